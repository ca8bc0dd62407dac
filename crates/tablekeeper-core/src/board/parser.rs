use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{BoardRef, LabelKind, MemberId, Player, RawBoard, RawCard, RawLabel, RawList, Table, TableNumber};

use super::state::{BoardState, CardEntry};

/// List name prefixes that mark the overflow (not yet seated) list
const OVERFLOW_MARKERS: [&str; 2] = ["rsvp", "waitlist"];

/// Name of the card carrying a table's blurb and capacity
const INFO_CARD: &str = "Info";

/// Separator between blurb and capacity on the Info card
const PLAYERS_MARKER: &str = "Players: ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed list name {raw:?}: expected \"<number>. <title>\"")]
    ListName { raw: String },

    #[error("List {raw:?} uses the reserved table number 9999")]
    ReservedTableNumber { raw: String },

    #[error("Table {number} appears in more than one list")]
    DuplicateTable { number: TableNumber },

    #[error("Malformed capacity {raw:?} on the Info card of table {table}")]
    Capacity { table: TableNumber, raw: String },

    #[error("Member {member} holds a seat at both table {first} and table {second}")]
    DuplicateParticipant {
        member: MemberId,
        first: TableNumber,
        second: TableNumber,
    },

    #[error("Table {table} has more than one GM card")]
    MultipleGms { table: TableNumber },

    #[error("Member {member} is both GM and player at table {table}")]
    GmSeatedAtOwnTable { member: MemberId, table: TableNumber },
}

fn is_overflow_list(name: &str) -> bool {
    let lower = name.trim_start().to_ascii_lowercase();
    OVERFLOW_MARKERS.iter().any(|m| lower.starts_with(m))
}

fn parse_list_name(name: &str) -> Result<(TableNumber, String), ParseError> {
    let malformed = || ParseError::ListName {
        raw: name.to_string(),
    };
    let (number, title) = name.split_once(". ").ok_or_else(malformed)?;
    let number: u32 = number.trim().parse().map_err(|_| malformed())?;
    if number == 0 {
        return Err(malformed());
    }
    let number = TableNumber(number);
    if number.is_overflow() {
        return Err(ParseError::ReservedTableNumber {
            raw: name.to_string(),
        });
    }
    Ok((number, title.to_string()))
}

/// Decode an Info card description into `(blurb, capacity)`.
///
/// A missing `Players: ` marker means unlimited. A marker followed by
/// something that is not a number is an error.
pub fn decode_info(desc: &str) -> Result<(String, Option<u32>), String> {
    match desc.rsplit_once(PLAYERS_MARKER) {
        Some((blurb, raw)) => {
            let max = raw.trim().parse::<u32>().map_err(|_| raw.trim().to_string())?;
            Ok((blurb.trim_end().to_string(), Some(max)))
        }
        None => Ok((desc.trim_end().to_string(), None)),
    }
}

pub fn encode_info(blurb: &str, max_players: Option<u32>) -> String {
    match (blurb.is_empty(), max_players) {
        (true, Some(max)) => format!("{}{}", PLAYERS_MARKER, max),
        (false, Some(max)) => format!("{}\n\n{}{}", blurb, PLAYERS_MARKER, max),
        (_, None) => blurb.to_string(),
    }
}

/// Seat bookkeeping across all tables of one board.
#[derive(Default)]
struct SeatIndex {
    seats: HashMap<MemberId, TableNumber>,
    gms: HashMap<MemberId, TableNumber>,
}

impl SeatIndex {
    fn take_seat(&mut self, member: MemberId, table: TableNumber) -> Result<(), ParseError> {
        if self.gms.get(&member) == Some(&table) {
            return Err(ParseError::GmSeatedAtOwnTable { member, table });
        }
        if let Some(&first) = self.seats.get(&member) {
            return Err(ParseError::DuplicateParticipant {
                member,
                first,
                second: table,
            });
        }
        self.seats.insert(member, table);
        Ok(())
    }

    fn take_gm(&mut self, member: MemberId, table: TableNumber) -> Result<(), ParseError> {
        if self.seats.get(&member) == Some(&table) {
            return Err(ParseError::GmSeatedAtOwnTable { member, table });
        }
        if let Some(&first) = self.gms.get(&member) {
            return Err(ParseError::DuplicateParticipant {
                member,
                first,
                second: table,
            });
        }
        self.gms.insert(member, table);
        Ok(())
    }
}

struct Parsed {
    tables: BTreeMap<TableNumber, Table>,
    cards: Vec<CardEntry>,
    overflow_list_id: Option<String>,
    first_list_id: Option<String>,
}

fn parse_raw(board_name: &str, raw: &RawBoard) -> Result<Parsed, ParseError> {
    let mut tables: BTreeMap<TableNumber, Table> = BTreeMap::new();
    let mut cards = Vec::new();
    let mut index = SeatIndex::default();
    let mut overflow_list_id = None;

    for list in &raw.lists {
        let number = if is_overflow_list(&list.name) {
            if overflow_list_id.is_none() {
                overflow_list_id = Some(list.id.clone());
            }
            tables
                .entry(TableNumber::OVERFLOW)
                .or_insert_with(|| Table::overflow(list.name.clone()));
            TableNumber::OVERFLOW
        } else {
            let (number, title) = parse_list_name(&list.name)?;
            match tables.entry(number) {
                Entry::Occupied(_) => return Err(ParseError::DuplicateTable { number }),
                Entry::Vacant(slot) => {
                    slot.insert(Table::new(number, title));
                }
            }
            number
        };

        parse_cards(board_name, list, number, &mut tables, &mut cards, &mut index)?;
    }

    debug!(
        board = board_name,
        tables = tables.len(),
        cards = cards.len(),
        "Parsed board"
    );

    Ok(Parsed {
        tables,
        cards,
        overflow_list_id,
        first_list_id: raw.lists.first().map(|l| l.id.clone()),
    })
}

fn parse_cards(
    board_name: &str,
    list: &RawList,
    number: TableNumber,
    tables: &mut BTreeMap<TableNumber, Table>,
    cards: &mut Vec<CardEntry>,
    index: &mut SeatIndex,
) -> Result<(), ParseError> {
    let Some(table) = tables.get_mut(&number) else {
        return Ok(());
    };

    for card in &list.cards {
        if card.name.trim().eq_ignore_ascii_case(INFO_CARD) {
            let (blurb, max_players) = decode_info(&card.desc)
                .map_err(|raw| ParseError::Capacity { table: number, raw })?;
            table.blurb = blurb;
            table.max_players = max_players;
            continue;
        }

        let member = match card.desc.parse::<MemberId>() {
            Ok(id) => id,
            Err(_) => {
                warn!(
                    board = board_name,
                    list = %list.name,
                    card = %card.name,
                    "Skipping card without a member id"
                );
                continue;
            }
        };
        let player = Player {
            name: card.name.clone(),
            id: member,
        };

        let mut entry = CardEntry {
            card_id: card.id.clone(),
            list_id: list.id.clone(),
            table: number,
            player: player.clone(),
            gm: false,
            waitlisted: false,
            cancelled: false,
        };

        if card.has_label(LabelKind::Canceled) {
            entry.cancelled = true;
            table.cancelled.push(player);
        } else if card.has_label(LabelKind::Gm) {
            if table.gm.is_some() {
                return Err(ParseError::MultipleGms { table: number });
            }
            index.take_gm(member, number)?;
            entry.gm = true;
            table.gm = Some(player);
        } else if card.has_label(LabelKind::Waitlist) {
            index.take_seat(member, number)?;
            entry.waitlisted = true;
            table.waitlist.push(player);
        } else {
            index.take_seat(member, number)?;
            table.add_player(player);
        }

        cards.push(entry);
    }

    Ok(())
}

/// Parse a raw board into its tables, keyed by table number.
pub fn parse_tables(raw: &RawBoard) -> Result<BTreeMap<TableNumber, Table>, ParseError> {
    parse_raw("", raw).map(|parsed| parsed.tables)
}

/// Parse a raw board into a [`BoardState`] with its participant index.
pub fn parse_board(board: &BoardRef, raw: &RawBoard) -> Result<BoardState, ParseError> {
    let parsed = parse_raw(&board.name, raw)?;
    Ok(BoardState::new(
        board.clone(),
        parsed.tables,
        parsed.cards,
        parsed.overflow_list_id.or(parsed.first_list_id),
    ))
}

fn player_card(player: &Player, label: Option<LabelKind>) -> RawCard {
    RawCard {
        id: String::new(),
        name: player.name.clone(),
        desc: player.id.to_string(),
        labels: label
            .map(|kind| {
                vec![RawLabel {
                    id: String::new(),
                    name: kind.name().to_string(),
                }]
            })
            .unwrap_or_default(),
    }
}

/// Render tables back into the board encoding. The overflow table comes
/// first, as the RSVP list does on a board cloned from the template.
pub fn serialize_tables(tables: &BTreeMap<TableNumber, Table>) -> RawBoard {
    let ordered = tables
        .get(&TableNumber::OVERFLOW)
        .into_iter()
        .chain(tables.values().filter(|t| !t.is_overflow()));

    let lists = ordered
        .map(|table| {
            let name = if table.is_overflow() {
                table.title.clone()
            } else {
                format!("{}. {}", table.number, table.title)
            };

            let mut cards = Vec::new();
            if !table.blurb.is_empty() || table.max_players.is_some() {
                cards.push(RawCard {
                    id: String::new(),
                    name: INFO_CARD.to_string(),
                    desc: encode_info(&table.blurb, table.max_players),
                    labels: Vec::new(),
                });
            }
            cards.extend(table.gm.iter().map(|p| player_card(p, Some(LabelKind::Gm))));
            cards.extend(table.players.iter().map(|p| player_card(p, None)));
            cards.extend(table.waitlist.iter().map(|p| player_card(p, Some(LabelKind::Waitlist))));
            cards.extend(table.cancelled.iter().map(|p| player_card(p, Some(LabelKind::Canceled))));

            RawList {
                id: String::new(),
                name,
                cards,
            }
        })
        .collect();

    RawBoard { lists }
}
