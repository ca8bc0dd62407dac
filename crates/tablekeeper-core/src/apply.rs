//! Idempotent application of reconciler actions to the board store.
//!
//! Actions run strictly in order. Each one checks the applier's view of the
//! board first and does nothing if its postcondition already holds. A failed
//! write is recorded and the batch carries on.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::{encode_info, BoardState};
use crate::error::{Result, RosterError};
use crate::models::{BoardRef, Event, LabelKind, MemberId, Player, TableNumber};
use crate::reconcile::Action;
use crate::store::BoardStore;

/// A write that did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    pub action: Action,
    pub error: String,
}

/// A live (non-cancelled) card as the applier knows it.
#[derive(Debug, Clone)]
struct LiveCard {
    card_id: String,
    gm: bool,
    waitlisted: bool,
}

/// Applies actions against one board.
///
/// A member may hold more than one live card (a GM card at one table and a
/// seat elsewhere), so every member maps to all of their live cards.
pub struct ActionApplier<'a> {
    store: &'a dyn BoardStore,
    board: BoardRef,
    overflow_list_id: Option<String>,
    cards: HashMap<MemberId, Vec<LiveCard>>,
}

impl<'a> ActionApplier<'a> {
    pub fn new(store: &'a dyn BoardStore, state: &BoardState) -> Self {
        let mut cards: HashMap<MemberId, Vec<LiveCard>> = HashMap::new();
        for card in state.cards().iter().filter(|c| c.is_active()) {
            cards.entry(card.player.id).or_default().push(LiveCard {
                card_id: card.card_id.clone(),
                gm: card.gm,
                waitlisted: card.waitlisted,
            });
        }

        Self {
            store,
            board: state.board.clone(),
            overflow_list_id: state.overflow_list_id().map(str::to_string),
            cards,
        }
    }

    /// Apply every action in order. Returns the ones that failed.
    pub async fn apply(&mut self, actions: &[Action]) -> Vec<ActionFailure> {
        let mut failures = Vec::new();
        for action in actions {
            match self.apply_one(action).await {
                Ok(()) => debug!(board = %self.board.name, %action, "Action applied"),
                Err(e) => {
                    warn!(board = %self.board.name, %action, error = %e, "Action failed, continuing");
                    failures.push(ActionFailure {
                        action: action.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        failures
    }

    async fn apply_one(&mut self, action: &Action) -> Result<()> {
        let member = action.member();
        let write_err = |e: RosterError| RosterError::remote_write(action, e);

        match action {
            Action::Seat(player) => {
                if self.has_cards(member) {
                    debug!(%member, "Card already on the board, nothing to seat");
                    return Ok(());
                }
                self.new_card(player, false).await.map_err(write_err)?;
            }
            Action::Cancel { .. } => {
                let live = self.cards.remove(&member).unwrap_or_default();
                if live.is_empty() {
                    debug!(%member, "No card to cancel");
                    return Ok(());
                }
                // Every live card is labelled. Cards whose write failed stay
                // live so a later pass retries them.
                let mut remaining = Vec::new();
                let mut first_err = None;
                for card in live {
                    if let Err(e) = self
                        .store
                        .add_label(&self.board, &card.card_id, LabelKind::Canceled)
                        .await
                    {
                        remaining.push(card);
                        first_err.get_or_insert(e);
                    }
                }
                if !remaining.is_empty() {
                    self.cards.insert(member, remaining);
                }
                if let Some(e) = first_err {
                    return Err(write_err(e));
                }
            }
            Action::AddToWaitlist(player) => {
                let cards = self.cards.get(&member).map(Vec::as_slice).unwrap_or_default();
                if cards.iter().any(|c| c.waitlisted) {
                    debug!(%member, "Already waitlisted");
                    return Ok(());
                }
                match cards.iter().position(|c| !c.gm) {
                    Some(index) => {
                        let card_id = cards[index].card_id.clone();
                        self.store
                            .add_label(&self.board, &card_id, LabelKind::Waitlist)
                            .await
                            .map_err(write_err)?;
                        self.set_waitlisted(member, index, true);
                    }
                    None => {
                        self.new_card(player, true).await.map_err(write_err)?;
                    }
                }
            }
            Action::PromoteFromWaitlist(player) => {
                let cards = self.cards.get(&member).map(Vec::as_slice).unwrap_or_default();
                match cards.iter().position(|c| c.waitlisted) {
                    Some(index) => {
                        let card_id = cards[index].card_id.clone();
                        self.store
                            .remove_label(&self.board, &card_id, LabelKind::Waitlist)
                            .await
                            .map_err(write_err)?;
                        self.set_waitlisted(member, index, false);
                    }
                    None if !cards.is_empty() => {
                        debug!(%member, "Already seated");
                    }
                    None => {
                        self.new_card(player, false).await.map_err(write_err)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn has_cards(&self, member: MemberId) -> bool {
        self.cards.get(&member).is_some_and(|cards| !cards.is_empty())
    }

    fn set_waitlisted(&mut self, member: MemberId, index: usize, waitlisted: bool) {
        if let Some(card) = self.cards.get_mut(&member).and_then(|cards| cards.get_mut(index)) {
            card.waitlisted = waitlisted;
        }
    }

    /// Create a card in the RSVP list and track it as live.
    async fn new_card(&mut self, player: &Player, waitlisted: bool) -> Result<()> {
        let list_id = self.rsvp_list()?;
        let labels: &[LabelKind] = if waitlisted { &[LabelKind::Waitlist] } else { &[] };
        let card_id = self
            .store
            .create_card(&self.board, &list_id, &player.name, &player.id.to_string(), labels)
            .await?;
        self.cards.entry(player.id).or_default().push(LiveCard {
            card_id,
            gm: false,
            waitlisted,
        });
        Ok(())
    }

    fn rsvp_list(&self) -> Result<String> {
        self.overflow_list_id
            .clone()
            .ok_or_else(|| RosterError::NotFound(format!("RSVP list on board {:?}", self.board.name)))
    }

    /// Make sure a board exists for the event, cloning the template if not.
    /// Returns the board and whether it was created.
    pub async fn create_board_for_event(
        store: &dyn BoardStore,
        event: &Event,
        template_name: &str,
        organization: Option<&str>,
    ) -> Result<(BoardRef, bool)> {
        match store.find_board(&event.name).await {
            Ok(board) => return Ok((board, false)),
            Err(RosterError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let template = store.find_board(template_name).await?;
        let organization_id = match organization {
            Some(name) => Some(store.find_organization(name).await?),
            None => None,
        };
        let board = store
            .clone_board(&template, &event.name, organization_id.as_deref())
            .await
            .map_err(|e| RosterError::remote_write(format!("CreateBoardForEvent({})", event.name), e))?;

        info!(event = %event.name, board = %board.id, "Created board for new event");
        Ok((board, true))
    }
}

/// Append a table to a board: a list `"<N>. <title>"` numbered after the
/// highest existing table, with an Info card holding blurb and capacity.
pub async fn add_table(
    store: &dyn BoardStore,
    state: &BoardState,
    title: &str,
    blurb: &str,
    max_players: Option<u32>,
) -> Result<TableNumber> {
    let number = state
        .last_table_number()
        .map(|n| TableNumber(n.0 + 1))
        .unwrap_or(TableNumber(1));
    let name = format!("{}. {}", number, title.trim());

    let list_id = store.create_list(&state.board, &name).await?;
    store
        .create_card(
            &state.board,
            &list_id,
            "Info",
            &encode_info(blurb.trim(), max_players),
            &[],
        )
        .await?;

    info!(board = %state.board.name, table = %name, "Table added");
    Ok(number)
}
