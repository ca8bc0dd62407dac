//! In-memory board store and events source for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, RosterError};
use crate::models::{BoardRef, Event, LabelKind, RawBoard, RawCard, RawLabel, RawList, RsvpRecord};

use super::{BoardStore, EventsSource};

#[derive(Default)]
struct Inner {
    boards: Vec<(BoardRef, RawBoard)>,
    organizations: Vec<(String, String)>,
    next_id: u64,
    failing_cards: HashSet<String>,
    fail_reads: bool,
    writes: usize,
    passes: Vec<String>,
}

impl Inner {
    /// Generated ids live in their own range so they never collide with
    /// fixture ids like `card-2`.
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-m{}", prefix, self.next_id)
    }

    fn card_mut(&mut self, card_id: &str) -> Option<&mut RawCard> {
        self.boards
            .iter_mut()
            .flat_map(|(_, raw)| raw.lists.iter_mut())
            .flat_map(|list| list.cards.iter_mut())
            .find(|card| card.id == card_id)
    }
}

#[derive(Default)]
pub(crate) struct MemoryBoardStore {
    inner: Mutex<Inner>,
}

impl MemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_board(self, name: &str, raw: RawBoard) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id("board");
            let board = BoardRef {
                id: id.clone(),
                name: name.to_string(),
                url: format!("https://boards.example.com/b/{}", id),
                organization_id: None,
            };
            inner.boards.push((board, raw));
        }
        self
    }

    pub fn with_organization(self, name: &str, id: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .organizations
            .push((name.to_string(), id.to_string()));
        self
    }

    /// Every label write against this card fails
    pub fn fail_label_writes_for(&self, card_id: &str) {
        self.inner.lock().unwrap().failing_cards.insert(card_id.to_string());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_reads = fail;
    }

    pub fn raw(&self, name: &str) -> RawBoard {
        let inner = self.inner.lock().unwrap();
        inner
            .boards
            .iter()
            .find(|(b, _)| b.name == name)
            .map(|(_, raw)| raw.clone())
            .unwrap()
    }

    pub fn board_count(&self, name: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.boards.iter().filter(|(b, _)| b.name == name).count()
    }

    pub fn writes(&self) -> usize {
        self.inner.lock().unwrap().writes
    }

    pub fn passes(&self) -> Vec<String> {
        self.inner.lock().unwrap().passes.clone()
    }

    fn label_write(&self, card_id: &str, label: LabelKind, attach: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_cards.contains(card_id) {
            return Err(anyhow::anyhow!("Server error: label write rejected").into());
        }
        inner.writes += 1;
        let card = inner
            .card_mut(card_id)
            .ok_or_else(|| RosterError::NotFound(format!("card {}", card_id)))?;
        if attach {
            if !card.has_label(label) {
                card.labels.push(RawLabel {
                    id: String::new(),
                    name: label.name().to_string(),
                });
            }
        } else {
            card.labels.retain(|l| LabelKind::from_name(&l.name) != Some(label));
        }
        Ok(())
    }
}

#[async_trait]
impl BoardStore for MemoryBoardStore {
    fn begin_pass(&self, board_name: &str) {
        self.inner.lock().unwrap().passes.push(board_name.to_string());
    }

    async fn find_board(&self, name: &str) -> Result<BoardRef> {
        // Give concurrent passes a chance to interleave, as a network call would
        tokio::task::yield_now().await;
        let inner = self.inner.lock().unwrap();
        let matches: Vec<&BoardRef> = inner
            .boards
            .iter()
            .map(|(b, _)| b)
            .filter(|b| b.name == name)
            .collect();
        match matches.as_slice() {
            [] => Err(RosterError::NotFound(format!("board {:?}", name))),
            [board] => Ok((*board).clone()),
            _ => Err(RosterError::AmbiguousJoinKey(format!("{} boards named {:?}", matches.len(), name))),
        }
    }

    async fn read_board(&self, board: &BoardRef) -> Result<RawBoard> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(anyhow::anyhow!("Network error: connection reset").into());
        }
        inner
            .boards
            .iter()
            .find(|(b, _)| b.id == board.id)
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| RosterError::NotFound(format!("board {}", board.id)))
    }

    async fn create_card(
        &self,
        board: &BoardRef,
        list_id: &str,
        name: &str,
        description: &str,
        labels: &[LabelKind],
    ) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        let card_id = inner.next_id("card");
        inner.writes += 1;
        let list = inner
            .boards
            .iter_mut()
            .filter(|(b, _)| b.id == board.id)
            .flat_map(|(_, raw)| raw.lists.iter_mut())
            .find(|l| l.id == list_id)
            .ok_or_else(|| RosterError::NotFound(format!("list {}", list_id)))?;
        list.cards.push(RawCard {
            id: card_id.clone(),
            name: name.to_string(),
            desc: description.to_string(),
            labels: labels
                .iter()
                .map(|l| RawLabel {
                    id: String::new(),
                    name: l.name().to_string(),
                })
                .collect(),
        });
        Ok(card_id)
    }

    async fn add_label(&self, _board: &BoardRef, card_id: &str, label: LabelKind) -> Result<()> {
        self.label_write(card_id, label, true)
    }

    async fn remove_label(&self, _board: &BoardRef, card_id: &str, label: LabelKind) -> Result<()> {
        self.label_write(card_id, label, false)
    }

    async fn create_list(&self, board: &BoardRef, name: &str) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        let list_id = inner.next_id("list");
        inner.writes += 1;
        let (_, raw) = inner
            .boards
            .iter_mut()
            .find(|(b, _)| b.id == board.id)
            .ok_or_else(|| RosterError::NotFound(format!("board {}", board.id)))?;
        raw.lists.push(RawList {
            id: list_id.clone(),
            name: name.to_string(),
            cards: Vec::new(),
        });
        Ok(list_id)
    }

    async fn find_organization(&self, name: &str) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .organizations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.clone())
            .ok_or_else(|| RosterError::NotFound(format!("organization {:?}", name)))
    }

    async fn clone_board(
        &self,
        template: &BoardRef,
        new_name: &str,
        organization_id: Option<&str>,
    ) -> Result<BoardRef> {
        let mut inner = self.inner.lock().unwrap();
        let raw = inner
            .boards
            .iter()
            .find(|(b, _)| b.id == template.id)
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| RosterError::NotFound(format!("template {}", template.name)))?;
        let mut copy = raw;
        for list in &mut copy.lists {
            list.id = inner.next_id("list");
            for card in &mut list.cards {
                card.id = inner.next_id("card");
            }
        }
        let id = inner.next_id("board");
        let board = BoardRef {
            id: id.clone(),
            name: new_name.to_string(),
            url: format!("https://boards.example.com/b/{}", id),
            organization_id: organization_id.map(str::to_string),
        };
        inner.writes += 1;
        inner.boards.push((board.clone(), copy));
        Ok(board)
    }
}

/// Fixed events and RSVPs.
#[derive(Default)]
pub(crate) struct MemoryEvents {
    pub events: Vec<Event>,
    pub rsvps: Vec<(String, Vec<RsvpRecord>)>,
}

#[async_trait]
impl EventsSource for MemoryEvents {
    async fn upcoming_events(&self) -> Result<Vec<Event>> {
        Ok(self.events.clone())
    }

    async fn rsvps(&self, event_id: &str) -> Result<Vec<RsvpRecord>> {
        Ok(self
            .rsvps
            .iter()
            .find(|(id, _)| id == event_id)
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }
}
