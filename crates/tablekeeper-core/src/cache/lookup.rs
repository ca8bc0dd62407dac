use std::collections::HashMap;

use crate::models::{BoardRef, LabelKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Board,
    Labels,
}

#[derive(Debug, Clone)]
enum Entry {
    Board(BoardRef),
    Labels {
        board_name: String,
        ids: HashMap<LabelKind, String>,
    },
}

/// Per-pass board lookups.
///
/// Boards are keyed by name, the join key with the events source. Label ids
/// are keyed by board id, so a board replaced under the same name never
/// sees its predecessor's labels. [`LookupCache::invalidate`] drops both
/// kinds of entry for a board name at the start of every pass over it.
#[derive(Debug, Default)]
pub struct LookupCache {
    entries: HashMap<(String, LookupKind), Entry>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self, board_name: &str) -> Option<BoardRef> {
        match self.entries.get(&(board_name.to_string(), LookupKind::Board)) {
            Some(Entry::Board(board)) => Some(board.clone()),
            _ => None,
        }
    }

    pub fn put_board(&mut self, board: &BoardRef) {
        self.entries.insert(
            (board.name.clone(), LookupKind::Board),
            Entry::Board(board.clone()),
        );
    }

    pub fn label_id(&self, board: &BoardRef, label: LabelKind) -> Option<String> {
        match self.entries.get(&(board.id.clone(), LookupKind::Labels)) {
            Some(Entry::Labels { ids, .. }) => ids.get(&label).cloned(),
            _ => None,
        }
    }

    pub fn put_labels(&mut self, board: &BoardRef, ids: HashMap<LabelKind, String>) {
        self.entries.insert(
            (board.id.clone(), LookupKind::Labels),
            Entry::Labels {
                board_name: board.name.clone(),
                ids,
            },
        );
    }

    pub fn invalidate(&mut self, board_name: &str) {
        self.entries.retain(|(key, _), entry| match entry {
            Entry::Board(_) => key != board_name,
            Entry::Labels { board_name: name, .. } => name != board_name,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
