use std::fmt;

use serde::{Deserialize, Serialize};

/// Labels with a meaning for the roster. Any other label on a card is
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelKind {
    Gm,
    Canceled,
    Waitlist,
}

impl LabelKind {
    /// Name of the label on the board
    pub fn name(&self) -> &'static str {
        match self {
            LabelKind::Gm => "GM",
            LabelKind::Canceled => "Canceled",
            LabelKind::Waitlist => "Waitlist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gm" => Some(LabelKind::Gm),
            "canceled" | "cancelled" => Some(LabelKind::Canceled),
            "waitlist" | "waitlisted" => Some(LabelKind::Waitlist),
            _ => None,
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Handle to a board in the board store. `name` equals the event name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "idOrganization", default)]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLabel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCard {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub labels: Vec<RawLabel>,
}

impl RawCard {
    pub fn has_label(&self, kind: LabelKind) -> bool {
        self.labels
            .iter()
            .any(|l| LabelKind::from_name(&l.name) == Some(kind))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawList {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cards: Vec<RawCard>,
}

/// A board's open lists and cards, in board order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBoard {
    pub lists: Vec<RawList>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names() {
        assert_eq!(LabelKind::from_name("GM"), Some(LabelKind::Gm));
        assert_eq!(LabelKind::from_name("cancelled"), Some(LabelKind::Canceled));
        assert_eq!(LabelKind::from_name(" Waitlist "), Some(LabelKind::Waitlist));
        assert_eq!(LabelKind::from_name("Newbie"), None);
        assert_eq!(LabelKind::Canceled.to_string(), "Canceled");
    }

    #[test]
    fn test_parse_trello_list_with_cards() {
        let json = r#"{"id": "l1", "name": "1. Rat Queens (Fate)", "closed": false, "pos": 65535,
            "cards": [{"id": "c1", "name": "Ann", "desc": "1", "idList": "l1",
                       "labels": [{"id": "g", "idBoard": "b", "name": "GM", "color": "green"}]}]}"#;

        let list: RawList = serde_json::from_str(json).expect("list should parse");
        assert_eq!(list.cards.len(), 1);
        assert!(list.cards[0].has_label(LabelKind::Gm));
        assert!(!list.cards[0].has_label(LabelKind::Canceled));
    }
}
