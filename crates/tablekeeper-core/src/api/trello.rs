//! Client for the board store (Trello v1 API).
//!
//! Board and label lookups go through a [`LookupCache`] that is cleared for
//! a board whenever a new pass over it begins.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::http::{Auth, HttpClient};
use crate::cache::LookupCache;
use crate::error::{Result, RosterError};
use crate::models::{BoardRef, LabelKind, RawBoard, RawLabel, RawList};
use crate::store::BoardStore;

pub const TRELLO_BASE_URL: &str = "https://api.trello.com";

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Organization {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
}

fn label_color(kind: LabelKind) -> &'static str {
    match kind {
        LabelKind::Gm => "green",
        LabelKind::Canceled => "red",
        LabelKind::Waitlist => "yellow",
    }
}

pub struct TrelloClient {
    http: HttpClient,
    cache: Mutex<LookupCache>,
}

impl TrelloClient {
    pub fn new(api_key: &str, token: &str) -> AnyResult<Self> {
        Self::with_base_url(TRELLO_BASE_URL, api_key, token)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, token: &str) -> AnyResult<Self> {
        let http = HttpClient::new(
            "trello",
            base_url,
            Auth::Query(vec![("key", api_key.to_string()), ("token", token.to_string())]),
        )?;
        Ok(Self {
            http,
            cache: Mutex::new(LookupCache::new()),
        })
    }

    fn cache(&self) -> MutexGuard<'_, LookupCache> {
        // A poisoned cache only holds lookups; keep using it.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Id of the board's label for `kind`, creating the label if the board
    /// has none.
    async fn label_id(&self, board: &BoardRef, kind: LabelKind) -> Result<String> {
        let cached = self.cache().label_id(board, kind);
        if let Some(id) = cached {
            return Ok(id);
        }

        let labels: Vec<RawLabel> = self
            .http
            .get(&format!("/1/boards/{}/labels", board.id), &[("fields", "name")])
            .await?;
        let mut by_kind: HashMap<LabelKind, String> = HashMap::new();
        for label in labels {
            if let Some(k) = LabelKind::from_name(&label.name) {
                by_kind.entry(k).or_insert(label.id);
            }
        }

        let id = match by_kind.get(&kind) {
            Some(id) => id.clone(),
            None => {
                let created: Created = self
                    .http
                    .post(
                        "/1/labels",
                        &[
                            ("name", kind.name()),
                            ("color", label_color(kind)),
                            ("idBoard", board.id.as_str()),
                        ],
                    )
                    .await?;
                info!(board = %board.name, label = %kind, "Created missing label");
                by_kind.insert(kind, created.id.clone());
                created.id
            }
        };

        self.cache().put_labels(board, by_kind);
        Ok(id)
    }
}

#[async_trait]
impl BoardStore for TrelloClient {
    fn begin_pass(&self, board_name: &str) {
        self.cache().invalidate(board_name);
    }

    async fn find_board(&self, name: &str) -> Result<BoardRef> {
        let cached = self.cache().board(name);
        if let Some(board) = cached {
            return Ok(board);
        }

        let boards: Vec<BoardRef> = self
            .http
            .get(
                "/1/members/me/boards",
                &[("filter", "open"), ("fields", "name,url,idOrganization")],
            )
            .await?;
        let mut matches = boards.into_iter().filter(|b| b.name == name);
        let board = match (matches.next(), matches.next()) {
            (Some(board), None) => board,
            (None, _) => return Err(RosterError::NotFound(format!("board {:?}", name))),
            (Some(_), Some(_)) => {
                return Err(RosterError::AmbiguousJoinKey(format!(
                    "several open boards are named {:?}",
                    name
                )))
            }
        };

        debug!(board = %name, id = %board.id, "Board found");
        self.cache().put_board(&board);
        Ok(board)
    }

    async fn read_board(&self, board: &BoardRef) -> Result<RawBoard> {
        let lists: Vec<RawList> = self
            .http
            .get(
                &format!("/1/boards/{}/lists", board.id),
                &[
                    ("filter", "open"),
                    ("cards", "open"),
                    ("card_fields", "name,desc,labels"),
                    ("fields", "name"),
                ],
            )
            .await?;
        Ok(RawBoard { lists })
    }

    async fn create_card(
        &self,
        board: &BoardRef,
        list_id: &str,
        name: &str,
        description: &str,
        labels: &[LabelKind],
    ) -> Result<String> {
        let mut label_ids = Vec::with_capacity(labels.len());
        for kind in labels {
            label_ids.push(self.label_id(board, *kind).await?);
        }
        let label_ids = label_ids.join(",");

        let mut query = vec![("idList", list_id), ("name", name), ("desc", description)];
        if !label_ids.is_empty() {
            query.push(("idLabels", label_ids.as_str()));
        }
        let created: Created = self.http.post("/1/cards", &query).await?;
        Ok(created.id)
    }

    async fn add_label(&self, board: &BoardRef, card_id: &str, label: LabelKind) -> Result<()> {
        let label_id = self.label_id(board, label).await?;
        let _: serde_json::Value = self
            .http
            .post(
                &format!("/1/cards/{}/idLabels", card_id),
                &[("value", label_id.as_str())],
            )
            .await?;
        Ok(())
    }

    async fn remove_label(&self, board: &BoardRef, card_id: &str, label: LabelKind) -> Result<()> {
        let label_id = self.label_id(board, label).await?;
        self.http
            .delete(&format!("/1/cards/{}/idLabels/{}", card_id, label_id), &[])
            .await?;
        Ok(())
    }

    async fn create_list(&self, board: &BoardRef, name: &str) -> Result<String> {
        let created: Created = self
            .http
            .post(
                "/1/lists",
                &[("name", name), ("idBoard", board.id.as_str()), ("pos", "bottom")],
            )
            .await?;
        Ok(created.id)
    }

    async fn find_organization(&self, name: &str) -> Result<String> {
        let organizations: Vec<Organization> = self
            .http
            .get("/1/members/me/organizations", &[("fields", "name,displayName")])
            .await?;
        organizations
            .into_iter()
            .find(|o| o.name == name || o.display_name == name)
            .map(|o| o.id)
            .ok_or_else(|| RosterError::NotFound(format!("team {:?}", name)))
    }

    async fn clone_board(
        &self,
        template: &BoardRef,
        new_name: &str,
        organization_id: Option<&str>,
    ) -> Result<BoardRef> {
        let mut query = vec![
            ("name", new_name),
            ("idBoardSource", template.id.as_str()),
            ("keepFromSource", "cards"),
            ("prefs_permissionLevel", "public"),
            ("defaultLists", "false"),
        ];
        if let Some(org) = organization_id {
            query.push(("idOrganization", org));
        }
        let board: BoardRef = self.http.post("/1/boards", &query).await?;
        self.cache().put_board(&board);
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_organizations() {
        let json = r#"[{"id": "o1", "name": "storg", "displayName": "STORG"}]"#;
        let orgs: Vec<Organization> = serde_json::from_str(json).unwrap();
        assert_eq!(orgs[0].display_name, "STORG");
    }

    #[test]
    fn test_begin_pass_clears_board_lookups() {
        let client = TrelloClient::new("key", "token").unwrap();
        let board = BoardRef {
            id: "b1".to_string(),
            name: "Game Day".to_string(),
            url: String::new(),
            organization_id: None,
        };
        client.cache().put_board(&board);
        assert!(client.cache().board("Game Day").is_some());

        client.begin_pass("Game Day");
        assert!(client.cache().board("Game Day").is_none());
    }
}
