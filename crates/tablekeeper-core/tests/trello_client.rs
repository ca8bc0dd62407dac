use tablekeeper_core::api::TrelloClient;
use tablekeeper_core::models::BoardRef;
use tablekeeper_core::{parse_board, BoardStore, LabelKind, MemberId, RosterError, TableNumber};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn game_day() -> BoardRef {
    BoardRef {
        id: "b1".to_string(),
        name: "Game Day".to_string(),
        url: String::new(),
        organization_id: None,
    }
}

async fn mount_boards(mock_server: &MockServer, expect: u64) {
    Mock::given(method("GET"))
        .and(path("/1/members/me/boards"))
        .and(query_param("key", "k"))
        .and(query_param("token", "t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "b1", "name": "Game Day", "url": "https://trello.com/b/b1", "idOrganization": "o1"},
            {"id": "b2", "name": "Meetup Template", "url": "https://trello.com/b/b2", "idOrganization": null}
        ])))
        .expect(expect)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_find_board_is_cached_within_a_pass() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    mount_boards(&mock_server, 3).await;

    let client = TrelloClient::with_base_url(&mock_server.uri(), "k", "t")?;
    client.begin_pass("Game Day");
    let board = client.find_board("Game Day").await?;
    assert_eq!(board.id, "b1");
    assert_eq!(board.organization_id.as_deref(), Some("o1"));
    client.find_board("Game Day").await?;

    // A new pass looks the board up again
    client.begin_pass("Game Day");
    client.find_board("Game Day").await?;

    let err = client.find_board("Game Night").await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_board_names_are_ambiguous() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/members/me/boards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "b1", "name": "Game Day"},
            {"id": "b3", "name": "Game Day"}
        ])))
        .mount(&mock_server)
        .await;

    let client = TrelloClient::with_base_url(&mock_server.uri(), "k", "t")?;
    let err = client.find_board("Game Day").await.unwrap_err();
    assert!(matches!(err, RosterError::AmbiguousJoinKey(_)));
    Ok(())
}

#[tokio::test]
async fn test_read_and_parse_board() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/boards/b1/lists"))
        .and(query_param("cards", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "l0", "name": "RSVP", "closed": false, "cards": [
                {"id": "c1", "name": "Ann", "desc": "1", "labels": []}
            ]},
            {"id": "l1", "name": "1. Rat Queens (Fate)", "cards": [
                {"id": "c0", "name": "Info", "desc": "Rescue the queens\n\nPlayers: 4", "labels": []},
                {"id": "c2", "name": "Bo", "desc": "2", "labels": [{"id": "g", "name": "GM", "color": "green"}]},
                {"id": "c3", "name": "Cy", "desc": "3", "labels": []}
            ]}
        ])))
        .mount(&mock_server)
        .await;

    let client = TrelloClient::with_base_url(&mock_server.uri(), "k", "t")?;
    let raw = client.read_board(&game_day()).await?;
    let state = parse_board(&game_day(), &raw)?;

    let table = state.table(TableNumber(1)).ok_or("table 1 missing")?;
    assert_eq!(table.max_players, Some(4));
    assert_eq!(table.gm.as_ref().map(|p| p.id), Some(MemberId(2)));
    assert_eq!(state.overflow_list_id(), Some("l0"));
    assert_eq!(state.participants().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_waitlist_card_gets_label_on_creation() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/boards/b1/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "lbl-gm", "name": "GM"},
            {"id": "lbl-wait", "name": "Waitlist"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/cards"))
        .and(query_param("idList", "l0"))
        .and(query_param("desc", "7"))
        .and(query_param("idLabels", "lbl-wait"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "c7"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/1/cards/c7/idLabels/lbl-wait"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"_value": null})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TrelloClient::with_base_url(&mock_server.uri(), "k", "t")?;
    let card = client
        .create_card(&game_day(), "l0", "Dee", "7", &[LabelKind::Waitlist])
        .await?;
    assert_eq!(card, "c7");

    // Label ids come from the cache for the rest of the pass
    client
        .remove_label(&game_day(), "c7", LabelKind::Waitlist)
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_missing_label_is_created() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/boards/b1/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "lbl-gm", "name": "GM"}
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/labels"))
        .and(query_param("name", "Canceled"))
        .and(query_param("idBoard", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "lbl-x"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/cards/c1/idLabels"))
        .and(query_param("value", "lbl-x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["lbl-x"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TrelloClient::with_base_url(&mock_server.uri(), "k", "t")?;
    client.add_label(&game_day(), "c1", LabelKind::Canceled).await?;
    Ok(())
}

#[tokio::test]
async fn test_failed_label_write_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/boards/b1/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "lbl-c", "name": "Canceled"}
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/cards/c1/idLabels"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&mock_server)
        .await;

    let client = TrelloClient::with_base_url(&mock_server.uri(), "k", "t")?;
    let err = client
        .add_label(&game_day(), "c1", LabelKind::Canceled)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("server error: try later"));
    Ok(())
}

#[tokio::test]
async fn test_clone_board_from_template() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/boards"))
        .and(query_param("name", "Game Night"))
        .and(query_param("idBoardSource", "b2"))
        .and(query_param("idOrganization", "o1"))
        .and(query_param("prefs_permissionLevel", "public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "b9", "name": "Game Night", "url": "https://trello.com/b/b9", "idOrganization": "o1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/members/me/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "o1", "name": "storg", "displayName": "STORG"}
        ])))
        .mount(&mock_server)
        .await;

    let client = TrelloClient::with_base_url(&mock_server.uri(), "k", "t")?;
    let template = BoardRef {
        id: "b2".to_string(),
        name: "Meetup Template".to_string(),
        url: String::new(),
        organization_id: None,
    };
    let org = client.find_organization("STORG").await?;
    let board = client.clone_board(&template, "Game Night", Some(org.as_str())).await?;
    assert_eq!(board.id, "b9");

    // Freshly cloned board resolves without listing boards
    assert_eq!(client.find_board("Game Night").await?.id, "b9");
    Ok(())
}

#[tokio::test]
async fn test_create_list_at_bottom() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/lists"))
        .and(query_param("name", "2. Rat Queens"))
        .and(query_param("pos", "bottom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "l2"})))
        .mount(&mock_server)
        .await;

    let client = TrelloClient::with_base_url(&mock_server.uri(), "k", "t")?;
    assert_eq!(client.create_list(&game_day(), "2. Rat Queens").await?, "l2");
    Ok(())
}
