use super::*;
use crate::utils::test_utils::{create_test_conversation, spawn_stub_server, StubResponse};
use serde_json::json;
use std::collections::VecDeque;

#[derive(Default)]
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<Conversation>, ApiError>>>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<Vec<Conversation>, ApiError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl ConversationSource for ScriptedSource {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected fetch")
    }
}

fn rejected(message: &str) -> ApiError {
    ApiError::Rejected {
        status: 500,
        message: message.to_string(),
    }
}

fn ids(store: &ConversationStore) -> Vec<String> {
    store
        .conversations()
        .into_iter()
        .map(|conv| conv.conversation_id)
        .collect()
}

fn seeded() -> ConversationStore {
    let store = ConversationStore::new();
    store.add(create_test_conversation("a", "Alpha"));
    store.add(create_test_conversation("b", "Beta"));
    store.add(create_test_conversation("c", "Gamma"));
    store
}

#[tokio::test]
async fn fetch_replaces_whole_collection_and_clears_error() {
    let store = seeded();
    let source = ScriptedSource::new(vec![
        Err(rejected("boom")),
        Ok(vec![create_test_conversation("z", "Remote")]),
    ]);

    store.fetch_all(&source).await;
    assert_eq!(store.error().as_deref(), Some(FETCH_FAILED_MESSAGE));
    assert_eq!(ids(&store), vec!["a", "b", "c"]);

    store.fetch_all(&source).await;
    assert_eq!(store.error(), None);
    assert_eq!(ids(&store), vec!["z"]);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn delete_all_then_fetch_yields_exactly_server_set() {
    let store = seeded();
    store.delete_all();
    assert!(store.is_empty());

    let remote = vec![
        create_test_conversation("r1", "One"),
        create_test_conversation("r2", "Two"),
    ];
    let source = ScriptedSource::new(vec![Ok(remote.clone())]);
    store.fetch_all(&source).await;
    assert_eq!(store.conversations(), remote);
}

#[test]
fn loading_flag_tracks_outstanding_requests() {
    let store = ConversationStore::new();
    assert!(!store.is_loading());
    let first = store.begin_fetch();
    let second = store.begin_fetch();
    assert!(store.is_loading());
    let _ = store.complete_fetch(first, Ok(vec![]));
    assert!(store.is_loading());
    let _ = store.complete_fetch(second, Ok(vec![]));
    assert!(!store.is_loading());
}

#[test]
fn stale_response_does_not_overwrite_newer_one() {
    let store = ConversationStore::new();
    let older = store.begin_fetch();
    let newer = store.begin_fetch();

    assert!(store.complete_fetch(newer, Ok(vec![create_test_conversation("new", "New")])));
    assert!(!store.complete_fetch(older, Ok(vec![create_test_conversation("old", "Old")])));
    assert_eq!(ids(&store), vec!["new"]);
}

#[test]
fn stale_failure_does_not_set_error() {
    let store = ConversationStore::new();
    let older = store.begin_fetch();
    let newer = store.begin_fetch();

    let _ = store.complete_fetch(newer, Ok(vec![]));
    let _ = store.complete_fetch(older, Err(rejected("late failure")));
    assert_eq!(store.error(), None);
}

#[test]
fn older_response_still_applies_when_newer_has_not_landed() {
    let store = ConversationStore::new();
    let older = store.begin_fetch();
    let newer = store.begin_fetch();

    assert!(store.complete_fetch(older, Ok(vec![create_test_conversation("old", "Old")])));
    assert!(store.complete_fetch(newer, Ok(vec![create_test_conversation("new", "New")])));
    assert_eq!(ids(&store), vec!["new"]);
}

#[test]
fn add_appends_without_uniqueness_check() {
    let store = seeded();
    store.add(create_test_conversation("a", "Duplicate"));
    assert_eq!(ids(&store), vec!["a", "b", "c", "a"]);

    store.delete("a");
    assert_eq!(ids(&store), vec!["b", "c"]);
}

#[test]
fn update_relabels_and_optionally_sets_loading() {
    let store = seeded();
    store.update("b", "Renamed", Some(true));
    let conv = store.get("b").unwrap();
    assert_eq!(conv.alias, "Renamed");
    assert!(conv.is_loading);

    store.update("b", "Renamed again", None);
    let conv = store.get("b").unwrap();
    assert_eq!(conv.alias, "Renamed again");
    assert!(conv.is_loading);
}

#[test]
fn update_on_missing_id_changes_nothing() {
    let store = seeded();
    let before = store.conversations();
    store.update("missing", "Nope", Some(true));
    assert_eq!(store.conversations(), before);
}

#[test]
fn starred_at_mirrors_starred() {
    let store = seeded();
    store.toggle_star("c", true);
    let conv = store.get("c").unwrap();
    assert!(conv.starred);
    assert!(conv.starred_at.is_some());

    store.toggle_star("c", false);
    let conv = store.get("c").unwrap();
    assert!(!conv.starred);
    assert!(conv.starred_at.is_none());

    assert!(store.get("a").unwrap().starred_at.is_none());
}

#[test]
fn clones_share_state() {
    let store = ConversationStore::new();
    let view = store.clone();
    store.add(create_test_conversation("x", "X"));
    assert_eq!(view.len(), 1);
}

#[tokio::test]
async fn fetch_against_service_records_error_on_non_success() {
    let server = spawn_stub_server(vec![
        StubResponse::text(503, "unavailable"),
        StubResponse::json(
            200,
            json!({"conversations": [{"conversation_id": "s1", "alias": "Server"}]}),
        ),
    ])
    .await;
    let client = ServiceClient::new(server.base_url.clone(), None);
    let store = seeded();

    store.fetch_all(&client).await;
    assert_eq!(store.error().as_deref(), Some(FETCH_FAILED_MESSAGE));
    assert_eq!(store.len(), 3);

    store.fetch_all(&client).await;
    assert_eq!(store.error(), None);
    assert_eq!(ids(&store), vec!["s1"]);
}

#[tokio::test]
async fn service_detail_is_not_shown_as_the_list_error() {
    let server = spawn_stub_server(vec![StubResponse::json(
        500,
        json!({"detail": "database timeout"}),
    )])
    .await;
    let client = ServiceClient::new(server.base_url.clone(), None);
    let store = seeded();

    store.fetch_all(&client).await;
    assert_eq!(store.error().as_deref(), Some(FETCH_FAILED_MESSAGE));
    assert_eq!(ids(&store), vec!["a", "b", "c"]);
}
