use std::sync::Arc;

use async_trait::async_trait;
use chatdoc_session::{AskError, ChatWorkspace, Document, DocumentService, QueryRequest};
use chatdoc_store::{
    ChatStore, CredentialBundle, CredentialOverride, ManualClock, Role, StoreConfig,
    WriteOutcome, HISTORY_HEADER,
};
use chrono::{Local, TimeZone};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
#[error("service unavailable")]
struct Unavailable;

#[derive(Default)]
struct MockService {
    next_id: Mutex<u32>,
    answer: Mutex<Value>,
    fail_queries: Mutex<bool>,
    fail_deletes: Mutex<bool>,
    upload_overrides: Mutex<Vec<Option<CredentialOverride>>>,
    queries: Mutex<Vec<Value>>,
    deletes: Mutex<Vec<(String, Option<CredentialOverride>)>>,
}

#[async_trait]
impl DocumentService for MockService {
    type Error = Unavailable;

    async fn upload(
        &self,
        _document: &Document,
        overrides: Option<&CredentialOverride>,
    ) -> Result<String, Unavailable> {
        self.upload_overrides.lock().push(overrides.cloned());
        let mut next = self.next_id.lock();
        *next += 1;
        Ok(format!("u{}", *next))
    }

    async fn query(&self, request: &QueryRequest) -> Result<Value, Unavailable> {
        self.queries
            .lock()
            .push(serde_json::to_value(request).unwrap());
        if *self.fail_queries.lock() {
            return Err(Unavailable);
        }
        Ok(self.answer.lock().clone())
    }

    async fn delete(
        &self,
        upload_id: &str,
        overrides: Option<&CredentialOverride>,
    ) -> Result<(), Unavailable> {
        self.deletes
            .lock()
            .push((upload_id.to_string(), overrides.cloned()));
        if *self.fail_deletes.lock() {
            return Err(Unavailable);
        }
        Ok(())
    }
}

struct Harness {
    store: ChatStore,
    clock: Arc<ManualClock>,
    workspace: ChatWorkspace<MockService>,
}

fn harness() -> Harness {
    let store = ChatStore::in_memory(&StoreConfig::default());
    let clock = Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2025, 3, 4, 23, 59, 0).unwrap(),
    ));
    let service = MockService {
        answer: Mutex::new(json!({"answer": "The total is $42."})),
        ..Default::default()
    };
    let workspace = ChatWorkspace::new(&store, service, clock.clone());
    Harness {
        store,
        clock,
        workspace,
    }
}

fn report() -> Document {
    Document::new("report.pdf", b"%PDF-1.7".to_vec())
}

#[tokio::test]
async fn test_upload_without_bundle_is_unprotected() {
    let h = harness();
    let uploaded = h.workspace.upload(&report()).await.unwrap();

    assert_eq!(uploaded.persisted, WriteOutcome::Written);
    assert_eq!(uploaded.entry.id(), "u1");
    assert_eq!(uploaded.entry.label(), "report.pdf");
    assert!(!uploaded.entry.is_protected());
    assert!(uploaded.entry.credential_override().is_none());
    assert_eq!(h.workspace.service().upload_overrides.lock()[0], None);
}

#[tokio::test]
async fn test_upload_with_bundle_is_protected() {
    let h = harness();
    let bundle = CredentialBundle::new("sk", "https://v.example", "tok", "docs");
    let _ = h.store.vault.set(&bundle);

    let uploaded = h.workspace.upload(&report()).await.unwrap();
    assert!(uploaded.entry.is_protected());
    assert_eq!(
        h.workspace.service().upload_overrides.lock()[0],
        Some(CredentialOverride::from(&bundle))
    );

    h.clock.set(Local.with_ymd_and_hms(2025, 3, 9, 8, 0, 0).unwrap());
    assert_eq!(h.workspace.expired_count(), 0);
}

#[tokio::test]
async fn test_upload_with_partial_bundle_is_not_protected() {
    let h = harness();
    let _ = h
        .store
        .vault
        .set(&CredentialBundle::new("sk", "https://v.example", "", "docs"));

    let uploaded = h.workspace.upload(&report()).await.unwrap();
    assert!(!uploaded.entry.is_protected());
    assert!(uploaded.entry.credential_override().is_some());
}

#[tokio::test]
async fn test_ask_records_both_turns() {
    let h = harness();
    let id = h.workspace.upload(&report()).await.unwrap().entry.id().to_string();

    let answered = h.workspace.ask(&id, "What is the total?").await.unwrap();
    assert_eq!(answered.answer, "The total is $42.");

    let entry = h.store.records.get(&id).unwrap();
    let turns = entry.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text, "What is the total?");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].text, "The total is $42.");

    let sent = &h.workspace.service().queries.lock()[0];
    assert_eq!(sent["question"], "What is the total?");
    assert_eq!(sent["upload_id"], id.as_str());
    assert!(sent["mistral_api_key"].is_null());
}

#[tokio::test]
async fn test_follow_up_carries_history() {
    let h = harness();
    let id = h.workspace.upload(&report()).await.unwrap().entry.id().to_string();
    h.workspace.ask(&id, "What is the total?").await.unwrap();
    h.workspace.ask(&id, "And the tax?").await.unwrap();

    let queries = h.workspace.service().queries.lock();
    let question = queries[1]["question"].as_str().unwrap();
    assert!(question.starts_with(HISTORY_HEADER));
    assert!(question.contains("User: What is the total?"));
    assert!(question.contains("Assistant: The total is $42."));
    assert!(question.ends_with("New question: And the tax?"));
}

#[tokio::test]
async fn test_failed_query_keeps_user_turn() {
    let h = harness();
    let id = h.workspace.upload(&report()).await.unwrap().entry.id().to_string();
    *h.workspace.service().fail_queries.lock() = true;

    let err = h.workspace.ask(&id, "Anyone there?").await.unwrap_err();
    assert!(err.is_remote());

    let entry = h.store.records.get(&id).unwrap();
    assert_eq!(entry.turns().len(), 1);
    assert_eq!(entry.turns()[0].role, Role::User);
}

#[tokio::test]
async fn test_ask_unknown_entry() {
    let h = harness();
    let err = h.workspace.ask("missing", "hello?").await.unwrap_err();
    assert!(matches!(err, AskError::UnknownEntry(id) if id == "missing"));
    assert!(h.workspace.service().queries.lock().is_empty());
}

#[tokio::test]
async fn test_ask_replays_captured_overrides_after_vault_cleared() {
    let h = harness();
    let _ = h
        .store
        .vault
        .set(&CredentialBundle::new("sk", "https://v.example", "tok", "docs"));
    let id = h.workspace.upload(&report()).await.unwrap().entry.id().to_string();
    let _ = h.store.vault.clear();

    h.workspace.ask(&id, "q").await.unwrap();
    let sent = &h.workspace.service().queries.lock()[0];
    assert_eq!(sent["mistral_api_key"], "sk");
    assert_eq!(sent["collection_name"], "docs");
}

#[tokio::test]
async fn test_delete_removes_locally_even_when_remote_fails() {
    let h = harness();
    let id = h.workspace.upload(&report()).await.unwrap().entry.id().to_string();
    *h.workspace.service().fail_deletes.lock() = true;

    let deleted = h.workspace.delete(&id).await;
    assert!(!deleted.remote);
    assert_eq!(deleted.local, WriteOutcome::Written);
    assert!(h.store.records.get(&id).is_none());
    assert_eq!(h.workspace.service().deletes.lock()[0].0, id);
}

#[tokio::test]
async fn test_clear_expired_after_midnight() {
    let h = harness();
    h.workspace.upload(&report()).await.unwrap();
    assert_eq!(h.workspace.expired_count(), 0);

    h.clock.set(Local.with_ymd_and_hms(2025, 3, 5, 0, 0, 30).unwrap());
    assert_eq!(h.workspace.expired_count(), 1);

    let result = h.workspace.clear_expired();
    assert_eq!(result.removed, 1);
    assert!(h.store.records.list().is_empty());
}
