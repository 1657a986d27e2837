use chatdoc_store::{
    ChatStore, Clock, ContextComposer, ConversationEntry, CredentialOverride, CredentialVault,
    Message, RecordStore, SweepResult, WriteOutcome,
};
use chrono::Utc;
use std::sync::Arc;

use crate::answer::normalize_answer;
use crate::error::AskError;
use crate::service::{Document, DocumentService, QueryRequest};

#[derive(Debug, Clone)]
pub struct Uploaded {
    pub entry: ConversationEntry,
    pub persisted: WriteOutcome,
}

#[derive(Debug, Clone)]
pub struct Answered {
    pub answer: String,
    /// Outcome of storing the assistant turn.
    pub persisted: WriteOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deleted {
    /// The service acknowledged the delete.
    pub remote: bool,
    pub local: WriteOutcome,
}

/// Drives uploads, questions and deletes against a [`DocumentService`]
/// while keeping the local conversation history in step.
pub struct ChatWorkspace<S> {
    service: S,
    records: Arc<RecordStore>,
    vault: Arc<CredentialVault>,
    composer: ContextComposer,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentService> ChatWorkspace<S> {
    pub fn new(store: &ChatStore, service: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            service,
            records: store.records.clone(),
            vault: store.vault.clone(),
            composer: store.composer.clone(),
            clock,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn records(&self) -> &Arc<RecordStore> {
        &self.records
    }

    /// Upload with whatever BYOK bundle is stored right now and record the
    /// new conversation as the most recent one.
    pub async fn upload(&self, document: &Document) -> Result<Uploaded, S::Error> {
        let captured = self.vault.get().map(|bundle| CredentialOverride::from(&bundle));

        let id = self.service.upload(document, captured.as_ref()).await?;
        let created_at = self.clock.now().with_timezone(&Utc);
        let entry = ConversationEntry::new(id, &document.file_name, created_at, captured);

        let persisted = self.records.insert(entry.clone());
        tracing::info!(
            id = %entry.id(),
            file = %entry.label(),
            protected = entry.is_protected(),
            "document uploaded"
        );

        Ok(Uploaded { entry, persisted })
    }

    /// Ask a follow-up about an existing conversation.
    ///
    /// The user turn is stored before the request goes out and stays even
    /// when the service fails.
    pub async fn ask(&self, id: &str, question: &str) -> Result<Answered, AskError<S::Error>> {
        let entry = self
            .records
            .get(id)
            .ok_or_else(|| AskError::UnknownEntry(id.to_string()))?;

        let composed = self.composer.compose(&entry, question);
        let asked_at = self.clock.now().with_timezone(&Utc);
        if !self
            .records
            .append_message(id, Message::user(question, asked_at))
            .is_durable()
        {
            tracing::warn!(id = %id, "question was not persisted");
        }

        let request = QueryRequest::new(composed, id, entry.credential_override());
        let raw = self.service.query(&request).await.map_err(|e| {
            tracing::warn!(id = %id, error = %e, "query failed");
            AskError::Remote(e)
        })?;

        let answer = normalize_answer(&raw);
        let answered_at = self.clock.now().with_timezone(&Utc);
        let persisted = self
            .records
            .append_message(id, Message::assistant(answer.clone(), answered_at));

        Ok(Answered { answer, persisted })
    }

    /// Delete remotely if possible, then always locally.
    pub async fn delete(&self, id: &str) -> Deleted {
        let entry = self.records.get(id);
        let overrides = entry.as_ref().and_then(|e| e.credential_override());

        let remote = match self.service.delete(id, overrides).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "remote delete failed, removing locally anyway");
                false
            }
        };

        let local = self.records.remove(id);
        Deleted { remote, local }
    }

    pub fn clear_expired(&self) -> SweepResult {
        self.records.sweep_expired(self.clock.today())
    }

    pub fn expired_count(&self) -> usize {
        self.records.expired_count(self.clock.today())
    }
}
