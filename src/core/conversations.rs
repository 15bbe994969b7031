//! Local view-model of the user's conversation list.
//!
//! Mutations are in-memory only. Callers that change the remote list must
//! issue the matching request themselves and reconcile on failure (usually
//! by calling [`ConversationStore::fetch_all`] again).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::api::client::{ApiError, ServiceClient};
use crate::api::Conversation;

pub const FETCH_FAILED_MESSAGE: &str = "Failed to load conversations.";

/// Remote source of truth for the conversation list.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;
}

#[async_trait]
impl ConversationSource for ServiceClient {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.fetch_conversations().await
    }
}

#[derive(Debug, Default)]
struct StoreState {
    conversations: Vec<Conversation>,
    error: Option<String>,
    in_flight: usize,
    last_issued: u64,
    last_applied: u64,
}

/// Sequence number handed out when a fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FetchTicket(u64);

/// Cheaply cloneable handle; every clone sees the same list.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    state: Arc<Mutex<StoreState>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().conversations.clone()
    }

    pub fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.lock()
            .conversations
            .iter()
            .find(|conv| conv.conversation_id == conversation_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True only while at least one fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Replace the list with the remote one.
    ///
    /// Failures are recorded in [`error`](Self::error) and keep the current
    /// list. When fetches overlap, a response older than one already applied
    /// is dropped instead of overwriting newer data.
    pub async fn fetch_all(&self, source: &dyn ConversationSource) {
        let ticket = self.begin_fetch();
        let result = source.list_conversations().await;
        self.complete_fetch(ticket, result);
    }

    pub fn begin_fetch(&self) -> FetchTicket {
        let mut state = self.lock();
        state.last_issued += 1;
        state.in_flight += 1;
        debug!(seq = state.last_issued, "conversation fetch started");
        FetchTicket(state.last_issued)
    }

    /// Returns true when the result was applied to the store.
    pub fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<Vec<Conversation>, ApiError>,
    ) -> bool {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        let FetchTicket(seq) = ticket;
        if seq <= state.last_applied {
            debug!(seq, applied = state.last_applied, "dropping stale conversation fetch");
            return false;
        }

        match result {
            Ok(conversations) => {
                debug!(seq, count = conversations.len(), "conversation list replaced");
                state.conversations = conversations;
                state.error = None;
                state.last_applied = seq;
                true
            }
            Err(err) => {
                warn!(seq, error = %err, "conversation fetch failed");
                let message = match &err {
                    ApiError::Unauthenticated => err.user_message(),
                    _ => FETCH_FAILED_MESSAGE.to_string(),
                };
                state.error = Some(message);
                false
            }
        }
    }

    /// Append without checking for an existing id.
    pub fn add(&self, conversation: Conversation) {
        self.lock().conversations.push(conversation);
    }

    pub fn delete(&self, conversation_id: &str) {
        self.lock()
            .conversations
            .retain(|conv| conv.conversation_id != conversation_id);
    }

    pub fn delete_all(&self) {
        self.lock().conversations.clear();
    }

    /// Relabel an entry; `is_loading` is only replaced when supplied.
    pub fn update(&self, conversation_id: &str, new_alias: &str, is_loading: Option<bool>) {
        let mut state = self.lock();
        for conv in state
            .conversations
            .iter_mut()
            .filter(|conv| conv.conversation_id == conversation_id)
        {
            conv.alias = new_alias.to_string();
            if let Some(is_loading) = is_loading {
                conv.is_loading = is_loading;
            }
        }
    }

    /// `starred_at` is stamped when starring and cleared when unstarring.
    pub fn toggle_star(&self, conversation_id: &str, starred: bool) {
        let now = Utc::now();
        let mut state = self.lock();
        for conv in state
            .conversations
            .iter_mut()
            .filter(|conv| conv.conversation_id == conversation_id)
        {
            conv.starred = starred;
            conv.starred_at = starred.then_some(now);
        }
    }
}

#[cfg(test)]
mod tests;
