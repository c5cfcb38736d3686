//! Per-session conversation storage
//!
//! Conversations are created lazily on first use and live for the process
//! lifetime. The map is behind a short-lived std mutex; each conversation has
//! its own async mutex that a turn holds from start to finish, so turns on one
//! session serialize while different sessions run concurrently.
//!
//! Reading a transcript or resetting a session waits for the session's
//! in-flight turn, so both only ever see the state between turns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::llm::Message;

use super::Conversation;

pub type SessionHandle = Arc<AsyncMutex<Conversation>>;

/// Conversations keyed by session id
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the conversation for `session_id`, creating it if needed
    pub fn handle(&self, session_id: &str) -> SessionHandle {
        let mut map = self.map();
        Arc::clone(
            map.entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(Conversation::new()))),
        )
    }

    /// Lock the current conversation of `session_id` for a whole turn.
    ///
    /// A handle that was reset while waiting for the lock is stale; the lock
    /// is retried on the session's new conversation.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<Conversation> {
        loop {
            let handle = self.handle(session_id);
            let guard = Arc::clone(&handle).lock_owned().await;
            if self.is_current(session_id, &handle) {
                return guard;
            }
        }
    }

    fn is_current(&self, session_id: &str, handle: &SessionHandle) -> bool {
        self.map()
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    /// Snapshot of a session's messages; empty for unknown sessions
    pub async fn transcript(&self, session_id: &str) -> Vec<Message> {
        let handle = self.map().get(session_id).map(Arc::clone);
        match handle {
            Some(handle) => handle.lock().await.snapshot(),
            None => Vec::new(),
        }
    }

    /// Known session ids, sorted
    pub fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop a session once its in-flight turn, if any, has finished.
    /// Returns false if it did not exist.
    pub async fn reset(&self, session_id: &str) -> bool {
        let Some(handle) = self.map().get(session_id).map(Arc::clone) else {
            return false;
        };
        let _turn = handle.lock().await;

        let mut map = self.map();
        if map
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, &handle))
        {
            map.remove(session_id);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}
