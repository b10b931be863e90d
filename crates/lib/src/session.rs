//! Per-user conversation context for prompt stitching.
//!
//! Each user keeps only the last exchanged question/answer pair. It is
//! overwritten on every successful exchange, cleared when the user sends the
//! session-clear token, and otherwise retained for the process lifetime.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Opaque per-user key (the sender id).
pub type UserId = String;

/// The last question/answer pair exchanged with a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub last_question: String,
    pub last_answer: String,
}

/// In-memory per-user context store (get, set, clear) with per-user turn
/// locks so one user's read-then-write turn cannot interleave with another
/// turn for the same user.
pub struct SessionStore {
    contexts: Arc<RwLock<HashMap<UserId, SessionContext>>>,
    turn_locks: Arc<RwLock<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            contexts: Arc::new(RwLock::new(HashMap::new())),
            turn_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Return a clone of the user's context if one exists.
    pub async fn get(&self, user: &str) -> Option<SessionContext> {
        self.contexts.read().await.get(user).cloned()
    }

    /// Overwrite the user's context with the latest exchange.
    pub async fn set(&self, user: impl Into<UserId>, question: impl Into<String>, answer: impl Into<String>) {
        let context = SessionContext {
            last_question: question.into(),
            last_answer: answer.into(),
        };
        self.contexts.write().await.insert(user.into(), context);
    }

    /// Remove the user's context; returns true when an entry existed.
    pub async fn clear(&self, user: &str) -> bool {
        self.contexts.write().await.remove(user).is_some()
    }

    /// Get or create the user's turn lock. Dispatch holds the guard across
    /// normalize, completion, store write, and reply for that user.
    pub async fn turn_lock(&self, user: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.turn_locks.read().await;
            if let Some(lock) = locks.get(user) {
                return lock.clone();
            }
        }
        let mut locks = self.turn_locks.write().await;
        locks
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
