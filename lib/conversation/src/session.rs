//! Conversation session memory.
//!
//! A [`SessionStore`] maps opaque session keys to append-only transcripts.
//! Storage lives for the lifetime of the process: there is no eviction,
//! no TTL and no size bound.

use crate::turn::{Role, Turn};
use chainlab_core::SessionKey;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// A conversation session.
///
/// Sessions are shared through `Arc` handles; every handle obtained for the
/// same key refers to the same transcript.
#[derive(Debug)]
pub struct Session {
    key: SessionKey,
    created_at: DateTime<Utc>,
    transcript: RwLock<Transcript>,
}

#[derive(Debug)]
struct Transcript {
    turns: Vec<Turn>,
    last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new(key: impl Into<SessionKey>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            created_at: now,
            transcript: RwLock::new(Transcript {
                turns: Vec::new(),
                last_active_at: now,
            }),
        }
    }

    /// The session's key.
    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When a turn was last appended (creation time if none).
    #[must_use]
    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.read().last_active_at
    }

    /// Appends a turn and returns it.
    pub fn append(&self, role: Role, content: impl Into<String>) -> Turn {
        self.push(Turn::new(role, content))
    }

    /// Appends an already-built turn.
    pub fn push(&self, turn: Turn) -> Turn {
        let mut transcript = self
            .transcript
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        transcript.last_active_at = turn.timestamp();
        transcript.turns.push(turn.clone());
        turn
    }

    /// Returns a snapshot of the turns in append order.
    #[must_use]
    pub fn history(&self) -> Vec<Turn> {
        self.read().turns.clone()
    }

    /// Returns the number of turns.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.read().turns.len()
    }

    /// Returns the last turn, if any.
    #[must_use]
    pub fn last_turn(&self) -> Option<Turn> {
        self.read().turns.last().cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Transcript> {
        // Turns are append-only, so a poisoned lock still guards a valid transcript.
        self.transcript
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory store of conversation sessions.
///
/// Cloning the store yields another handle to the same sessions. Inserts and
/// removals on the key map are serialized; each session guards its own
/// transcript, so different sessions append independently.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionKey, Arc<Session>>>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `key`, creating an empty one if it is unseen.
    pub fn get_or_create(&self, key: impl Into<SessionKey>) -> Arc<Session> {
        let key = key.into();
        if let Some(session) = self.get(key.as_str()) {
            return session;
        }

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another caller may have created it between the read and write locks.
        Arc::clone(sessions.entry(key).or_insert_with_key(|key| {
            debug!(session = %key, "creating session");
            Arc::new(Session::new(key.clone()))
        }))
    }

    /// Returns the session for `key` without creating it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(Arc::clone)
    }

    /// Appends a turn to the session, creating the session if absent.
    pub fn append(&self, key: impl Into<SessionKey>, role: Role, content: impl Into<String>) -> Turn {
        self.get_or_create(key).append(role, content)
    }

    /// Returns the session's turns in append order.
    ///
    /// An unseen key yields an empty history and is not created.
    #[must_use]
    pub fn history(&self, key: &str) -> Vec<Turn> {
        self.get(key).map(|s| s.history()).unwrap_or_default()
    }

    /// Removes a session, returning whether it existed.
    ///
    /// Handles obtained earlier stay usable but are detached from the store.
    pub fn clear(&self, key: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some();
        if removed {
            debug!(session = key, "cleared session");
        }
        removed
    }

    /// Returns a snapshot of the known session keys.
    #[must_use]
    pub fn list_ids(&self) -> BTreeSet<SessionKey> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Returns whether a session exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
