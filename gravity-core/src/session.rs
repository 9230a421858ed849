//! Per-user conversation state.
//!
//! One `Session` per user id, held in a concurrent map. Every mutation of
//! a given user's entry goes through that entry's async mutex, so two
//! rapid updates from the same user cannot interleave their history
//! reads and writes.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use gravity_common::{Error, Result};

use crate::mode::Mode;

/// Maximum retained history turns per session (5 exchanges).
pub const HISTORY_CAP: usize = 10;

/// Default reply language tag for new sessions.
pub const DEFAULT_LANGUAGE: &str = "uz";

/// Message role in a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message retained for conversational context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

/// Per-user conversational state: active mode plus bounded history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub mode: Mode,
    #[serde(default)]
    pub history: Vec<Turn>,
    pub language: String,
}

impl Session {
    fn new(user_id: i64) -> Self {
        Self {
            user_id,
            mode: Mode::default(),
            history: Vec::new(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Process-wide keyed session state.
///
/// Entries are created lazily on first contact. When a snapshot directory
/// is configured, each mutation writes the session to scratch disk;
/// a failed write degrades to in-memory state for that turn and is only
/// logged, never surfaced to the user.
pub struct SessionStore {
    sessions: DashMap<i64, Arc<Mutex<Session>>>,
    snapshot_dir: Option<PathBuf>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            snapshot_dir: None,
        }
    }

    /// Store with scratch-disk snapshots under `dir`.
    pub fn with_snapshot_dir(dir: PathBuf) -> Self {
        if let Err(err) = std::fs::create_dir_all(&dir) {
            tracing::warn!(
                "cannot create session dir {}, running memory-only: {err}",
                dir.display()
            );
            return Self::new();
        }
        Self {
            sessions: DashMap::new(),
            snapshot_dir: Some(dir),
        }
    }

    /// Handle for the user's session, created with defaults on first
    /// contact. All mutation happens under the returned entry's lock.
    pub fn session(&self, user_id: i64) -> Arc<Mutex<Session>> {
        self.sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(self.load_or_default(user_id))))
            .clone()
    }

    /// Whether a session already exists for this user.
    pub fn contains(&self, user_id: i64) -> bool {
        self.sessions.contains_key(&user_id)
    }

    pub async fn mode(&self, user_id: i64) -> Mode {
        self.session(user_id).lock().await.mode
    }

    pub async fn set_mode(&self, user_id: i64, mode: Mode) {
        let entry = self.session(user_id);
        let mut session = entry.lock().await;
        session.mode = mode;
        self.snapshot(&session).await;
    }

    /// Append one user/assistant exchange and trim to the cap.
    ///
    /// Both turns land under a single lock acquisition so history stays
    /// paired even when a follow-up message races this one. Trimming drops
    /// the oldest turns first.
    pub async fn append_exchange(&self, user_id: i64, prompt: &str, answer: &str) {
        let entry = self.session(user_id);
        let mut session = entry.lock().await;
        let now = Utc::now().timestamp();
        session.history.push(Turn {
            role: Role::User,
            content: prompt.to_string(),
            timestamp: now,
        });
        session.history.push(Turn {
            role: Role::Assistant,
            content: answer.to_string(),
            timestamp: now,
        });
        let len = session.history.len();
        if len > HISTORY_CAP {
            session.history.drain(..len - HISTORY_CAP);
        }
        self.snapshot(&session).await;
    }

    /// Start a fresh conversation: history is cleared, mode and language
    /// survive.
    pub async fn reset(&self, user_id: i64) {
        let entry = self.session(user_id);
        let mut session = entry.lock().await;
        session.history.clear();
        self.snapshot(&session).await;
    }

    /// Drop all sessions.
    pub fn clear(&self) {
        self.sessions.clear();
    }

    fn snapshot_path(&self, user_id: i64) -> Option<PathBuf> {
        self.snapshot_dir
            .as_ref()
            .map(|dir| dir.join(format!("{user_id}.json")))
    }

    fn load_or_default(&self, user_id: i64) -> Session {
        if let Some(path) = self.snapshot_path(user_id) {
            match std::fs::read(&path) {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(session) => return session,
                    Err(err) => {
                        tracing::warn!(
                            "discarding corrupt session snapshot {}: {err}",
                            path.display()
                        );
                    }
                },
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!("cannot read session snapshot {}: {err}", path.display());
                }
            }
        }
        Session::new(user_id)
    }

    /// Best-effort snapshot write. Failure degrades to memory-only state
    /// for this turn.
    async fn snapshot(&self, session: &Session) {
        if let Err(err) = self.try_snapshot(session).await {
            tracing::warn!(user_id = session.user_id, "{err}; staying in memory");
        }
    }

    async fn try_snapshot(&self, session: &Session) -> Result<()> {
        let Some(path) = self.snapshot_path(session.user_id) else {
            return Ok(());
        };
        let payload = serde_json::to_vec(session)?;
        tokio::fs::write(&path, payload)
            .await
            .map_err(|err| Error::StoreIo(format!("write {}: {err}", path.display())))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unseen_user_gets_default_session() {
        let store = SessionStore::new();
        let entry = store.session(42);
        let session = entry.lock().await;
        assert_eq!(session.mode, Mode::General);
        assert!(session.history.is_empty());
        assert_eq!(session.language, DEFAULT_LANGUAGE);
    }

    #[tokio::test]
    async fn append_is_reflected_on_next_access() {
        let store = SessionStore::new();
        store.append_exchange(1, "Hello", "Hi there").await;

        let entry = store.session(1);
        let session = entry.lock().await;
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, Role::User);
        assert_eq!(session.history[0].content, "Hello");
        assert_eq!(session.history[1].role, Role::Assistant);
        assert_eq!(session.history[1].content, "Hi there");
    }

    #[tokio::test]
    async fn history_never_exceeds_cap_and_drops_oldest() {
        let store = SessionStore::new();
        for i in 0..8 {
            store
                .append_exchange(1, &format!("q{i}"), &format!("a{i}"))
                .await;
        }

        let entry = store.session(1);
        let session = entry.lock().await;
        assert_eq!(session.history.len(), HISTORY_CAP);
        assert_eq!(session.history.len() % 2, 0);
        // Oldest exchanges were dropped; the earliest survivor is q3
        assert_eq!(session.history[0].content, "q3");
        assert_eq!(session.history.last().unwrap().content, "a7");
    }

    #[tokio::test]
    async fn reset_clears_history_but_keeps_mode() {
        let store = SessionStore::new();
        store.set_mode(1, Mode::Debugger).await;
        store.append_exchange(1, "q", "a").await;
        store.reset(1).await;

        let entry = store.session(1);
        let session = entry.lock().await;
        assert!(session.history.is_empty());
        assert_eq!(session.mode, Mode::Debugger);
    }

    #[tokio::test]
    async fn concurrent_appends_keep_history_paired() {
        let store = Arc::new(SessionStore::new());

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_exchange(7, &format!("q{i}"), &format!("a{i}"))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let entry = store.session(7);
        let session = entry.lock().await;
        assert_eq!(session.history.len(), HISTORY_CAP);
        for pair in session.history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            // Each user turn is followed by its own answer
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = SessionStore::with_snapshot_dir(dir.path().to_path_buf());
            store.set_mode(9, Mode::Designer).await;
            store.append_exchange(9, "logo?", "nice logo").await;
        }

        // A fresh store over the same directory sees the persisted state
        let store = SessionStore::with_snapshot_dir(dir.path().to_path_buf());
        let entry = store.session(9);
        let session = entry.lock().await;
        assert_eq!(session.mode, Mode::Designer);
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn snapshot_write_failure_degrades_silently() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::with_snapshot_dir(dir.path().to_path_buf());
        // Make the snapshot path unwritable by occupying it with a directory
        std::fs::create_dir(dir.path().join("5.json")).unwrap();

        store.append_exchange(5, "q", "a").await;

        let entry = store.session(5);
        let session = entry.lock().await;
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn corrupt_snapshot_yields_fresh_session() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("3.json"), b"not json").unwrap();

        let store = SessionStore::with_snapshot_dir(dir.path().to_path_buf());
        let entry = store.session(3);
        let session = entry.lock().await;
        assert!(session.history.is_empty());
        assert_eq!(session.mode, Mode::General);
    }
}
