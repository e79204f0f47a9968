//! Session store mapping cookie tokens to per-visitor [`Session`] state.
//!
//! The store is the only persistence the server has. Each entry holds one
//! visitor's lists and expires after a period of inactivity; writing a
//! session back resets its clock.
//!
//! # Token Format
//!
//! Session tokens are 32 bytes of cryptographically secure random data,
//! base64-url encoded without padding, resulting in 43 character tokens.
//! Tokens are never logged.
//!
//! # Thread Safety
//!
//! The [`SessionStore`] uses interior mutability with [`RwLock`] so it can be
//! shared across request handlers. Requests for one session are assumed to
//! arrive one at a time; concurrent writes to the same token are last
//! writer wins.
//!
//! # Example
//!
//! ```rust
//! use todos_server::session::{SessionStore, SessionStoreConfig};
//! use todos_server::store::Session;
//!
//! let store = SessionStore::new(SessionStoreConfig::default());
//! let token = SessionStore::generate_token();
//!
//! let mut session = store.get(&token).unwrap_or_default();
//! session.create_list("Groceries").unwrap();
//! store.set(&token, session).expect("store has capacity");
//!
//! assert_eq!(store.get(&token).unwrap().lists().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::store::Session;

/// Default idle lifetime of a session (24 hours).
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default maximum number of live sessions.
pub const DEFAULT_MAX_CAPACITY: usize = 10_000;

/// Longest accepted idle lifetime of a session (one year).
pub const MAX_TTL_SECS: u64 = 365 * 86_400;

/// Size of the random token in bytes.
const TOKEN_BYTES: usize = 32;

/// Expected length of base64-url encoded token (43 characters).
pub const TOKEN_LENGTH: usize = 43;

/// Errors that can occur during session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session store has reached maximum capacity.
    #[error("session store at maximum capacity ({max_capacity} sessions)")]
    AtCapacity {
        /// The maximum number of sessions allowed.
        max_capacity: usize,
    },
}

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Maximum number of concurrent sessions.
    pub max_capacity: usize,

    /// How long a session survives without being written.
    pub ttl: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl SessionStoreConfig {
    /// Creates a new configuration with custom values.
    ///
    /// `ttl` is capped at [`MAX_TTL_SECS`].
    pub fn new(max_capacity: usize, ttl: Duration) -> Self {
        Self {
            max_capacity,
            ttl: ttl.min(Duration::from_secs(MAX_TTL_SECS)),
        }
    }
}

/// A stored session with its expiry.
#[derive(Debug, Clone)]
struct Entry {
    session: Session,
    expires_at: Instant,
}

impl Entry {
    fn new(session: Session, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(Duration::from_secs(MAX_TTL_SECS)))
            .unwrap_or(now);
        Self {
            session,
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe in-memory session store.
pub struct SessionStore {
    /// Session data, protected by a read-write lock.
    entries: RwLock<HashMap<String, Entry>>,

    /// Store configuration.
    config: SessionStoreConfig,
}

impl SessionStore {
    /// Creates a new session store with the given configuration.
    pub fn new(config: SessionStoreConfig) -> Self {
        debug!(
            max_capacity = config.max_capacity,
            ttl_secs = config.ttl.as_secs(),
            "Creating new session store"
        );
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Generates a fresh, unguessable session token.
    ///
    /// The token is 32 bytes of random data, base64-url encoded without
    /// padding, resulting in a 43-character string.
    pub fn generate_token() -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns a copy of the session stored under `token`.
    ///
    /// Returns `None` for unknown, malformed, or expired tokens. An expired
    /// entry is removed on the way out.
    pub fn get(&self, token: &str) -> Option<Session> {
        if token.len() != TOKEN_LENGTH {
            trace!(token_len = token.len(), "Invalid token length");
            return None;
        }

        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(token) {
                Some(entry) if !entry.is_expired() => {
                    trace!(
                        list_count = entry.session.lists().len(),
                        "Session loaded"
                    );
                    return Some(entry.session.clone());
                }
                Some(_) => {}
                None => {
                    trace!("Session token not found");
                    return None;
                }
            }
        }

        // Present but expired.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.get(token).is_some_and(Entry::is_expired) {
            entries.remove(token);
            trace!("Removed expired session during lookup");
        }
        None
    }

    /// Stores `session` under `token`, replacing any previous value and
    /// restarting its idle timer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AtCapacity`] if `token` is new and the store
    /// is full even after expired entries are dropped.
    pub fn set(&self, token: &str, session: Session) -> Result<(), SessionError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        let is_new = !entries.contains_key(token);
        if is_new && entries.len() >= self.config.max_capacity {
            entries.retain(|_, entry| !entry.is_expired());
        }

        if is_new && entries.len() >= self.config.max_capacity {
            warn!(
                capacity = entries.len(),
                max_capacity = self.config.max_capacity,
                "Session store at capacity, rejecting new session"
            );
            return Err(SessionError::AtCapacity {
                max_capacity: self.config.max_capacity,
            });
        }

        trace!(
            list_count = session.lists().len(),
            ttl_secs = self.config.ttl.as_secs(),
            "Storing session"
        );
        entries.insert(token.to_string(), Entry::new(session, self.config.ttl));
        Ok(())
    }

    /// Returns the current number of sessions in the store.
    ///
    /// Note: This count may include expired sessions that haven't been
    /// cleaned up yet.
    pub fn session_count(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Removes all expired sessions from the store.
    ///
    /// Complements the lazy cleanup in [`get`](Self::get).
    ///
    /// # Returns
    ///
    /// The number of sessions that were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let initial_len = entries.len();

        entries.retain(|_, entry| !entry.is_expired());

        let removed = initial_len - entries.len();
        if removed > 0 {
            debug!(
                removed_count = removed,
                remaining_count = entries.len(),
                "Cleaned up expired sessions"
            );
        }
        removed
    }

    /// Spawns a background task that sweeps expired sessions every
    /// `cleanup_interval`.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_cleanup_task(
        self: &Arc<Self>,
        cleanup_interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);

            loop {
                interval.tick().await;
                store.cleanup_expired();
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.read().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("SessionStore")
            .field("session_count", &len)
            .field("config", &self.config)
            .finish()
    }
}
