//! Session registry.
//!
//! Holds every live [`EngineSession`] behind an id. The map itself sits
//! behind a `RwLock` so concurrent callers working on different sessions
//! only contend on the brief map lookup; each session then has its own
//! `Mutex` for the duration of the operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use crate::error::{CallMatchError, Result};
use crate::session::{EngineSession, SessionId};

pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Mutex<EngineSession>>>,
    next_id: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a session and returns its fresh id.
    pub fn insert(&self, session: EngineSession) -> SessionId {
        let id = SessionId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.insert(id, Mutex::new(session));
        id
    }

    /// Runs `f` with exclusive access to one session.
    pub fn with_session<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut EngineSession) -> Result<T>,
    ) -> Result<T> {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let slot = sessions
            .get(&id)
            .ok_or(CallMatchError::UnknownSession { id })?;
        let mut session = match slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut session)
    }

    /// Removes a session, failing if the id was never issued or already
    /// closed.
    pub fn remove(&self, id: SessionId) -> Result<()> {
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(CallMatchError::UnknownSession { id })
    }

    pub fn contains(&self, id: SessionId) -> bool {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
