use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Mutex, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    error::EngineError,
    models::UserId,
    services::{
        conversation::DialogState,
        scheduler::{CycleReport, PeriodicJob},
    },
};

#[derive(Debug)]
pub struct Session {
    pub state: DialogState,
    touched: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            state: DialogState::Idle,
            touched: Instant::now(),
        }
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Per-user conversation context with idle expiry.
///
/// Holding a session's lock serializes that user's turns; different users
/// never contend.
pub struct SessionStore {
    ttl: Duration,
    sessions: StdMutex<HashMap<UserId, SessionHandle>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: StdMutex::new(HashMap::new()),
        }
    }

    pub fn handle(&self, user_id: UserId) -> SessionHandle {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }

    /// Locks the user's session and resets the dialog if it sat idle past the TTL.
    pub async fn begin(&self, user_id: UserId) -> tokio::sync::OwnedMutexGuard<Session> {
        let mut session = self.handle(user_id).lock_owned().await;
        if session.touched.elapsed() > self.ttl && session.state != DialogState::Idle {
            tracing::debug!(user_id, "conversation expired");
            session.state = DialogState::Idle;
        }
        session.touched = Instant::now();
        session
    }

    /// Drops sessions idle past the TTL that nobody currently holds.
    pub fn prune(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.touched.elapsed() <= self.ttl,
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PeriodicJob for SessionStore {
    fn name(&self) -> &'static str {
        "session-sweep"
    }

    async fn run_cycle(&self, _cancel: &CancellationToken) -> Result<CycleReport, EngineError> {
        let checked = self.len();
        let dropped = self.prune();
        Ok(CycleReport {
            checked,
            skipped: dropped,
            ..CycleReport::default()
        })
    }
}
