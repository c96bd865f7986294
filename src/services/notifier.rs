use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::{error::NotifyError, models::UserId};

/// The send primitive both background loops use.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: UserId, text: String) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub user_id: UserId,
    pub text: String,
    pub sent_at: i64,
}

/// One broadcast channel per user; the SSE endpoint subscribes to it.
///
/// A send to a user with no open listener fails with
/// [`NotifyError::NoRecipient`], so callers can retry it later.
pub struct NotificationHub {
    capacity: usize,
    channels: Mutex<HashMap<UserId, broadcast::Sender<Notification>>>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, user_id: UserId) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);

        // drop channels nobody listens to anymore
        channels.retain(|uid, tx| *uid == user_id || tx.receiver_count() > 0);

        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn listeners(&self, user_id: UserId) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Notifier for NotificationHub {
    async fn send(&self, user_id: UserId, text: String) -> Result<(), NotifyError> {
        let tx = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned();

        let Some(tx) = tx else {
            return Err(NotifyError::NoRecipient(user_id));
        };

        let note = Notification {
            user_id,
            text,
            sent_at: Utc::now().timestamp(),
        };

        tx.send(note)
            .map(|_| ())
            .map_err(|_| NotifyError::NoRecipient(user_id))
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashSet;

    use super::*;

    /// Records every delivered message; users in `failing` always error.
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<(UserId, String)>>,
        failing: Mutex<HashSet<UserId>>,
    }

    impl RecordingNotifier {
        pub fn fail_for(&self, user_id: UserId) {
            self.failing.lock().unwrap().insert(user_id);
        }

        pub fn recover(&self, user_id: UserId) {
            self.failing.lock().unwrap().remove(&user_id);
        }

        pub fn sent(&self) -> Vec<(UserId, String)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_to(&self, user_id: UserId) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, t)| t)
                .collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, user_id: UserId, text: String) -> Result<(), NotifyError> {
            if self.failing.lock().unwrap_or_else(PoisonError::into_inner).contains(&user_id) {
                return Err(NotifyError::Transport("chat API unavailable".to_string()));
            }
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((user_id, text));
            Ok(())
        }
    }
}
