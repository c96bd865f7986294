use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::StoreError,
    models::{Alert, Interaction, NewAlert, NewInteraction, Subscription, Topic, UserId},
    services::store::AlertStore,
};

#[derive(Default)]
struct Tables {
    alerts: Vec<Alert>,
    subscriptions: Vec<Subscription>,
    interactions: Vec<Interaction>,
}

/// Process-local store. Every operation runs under one lock, which gives the
/// same per-record atomicity the Mongo backend gets from guarded updates.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every alert regardless of state, in insertion order.
    pub fn all_alerts(&self) -> Vec<Alert> {
        self.tables().alerts.clone()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let alert = alert.into_alert(ObjectId::new());
        self.tables().alerts.push(alert.clone());
        Ok(alert)
    }

    async fn list_active_alerts_for_user(&self, user_id: UserId) -> Result<Vec<Alert>, StoreError> {
        // newest first, like the Mongo backend
        Ok(self
            .tables()
            .alerts
            .iter()
            .rev()
            .filter(|a| a.active && a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        Ok(self.tables().alerts.iter().filter(|a| a.active).cloned().collect())
    }

    async fn deactivate_alert(&self, id: ObjectId, owner: UserId) -> Result<bool, StoreError> {
        let mut t = self.tables();
        let Some(alert) = t
            .alerts
            .iter_mut()
            .find(|a| a.id == id && a.user_id == owner && a.active)
        else {
            return Ok(false);
        };

        alert.active = false;
        alert.triggered_at = Some(Utc::now().timestamp());
        Ok(true)
    }

    async fn delete_alert(&self, id: ObjectId, owner: UserId) -> Result<bool, StoreError> {
        let mut t = self.tables();
        let before = t.alerts.len();
        t.alerts.retain(|a| !(a.id == id && a.user_id == owner));
        Ok(t.alerts.len() < before)
    }

    async fn toggle_subscription(&self, user_id: UserId, topic: Topic) -> Result<Subscription, StoreError> {
        let mut t = self.tables();

        if let Some(sub) = t
            .subscriptions
            .iter_mut()
            .find(|s| s.user_id == user_id && s.topic == topic)
        {
            sub.active = !sub.active;
            return Ok(sub.clone());
        }

        let sub = Subscription {
            id: ObjectId::new(),
            user_id,
            topic,
            active: true,
            created_at: Utc::now().timestamp(),
        };
        t.subscriptions.push(sub.clone());
        Ok(sub)
    }

    async fn list_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .tables()
            .subscriptions
            .iter()
            .filter(|s| s.active)
            .cloned()
            .collect())
    }

    async fn list_user_subscriptions(&self, user_id: UserId) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .tables()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_interaction(&self, interaction: NewInteraction) -> Result<Interaction, StoreError> {
        let row = Interaction {
            id: ObjectId::new(),
            user_id: interaction.user_id,
            username: interaction.username,
            request_text: interaction.request_text,
            response_text: interaction.response_text,
            created_at: Utc::now().timestamp(),
        };
        self.tables().interactions.push(row.clone());
        Ok(row)
    }

    async fn list_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<Interaction>, StoreError> {
        Ok(self
            .tables()
            .interactions
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
