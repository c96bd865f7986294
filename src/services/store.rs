use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::StoreError,
    models::{Alert, Interaction, NewAlert, NewInteraction, Subscription, Topic, UserId},
};

/// Durable CRUD for alerts, subscriptions and interaction history.
///
/// Writes that target one record are guarded by id *and* owner, so two
/// writers racing on the same alert cannot both win.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    async fn list_active_alerts_for_user(&self, user_id: UserId) -> Result<Vec<Alert>, StoreError>;

    /// Oldest first.
    async fn list_all_active_alerts(&self) -> Result<Vec<Alert>, StoreError>;

    /// Returns true if this call flipped the alert from active to inactive.
    async fn deactivate_alert(&self, id: ObjectId, owner: UserId) -> Result<bool, StoreError>;

    /// Returns true if an alert was removed.
    async fn delete_alert(&self, id: ObjectId, owner: UserId) -> Result<bool, StoreError>;

    /// Creates the (user, topic) record as active, or flips an existing one.
    async fn toggle_subscription(&self, user_id: UserId, topic: Topic) -> Result<Subscription, StoreError>;

    async fn list_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;

    async fn list_user_subscriptions(&self, user_id: UserId) -> Result<Vec<Subscription>, StoreError>;

    async fn save_interaction(&self, interaction: NewInteraction) -> Result<Interaction, StoreError>;

    /// Most recent first.
    async fn list_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<Interaction>, StoreError>;
}

pub fn parse_alert_id(raw: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| StoreError::InvalidId(raw.to_string()))
}
