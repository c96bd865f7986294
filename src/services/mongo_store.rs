use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::{
    Client, Collection, Cursor, Database,
    bson::{doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use serde::de::DeserializeOwned;

use crate::{
    error::StoreError,
    models::{Alert, Interaction, NewAlert, NewInteraction, Subscription, Topic, UserId},
    services::{db_init, store::AlertStore},
};

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Connects and makes sure the indexes the store relies on exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        db_init::ensure_indexes(&db).await?;
        Ok(Self::new(db))
    }

    fn alerts(&self) -> Collection<Alert> {
        self.db.collection::<Alert>("alerts")
    }

    fn subscriptions(&self) -> Collection<Subscription> {
        self.db.collection::<Subscription>("subscriptions")
    }

    fn interactions(&self) -> Collection<Interaction> {
        self.db.collection::<Interaction>("interactions")
    }
}

async fn collect<T: DeserializeOwned + Unpin + Send + Sync>(mut cursor: Cursor<T>) -> Result<Vec<T>, StoreError> {
    let mut items = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }
    Ok(items)
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(w)) if w.code == 11000
    ) || matches!(e.kind.as_ref(), ErrorKind::Command(c) if c.code == 11000)
}

#[async_trait]
impl AlertStore for MongoStore {
    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let alert = alert.into_alert(ObjectId::new());
        self.alerts().insert_one(&alert, None).await?;
        Ok(alert)
    }

    async fn list_active_alerts_for_user(&self, user_id: UserId) -> Result<Vec<Alert>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self
            .alerts()
            .find(doc! { "user_id": user_id, "active": true }, opts)
            .await?;
        collect(cursor).await
    }

    async fn list_all_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let opts = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();
        let cursor = self.alerts().find(doc! { "active": true }, opts).await?;
        collect(cursor).await
    }

    async fn deactivate_alert(&self, id: ObjectId, owner: UserId) -> Result<bool, StoreError> {
        let now = Utc::now().timestamp();
        let res = self
            .alerts()
            .update_one(
                doc! { "_id": id, "user_id": owner, "active": true },
                doc! { "$set": { "active": false, "triggered_at": now } },
                None,
            )
            .await?;

        Ok(res.modified_count > 0)
    }

    async fn delete_alert(&self, id: ObjectId, owner: UserId) -> Result<bool, StoreError> {
        let res = self
            .alerts()
            .delete_one(doc! { "_id": id, "user_id": owner }, None)
            .await?;

        Ok(res.deleted_count > 0)
    }

    async fn toggle_subscription(&self, user_id: UserId, topic: Topic) -> Result<Subscription, StoreError> {
        let now = Utc::now().timestamp();

        // Pipeline upsert: a missing record starts from `active: null`, which
        // `$not` turns into `true`.
        let pipeline = vec![doc! {
            "$set": {
                "active": { "$not": ["$active"] },
                "created_at": { "$ifNull": ["$created_at", now] },
            }
        }];

        let opts = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let filter = doc! { "user_id": user_id, "topic": topic.as_str() };

        // Two first-time toggles can race on the unique (user_id, topic)
        // index; the loser retries against the record the winner created.
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .subscriptions()
                .find_one_and_update(filter.clone(), pipeline.clone(), opts.clone())
                .await
            {
                Ok(Some(sub)) => return Ok(sub),
                Ok(None) => return Err(StoreError::Backend("toggle returned no document".to_string())),
                Err(e) if attempt < 2 && is_duplicate_key(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn list_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        let cursor = self.subscriptions().find(doc! { "active": true }, opts).await?;
        collect(cursor).await
    }

    async fn list_user_subscriptions(&self, user_id: UserId) -> Result<Vec<Subscription>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.subscriptions().find(doc! { "user_id": user_id }, opts).await?;
        collect(cursor).await
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

        self.interactions().insert_one(&row, None).await?;
        Ok(row)
    }

    async fn list_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<Interaction>, StoreError> {
        let opts = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();

        let cursor = self.interactions().find(doc! { "user_id": user_id }, opts).await?;
        collect(cursor).await
    }
}
