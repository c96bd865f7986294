use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Database, IndexModel,
};

use crate::error::StoreError;

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    // alerts: evaluation loop scans active alerts oldest first
    {
        let col = db.collection::<Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "active": 1, "created_at": 1 })
            .build();
        col.create_index(model, None).await?;

        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "active": 1 })
            .build();
        col.create_index(model, None).await?;
    }

    // subscriptions: unique per (user_id, topic)
    {
        let col = db.collection::<Document>("subscriptions");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "topic": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        col.create_index(model, None).await?;
    }

    // interactions: history by user, newest first
    {
        let col = db.collection::<Document>("interactions");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();

        if let Err(e) = col.create_index(model, None).await {
            tracing::warn!(error = %e, "could not create interactions index");
        }
    }

    Ok(())
}
