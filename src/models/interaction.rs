use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: UserId,

    #[serde(default)]
    pub username: Option<String>,

    pub request_text: String,
    pub response_text: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub user_id: UserId,
    pub username: Option<String>,
    pub request_text: String,
    pub response_text: String,
}
