use std::{fmt, str::FromStr};

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Crypto,
    Stocks,
    News,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Crypto, Topic::Stocks, Topic::News];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Crypto => "crypto",
            Topic::Stocks => "stocks",
            Topic::News => "news",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Topic::Crypto => "Crypto",
            Topic::Stocks => "Stocks",
            Topic::News => "News",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crypto" => Ok(Topic::Crypto),
            "stocks" => Ok(Topic::Stocks),
            "news" => Ok(Topic::News),
            other => Err(UnknownTopic(other.to_string())),
        }
    }
}

/// One record per (user, topic); toggling flips `active` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: UserId,
    pub topic: Topic,
    pub active: bool,
    pub created_at: i64,
}
