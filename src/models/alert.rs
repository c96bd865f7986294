use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }

    /// Both directions fire on equality.
    pub fn is_crossed(self, price: f64, target: f64) -> bool {
        match self {
            Direction::Above => price >= target,
            Direction::Below => price <= target,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown direction: {0}")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            other => Err(UnknownDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidTargetPrice {
    #[error("not a number")]
    NotANumber,

    #[error("price must be greater than zero")]
    NotPositive,
}

static GROUPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(,\d{3})+(\.\d+)?$").expect("grouped number regex")
});

/// A strictly positive, finite target price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPrice(f64);

impl TargetPrice {
    pub fn new(value: f64) -> Result<Self, InvalidTargetPrice> {
        if !value.is_finite() {
            return Err(InvalidTargetPrice::NotANumber);
        }
        if value <= 0.0 {
            return Err(InvalidTargetPrice::NotPositive);
        }
        Ok(Self(value))
    }

    /// Parses user input. A leading `$` is allowed; commas only as thousands
    /// separators (`50,000.5`), so `0,5` is rejected rather than read as 5.
    pub fn parse(input: &str) -> Result<Self, InvalidTargetPrice> {
        let raw = input.trim().trim_start_matches('$');

        let cleaned = if raw.contains(',') {
            if !GROUPED_RE.is_match(raw) {
                return Err(InvalidTargetPrice::NotANumber);
            }
            raw.replace(',', "")
        } else {
            raw.to_string()
        };

        let value: f64 = cleaned.parse().map_err(|_| InvalidTargetPrice::NotANumber)?;
        Self::new(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: UserId,

    // lower-cased instrument identifier
    pub symbol: String,
    pub target_price: f64,
    pub direction: Direction,

    pub active: bool,
    pub created_at: i64,

    #[serde(default)]
    pub triggered_at: Option<i64>,
}

impl Alert {
    pub fn is_triggered_by(&self, price: f64) -> bool {
        self.active && price.is_finite() && self.direction.is_crossed(price, self.target_price)
    }
}

/// A fully validated alert that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub user_id: UserId,
    pub symbol: String,
    pub target_price: TargetPrice,
    pub direction: Direction,
}

impl NewAlert {
    pub fn new(user_id: UserId, symbol: &str, target_price: TargetPrice, direction: Direction) -> Self {
        Self {
            user_id,
            symbol: symbol.trim().to_lowercase(),
            target_price,
            direction,
        }
    }

    pub fn into_alert(self, id: ObjectId) -> Alert {
        Alert {
            id,
            user_id: self.user_id,
            symbol: self.symbol,
            target_price: self.target_price.value(),
            direction: self.direction,
            active: true,
            created_at: Utc::now().timestamp(),
            triggered_at: None,
        }
    }
}
