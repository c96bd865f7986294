use thiserror::Error;

use crate::models::UserId;

/// Failure to resolve a symbol against the market-data providers.
///
/// Callers treat both variants the same way: skip the symbol for now and
/// try again on the next cycle.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketError {
    #[error("no market data for {0}")]
    NotFound(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        MarketError::Provider(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Backend(String),

    #[error("invalid id: {0}")]
    InvalidId(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no active listener for user {0}")]
    NoRecipient(UserId),

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("render error: {0}")]
    Render(String),
}

impl From<handlebars::RenderError> for EngineError {
    fn from(e: handlebars::RenderError) -> Self {
        EngineError::Render(e.to_string())
    }
}

impl From<handlebars::TemplateError> for EngineError {
    fn from(e: handlebars::TemplateError) -> Self {
        EngineError::Render(e.to_string())
    }
}
