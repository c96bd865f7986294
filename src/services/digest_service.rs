use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::EngineError,
    models::{Topic, UserId},
    services::{
        formatting::Messages,
        market_data::MarketGateway,
        notifier::Notifier,
        scheduler::{CycleReport, PeriodicJob},
        store::AlertStore,
    },
};

const TRENDING_LIMIT: usize = 5;

pub const HEADLINES: &[&str] = &[
    "Central banks signal a cautious path for rate cuts",
    "Tech earnings beat estimates as cloud revenue climbs",
    "Bitcoin ETF inflows hold steady through the week",
    "Oil slips on softer demand outlook",
    "Treasury yields edge higher ahead of jobs data",
];

/// Pushes one digest per subscribed topic to every active subscriber.
pub struct DigestService {
    gateway: MarketGateway,
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    messages: Messages,
    stock_symbols: Vec<String>,
}

impl DigestService {
    pub fn new(
        gateway: MarketGateway,
        store: Arc<dyn AlertStore>,
        notifier: Arc<dyn Notifier>,
        messages: Messages,
        stock_symbols: Vec<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            notifier,
            messages,
            stock_symbols,
        }
    }

    pub async fn send_digests(&self, cancel: &CancellationToken) -> Result<CycleReport, EngineError> {
        let subscriptions = self.store.list_active_subscriptions().await?;

        let mut by_topic: BTreeMap<Topic, BTreeSet<UserId>> = BTreeMap::new();
        for sub in subscriptions {
            by_topic.entry(sub.topic).or_default().insert(sub.user_id);
        }

        let mut report = CycleReport::default();

        for (topic, users) in by_topic {
            if cancel.is_cancelled() {
                break;
            }

            let digest = match self.compose(topic).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    tracing::info!(topic = %topic, subscribers = users.len(), "no digest content this cycle");
                    report.checked += users.len();
                    report.skipped += users.len();
                    continue;
                }
                Err(e) => {
                    tracing::warn!(topic = %topic, error = %e, "could not compose digest");
                    report.checked += users.len();
                    report.failed += users.len();
                    continue;
                }
            };

            for user_id in users {
                if cancel.is_cancelled() {
                    tracing::info!(topic = %topic, "digest cycle interrupted");
                    return Ok(report);
                }
                report.checked += 1;

                match self.notifier.send(user_id, digest.clone()).await {
                    Ok(()) => report.fired += 1,
                    Err(e) => {
                        tracing::warn!(user_id, topic = %topic, error = %e, "digest delivery failed");
                        report.failed += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    /// `Ok(None)` when the topic has nothing to say this cycle.
    async fn compose(&self, topic: Topic) -> Result<Option<String>, EngineError> {
        match topic {
            Topic::Crypto => self.crypto_digest().await,
            Topic::Stocks => self.stocks_digest().await,
            Topic::News => Ok(Some(self.messages.news_digest(HEADLINES)?)),
        }
    }

    async fn crypto_digest(&self) -> Result<Option<String>, EngineError> {
        let mut coins = match self.gateway.crypto().trending().await {
            Ok(coins) if !coins.is_empty() => coins,
            Ok(_) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "trending coins unavailable");
                return Ok(None);
            }
        };
        coins.truncate(TRENDING_LIMIT);

        // the summary is optional decoration
        let market = match self.gateway.crypto().global().await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "global market summary unavailable");
                None
            }
        };

        Ok(Some(self.messages.crypto_digest(&coins, market.as_ref())?))
    }

    async fn stocks_digest(&self) -> Result<Option<String>, EngineError> {
        let mut rows = Vec::with_capacity(self.stock_symbols.len());
        for symbol in &self.stock_symbols {
            let quote = match self.gateway.lookup_equity(symbol).await {
                Ok(q) => Some(q),
                Err(e) => {
                    tracing::debug!(symbol = %symbol, error = %e, "watchlist quote unavailable");
                    None
                }
            };
            rows.push((symbol.to_uppercase(), quote));
        }

        if rows.iter().all(|(_, q)| q.is_none()) {
            return Ok(None);
        }

        Ok(Some(self.messages.stocks_digest(&rows)?))
    }
}

#[async_trait]
impl PeriodicJob for DigestService {
    fn name(&self) -> &'static str {
        "digest"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, EngineError> {
        self.send_digests(cancel).await
    }
}
