#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use http_body_util::BodyExt;
use pricewatch::{
    AppState,
    config::{Settings, StoreBackend},
    error::MarketError,
    models::{CryptoQuote, EquityQuote, GlobalMarket, TrendingCoin},
    services::{
        formatting::Messages,
        market_data::{CryptoProvider, EquityProvider, MarketGateway},
        memory_store::MemoryStore,
        notifier::NotificationHub,
    },
};

/// Crypto provider answering from a fixed price table.
#[derive(Default)]
pub struct FakeCrypto {
    prices: Mutex<HashMap<String, f64>>,
}

impl FakeCrypto {
    pub fn set(&self, id: &str, price: f64) {
        self.prices.lock().unwrap().insert(id.to_string(), price);
    }
}

#[async_trait]
impl CryptoProvider for FakeCrypto {
    async fn coin(&self, id: &str) -> Result<Option<CryptoQuote>, MarketError> {
        Ok(self.prices.lock().unwrap().get(id).map(|&p| CryptoQuote {
            id: id.to_string(),
            name: id.to_string(),
            symbol: id.to_uppercase(),
            current_price: p,
            market_cap: 1.0e9,
            volume_24h: 1.0e7,
            price_change_percentage_24h: 2.0,
        }))
    }

    async fn trending(&self) -> Result<Vec<TrendingCoin>, MarketError> {
        Err(MarketError::Provider("not scripted".to_string()))
    }

    async fn global(&self) -> Result<Option<GlobalMarket>, MarketError> {
        Ok(None)
    }
}

/// Knows no tickers at all.
pub struct NoEquities;

#[async_trait]
impl EquityProvider for NoEquities {
    async fn quote(&self, _ticker: &str) -> Result<Option<EquityQuote>, MarketError> {
        Ok(None)
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub crypto: Arc<FakeCrypto>,
    pub hub: Arc<NotificationHub>,
}

pub fn harness() -> Harness {
    let settings = Settings {
        store_backend: StoreBackend::Memory,
        alert_check_interval_secs: 60,
        digest_interval_secs: 3600,
        ..Settings::default()
    };

    let store = Arc::new(MemoryStore::new());
    let crypto = Arc::new(FakeCrypto::default());
    let hub = Arc::new(NotificationHub::default());
    let gateway = MarketGateway::new(crypto.clone(), Arc::new(NoEquities));

    let state = AppState::new(
        settings,
        store.clone(),
        gateway,
        hub.clone(),
        Messages::standard().unwrap(),
    );

    Harness {
        state,
        store,
        crypto,
        hub,
    }
}

pub async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
