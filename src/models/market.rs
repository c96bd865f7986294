use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CryptoQuote {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub price_change_percentage_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    // provider formats this itself, e.g. "1.2345%"
    pub change_percent: String,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub price_btc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalMarket {
    pub total_market_cap_usd: f64,
    pub total_volume_usd: f64,
    pub market_cap_change_24h: f64,
    pub active_cryptocurrencies: u64,
}

/// Whatever provider answered for a symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Instrument {
    Crypto(CryptoQuote),
    Equity(EquityQuote),
}

impl Instrument {
    pub fn price(&self) -> f64 {
        match self {
            Instrument::Crypto(q) => q.current_price,
            Instrument::Equity(q) => q.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub price: f64,
    pub fetched_at: DateTime<Utc>,
}
