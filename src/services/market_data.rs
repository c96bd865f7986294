//! Uniform price lookup over the crypto and equity providers.
//!
//! A symbol is tried as a crypto id (lower-cased) first and as an equity
//! ticker (upper-cased) second. Callers only learn which provider answered
//! through [`Instrument`].

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;

use crate::{
    error::MarketError,
    models::{CryptoQuote, EquityQuote, GlobalMarket, Instrument, PriceSnapshot, TrendingCoin},
};

/// `Ok(None)` means the provider answered and has no such coin.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    async fn coin(&self, id: &str) -> Result<Option<CryptoQuote>, MarketError>;
    async fn trending(&self) -> Result<Vec<TrendingCoin>, MarketError>;
    async fn global(&self) -> Result<Option<GlobalMarket>, MarketError>;
}

/// `Ok(None)` means the provider answered and has no such ticker.
#[async_trait]
pub trait EquityProvider: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<Option<EquityQuote>, MarketError>;
}

static SYMBOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.\-]{0,49}$").expect("symbol regex")
});

/// Lower-cases and validates free-form user input as an instrument id.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim().to_lowercase();
    SYMBOL_RE.is_match(&s).then_some(s)
}

#[derive(Clone)]
pub struct MarketGateway {
    crypto: Arc<dyn CryptoProvider>,
    equity: Arc<dyn EquityProvider>,
}

impl MarketGateway {
    pub fn new(crypto: Arc<dyn CryptoProvider>, equity: Arc<dyn EquityProvider>) -> Self {
        Self { crypto, equity }
    }

    pub fn crypto(&self) -> &dyn CryptoProvider {
        self.crypto.as_ref()
    }

    pub fn equity(&self) -> &dyn EquityProvider {
        self.equity.as_ref()
    }

    pub async fn lookup_crypto(&self, symbol: &str) -> Result<CryptoQuote, MarketError> {
        let id = normalize_symbol(symbol).ok_or_else(|| MarketError::NotFound(symbol.to_string()))?;
        self.crypto
            .coin(&id)
            .await?
            .ok_or(MarketError::NotFound(id))
    }

    pub async fn lookup_equity(&self, symbol: &str) -> Result<EquityQuote, MarketError> {
        let ticker = normalize_symbol(symbol)
            .ok_or_else(|| MarketError::NotFound(symbol.to_string()))?
            .to_uppercase();
        self.equity
            .quote(&ticker)
            .await?
            .ok_or(MarketError::NotFound(ticker))
    }

    /// Crypto first, equity second. A crypto provider failure still falls
    /// through to the equity provider.
    pub async fn lookup(&self, symbol: &str) -> Result<Instrument, MarketError> {
        let crypto_err = match self.lookup_crypto(symbol).await {
            Ok(q) => return Ok(Instrument::Crypto(q)),
            Err(MarketError::NotFound(_)) => None,
            Err(e) => {
                tracing::debug!(symbol, error = %e, "crypto lookup failed, trying equity");
                Some(e)
            }
        };

        match self.lookup_equity(symbol).await {
            Ok(q) => Ok(Instrument::Equity(q)),
            Err(MarketError::NotFound(t)) => Err(crypto_err.unwrap_or(MarketError::NotFound(t))),
            Err(e) => Err(e),
        }
    }

    pub async fn fetch(&self, symbol: &str) -> Result<PriceSnapshot, MarketError> {
        let instrument = self.lookup(symbol).await?;
        let price = instrument.price();

        if !price.is_finite() || price <= 0.0 {
            return Err(MarketError::Provider(format!("unusable price {price} for {symbol}")));
        }

        Ok(PriceSnapshot {
            symbol: symbol.trim().to_lowercase(),
            price,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Scripted providers shared by the service tests.

    use std::{
        collections::HashMap,
        sync::{
            Mutex, PoisonError,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use super::*;

    #[derive(Default)]
    pub struct ScriptedCrypto {
        coins: Mutex<HashMap<String, Result<f64, String>>>,
        trending: Mutex<Vec<TrendingCoin>>,
        global: Mutex<Option<GlobalMarket>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedCrypto {
        pub fn set_price(&self, id: &str, price: f64) {
            self.coins.lock().unwrap().insert(id.to_string(), Ok(price));
        }

        pub fn fail(&self, id: &str) {
            self.coins
                .lock()
                .unwrap()
                .insert(id.to_string(), Err("provider down".to_string()));
        }

        pub fn set_trending(&self, coins: Vec<TrendingCoin>) {
            *self.trending.lock().unwrap() = coins;
        }

        pub fn set_global(&self, market: GlobalMarket) {
            *self.global.lock().unwrap() = Some(market);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CryptoProvider for ScriptedCrypto {
        async fn coin(&self, id: &str) -> Result<Option<CryptoQuote>, MarketError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let entry = self
                .coins
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(id)
                .cloned();

            match entry {
                None => Ok(None),
                Some(Err(e)) => Err(MarketError::Provider(e)),
                Some(Ok(price)) => Ok(Some(CryptoQuote {
                    id: id.to_string(),
                    name: id.to_string(),
                    symbol: id.to_uppercase(),
                    current_price: price,
                    market_cap: 1_000_000.0,
                    volume_24h: 10_000.0,
                    price_change_percentage_24h: 1.5,
                })),
            }
        }

        async fn trending(&self) -> Result<Vec<TrendingCoin>, MarketError> {
            let coins = self.trending.lock().unwrap_or_else(PoisonError::into_inner).clone();
            if coins.is_empty() {
                return Err(MarketError::Provider("trending unavailable".to_string()));
            }
            Ok(coins)
        }

        async fn global(&self) -> Result<Option<GlobalMarket>, MarketError> {
            Ok(self.global.lock().unwrap_or_else(PoisonError::into_inner).clone())
        }
    }

    #[derive(Default)]
    pub struct ScriptedEquity {
        quotes: Mutex<HashMap<String, Result<f64, String>>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedEquity {
        pub fn set_price(&self, ticker: &str, price: f64) {
            self.quotes.lock().unwrap().insert(ticker.to_string(), Ok(price));
        }

        pub fn fail(&self, ticker: &str) {
            self.quotes
                .lock()
                .unwrap()
                .insert(ticker.to_string(), Err("rate limited".to_string()));
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EquityProvider for ScriptedEquity {
        async fn quote(&self, ticker: &str) -> Result<Option<EquityQuote>, MarketError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let entry = self
                .quotes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(ticker)
                .cloned();

            match entry {
                None => Ok(None),
                Some(Err(e)) => Err(MarketError::Provider(e)),
                Some(Ok(price)) => Ok(Some(EquityQuote {
                    symbol: ticker.to_string(),
                    price,
                    change: 1.25,
                    change_percent: "0.6500%".to_string(),
                    volume: 1_000_000,
                })),
            }
        }
    }

    pub fn gateway() -> (MarketGateway, Arc<ScriptedCrypto>, Arc<ScriptedEquity>) {
        let crypto = Arc::new(ScriptedCrypto::default());
        let equity = Arc::new(ScriptedEquity::default());
        (MarketGateway::new(crypto.clone(), equity.clone()), crypto, equity)
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::gateway;
    use super::*;

    #[test]
    fn normalizes_and_rejects_symbols() {
        assert_eq!(normalize_symbol("  BitCoin "), Some("bitcoin".to_string()));
        assert_eq!(normalize_symbol("usd-coin"), Some("usd-coin".to_string()));
        assert_eq!(normalize_symbol("BRK.B"), Some("brk.b".to_string()));
        assert_eq!(normalize_symbol(""), None);
        assert_eq!(normalize_symbol("bit coin"), None);
        assert_eq!(normalize_symbol("-abc"), None);
    }

    #[tokio::test]
    async fn crypto_is_tried_before_equity() {
        let (gw, crypto, equity) = gateway();
        crypto.set_price("bitcoin", 51_000.0);
        equity.set_price("BITCOIN", 1.0);

        let snap = gw.fetch("Bitcoin").await.unwrap();
        assert_eq!(snap.price, 51_000.0);
        assert_eq!(snap.symbol, "bitcoin");
        assert_eq!(equity.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_to_upper_cased_ticker() {
        let (gw, _crypto, equity) = gateway();
        equity.set_price("AAPL", 190.0);

        let inst = gw.lookup("aapl").await.unwrap();
        assert!(matches!(inst, Instrument::Equity(ref q) if q.symbol == "AAPL"));
    }

    #[tokio::test]
    async fn crypto_failure_still_consults_equity() {
        let (gw, crypto, equity) = gateway();
        crypto.fail("tsla");
        equity.set_price("TSLA", 250.0);

        assert_eq!(gw.fetch("tsla").await.unwrap().price, 250.0);
    }

    #[tokio::test]
    async fn miss_on_both_is_not_found() {
        let (gw, _crypto, _equity) = gateway();
        let err = gw.fetch("doesnotexist123").await.unwrap_err();
        assert_eq!(err, MarketError::NotFound("DOESNOTEXIST123".to_string()));
    }

    #[tokio::test]
    async fn provider_error_is_reported_when_nothing_matched() {
        let (gw, crypto, _equity) = gateway();
        crypto.fail("eth");

        assert!(matches!(gw.fetch("eth").await, Err(MarketError::Provider(_))));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_providers() {
        let (gw, crypto, equity) = gateway();
        assert!(matches!(gw.fetch("not a symbol!").await, Err(MarketError::NotFound(_))));
        assert_eq!(crypto.calls() + equity.calls(), 0);
    }

    #[tokio::test]
    async fn non_positive_price_is_unusable() {
        let (gw, crypto, _equity) = gateway();
        crypto.set_price("deadcoin", 0.0);
        assert!(matches!(gw.fetch("deadcoin").await, Err(MarketError::Provider(_))));
    }
}
