use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::MarketError,
    models::{CryptoQuote, GlobalMarket, TrendingCoin},
    services::market_data::CryptoProvider,
};

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, MarketError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self.http.get(&url).query(query).send().await?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(MarketError::Provider(format!("CoinGecko {path} failed: {status} {body}")));
        }

        res.json::<T>().await.map(Some).map_err(MarketError::from)
    }
}

#[async_trait]
impl CryptoProvider for CoinGeckoClient {
    async fn coin(&self, id: &str) -> Result<Option<CryptoQuote>, MarketError> {
        let path = format!("/coins/{id}");
        let query = [
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
        ];

        let Some(resp) = self.get_json::<CoinResponse>(&path, &query).await? else {
            return Ok(None);
        };

        Ok(resp.into_quote())
    }

    async fn trending(&self) -> Result<Vec<TrendingCoin>, MarketError> {
        let resp = self
            .get_json::<TrendingResponse>("/search/trending", &[])
            .await?
            .unwrap_or_default();

        Ok(resp
            .coins
            .into_iter()
            .map(|c| TrendingCoin {
                id: c.item.id,
                name: c.item.name,
                symbol: c.item.symbol.to_uppercase(),
                market_cap_rank: c.item.market_cap_rank,
                price_btc: c.item.price_btc.unwrap_or(0.0),
            })
            .collect())
    }

    async fn global(&self) -> Result<Option<GlobalMarket>, MarketError> {
        let Some(resp) = self.get_json::<GlobalResponse>("/global", &[]).await? else {
            return Ok(None);
        };

        let d = resp.data;
        Ok(Some(GlobalMarket {
            total_market_cap_usd: usd(&d.total_market_cap),
            total_volume_usd: usd(&d.total_volume),
            market_cap_change_24h: d.market_cap_change_percentage_24h_usd.unwrap_or(0.0),
            active_cryptocurrencies: d.active_cryptocurrencies.unwrap_or(0),
        }))
    }
}

fn usd(map: &HashMap<String, Option<f64>>) -> f64 {
    map.get("usd").copied().flatten().unwrap_or(0.0)
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    id: String,
    name: String,
    symbol: String,
    #[serde(default)]
    market_data: Option<CoinMarketData>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    #[serde(default)]
    current_price: HashMap<String, Option<f64>>,
    #[serde(default)]
    market_cap: HashMap<String, Option<f64>>,
    #[serde(default)]
    total_volume: HashMap<String, Option<f64>>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
}

impl CoinResponse {
    // A coin without a USD price is as good as unknown.
    fn into_quote(self) -> Option<CryptoQuote> {
        let md = self.market_data?;
        let price = md.current_price.get("usd").copied().flatten()?;

        Some(CryptoQuote {
            id: self.id,
            name: self.name,
            symbol: self.symbol.to_uppercase(),
            current_price: price,
            market_cap: usd(&md.market_cap),
            volume_24h: usd(&md.total_volume),
            price_change_percentage_24h: md.price_change_percentage_24h.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    coins: Vec<TrendingEntry>,
}

#[derive(Debug, Deserialize)]
struct TrendingEntry {
    item: TrendingItem,
}

#[derive(Debug, Deserialize)]
struct TrendingItem {
    id: String,
    name: String,
    symbol: String,
    #[serde(default)]
    market_cap_rank: Option<u32>,
    #[serde(default)]
    price_btc: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    #[serde(default)]
    total_market_cap: HashMap<String, Option<f64>>,
    #[serde(default)]
    total_volume: HashMap<String, Option<f64>>,
    #[serde(default)]
    market_cap_change_percentage_24h_usd: Option<f64>,
    #[serde(default)]
    active_cryptocurrencies: Option<u64>,
}
