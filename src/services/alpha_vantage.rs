use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{error::MarketError, models::EquityQuote, services::market_data::EquityProvider};

#[derive(Clone)]
pub struct AlphaVantageClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(http: Client, base_url: &str, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[async_trait]
impl EquityProvider for AlphaVantageClient {
    async fn quote(&self, ticker: &str) -> Result<Option<EquityQuote>, MarketError> {
        if !self.has_key() {
            return Err(MarketError::Provider("ALPHA_VANTAGE_API_KEY is missing".to_string()));
        }

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", ticker),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(MarketError::Provider(format!("Alpha Vantage quote failed: {status} {body}")));
        }

        res.json::<GlobalQuoteEnvelope>().await?.into_quote()
    }
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteEnvelope {
    #[serde(rename = "Global Quote", default)]
    quote: Option<RawGlobalQuote>,

    // rate limiting and key problems come back as 200 with one of these
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGlobalQuote {
    #[serde(rename = "01. symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "05. price", default)]
    price: Option<String>,
    #[serde(rename = "06. volume", default)]
    volume: Option<String>,
    #[serde(rename = "09. change", default)]
    change: Option<String>,
    #[serde(rename = "10. change percent", default)]
    change_percent: Option<String>,
}

impl GlobalQuoteEnvelope {
    fn into_quote(self) -> Result<Option<EquityQuote>, MarketError> {
        if let Some(msg) = self.note.or(self.information) {
            return Err(MarketError::Provider(msg));
        }
        if self.error_message.is_some() {
            // unknown ticker
            return Ok(None);
        }

        let Some(raw) = self.quote else {
            return Ok(None);
        };
        let Some(symbol) = raw.symbol.filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };

        let price = parse_number(raw.price.as_deref(), "price")?;
        let change = parse_number(raw.change.as_deref(), "change")?;
        let volume = raw
            .volume
            .as_deref()
            .map(str::trim)
            .unwrap_or("0")
            .parse::<u64>()
            .map_err(|e| MarketError::Provider(format!("bad volume: {e}")))?;

        Ok(Some(EquityQuote {
            symbol,
            price,
            change,
            change_percent: raw.change_percent.unwrap_or_else(|| "0%".to_string()),
            volume,
        }))
    }
}

fn parse_number(raw: Option<&str>, field: &str) -> Result<f64, MarketError> {
    raw.map(str::trim)
        .unwrap_or("0")
        .parse::<f64>()
        .map_err(|e| MarketError::Provider(format!("bad {field}: {e}")))
}
