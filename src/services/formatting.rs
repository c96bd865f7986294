use num_format::{Locale, ToFormattedString};
use serde_json::json;

use crate::{
    error::EngineError,
    models::{Alert, CryptoQuote, Direction, EquityQuote, GlobalMarket, Instrument, Topic, TrendingCoin},
    templates::{self, Hbs},
};

/// `$51,000.00`; sub-dollar prices keep six decimals.
pub fn fmt_usd(x: f64) -> String {
    if x.abs() < 1.0 && x != 0.0 {
        let sign = if x < 0.0 { "-" } else { "" };
        return format!("{sign}${:.6}", x.abs());
    }

    let cents = (x * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{sign}${}.{:02}",
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// `$1,234,567` (no cents).
pub fn fmt_usd_whole(x: f64) -> String {
    let whole = x.round() as i64;
    let sign = if whole < 0 { "-" } else { "" };
    format!("{sign}${}", whole.unsigned_abs().to_formatted_string(&Locale::en))
}

pub fn fmt_pct(x: f64) -> String {
    format!("{x:+.2}%")
}

fn trend_emoji(up: bool) -> &'static str {
    if up { "📈" } else { "📉" }
}

fn direction_emoji(d: Direction) -> &'static str {
    trend_emoji(d == Direction::Above)
}

/// Renders every user-facing message from the handlebars registry.
#[derive(Clone)]
pub struct Messages {
    hbs: Hbs,
}

impl Messages {
    pub fn new(hbs: Hbs) -> Self {
        Self { hbs }
    }

    pub fn standard() -> Result<Self, EngineError> {
        Ok(Self::new(templates::build_handlebars()?))
    }

    fn render(&self, tpl: &str, ctx: &serde_json::Value) -> Result<String, EngineError> {
        let text = self.hbs.render(tpl, ctx)?;
        Ok(text.trim().to_string())
    }

    pub fn alert_triggered(&self, alert: &Alert, price: f64) -> Result<String, EngineError> {
        self.render(
            "alert_triggered",
            &json!({
                "emoji": direction_emoji(alert.direction),
                "symbol": alert.symbol.to_uppercase(),
                "current_price": fmt_usd(price),
                "target_price": fmt_usd(alert.target_price),
                "direction": alert.direction.as_str(),
            }),
        )
    }

    pub fn alert_created(&self, alert: &Alert) -> Result<String, EngineError> {
        self.render(
            "alert_created",
            &json!({
                "symbol": alert.symbol.to_uppercase(),
                "target_price": fmt_usd(alert.target_price),
                "direction": alert.direction.as_str(),
                "alert_id": alert.id.to_hex(),
            }),
        )
    }

    pub fn instrument(&self, instrument: &Instrument) -> Result<String, EngineError> {
        match instrument {
            Instrument::Crypto(q) => self.crypto_snapshot(q),
            Instrument::Equity(q) => self.equity_snapshot(q),
        }
    }

    fn crypto_snapshot(&self, q: &CryptoQuote) -> Result<String, EngineError> {
        self.render(
            "crypto_snapshot",
            &json!({
                "name": q.name,
                "symbol": q.symbol,
                "price": fmt_usd(q.current_price),
                "emoji": trend_emoji(q.price_change_percentage_24h >= 0.0),
                "change_24h": fmt_pct(q.price_change_percentage_24h),
                "market_cap": fmt_usd_whole(q.market_cap),
                "volume_24h": fmt_usd_whole(q.volume_24h),
            }),
        )
    }

    fn equity_snapshot(&self, q: &EquityQuote) -> Result<String, EngineError> {
        self.render(
            "equity_snapshot",
            &json!({
                "symbol": q.symbol,
                "price": fmt_usd(q.price),
                "emoji": trend_emoji(q.change >= 0.0),
                "change": format!("{:+.2}", q.change),
                "change_percent": q.change_percent,
                "volume": q.volume.to_formatted_string(&Locale::en),
            }),
        )
    }

    fn coin_rows(coins: &[TrendingCoin]) -> Vec<serde_json::Value> {
        coins
            .iter()
            .enumerate()
            .map(|(i, c)| {
                json!({
                    "rank": i + 1,
                    "name": c.name,
                    "symbol": c.symbol,
                    "market_cap_rank": c.market_cap_rank,
                    "price_btc": format!("{:.8}", c.price_btc),
                })
            })
            .collect()
    }

    pub fn trending(&self, coins: &[TrendingCoin]) -> Result<String, EngineError> {
        self.render("trending", &json!({ "coins": Self::coin_rows(coins) }))
    }

    pub fn market_overview(&self, market: &GlobalMarket, leaders: &[CryptoQuote]) -> Result<String, EngineError> {
        let leaders: Vec<_> = leaders
            .iter()
            .map(|q| json!({ "name": q.name, "price": fmt_usd(q.current_price) }))
            .collect();

        self.render(
            "market_overview",
            &json!({
                "total_market_cap": fmt_usd_whole(market.total_market_cap_usd),
                "total_volume": fmt_usd_whole(market.total_volume_usd),
                "change_24h": fmt_pct(market.market_cap_change_24h),
                "active_cryptocurrencies": market.active_cryptocurrencies.to_formatted_string(&Locale::en),
                "leaders": leaders,
            }),
        )
    }

    pub fn crypto_digest(&self, coins: &[TrendingCoin], market: Option<&GlobalMarket>) -> Result<String, EngineError> {
        let coins = Self::coin_rows(coins);

        let market = market.map(|m| {
            json!({
                "total_market_cap": fmt_usd_whole(m.total_market_cap_usd),
                "total_volume": fmt_usd_whole(m.total_volume_usd),
                "change_24h": fmt_pct(m.market_cap_change_24h),
            })
        });

        self.render("digest_crypto", &json!({ "coins": coins, "market": market }))
    }

    /// `None` quotes render as unavailable.
    pub fn stocks_digest(&self, rows: &[(String, Option<EquityQuote>)]) -> Result<String, EngineError> {
        let rows: Vec<_> = rows
            .iter()
            .map(|(symbol, quote)| match quote {
                Some(q) => json!({
                    "emoji": trend_emoji(q.change >= 0.0),
                    "symbol": symbol,
                    "line": format!("{} ({})", fmt_usd(q.price), q.change_percent),
                }),
                None => json!({
                    "emoji": "⏸",
                    "symbol": symbol,
                    "line": "data unavailable",
                }),
            })
            .collect();

        self.render("digest_stocks", &json!({ "rows": rows }))
    }

    pub fn news_digest(&self, headlines: &[&str]) -> Result<String, EngineError> {
        let headlines: Vec<_> = headlines
            .iter()
            .enumerate()
            .map(|(i, h)| json!({ "rank": i + 1, "text": h }))
            .collect();

        self.render("digest_news", &json!({ "headlines": headlines }))
    }

    pub fn welcome(&self, topic: Topic) -> Result<String, EngineError> {
        let blurb = match topic {
            Topic::Crypto => "You will get regular updates on trending coins and the crypto market.",
            Topic::Stocks => "You will get regular updates on stock moves for the watchlist.",
            Topic::News => "You will get regular financial headlines.",
        };

        self.render("welcome", &json!({ "title": topic.title(), "blurb": blurb }))
    }
}
