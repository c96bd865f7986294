use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,

    pub coingecko_api_url: String,
    pub alpha_vantage_api_url: String,
    pub alpha_vantage_api_key: String,
    pub http_timeout_secs: u64,

    pub alert_check_interval_secs: u64,
    pub digest_interval_secs: u64,
    pub loop_cooldown_secs: u64,

    pub session_ttl_secs: u64,
    pub digest_stock_symbols: Vec<String>,
}

/// Pause between cycles of one background loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Sleep after a cycle finished normally.
    pub interval: Duration,
    /// Sleep after a cycle failed as a whole.
    pub cooldown: Duration,
}

/// Periods are never shorter than one second.
fn secs(n: u64) -> Duration {
    Duration::from_secs(n.max(1))
}

impl Settings {
    pub fn alert_schedule(&self) -> Schedule {
        Schedule {
            interval: secs(self.alert_check_interval_secs),
            cooldown: secs(self.loop_cooldown_secs),
        }
    }

    pub fn digest_schedule(&self) -> Schedule {
        Schedule {
            interval: secs(self.digest_interval_secs),
            cooldown: secs(self.loop_cooldown_secs),
        }
    }

    pub fn session_sweep_schedule(&self) -> Schedule {
        let ttl = self.session_ttl();
        Schedule {
            interval: ttl,
            cooldown: ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        secs(self.session_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        secs(self.http_timeout_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "127.0.0.1".to_string(),
            port: 3000,
            store_backend: StoreBackend::Mongo,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "pricewatch".to_string(),
            coingecko_api_url: "https://api.coingecko.com/api/v3".to_string(),
            alpha_vantage_api_url: "https://www.alphavantage.co/query".to_string(),
            alpha_vantage_api_key: String::new(),
            http_timeout_secs: 10,
            alert_check_interval_secs: 60,
            digest_interval_secs: 300,
            loop_cooldown_secs: 60,
            session_ttl_secs: 900,
            digest_stock_symbols: ["AAPL", "GOOGL", "TSLA", "MSFT", "AMZN"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

fn var_or(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let d = Settings::default();

    let store_backend = match env::var("STORE_BACKEND").map(|s| s.trim().to_lowercase()) {
        Ok(s) if s == "memory" => StoreBackend::Memory,
        _ => StoreBackend::Mongo,
    };

    let digest_stock_symbols = env::var("DIGEST_STOCK_SYMBOLS")
        .ok()
        .map(|s| parse_symbol_list(&s))
        .filter(|v| !v.is_empty())
        .unwrap_or(d.digest_stock_symbols);

    Settings {
        host: var_or("HOST", d.host),
        port: parsed_or("PORT", d.port),
        store_backend,
        mongodb_uri: var_or("MONGODB_URI", d.mongodb_uri),
        mongodb_db: var_or("MONGODB_DB", d.mongodb_db),
        coingecko_api_url: var_or("COINGECKO_API_URL", d.coingecko_api_url),
        alpha_vantage_api_url: var_or("ALPHA_VANTAGE_API_URL", d.alpha_vantage_api_url),
        alpha_vantage_api_key: env::var("ALPHA_VANTAGE_API_KEY").unwrap_or_default(),
        http_timeout_secs: parsed_or("HTTP_TIMEOUT_SECS", d.http_timeout_secs),
        alert_check_interval_secs: parsed_or("ALERT_CHECK_INTERVAL_SECS", d.alert_check_interval_secs),
        digest_interval_secs: parsed_or("DIGEST_INTERVAL_SECS", d.digest_interval_secs),
        loop_cooldown_secs: parsed_or("LOOP_COOLDOWN_SECS", d.loop_cooldown_secs),
        session_ttl_secs: parsed_or("SESSION_TTL_SECS", d.session_ttl_secs),
        digest_stock_symbols,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_list_is_trimmed_and_upper_cased() {
        assert_eq!(parse_symbol_list(" aapl, ,msft,"), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn schedules_follow_settings() {
        let s = Settings {
            alert_check_interval_secs: 30,
            digest_interval_secs: 600,
            loop_cooldown_secs: 5,
            ..Settings::default()
        };
        assert_eq!(s.alert_schedule().interval, Duration::from_secs(30));
        assert_eq!(s.digest_schedule().interval, Duration::from_secs(600));
        assert_eq!(s.digest_schedule().cooldown, Duration::from_secs(5));
    }

    #[test]
    fn zero_periods_are_raised_to_one_second() {
        let s = Settings {
            alert_check_interval_secs: 0,
            digest_interval_secs: 0,
            loop_cooldown_secs: 0,
            session_ttl_secs: 0,
            http_timeout_secs: 0,
            ..Settings::default()
        };
        let one = Duration::from_secs(1);
        for schedule in [s.alert_schedule(), s.digest_schedule(), s.session_sweep_schedule()] {
            assert_eq!(schedule.interval, one);
            assert_eq!(schedule.cooldown, one);
        }
        assert_eq!(s.session_ttl(), one);
        assert_eq!(s.http_timeout(), one);
    }
}
