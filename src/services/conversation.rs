//! Multi-turn dialog that collects an alert definition
//! (symbol, then target price, then direction) or answers a one-shot search.
//!
//! The state is a plain value owned by the caller; [`Conversation::handle`]
//! consumes it and returns the next one. Nothing is persisted until a
//! direction is chosen, so aborting at any point leaves no trace.

use std::{str::FromStr, sync::Arc};

use serde::Serialize;
use thiserror::Error;

use crate::{
    models::{Direction, Instrument, NewAlert, TargetPrice, UserId},
    services::{
        formatting::Messages,
        market_data::{MarketGateway, normalize_symbol},
        store::AlertStore,
    },
};

pub const DATA_UNAVAILABLE: &str = "⚠️ Data is unavailable right now. Please try again later.";
const MAIN_MENU: &str = "🏠 Main menu. Choose what you want to do next.";
const PROMPT_ALERT_SYMBOL: &str = "Enter a crypto or stock symbol (for example: bitcoin):";
const PROMPT_CRYPTO_SYMBOL: &str = "Enter a cryptocurrency id (for example: bitcoin, ethereum):";
const PROMPT_STOCK_SYMBOL: &str = "Enter a stock ticker (for example: AAPL, GOOGL):";
const PROMPT_DIRECTION: &str = "Choose the alert condition:";
const INVALID_PRICE: &str = "❌ Enter a valid price (a number greater than 0).";
const TRENDING_LIMIT: usize = 5;
const IDLE_HINT: &str = "❌ Enter a crypto or stock symbol (at least 2 characters), or use the menu.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Crypto,
    Stock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CreateAlert,
    Search(SearchKind),
}

/// Per-user dialog state. Each variant carries exactly the fields collected
/// so far.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DialogState {
    #[default]
    Idle,
    AwaitingSymbol {
        intent: Intent,
    },
    AwaitingPrice {
        symbol: String,
    },
    AwaitingDirection {
        symbol: String,
        target: TargetPrice,
    },
}

/// Quick-pick lists offered by the crypto and stock menus.
const PICK_CRYPTO: &[(&str, &str)] = &[
    ("Bitcoin", "bitcoin"),
    ("Ethereum", "ethereum"),
    ("Binance Coin", "binancecoin"),
    ("Solana", "solana"),
    ("Cardano", "cardano"),
];
const PICK_STOCKS: &[(&str, &str)] = &[
    ("AAPL (Apple)", "AAPL"),
    ("GOOGL (Google)", "GOOGL"),
    ("TSLA (Tesla)", "TSLA"),
    ("MSFT (Microsoft)", "MSFT"),
    ("AMZN (Amazon)", "AMZN"),
];

/// Coins priced under the market overview.
const MARKET_LEADERS: &[&str] = &["bitcoin", "ethereum", "binancecoin", "solana", "cardano"];

/// Structured button payloads coming from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddAlert,
    Search(SearchKind),
    Direction(Direction),
    /// Opens the quick-pick list for one provider.
    Browse(SearchKind),
    Trending,
    Market,
    /// A quick-pick button: quote one instrument from one provider.
    Quote {
        kind: SearchKind,
        symbol: String,
    },
    MainMenu,
    Back,
}

impl Action {
    pub fn payload(&self) -> String {
        match self {
            Action::AddAlert => "alert_add".to_string(),
            Action::Search(SearchKind::Crypto) => "crypto_search".to_string(),
            Action::Search(SearchKind::Stock) => "stock_search".to_string(),
            Action::Direction(Direction::Above) => "alert_above".to_string(),
            Action::Direction(Direction::Below) => "alert_below".to_string(),
            Action::Browse(SearchKind::Crypto) => "menu_crypto".to_string(),
            Action::Browse(SearchKind::Stock) => "menu_stocks".to_string(),
            Action::Trending => "menu_trending".to_string(),
            Action::Market => "menu_market".to_string(),
            Action::Quote {
                kind: SearchKind::Crypto,
                symbol,
            } => format!("crypto_{symbol}"),
            Action::Quote {
                kind: SearchKind::Stock,
                symbol,
            } => format!("stock_{symbol}"),
            Action::MainMenu => "menu_main".to_string(),
            Action::Back => "back".to_string(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

fn quote_action(kind: SearchKind, raw: &str, payload: &str) -> Result<Action, UnknownAction> {
    let symbol = normalize_symbol(raw).ok_or_else(|| UnknownAction(payload.to_string()))?;
    let symbol = match kind {
        SearchKind::Crypto => symbol,
        SearchKind::Stock => symbol.to_uppercase(),
    };
    Ok(Action::Quote { kind, symbol })
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "alert_add" => Ok(Action::AddAlert),
            "crypto_search" => Ok(Action::Search(SearchKind::Crypto)),
            "stock_search" => Ok(Action::Search(SearchKind::Stock)),
            "alert_above" => Ok(Action::Direction(Direction::Above)),
            "alert_below" => Ok(Action::Direction(Direction::Below)),
            "menu_crypto" => Ok(Action::Browse(SearchKind::Crypto)),
            "menu_stocks" => Ok(Action::Browse(SearchKind::Stock)),
            "menu_trending" => Ok(Action::Trending),
            "menu_market" => Ok(Action::Market),
            "menu_main" => Ok(Action::MainMenu),
            "back" => Ok(Action::Back),
            // any other menu navigation leaves the dialog as well
            s if s.starts_with("menu_") => Ok(Action::Back),
            s => {
                if let Some(id) = s.strip_prefix("crypto_") {
                    quote_action(SearchKind::Crypto, id, s)
                } else if let Some(ticker) = s.strip_prefix("stock_") {
                    quote_action(SearchKind::Stock, ticker, s)
                } else {
                    Err(UnknownAction(s.to_string()))
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Input {
    Text(String),
    Action(Action),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub action: String,
}

impl Button {
    fn new(label: &str, action: Action) -> Self {
        Self {
            label: label.to_string(),
            action: action.payload(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

fn direction_buttons() -> Vec<Button> {
    vec![
        Button::new("📈 Above price", Action::Direction(Direction::Above)),
        Button::new("📉 Below price", Action::Direction(Direction::Below)),
        Button::new("⬅️ Back", Action::Back),
    ]
}

fn menu_buttons() -> Vec<Button> {
    vec![
        Button::new("💰 Crypto prices", Action::Browse(SearchKind::Crypto)),
        Button::new("📈 Stock prices", Action::Browse(SearchKind::Stock)),
        Button::new("🔥 Trending coins", Action::Trending),
        Button::new("📊 Market overview", Action::Market),
        Button::new("➕ Add alert", Action::AddAlert),
    ]
}

fn pick_buttons(kind: SearchKind) -> Vec<Button> {
    let list = match kind {
        SearchKind::Crypto => PICK_CRYPTO,
        SearchKind::Stock => PICK_STOCKS,
    };

    let mut buttons: Vec<Button> = list
        .iter()
        .map(|(label, symbol)| {
            Button::new(
                label,
                Action::Quote {
                    kind,
                    symbol: symbol.to_string(),
                },
            )
        })
        .collect();
    buttons.push(Button::new("🔍 Search", Action::Search(kind)));
    buttons.push(Button::new("⬅️ Back", Action::MainMenu));
    buttons
}

fn back_buttons() -> Vec<Button> {
    vec![Button::new("🏠 Main menu", Action::MainMenu)]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: DialogState,
    pub reply: Reply,
}

impl Step {
    fn new(state: DialogState, reply: Reply) -> Self {
        Self { state, reply }
    }

    fn idle(reply: Reply) -> Self {
        Self::new(DialogState::Idle, reply)
    }
}

pub struct Conversation {
    gateway: MarketGateway,
    store: Arc<dyn AlertStore>,
    messages: Messages,
}

impl Conversation {
    pub fn new(gateway: MarketGateway, store: Arc<dyn AlertStore>, messages: Messages) -> Self {
        Self {
            gateway,
            store,
            messages,
        }
    }

    pub async fn handle(&self, user_id: UserId, state: DialogState, input: Input) -> Step {
        match input {
            Input::Action(action) => self.on_action(user_id, state, action).await,
            Input::Text(text) => self.on_text(user_id, state, &text).await,
        }
    }

    async fn on_action(&self, user_id: UserId, state: DialogState, action: Action) -> Step {
        match (action, state) {
            (Action::MainMenu | Action::Back, state) => {
                if state != DialogState::Idle {
                    tracing::debug!(user_id, ?state, "dialog aborted");
                }
                Step::idle(Reply::text(MAIN_MENU).with_buttons(menu_buttons()))
            }
            (Action::AddAlert, _) => Step::new(
                DialogState::AwaitingSymbol {
                    intent: Intent::CreateAlert,
                },
                Reply::text(PROMPT_ALERT_SYMBOL),
            ),
            (Action::Search(kind), _) => Step::new(
                DialogState::AwaitingSymbol {
                    intent: Intent::Search(kind),
                },
                Reply::text(symbol_prompt(Intent::Search(kind))),
            ),
            (Action::Direction(direction), DialogState::AwaitingDirection { symbol, target }) => {
                self.commit(user_id, symbol, target, direction).await
            }
            (Action::Direction(_), state) => reprompt(state),
            (Action::Browse(kind), _) => {
                let prompt = match kind {
                    SearchKind::Crypto => "💰 Choose a cryptocurrency:",
                    SearchKind::Stock => "📈 Choose a stock:",
                };
                Step::idle(Reply::text(prompt).with_buttons(pick_buttons(kind)))
            }
            (Action::Trending, _) => Step::idle(self.trending_reply().await),
            (Action::Market, _) => Step::idle(self.market_reply().await),
            (Action::Quote { kind, symbol }, _) => Step::idle(self.pick_reply(kind, &symbol).await),
        }
    }

    async fn pick_reply(&self, kind: SearchKind, symbol: &str) -> Reply {
        let found = match kind {
            SearchKind::Crypto => self.gateway.lookup_crypto(symbol).await.map(Instrument::Crypto),
            SearchKind::Stock => self.gateway.lookup_equity(symbol).await.map(Instrument::Equity),
        };

        match found {
            Ok(instrument) => self.snapshot_reply(&instrument),
            Err(e) => {
                tracing::debug!(symbol, error = %e, "quick-pick quote failed");
                Reply::text(format!("❌ Could not get data for {symbol}.")).with_buttons(back_buttons())
            }
        }
    }

    async fn trending_reply(&self) -> Reply {
        let rendered = match self.gateway.crypto().trending().await {
            Ok(mut coins) if !coins.is_empty() => {
                coins.truncate(TRENDING_LIMIT);
                self.messages.trending(&coins).map_err(|e| e.to_string())
            }
            Ok(_) => Err("no trending coins".to_string()),
            Err(e) => Err(e.to_string()),
        };

        let text = rendered.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "trending list unavailable");
            DATA_UNAVAILABLE.to_string()
        });
        Reply::text(text).with_buttons(back_buttons())
    }

    async fn market_reply(&self) -> Reply {
        let market = match self.gateway.crypto().global().await {
            Ok(Some(m)) => m,
            Ok(None) => {
                tracing::warn!("global market summary empty");
                return Reply::text(DATA_UNAVAILABLE).with_buttons(back_buttons());
            }
            Err(e) => {
                tracing::warn!(error = %e, "global market summary unavailable");
                return Reply::text(DATA_UNAVAILABLE).with_buttons(back_buttons());
            }
        };

        // leaders that fail to price are left out
        let mut leaders = Vec::with_capacity(MARKET_LEADERS.len());
        for id in MARKET_LEADERS {
            match self.gateway.lookup_crypto(id).await {
                Ok(q) => leaders.push(q),
                Err(e) => tracing::debug!(symbol = id, error = %e, "market leader unavailable"),
            }
        }

        let text = self.messages.market_overview(&market, &leaders).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not render market overview");
            DATA_UNAVAILABLE.to_string()
        });
        Reply::text(text).with_buttons(back_buttons())
    }

    async fn on_text(&self, user_id: UserId, state: DialogState, text: &str) -> Step {
        match state {
            DialogState::Idle => self.quick_quote(text).await,
            DialogState::AwaitingSymbol { intent } => self.on_symbol(intent, text).await,
            DialogState::AwaitingPrice { symbol } => match TargetPrice::parse(text) {
                Ok(target) => Step::new(
                    DialogState::AwaitingDirection { symbol, target },
                    Reply::text(PROMPT_DIRECTION).with_buttons(direction_buttons()),
                ),
                Err(_) => Step::new(DialogState::AwaitingPrice { symbol }, Reply::text(INVALID_PRICE)),
            },
            DialogState::AwaitingDirection { symbol, target } => match text.parse::<Direction>() {
                Ok(direction) => self.commit(user_id, symbol, target, direction).await,
                Err(_) => reprompt(DialogState::AwaitingDirection { symbol, target }),
            },
        }
    }

    async fn on_symbol(&self, intent: Intent, text: &str) -> Step {
        let stay = |reply: Reply| Step::new(DialogState::AwaitingSymbol { intent }, reply);

        let Some(symbol) = normalize_symbol(text) else {
            return stay(Reply::text(format!(
                "❌ '{}' is not a valid symbol. {}",
                text.trim(),
                symbol_prompt(intent)
            )));
        };

        let not_found = || Reply::text(format!("❌ Symbol '{symbol}' was not found. Try another symbol."));

        match intent {
            Intent::CreateAlert => match self.gateway.lookup(&symbol).await {
                Ok(_) => Step::new(
                    DialogState::AwaitingPrice {
                        symbol: symbol.clone(),
                    },
                    Reply::text(format!(
                        "Enter the target price for {} (for example: 50000):",
                        symbol.to_uppercase()
                    )),
                ),
                Err(e) => {
                    tracing::debug!(symbol = %symbol, error = %e, "alert symbol lookup failed");
                    stay(not_found())
                }
            },
            Intent::Search(kind) => {
                let found = match kind {
                    SearchKind::Crypto => self.gateway.lookup_crypto(&symbol).await.map(Instrument::Crypto),
                    SearchKind::Stock => self.gateway.lookup_equity(&symbol).await.map(Instrument::Equity),
                };

                match found {
                    Ok(instrument) => Step::idle(self.snapshot_reply(&instrument)),
                    Err(e) => {
                        tracing::debug!(symbol = %symbol, error = %e, "search lookup failed");
                        stay(not_found())
                    }
                }
            }
        }
    }

    /// Free text outside any dialog is treated as a quote request.
    async fn quick_quote(&self, text: &str) -> Step {
        let trimmed = text.trim();
        if trimmed.chars().count() < 2 || trimmed.starts_with('/') {
            return Step::idle(Reply::text(IDLE_HINT).with_buttons(menu_buttons()));
        }

        match self.gateway.lookup(trimmed).await {
            Ok(instrument) => Step::idle(self.snapshot_reply(&instrument)),
            Err(e) => {
                tracing::debug!(query = trimmed, error = %e, "quick quote failed");
                Step::idle(
                    Reply::text(format!(
                        "❌ Could not find data for '{trimmed}'. Use the menu or type an exact coin id or ticker."
                    ))
                    .with_buttons(menu_buttons()),
                )
            }
        }
    }

    fn snapshot_reply(&self, instrument: &Instrument) -> Reply {
        let text = self.messages.instrument(instrument).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not render instrument");
            DATA_UNAVAILABLE.to_string()
        });
        Reply::text(text).with_buttons(back_buttons())
    }

    async fn commit(&self, user_id: UserId, symbol: String, target: TargetPrice, direction: Direction) -> Step {
        let new_alert = NewAlert::new(user_id, &symbol, target, direction);

        match self.store.create_alert(new_alert).await {
            Ok(alert) => {
                tracing::info!(
                    user_id,
                    alert_id = %alert.id,
                    symbol = %alert.symbol,
                    target = alert.target_price,
                    direction = %alert.direction,
                    "alert created"
                );
                let text = self.messages.alert_created(&alert).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "could not render alert confirmation");
                    format!("✅ Alert created (ID: {})", alert.id.to_hex())
                });
                Step::idle(Reply::text(text).with_buttons(back_buttons()))
            }
            Err(e) => {
                // keep the collected fields so the user can pick again
                tracing::warn!(user_id, symbol = %symbol, error = %e, "could not store alert");
                Step::new(
                    DialogState::AwaitingDirection { symbol, target },
                    Reply::text(DATA_UNAVAILABLE).with_buttons(direction_buttons()),
                )
            }
        }
    }
}

fn symbol_prompt(intent: Intent) -> &'static str {
    match intent {
        Intent::CreateAlert => PROMPT_ALERT_SYMBOL,
        Intent::Search(SearchKind::Crypto) => PROMPT_CRYPTO_SYMBOL,
        Intent::Search(SearchKind::Stock) => PROMPT_STOCK_SYMBOL,
    }
}

/// Repeats the question for the current state without changing it.
fn reprompt(state: DialogState) -> Step {
    let reply = match &state {
        DialogState::Idle => Reply::text(MAIN_MENU).with_buttons(menu_buttons()),
        DialogState::AwaitingSymbol { intent } => Reply::text(symbol_prompt(*intent)),
        DialogState::AwaitingPrice { symbol } => Reply::text(format!(
            "Enter the target price for {} (for example: 50000):",
            symbol.to_uppercase()
        )),
        DialogState::AwaitingDirection { .. } => Reply::text(PROMPT_DIRECTION).with_buttons(direction_buttons()),
    };
    Step::new(state, reply)
}
