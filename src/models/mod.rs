pub mod alert;
pub mod interaction;
pub mod market;
pub mod subscription;

/// Chat-platform user identifier.
pub type UserId = i64;

pub use alert::{Alert, Direction, NewAlert, TargetPrice};
pub use interaction::{Interaction, NewInteraction};
pub use market::{CryptoQuote, EquityQuote, GlobalMarket, Instrument, PriceSnapshot, TrendingCoin};
pub use subscription::{Subscription, Topic};
