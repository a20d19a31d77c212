//! Synthetic price generation, sequenced tick publication, and rolling
//! history (spec §4.3).

pub mod history;
pub mod price_model;
pub mod publisher;
pub mod types;

pub use history::PriceHistory;
pub use price_model::{GbmModel, PriceModel};
pub use publisher::{MarketDataPublisher, MarketEvent, SharedHistories, TradeEvent};
pub use types::{Channel, MarketDataTick, PricePoint};
