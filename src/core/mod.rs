pub mod config;
pub mod error;
pub mod types;

pub use config::ForecastConfig;
pub use error::{ForecastError, Result};
pub use types::{Address, BattleType, ChainSnapshot, ItemId};
