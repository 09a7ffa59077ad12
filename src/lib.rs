// @file: kline_exporter/src/lib.rs
// @description: Exposes the modular architecture for integration testing and external usage.
// @author: LAS.

pub mod app;
pub mod cli;
pub mod connectors;
pub mod core;
pub mod output;
pub mod tests;
pub mod utils;

pub use crate::core::dates::{parse_utc_millis, TimePoint};
pub use crate::core::error::{KlineError, Result};
pub use crate::core::fetcher::{FetcherSettings, SeriesFetcher};
pub use crate::core::interval::{parse_interval, Interval};
pub use crate::core::models::{Candle, FetchReport, MarketType, Series};
