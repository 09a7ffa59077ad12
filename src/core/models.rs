// @file: kline_exporter/src/core/models.rs
// @description: Candle records, the ordered series they are stitched into, and market selection.
// @author: LAS.

use crate::core::dates::TimePoint;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;


//
// MARKET TYPES
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketType {
    #[default]
    Spot,
    LinearFuture, // USDT-M
    InverseFuture, // COIN-M
}

impl MarketType {
    pub fn klines_path(&self) -> &'static str {
        match self {
            MarketType::Spot => "/api/v3/klines",
            MarketType::LinearFuture => "/fapi/v1/klines",
            MarketType::InverseFuture => "/dapi/v1/klines",
        }
    }

    /// Largest `limit` the klines endpoint honours. Larger requests are
    /// silently capped by the server.
    pub fn max_page_limit(&self) -> usize {
        match self {
            MarketType::Spot => 1000,
            MarketType::LinearFuture | MarketType::InverseFuture => 1500,
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for MarketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "spot" => Ok(MarketType::Spot),
            "linear-future" | "usdt-m" | "futures" => Ok(MarketType::LinearFuture),
            "inverse-future" | "coin-m" => Ok(MarketType::InverseFuture),
            other => Err(format!("unknown market type: {}", other)),
        }
    }
}


//
// CANDLE
//

/// One OHLCV bar. `open_time` is the identity key within a [`Series`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: TimePoint,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: TimePoint,
    pub quote_asset_volume: f64,
    pub number_of_trades: u64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl Candle {
    /// Column names in export order.
    pub const FIELD_NAMES: [&'static str; 11] = [
        "open_time",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "close_time",
        "quote_asset_volume",
        "number_of_trades",
        "taker_buy_base_volume",
        "taker_buy_quote_volume",
    ];
}


//
// SERIES
//

/// A gap between two consecutive candles wider than one interval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub after: TimePoint,
    pub before: TimePoint,
}

/// Candles ordered by strictly increasing `open_time`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    /// Append a page in order. Candles that would break the strictly
    /// increasing `open_time` invariant are dropped. Returns how many were kept.
    pub fn extend_page(&mut self, page: Vec<Candle>) -> usize {
        let mut kept: usize = 0;

        for candle in page {
            if let Some(last) = self.candles.last() {
                if candle.open_time <= last.open_time {
                    warn!(
                        "Dropping out-of-order candle open_time={} (last={})",
                        candle.open_time, last.open_time
                    );
                    continue;
                }
            }
            self.candles.push(candle);
            kept += 1;
        }

        kept
    }

    /// Spans between consecutive candles wider than `step_millis`.
    pub fn gaps(&self, step_millis: i64) -> Vec<Gap> {
        self.candles
            .windows(2)
            .filter(|pair| pair[1].open_time - pair[0].open_time > step_millis)
            .map(|pair| Gap {
                after: pair[0].open_time,
                before: pair[1].open_time,
            })
            .collect()
    }
}

impl From<Vec<Candle>> for Series {
    fn from(candles: Vec<Candle>) -> Self {
        let mut series: Series = Series::new();
        series.extend_page(candles);
        series
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}


//
// FETCH OUTCOME
//

/// What one pagination run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    pub series: Series,
    pub pages: usize,
    /// Pause points reached. The one at the final page is counted but not slept.
    pub pauses: usize,
}


#[cfg(test)]
pub(crate) fn candle_at(open_time: TimePoint, step_millis: i64, close: f64) -> Candle {
    Candle {
        open_time,
        open: close - 1.0,
        high: close + 2.0,
        low: close - 2.0,
        close,
        volume: 10.0,
        close_time: open_time + step_millis - 1,
        quote_asset_volume: close * 10.0,
        number_of_trades: 42,
        taker_buy_base_volume: 4.0,
        taker_buy_quote_volume: close * 4.0,
    }
}
