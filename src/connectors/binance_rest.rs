// @file: kline_exporter/src/connectors/binance_rest.rs
// @description: HTTP page source fetching historical klines from Binance spot and futures endpoints.
// @author: LAS.

use crate::connectors::retry::{retry_with_backoff, RetryPolicy};
use crate::core::error::{KlineError, Result};
use crate::core::interfaces::{PageRequest, PageSource};
use crate::core::models::{Candle, MarketType};
use crate::utils::config::AppConfig;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::{self, Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use tokio::time::Duration;
use url::Url;


//
// BINANCE WIRE MODELS
//

/// Numeric kline field; Binance quotes prices and volumes as strings.
#[derive(Debug, Clone)]
enum WireNumber {
    Text(String),
    Number(f64),
}

impl WireNumber {
    fn to_f64(&self, field: &str) -> Result<f64> {
        match self {
            WireNumber::Number(n) => Ok(*n),
            WireNumber::Text(s) => s.trim().parse::<f64>().map_err(|e| {
                KlineError::MalformedResponse(format!("failed to parse {} '{}': {}", field, s, e))
            }),
        }
    }
}

/// Positional kline array:
/// `[open_time, open, high, low, close, volume, close_time, quote_asset_volume,
///   number_of_trades, taker_buy_base_volume, taker_buy_quote_volume, ignore]`
#[derive(Debug, Clone)]
struct BinanceKlineRaw {
    open_time: i64,
    open: WireNumber,
    high: WireNumber,
    low: WireNumber,
    close: WireNumber,
    volume: WireNumber,
    close_time: i64,
    quote_asset_volume: WireNumber,
    number_of_trades: u64,
    taker_buy_base_volume: WireNumber,
    taker_buy_quote_volume: WireNumber,
}

impl<'de> Deserialize<'de> for BinanceKlineRaw {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KlineVisitor;

        impl<'de> Visitor<'de> for KlineVisitor {
            type Value = BinanceKlineRaw;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a kline array with at least 11 elements")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut index: usize = 0;
                let mut next = |seq: &mut A| -> std::result::Result<WireSlot, A::Error> {
                    let slot = seq
                        .next_element::<WireSlot>()?
                        .ok_or_else(|| {
                            <A::Error as de::Error>::invalid_length(index, &"at least 11 elements")
                        })?;
                    index += 1;
                    Ok(slot)
                };

                let open_time = next(&mut seq)?.into_i64::<A::Error>("open_time")?;
                let open = next(&mut seq)?.into_number();
                let high = next(&mut seq)?.into_number();
                let low = next(&mut seq)?.into_number();
                let close = next(&mut seq)?.into_number();
                let volume = next(&mut seq)?.into_number();
                let close_time = next(&mut seq)?.into_i64::<A::Error>("close_time")?;
                let quote_asset_volume = next(&mut seq)?.into_number();
                let number_of_trades = next(&mut seq)?.into_u64::<A::Error>("number_of_trades")?;
                let taker_buy_base_volume = next(&mut seq)?.into_number();
                let taker_buy_quote_volume = next(&mut seq)?.into_number();

                // Trailing "ignore" column and anything newer
                while seq.next_element::<IgnoredAny>()?.is_some() {}

                Ok(BinanceKlineRaw {
                    open_time,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    close_time,
                    quote_asset_volume,
                    number_of_trades,
                    taker_buy_base_volume,
                    taker_buy_quote_volume,
                })
            }
        }

        deserializer.deserialize_seq(KlineVisitor)
    }
}

/// Any scalar a kline slot may hold, before the field decides what it needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireSlot {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl WireSlot {
    fn into_number(self) -> WireNumber {
        match self {
            WireSlot::Integer(n) => WireNumber::Number(n as f64),
            WireSlot::Number(n) => WireNumber::Number(n),
            WireSlot::Text(s) => WireNumber::Text(s),
        }
    }

    fn into_i64<E: de::Error>(self, field: &str) -> std::result::Result<i64, E> {
        match self {
            WireSlot::Integer(n) => Ok(n),
            WireSlot::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("{} is not an integer: {:?}", field, s))),
            WireSlot::Number(n) => Err(E::custom(format!("{} is not an integer: {}", field, n))),
        }
    }

    fn into_u64<E: de::Error>(self, field: &str) -> std::result::Result<u64, E> {
        let value: i64 = self.into_i64(field)?;
        u64::try_from(value).map_err(|_| E::custom(format!("{} is negative: {}", field, value)))
    }
}

impl TryFrom<BinanceKlineRaw> for Candle {
    type Error = KlineError;

    fn try_from(raw: BinanceKlineRaw) -> Result<Self> {
        Ok(Candle {
            open_time: raw.open_time,
            open: raw.open.to_f64("open")?,
            high: raw.high.to_f64("high")?,
            low: raw.low.to_f64("low")?,
            close: raw.close.to_f64("close")?,
            volume: raw.volume.to_f64("volume")?,
            close_time: raw.close_time,
            quote_asset_volume: raw.quote_asset_volume.to_f64("quote_asset_volume")?,
            number_of_trades: raw.number_of_trades,
            taker_buy_base_volume: raw.taker_buy_base_volume.to_f64("taker_buy_base_volume")?,
            taker_buy_quote_volume: raw.taker_buy_quote_volume.to_f64("taker_buy_quote_volume")?,
        })
    }
}

/// Decode a klines response body into candles, oldest first.
pub fn parse_kline_page(body: &str) -> Result<Vec<Candle>> {
    let raw_list: Vec<BinanceKlineRaw> = serde_json::from_str(body)
        .map_err(|e| KlineError::MalformedResponse(format!("invalid klines payload: {}", e)))?;

    raw_list.into_iter().map(Candle::try_from).collect()
}


//
// CLIENT
//

#[derive(Debug, Clone)]
pub struct BinanceRestClient {
    client: Client,
    base_url: String,
    market: MarketType,
    retry: RetryPolicy,
}

impl BinanceRestClient {
    //
    // PUBLIC INTERFACE
    //

    pub fn new(
        base_url: &str,
        market: MarketType,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        // #1. Validate the base URL up front rather than on the first page
        Url::parse(base_url)
            .map_err(|e| KlineError::Config(format!("invalid base url {:?}: {}", base_url, e)))?;

        let client: Client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KlineError::Transport(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            market,
            retry,
        })
    }

    pub fn from_config(config: &AppConfig, market: MarketType) -> Result<Self> {
        Self::new(
            config.rest_base_url(market),
            market,
            config.request_timeout(),
            config.retry_policy(),
        )
    }

    pub fn market(&self) -> MarketType {
        self.market
    }

    pub fn klines_url(&self, request: &PageRequest) -> Result<Url> {
        let mut url: Url = Url::parse(&format!("{}{}", self.base_url, self.market.klines_path()))
            .map_err(|e| KlineError::Config(format!("invalid klines url: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("symbol", &request.symbol.to_uppercase())
            .append_pair("interval", &request.interval)
            .append_pair("startTime", &request.start_time.to_string())
            .append_pair("endTime", &request.end_time.to_string())
            .append_pair("limit", &request.limit.to_string());

        Ok(url)
    }

    //
    // INTERNAL HELPERS
    //

    async fn request_page(&self, request: &PageRequest) -> Result<Vec<Candle>> {
        let url: Url = self.klines_url(request)?;
        debug!("GET {}", url);

        // #1. Execute request
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KlineError::Transport(format!("request failed: {}", e)))?;

        // #2. Classify status
        let status: StatusCode = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            return Err(KlineError::RateLimited {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body: String = response.text().await.unwrap_or_default();
            return Err(KlineError::Transport(format!("API error {}: {}", status, body)));
        }

        // #3. Decode body
        let body: String = response
            .text()
            .await
            .map_err(|e| KlineError::Transport(format!("failed to read body: {}", e)))?;

        parse_kline_page(&body)
    }
}

#[async_trait]
impl PageSource for BinanceRestClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Candle>> {
        retry_with_backoff(&self.retry, KlineError::is_retriable, || {
            self.request_page(request)
        })
        .await
    }

    fn name(&self) -> &str {
        "binance-rest"
    }

    fn max_page_limit(&self) -> Option<usize> {
        Some(self.market.max_page_limit())
    }
}
