// @file: kline_exporter/src/utils/config.rs
// @description: Layered configuration (defaults, optional config file, APP_* environment).
// @author: LAS.

use crate::connectors::retry::RetryPolicy;
use crate::core::error::{KlineError, Result};
use crate::core::models::MarketType;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

//
// TYPE DEFINITIONS
//

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: String,

    // Binance REST endpoints
    pub binance_spot_rest_url: String,
    pub binance_linear_future_rest_url: String,
    pub binance_inverse_future_rest_url: String,

    // Pagination
    pub page_limit: usize,
    pub pause_every_pages: usize,
    pub pause_millis: u64,

    // Networking
    pub request_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_backoff_millis: u64,
    pub retry_max_backoff_millis: u64,

    // Output
    pub output_root: String,

    // Prompt defaults
    pub default_interval: String,
    pub default_start_date: String,
    pub default_end_date: String,
}

impl AppConfig {
    //
    // PUBLIC INTERFACE
    //

    pub fn load() -> Result<Self> {
        Self::load_from(File::with_name("config").required(false))
    }

    pub fn load_from(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self> {
        let builder = Config::builder()
            .set_default("log_level", "info")?
            // Binance Endpoints
            .set_default("binance_spot_rest_url", "https://api.binance.com")?
            .set_default("binance_linear_future_rest_url", "https://fapi.binance.com")?
            .set_default("binance_inverse_future_rest_url", "https://dapi.binance.com")?
            // Pagination Defaults
            .set_default("page_limit", 500)?
            .set_default("pause_every_pages", 5)?
            .set_default("pause_millis", 250)?
            // Networking Defaults
            .set_default("request_timeout_secs", 10)?
            .set_default("retry_max_attempts", 3)?
            .set_default("retry_initial_backoff_millis", 200)?
            .set_default("retry_max_backoff_millis", 5000)?
            // Output & Prompts
            .set_default("output_root", "./Data")?
            .set_default("default_interval", "1h")?
            .set_default("default_start_date", "January 01, 2018")?
            .set_default("default_end_date", "January 01, 2020")?
            // File & Env Overrides
            .add_source(file)
            .add_source(Environment::with_prefix("APP"));

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn rest_base_url(&self, market: MarketType) -> &str {
        match market {
            MarketType::Spot => &self.binance_spot_rest_url,
            MarketType::LinearFuture => &self.binance_linear_future_rest_url,
            MarketType::InverseFuture => &self.binance_inverse_future_rest_url,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.retry_initial_backoff_millis),
            max_backoff: Duration::from_millis(self.retry_max_backoff_millis),
            multiplier: 2,
            max_retries: self.retry_max_attempts,
        }
    }

    /// `<output_root>/<SYMBOL>`
    pub fn output_dir(&self, symbol: &str) -> PathBuf {
        Path::new(&self.output_root).join(symbol.to_uppercase())
    }

    //
    // INTERNAL HELPERS
    //

    fn validate(&self) -> Result<()> {
        // #1. The same limit must be valid on every market
        let max_page_limit: usize = MarketType::Spot.max_page_limit();
        if self.page_limit == 0 || self.page_limit > max_page_limit {
            return Err(KlineError::Config(format!(
                "page_limit must be between 1 and {}, got {}",
                max_page_limit, self.page_limit
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(KlineError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::io::Write;

    fn missing_file() -> File<config::FileSourceFile, FileFormat> {
        File::with_name("definitely-not-a-config-file-for-tests").required(false)
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_from(missing_file()).unwrap();

        assert_eq!(config.page_limit, 500);
        assert_eq!(config.pause_every_pages, 5);
        assert_eq!(config.pause_millis, 250);
        assert_eq!(config.default_interval, "1h");
        assert_eq!(config.rest_base_url(MarketType::Spot), "https://api.binance.com");
        assert_eq!(
            config.rest_base_url(MarketType::InverseFuture),
            "https://dapi.binance.com"
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_policy().max_retries, 3);
        assert_eq!(config.output_dir("ethusdt"), Path::new("./Data").join("ETHUSDT"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "page_limit = 1000\noutput_root = \"/tmp/klines\"").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load_from(File::with_name(&path).format(FileFormat::Toml)).unwrap();

        assert_eq!(config.page_limit, 1000);
        assert_eq!(config.output_root, "/tmp/klines");
        assert_eq!(config.pause_every_pages, 5);
    }

    #[test]
    fn test_zero_page_limit_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "page_limit = 0").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let result = AppConfig::load_from(File::with_name(&path).format(FileFormat::Toml));

        assert!(matches!(result, Err(KlineError::Config(_))));
    }

    #[test]
    fn test_page_limit_above_endpoint_cap_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "page_limit = 1500").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let result = AppConfig::load_from(File::with_name(&path).format(FileFormat::Toml));

        match result {
            Err(KlineError::Config(message)) => assert!(message.contains("1500")),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
