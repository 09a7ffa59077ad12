// @file: kline_exporter/src/connectors/mod.rs
// @description: Remote kline endpoints and the retry policy they share.
// @author: LAS.

pub mod binance_rest;
pub mod retry;
