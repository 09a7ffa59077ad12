// @file: kline_exporter/src/utils/mod.rs
// @description: Configuration loading.
// @author: LAS.

pub mod config;
