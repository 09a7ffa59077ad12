// @file: kline_exporter/src/core/mod.rs
// @description: Exports domain logic and data structures.
// @author: LAS.

pub mod dates;
pub mod error;
pub mod fetcher;
pub mod interfaces;
pub mod interval;
pub mod models;
