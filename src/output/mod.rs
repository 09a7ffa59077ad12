// @file: kline_exporter/src/output/mod.rs
// @description: File outputs derived from a fetched series.
// @author: LAS.

pub mod chart;
pub mod tsv;
