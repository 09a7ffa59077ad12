// @file: kline_exporter/src/tests/mod.rs
// @description: Scenario suites driving the fetcher against in-memory page sources.
// @author: LAS.

pub mod rate_limit_tester;
