// @file: kline_exporter/src/app.rs
// @description: One fetch-and-export run: validate inputs, page through the endpoint, write outputs.
// @author: LAS.

use crate::cli::RunRequest;
use crate::connectors::binance_rest::BinanceRestClient;
use crate::core::dates::{parse_utc_millis, TimePoint};
use crate::core::error::Result;
use crate::core::fetcher::{FetcherSettings, SeriesFetcher};
use crate::core::interval::{parse_interval, Interval};
use crate::core::models::FetchReport;
use crate::output::{chart, tsv};
use crate::utils::config::AppConfig;
use log::info;
use std::path::PathBuf;

//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: FetchReport,
    pub export_path: PathBuf,
    pub chart_path: Option<PathBuf>,
}


//
// PUBLIC INTERFACE
//

pub async fn run(request: &RunRequest, config: &AppConfig) -> Result<RunOutcome> {
    // #1. Caller errors surface before any network call
    let interval: Interval = parse_interval(&request.interval)?;
    let start: TimePoint = parse_utc_millis(&request.start)?;
    let end: TimePoint = parse_utc_millis(&request.end)?;

    // #2. Fetch
    let client: BinanceRestClient = BinanceRestClient::from_config(config, request.market)?;
    let fetcher = SeriesFetcher::with_settings(client, FetcherSettings::from(config));
    let report: FetchReport = fetcher
        .fetch_interval(&request.pair, &interval, start, end)
        .await?;

    // #3. Export next to each other under <output_root>/<PAIR>
    let dir: PathBuf = config.output_dir(&request.pair);
    let export_path: PathBuf = dir.join(format!("{}.csv", request.filename));
    tsv::write_series(&export_path, &report.series)?;

    let chart_path: Option<PathBuf> = if request.chart {
        let path: PathBuf = dir.join(format!("{}.svg", request.filename));
        let x_label: String = format!("Time: {}", interval);
        chart::write_chart(&path, &report.series, &request.pair, &x_label)?;
        Some(path)
    } else {
        None
    };

    info!(
        "Exported {} {} candles for {}",
        report.series.len(),
        interval,
        request.pair
    );

    Ok(RunOutcome {
        report,
        export_path,
        chart_path,
    })
}
