// @file: kline_exporter/src/output/tsv.rs
// @description: Tab-separated export of a candle series, indexed by close time.
// @author: LAS.

use crate::core::error::{KlineError, Result};
use crate::core::models::{Candle, Series};
use chrono::DateTime;
use csv::{Writer, WriterBuilder};
use log::info;
use std::fs;
use std::io::Write;
use std::path::Path;

//
// CONSTANTS
//

pub const INDEX_COLUMN: &str = "timestamp";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";


//
// PUBLIC INTERFACE
//

/// Write `series` to `path`, creating parent directories as needed.
pub fn write_series(path: &Path, series: &Series) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = fs::File::create(path)?;
    write_series_to(file, series)?;

    info!("Wrote {} rows to {}", series.len(), path.display());
    Ok(())
}

pub fn write_series_to<W: Write>(sink: W, series: &Series) -> Result<()> {
    let mut writer: Writer<W> = WriterBuilder::new().delimiter(b'\t').from_writer(sink);

    // #1. Header: index column then the candle fields
    let mut header: Vec<&str> = Vec::with_capacity(Candle::FIELD_NAMES.len() + 1);
    header.push(INDEX_COLUMN);
    header.extend_from_slice(&Candle::FIELD_NAMES);
    writer.write_record(&header)?;

    // #2. One row per candle
    for candle in series {
        writer.write_record(candle_record(candle)?)?;
    }

    writer.flush()?;
    Ok(())
}

/// Human-readable UTC rendering of an epoch-millisecond timestamp.
pub fn format_index(millis: i64) -> Result<String> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .ok_or_else(|| KlineError::Export(format!("timestamp out of range: {}", millis)))
}


//
// INTERNAL HELPERS
//

fn candle_record(candle: &Candle) -> Result<[String; 12]> {
    Ok([
        format_index(candle.close_time)?,
        candle.open_time.to_string(),
        candle.open.to_string(),
        candle.high.to_string(),
        candle.low.to_string(),
        candle.close.to_string(),
        candle.volume.to_string(),
        candle.close_time.to_string(),
        candle.quote_asset_volume.to_string(),
        candle.number_of_trades.to_string(),
        candle.taker_buy_base_volume.to_string(),
        candle.taker_buy_quote_volume.to_string(),
    ])
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::candle_at;

    #[test]
    fn test_header_and_rows() {
        let series = Series::from(vec![
            candle_at(1_514_764_800_000, 3_600_000, 100.0),
            candle_at(1_514_768_400_000, 3_600_000, 101.5),
        ]);

        let mut buffer: Vec<u8> = Vec::new();
        write_series_to(&mut buffer, &series).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp\topen_time\topen\thigh\tlow\tclose\tvolume\tclose_time\tquote_asset_volume\tnumber_of_trades\ttaker_buy_base_volume\ttaker_buy_quote_volume"
        );

        let first: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(first.len(), 12);
        assert_eq!(first[0], "2018-01-01 00:59:59.999");
        assert_eq!(first[1], "1514764800000");
        assert_eq!(first[5], "100");
        assert_eq!(first[9], "42");

        let second: Vec<&str> = lines[2].split('\t').collect();
        assert_eq!(second[5], "101.5");
    }

    #[test]
    fn test_empty_series_writes_header_only() {
        let mut buffer: Vec<u8> = Vec::new();
        write_series_to(&mut buffer, &Series::new()).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_write_series_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Data").join("ETHUSDT").join("eth.csv");
        let series = Series::from(vec![candle_at(0, 60_000, 1.0)]);

        write_series(&path, &series).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("timestamp\t"));
        assert!(text.contains("1970-01-01 00:00:59.999"));
    }
}
