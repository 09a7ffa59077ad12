// @file: kline_exporter/src/cli.rs
// @description: Command line arguments with interactive prompts for anything left out.
// @author: LAS.

use crate::core::models::MarketType;
use crate::utils::config::AppConfig;
use clap::Parser;
use std::io::{self, BufRead, Write};

//
// ARGUMENTS
//

#[derive(Debug, Parser)]
#[command(author, version, about = "Download historical klines to a tab-separated file", long_about = None)]
pub struct Args {
    /// Trading pair, e.g. ETHUSDT
    #[arg(short, long)]
    pub pair: Option<String>,

    /// Interval code: 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d, 3d, 1w
    #[arg(short, long)]
    pub interval: Option<String>,

    /// Start date, e.g. "January 01, 2018" or "11 hours ago UTC"
    #[arg(short, long)]
    pub start: Option<String>,

    /// End date
    #[arg(short, long)]
    pub end: Option<String>,

    /// Output file name without extension
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Market: spot, linear-future or inverse-future
    #[arg(short, long, default_value = "spot")]
    pub market: MarketType,

    /// Skip writing the close-price chart
    #[arg(long)]
    pub no_chart: bool,
}

/// Fully resolved run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub pair: String,
    pub interval: String,
    pub start: String,
    pub end: String,
    pub filename: String,
    pub market: MarketType,
    pub chart: bool,
}


//
// PUBLIC INTERFACE
//

impl Args {
    /// Fill missing values from `input`, falling back to config defaults on
    /// empty answers. Pair and filename are asked until non-empty.
    pub fn resolve<R: BufRead, W: Write>(
        self,
        config: &AppConfig,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<RunRequest> {
        let pair: String = match self.pair {
            Some(p) => p,
            None => prompt_required(input, output, "Trading Pair: ")?,
        };
        let interval: String = match self.interval {
            Some(i) => i,
            None => prompt_or(input, output, "Interval: ", &config.default_interval)?,
        };
        let start: String = match self.start {
            Some(s) => s,
            None => prompt_or(input, output, "Start Date: ", &config.default_start_date)?,
        };
        let end: String = match self.end {
            Some(e) => e,
            None => prompt_or(input, output, "End Date: ", &config.default_end_date)?,
        };
        let filename: String = match self.filename {
            Some(f) => f,
            None => prompt_required(input, output, "Filename: ")?,
        };

        Ok(RunRequest {
            pair: pair.trim().to_uppercase(),
            interval: interval.trim().to_lowercase(),
            start: start.trim().to_string(),
            end: end.trim().to_string(),
            filename: filename.trim().to_string(),
            market: self.market,
            chart: !self.no_chart,
        })
    }
}


//
// INTERNAL HELPERS
//

fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> io::Result<String> {
    write!(output, "{}", label)?;
    output.flush()?;

    let mut line: String = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line.trim().to_string())
}

fn prompt_or<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: &str,
) -> io::Result<String> {
    let answer: String = read_answer(input, output, label)?;
    Ok(if answer.is_empty() { default.to_string() } else { answer })
}

fn prompt_required<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> io::Result<String> {
    loop {
        let answer: String = read_answer(input, output, label)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use config::File;
    use std::io::Cursor;

    fn config() -> AppConfig {
        AppConfig::load_from(File::with_name("definitely-not-a-config-file-for-tests").required(false))
            .unwrap()
    }

    #[test]
    fn test_flags_skip_prompts() {
        let args = Args::parse_from([
            "kline_exporter",
            "--pair",
            "ethusdt",
            "--interval",
            "1H",
            "--start",
            "January 01, 2018",
            "--end",
            "now UTC",
            "--filename",
            "eth",
            "--market",
            "linear-future",
            "--no-chart",
        ]);

        let mut input = Cursor::new(Vec::<u8>::new());
        let mut output: Vec<u8> = Vec::new();
        let request = args.resolve(&config(), &mut input, &mut output).unwrap();

        assert!(output.is_empty());
        assert_eq!(
            request,
            RunRequest {
                pair: "ETHUSDT".to_string(),
                interval: "1h".to_string(),
                start: "January 01, 2018".to_string(),
                end: "now UTC".to_string(),
                filename: "eth".to_string(),
                market: MarketType::LinearFuture,
                chart: false,
            }
        );
    }

    #[test]
    fn test_prompts_fill_missing_values() {
        let args = Args::parse_from(["kline_exporter"]);
        // Empty pair is re-asked, empty interval/dates take config defaults
        let mut input = Cursor::new(b"\nbtcusdt\n\n\n01/06/19\nbtc\n".to_vec());
        let mut output: Vec<u8> = Vec::new();

        let request = args.resolve(&config(), &mut input, &mut output).unwrap();
        let shown = String::from_utf8(output).unwrap();

        assert_eq!(shown.matches("Trading Pair: ").count(), 2);
        assert!(shown.contains("Filename: "));
        assert_eq!(request.pair, "BTCUSDT");
        assert_eq!(request.interval, "1h");
        assert_eq!(request.start, "January 01, 2018");
        assert_eq!(request.end, "01/06/19");
        assert_eq!(request.filename, "btc");
        assert_eq!(request.market, MarketType::Spot);
        assert!(request.chart);
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let args = Args::parse_from(["kline_exporter"]);
        let mut input = Cursor::new(Vec::<u8>::new());
        let mut output: Vec<u8> = Vec::new();

        let err = args.resolve(&config(), &mut input, &mut output).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_unknown_market_is_rejected() {
        assert!(Args::try_parse_from(["kline_exporter", "--market", "options"]).is_err());
    }
}
