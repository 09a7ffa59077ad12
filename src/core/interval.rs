// @file: kline_exporter/src/core/interval.rs
// @description: Converts compact interval codes ("15m", "1h", "3d") into millisecond steps.
// @author: LAS.

use crate::core::error::{KlineError, Result};
use std::fmt;
use std::str::FromStr;

//
// CONSTANTS
//

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const SECONDS_PER_WEEK: i64 = 7 * 24 * 60 * 60;


//
// TYPE DEFINITIONS
//

/// Candle bucket width. Keeps the code it was parsed from so it can be sent
/// back to the endpoint verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    code: String,
    millis: i64,
}

impl Interval {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl FromStr for Interval {
    type Err = KlineError;

    fn from_str(s: &str) -> Result<Self> {
        parse_interval(s)
    }
}


//
// PUBLIC INTERFACE
//

pub fn parse_interval(code: &str) -> Result<Interval> {
    let fail = || KlineError::UnparseableInterval(code.to_string());

    // #1. Split trailing unit from numeric prefix
    let unit: char = code.chars().last().ok_or_else(fail)?;
    let prefix: &str = &code[..code.len() - unit.len_utf8()];

    let seconds_per_unit: i64 = match unit {
        'm' => SECONDS_PER_MINUTE,
        'h' => SECONDS_PER_HOUR,
        'd' => SECONDS_PER_DAY,
        'w' => SECONDS_PER_WEEK,
        _ => return Err(fail()),
    };

    // #2. Prefix must be a plain positive integer (no sign, no decimals)
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail());
    }
    let count: i64 = prefix.parse().map_err(|_| fail())?;
    if count == 0 {
        return Err(fail());
    }

    // #3. Scale to milliseconds, rejecting values that would overflow
    let millis: i64 = count
        .checked_mul(seconds_per_unit)
        .and_then(|s| s.checked_mul(1000))
        .ok_or_else(fail)?;

    Ok(Interval {
        code: code.to_string(),
        millis,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(parse_interval("1h").unwrap().millis(), 3_600_000);
        assert_eq!(parse_interval("3d").unwrap().millis(), 259_200_000);
        assert_eq!(parse_interval("15m").unwrap().millis(), 900_000);
        assert_eq!(parse_interval("1w").unwrap().millis(), 604_800_000);
        assert_eq!(parse_interval("12h").unwrap().millis(), 43_200_000);
    }

    #[test]
    fn test_code_is_preserved() {
        let interval: Interval = "4h".parse().unwrap();
        assert_eq!(interval.code(), "4h");
        assert_eq!(interval.to_string(), "4h");
    }

    #[test]
    fn test_rejects_unparseable_codes() {
        for code in ["bogus", "", "h", "1x", "1.5h", "-1h", "0m", "1M", "one h", "1hh"] {
            assert_eq!(
                parse_interval(code),
                Err(KlineError::UnparseableInterval(code.to_string())),
                "expected failure for {:?}",
                code
            );
        }
    }

    #[test]
    fn test_rejects_overflowing_prefix() {
        assert!(parse_interval("99999999999999999w").is_err());
    }

    #[test]
    fn test_non_ascii_unit_does_not_panic() {
        assert!(parse_interval("1é").is_err());
    }
}
