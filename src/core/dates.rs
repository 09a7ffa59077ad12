// @file: kline_exporter/src/core/dates.rs
// @description: Normalizes free-form date expressions into UTC epoch milliseconds.
// @author: LAS.

use crate::core::error::{KlineError, Result};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, SecondsFormat,
    TimeZone, Utc,
};

//
// TYPE DEFINITIONS
//

/// Absolute instant as milliseconds since 1970-01-01T00:00:00 UTC.
pub type TimePoint = i64;

/// Result of a raw parse, before UTC normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl ParsedDate {
    pub fn to_utc(self) -> DateTime<Utc> {
        match self {
            ParsedDate::Aware(dt) => dt.with_timezone(&Utc),
            // No offset means the expression already meant UTC
            ParsedDate::Naive(naive) => Utc.from_utc_datetime(&naive),
        }
    }
}

/// Narrow seam over whatever understands human date expressions.
pub trait DateParser: Send + Sync {
    fn parse(&self, text: &str) -> Option<ParsedDate>;
}


//
// CONSTANTS
//

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M",
    "%B %d, %Y %H:%M",
];

// Slash dates are day-first only ("01/02/19" is 1 February 2019), following the
// "DD/MM/YY" prompt; month-first readings are never attempted. They must come
// before "%Y/%m/%d", which accepts a one or two digit year.
const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%d.%m.%Y",
];

const TIMEZONE_SUFFIXES: &[&str] = &["utc", "gmt", "z"];
const ORDINAL_SUFFIXES: &[&str] = &["st", "nd", "rd", "th"];

/// Calendar-format matches before this year are misreads ("Dec 2019" as day 20, year 19).
const MIN_CALENDAR_YEAR: i32 = 1000;


//
// NATURAL LANGUAGE PARSER
//

/// Default [`DateParser`]: absolute calendar formats, RFC 3339, epoch
/// milliseconds and simple relative phrases ("now", "11 hours ago").
#[derive(Debug, Clone, Default)]
pub struct NaturalDateParser {
    now: Option<DateTime<Utc>>,
}

impl NaturalDateParser {
    pub fn new() -> Self {
        Self { now: None }
    }

    /// Pin the reference instant used for relative expressions.
    pub fn with_now(now: DateTime<Utc>) -> Self {
        Self { now: Some(now) }
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    fn parse_relative(&self, lower: &str) -> Option<DateTime<Utc>> {
        let now: DateTime<Utc> = self.now();

        match lower {
            "now" | "today" => return Some(now),
            "yesterday" => return shift(now, 1, "day", false),
            "tomorrow" => return shift(now, 1, "day", true),
            _ => {}
        }

        let tokens: Vec<&str> = lower.split_whitespace().collect();
        match tokens.as_slice() {
            // #1. "<count> <unit>[s] ago" / "<count> <unit>[s] from now"
            [count, unit, "ago"] => shift(now, parse_count(count)?, unit, false),
            [count, unit, "from", "now"] => shift(now, parse_count(count)?, unit, true),
            // #2. "in <count> <unit>[s]"
            ["in", count, unit] => shift(now, parse_count(count)?, unit, true),
            // #3. "last <unit>" / "next <unit>"
            ["last", unit] => shift(now, 1, unit, false),
            ["next", unit] => shift(now, 1, unit, true),
            _ => None,
        }
    }
}

impl DateParser for NaturalDateParser {
    fn parse(&self, text: &str) -> Option<ParsedDate> {
        let trimmed: &str = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        // #1. Offset-carrying forms are tried on the untouched text
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(ParsedDate::Aware(dt));
        }
        for fmt in AWARE_FORMATS {
            if let Some(dt) = DateTime::parse_from_str(trimmed, fmt)
                .ok()
                .filter(|dt| dt.year() >= MIN_CALENDAR_YEAR)
            {
                return Some(ParsedDate::Aware(dt));
            }
        }

        // #2. Drop a trailing timezone token ("now UTC", "January 01, 2018 UTC")
        let body: &str = strip_timezone_suffix(trimmed);
        let lower: String = body.to_lowercase();

        if let Some(dt) = self.parse_relative(&lower) {
            return Some(ParsedDate::Aware(dt.fixed_offset()));
        }

        // #3. Bare digits: four is a year, ten is epoch seconds, eleven or more epoch millis
        if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
            return match body.len() {
                4 => NaiveDate::from_ymd_opt(body.parse().ok()?, 1, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(ParsedDate::Naive),
                10 => DateTime::from_timestamp(body.parse().ok()?, 0)
                    .map(|dt| ParsedDate::Aware(dt.fixed_offset())),
                len if len >= 11 => DateTime::from_timestamp_millis(body.parse().ok()?)
                    .map(|dt| ParsedDate::Aware(dt.fixed_offset())),
                _ => None,
            };
        }

        // #4. "1st", "22nd" and friends lose their suffix
        let cleaned: String = strip_ordinals(body);

        // #5. "January 2018" means the first of that month
        if let Some(naive) = parse_month_year(&cleaned) {
            return Some(ParsedDate::Naive(naive));
        }

        // #6. Calendar formats without an offset
        for fmt in NAIVE_DATETIME_FORMATS {
            if let Some(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt)
                .ok()
                .filter(is_plausible)
            {
                return Some(ParsedDate::Naive(naive));
            }
        }
        for fmt in NAIVE_DATE_FORMATS {
            if let Some(naive) = NaiveDate::parse_from_str(&cleaned, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .filter(is_plausible)
            {
                return Some(ParsedDate::Naive(naive));
            }
        }

        None
    }
}


//
// PUBLIC INTERFACE
//

/// Parse `text` with the default [`NaturalDateParser`].
pub fn parse_utc_millis(text: &str) -> Result<TimePoint> {
    parse_utc_millis_with(&NaturalDateParser::new(), text)
}

pub fn parse_utc_millis_with(parser: &dyn DateParser, text: &str) -> Result<TimePoint> {
    parser
        .parse(text)
        .map(|parsed| parsed.to_utc().timestamp_millis())
        .ok_or_else(|| KlineError::UnparseableDate(text.to_string()))
}

/// Canonical text form of a [`TimePoint`], e.g. `2018-01-01T00:00:00.000Z`.
pub fn format_utc_millis(millis: TimePoint) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}


//
// INTERNAL HELPERS
//

fn parse_count(token: &str) -> Option<u32> {
    match token {
        "a" | "an" | "one" => Some(1),
        digits => digits.parse().ok(),
    }
}

/// Move `now` by `count` units, forwards or backwards. Months and years use
/// calendar arithmetic, everything else a fixed span.
fn shift(now: DateTime<Utc>, count: u32, unit: &str, forward: bool) -> Option<DateTime<Utc>> {
    let unit: &str = unit.strip_suffix('s').unwrap_or(unit);

    let span: Duration = match unit {
        "sec" | "second" => Duration::seconds(count.into()),
        "min" | "minute" => Duration::minutes(count.into()),
        "hour" => Duration::hours(count.into()),
        "day" => Duration::days(count.into()),
        "week" => Duration::weeks(count.into()),
        "month" | "year" => {
            let months: u32 = if unit == "year" { count.checked_mul(12)? } else { count };
            return if forward {
                now.checked_add_months(Months::new(months))
            } else {
                now.checked_sub_months(Months::new(months))
            };
        }
        _ => return None,
    };

    if forward {
        now.checked_add_signed(span)
    } else {
        now.checked_sub_signed(span)
    }
}

fn strip_ordinals(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out: String = String::with_capacity(text.len());
    let mut i: usize = 0;

    while i < chars.len() {
        out.push(chars[i]);
        if chars[i].is_ascii_digit() {
            if let (Some(a), Some(b)) = (chars.get(i + 1), chars.get(i + 2)) {
                let suffix: String = [*a, *b].iter().collect::<String>().to_lowercase();
                let at_boundary: bool = chars.get(i + 3).map_or(true, |c| !c.is_alphanumeric());
                if at_boundary && ORDINAL_SUFFIXES.contains(&suffix.as_str()) {
                    i += 3;
                    continue;
                }
            }
        }
        i += 1;
    }

    out
}

fn parse_month_year(text: &str) -> Option<NaiveDateTime> {
    let spaced: String = text.replace(',', " ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    let [month, year] = tokens.as_slice() else {
        return None;
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDate::parse_from_str(&format!("1 {} {}", month, year), "%d %B %Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

fn is_plausible(naive: &NaiveDateTime) -> bool {
    naive.year() >= MIN_CALENDAR_YEAR
}

fn strip_timezone_suffix(text: &str) -> &str {
    match text.rsplit_once(char::is_whitespace) {
        Some((head, tail)) if TIMEZONE_SUFFIXES.contains(&tail.to_lowercase().as_str()) => {
            head.trim_end()
        }
        None if TIMEZONE_SUFFIXES.contains(&text.to_lowercase().as_str()) => "",
        _ => text,
    }
}
