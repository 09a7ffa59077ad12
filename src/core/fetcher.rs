// @file: kline_exporter/src/core/fetcher.rs
// @description: Pages through a capped kline endpoint and stitches the pages into one ordered series.
// @author: LAS.

use crate::core::dates::TimePoint;
use crate::core::error::{KlineError, Result};
use crate::core::interfaces::{PageRequest, PageSource};
use crate::core::interval::{parse_interval, Interval};
use crate::core::models::{Candle, FetchReport};
use crate::utils::config::AppConfig;
use futures_util::stream::{self, Stream, StreamExt};
use log::{debug, info, warn};
use tokio::time::{sleep, Duration};

//
// CONSTANTS
//

/// Largest page the klines endpoint serves without an explicit limit.
pub const DEFAULT_PAGE_LIMIT: usize = 500;
pub const DEFAULT_PAUSE_EVERY_PAGES: usize = 5;
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(250);


//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherSettings {
    pub page_limit: usize,
    /// Courtesy pause after every N-th page. Zero disables pausing.
    pub pause_every_pages: usize,
    pub pause: Duration,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            pause_every_pages: DEFAULT_PAUSE_EVERY_PAGES,
            pause: DEFAULT_PAUSE,
        }
    }
}

impl From<&AppConfig> for FetcherSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            page_limit: config.page_limit,
            pause_every_pages: config.pause_every_pages,
            pause: Duration::from_millis(config.pause_millis),
        }
    }
}

/// Pagination state carried between pages.
struct PageCursor {
    request: PageRequest,
    step_millis: i64,
    fetched: usize,
    done: bool,
}


//
// SERIES FETCHER
//

pub struct SeriesFetcher<S> {
    source: S,
    settings: FetcherSettings,
}

impl<S: PageSource> SeriesFetcher<S> {
    //
    // CONSTRUCTION
    //

    pub fn new(source: S) -> Self {
        Self::with_settings(source, FetcherSettings::default())
    }

    pub fn with_settings(source: S, settings: FetcherSettings) -> Self {
        Self { source, settings }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn settings(&self) -> &FetcherSettings {
        &self.settings
    }

    /// Rows requested per page: at least one, and never above the source's cap.
    pub fn page_limit(&self) -> usize {
        let limit: usize = self.settings.page_limit.max(1);
        match self.source.max_page_limit() {
            Some(cap) => limit.min(cap.max(1)),
            None => limit,
        }
    }

    //
    // PUBLIC INTERFACE
    //

    /// Lazily request consecutive pages. Ends after the first short page or
    /// after yielding an error. The courtesy pause is slept before the page
    /// following every `pause_every_pages`-th one, so a finished run never waits.
    pub fn pages<'a>(
        &'a self,
        symbol: &str,
        interval: &Interval,
        start: TimePoint,
        end: TimePoint,
    ) -> impl Stream<Item = Result<Vec<Candle>>> + Send + 'a
    where
        S: 'a,
    {
        let cursor: PageCursor = PageCursor {
            request: PageRequest {
                symbol: symbol.trim().to_uppercase(),
                interval: interval.code().to_string(),
                start_time: start,
                end_time: end,
                limit: self.page_limit(),
            },
            step_millis: interval.millis(),
            fetched: 0,
            done: false,
        };

        stream::unfold(cursor, move |mut cursor| async move {
            if cursor.done {
                return None;
            }

            // #1. Courtesy pause before continuing past every N-th page
            let every: usize = self.settings.pause_every_pages;
            if every > 0 && cursor.fetched > 0 && cursor.fetched % every == 0 {
                debug!("Pausing {:?} after page {}", self.settings.pause, cursor.fetched);
                sleep(self.settings.pause).await;
            }
            cursor.fetched += 1;

            let page: Vec<Candle> = match self.source.fetch_page(&cursor.request).await {
                Ok(page) => page,
                Err(err) => {
                    cursor.done = true;
                    return Some((Err(err), cursor));
                }
            };

            // #2. A short page means the endpoint has nothing more up to `end`
            if page.len() < cursor.request.limit {
                cursor.done = true;
            }

            // #3. Next page starts one step after the last candle received
            if let Some(last) = page.last() {
                match last.open_time.checked_add(cursor.step_millis) {
                    Some(next) if next > cursor.request.start_time => {
                        cursor.request.start_time = next;
                    }
                    _ => {
                        cursor.done = true;
                        let err = KlineError::MalformedResponse(format!(
                            "pagination cursor did not advance past {} (last open_time {})",
                            cursor.request.start_time, last.open_time
                        ));
                        return Some((Err(err), cursor));
                    }
                }
            }

            Some((Ok(page), cursor))
        })
    }

    /// Resolve `interval` and fetch every candle between `start` and `end`.
    pub async fn fetch_series(
        &self,
        symbol: &str,
        interval: &str,
        start: TimePoint,
        end: TimePoint,
    ) -> Result<FetchReport> {
        // #1. Caller errors surface before any network call
        let interval: Interval = parse_interval(interval)?;
        self.fetch_interval(symbol, &interval, start, end).await
    }

    pub async fn fetch_interval(
        &self,
        symbol: &str,
        interval: &Interval,
        start: TimePoint,
        end: TimePoint,
    ) -> Result<FetchReport> {
        info!(
            "Fetching {} {} klines from {} to {} via {}",
            symbol,
            interval,
            start,
            end,
            self.source.name()
        );

        if self.page_limit() != self.settings.page_limit {
            warn!(
                "page_limit {} adjusted to {} for {}",
                self.settings.page_limit,
                self.page_limit(),
                self.source.name()
            );
        }

        let mut pages = Box::pin(self.pages(symbol, interval, start, end));
        let mut report: FetchReport = FetchReport::default();

        // #2. Drain pages into one ordered buffer
        while let Some(page) = pages.next().await {
            let page: Vec<Candle> = page?;
            report.pages += 1;

            let received: usize = page.len();
            let kept: usize = report.series.extend_page(page);
            debug!(
                "Page {}: {} candles ({} kept), total {}",
                report.pages,
                received,
                kept,
                report.series.len()
            );

            // #3. Every N-th page is a pause point, the stream sleeps only if another page follows
            let every: usize = self.settings.pause_every_pages;
            if every > 0 && report.pages % every == 0 {
                report.pauses += 1;
            }
        }

        let gaps = report.series.gaps(interval.millis());
        if !gaps.is_empty() {
            warn!("{} gap(s) in {} {} series", gaps.len(), symbol, interval);
        }

        info!(
            "Fetched {} candles in {} page(s) ({} pause(s))",
            report.series.len(),
            report.pages,
            report.pauses
        );

        Ok(report)
    }
}
