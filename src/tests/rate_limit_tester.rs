// @file: kline_exporter/src/tests/rate_limit_tester.rs
// @description: Checks the courtesy pause cadence of the series fetcher.
// @author: LAS.

#[cfg(test)]
mod pause_cadence_tests {
    use crate::core::fetcher::{FetcherSettings, SeriesFetcher};
    use crate::tests::page_stub::GridSource;
    use std::time::Instant;
    use tokio::time::Duration;

    const HOUR: i64 = 3_600_000;
    const ORIGIN: i64 = 1_514_764_800_000;
    const PAGE: usize = 4;

    fn fetcher(candles: usize, pause_every_pages: usize, pause: Duration) -> SeriesFetcher<GridSource> {
        SeriesFetcher::with_settings(
            GridSource::contiguous(ORIGIN, HOUR, candles),
            FetcherSettings {
                page_limit: PAGE,
                pause_every_pages,
                pause,
            },
        )
    }

    #[tokio::test]
    async fn test_ten_pages_pause_twice() {
        // #1. Nine full pages and a short tenth
        let fetcher = fetcher(9 * PAGE + 2, 5, Duration::ZERO);

        let report = fetcher
            .fetch_series("BTCUSDT", "1h", ORIGIN, ORIGIN + 10_000 * HOUR)
            .await
            .unwrap();

        assert_eq!(report.pages, 10);
        assert_eq!(report.pauses, 2);
        assert_eq!(report.series.len(), 9 * PAGE + 2);
    }

    #[tokio::test]
    async fn test_four_pages_never_pause() {
        let fetcher = fetcher(3 * PAGE + 1, 5, Duration::ZERO);

        let report = fetcher
            .fetch_series("BTCUSDT", "1h", ORIGIN, ORIGIN + 10_000 * HOUR)
            .await
            .unwrap();

        assert_eq!(report.pages, 4);
        assert_eq!(report.pauses, 0);
    }

    #[tokio::test]
    async fn test_zero_cadence_disables_pausing() {
        let fetcher = fetcher(12 * PAGE + 1, 0, Duration::from_secs(60));

        let report = fetcher
            .fetch_series("BTCUSDT", "1h", ORIGIN, ORIGIN + 10_000 * HOUR)
            .await
            .unwrap();

        assert_eq!(report.pages, 13);
        assert_eq!(report.pauses, 0);
    }

    #[tokio::test]
    async fn test_pause_actually_waits() {
        let pause: Duration = Duration::from_millis(20);
        let fetcher = fetcher(5 * PAGE + 1, 5, pause);

        let started: Instant = Instant::now();
        let report = fetcher
            .fetch_series("BTCUSDT", "1h", ORIGIN, ORIGIN + 10_000 * HOUR)
            .await
            .unwrap();

        assert_eq!(report.pages, 6);
        assert_eq!(report.pauses, 1);
        assert!(started.elapsed() >= pause);
    }

    #[tokio::test]
    async fn test_final_pause_point_is_counted_but_not_slept() {
        // #1. Four full pages and a short fifth: the fifth ends the run
        let fetcher = fetcher(4 * PAGE + 1, 5, Duration::from_secs(60));

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            fetcher.fetch_series("BTCUSDT", "1h", ORIGIN, ORIGIN + 10_000 * HOUR),
        )
        .await
        .expect("run slept after its last page")
        .unwrap();

        assert_eq!(report.pages, 5);
        assert_eq!(report.pauses, 1);
    }
}
