// @file: kline_exporter/src/core/interfaces.rs
// @description: The seam between the pagination loop and whatever serves kline pages.
// @author: LAS.

use crate::core::dates::TimePoint;
use crate::core::error::Result;
use crate::core::models::Candle;
use async_trait::async_trait;

//
// TYPE DEFINITIONS
//

/// One page worth of query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub symbol: String,
    pub interval: String,
    pub start_time: TimePoint,
    pub end_time: TimePoint,
    pub limit: usize,
}


//
// TRAIT DEFINITIONS
//

#[async_trait]
pub trait PageSource: Send + Sync {
    // #1. Fetch a single page, oldest candle first
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Candle>>;

    // #2. Identifier used in log lines
    fn name(&self) -> &str {
        "page-source"
    }

    // #3. Server-side cap on rows per page, when the source has one
    fn max_page_limit(&self) -> Option<usize> {
        None
    }
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for std::sync::Arc<S> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Candle>> {
        (**self).fetch_page(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn max_page_limit(&self) -> Option<usize> {
        (**self).max_page_limit()
    }
}
