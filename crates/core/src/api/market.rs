use async_trait::async_trait;
use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::errors::CoreError;
use crate::models::market::{DividendSeries, HistoricalSeries, Quote, TickerRequest};
use crate::providers::traits::MarketDataProvider;

/// Market data served by the backend's `/market` routes.
///
/// These routes are public, so no token is sent and no refresh is attempted.
pub struct MarketApi {
    client: Arc<ApiClient>,
}

impl MarketApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    fn request(tickers: &[String]) -> TickerRequest {
        TickerRequest {
            tickers: tickers.to_vec(),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for MarketApi {
    fn name(&self) -> &str {
        "Portfolio API"
    }

    async fn get_quote(&self, ticker: &str) -> Result<Quote, CoreError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(CoreError::Validation("Ticker cannot be empty".into()));
        }
        self.client
            .get_public_segment("/market/quote", ticker)
            .await
    }

    async fn get_quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, CoreError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .post_public("/market/quotes", &Self::request(tickers))
            .await
    }

    async fn get_historical(&self, tickers: &[String]) -> Result<Vec<HistoricalSeries>, CoreError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .post_public("/market/historical", &Self::request(tickers))
            .await
    }

    async fn get_dividends(&self, tickers: &[String]) -> Result<Vec<DividendSeries>, CoreError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .post_public("/market/dividends", &Self::request(tickers))
            .await
    }
}
