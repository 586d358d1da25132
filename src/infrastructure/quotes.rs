//! HTTP quote client against an IEX-style quote API.
//!
//! `GET {base}/stable/stock/{symbol}/quote?token=KEY` returning
//! `{"symbol": ..., "companyName": ..., "latestPrice": ...}`; 404 means the
//! symbol is unknown. Every request carries the configured timeout, so a
//! stuck upstream surfaces as a retryable `QuoteError::Timeout`.

use crate::domain::errors::QuoteError;
use crate::domain::ports::QuoteSource;
use crate::domain::types::Quote;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use std::time::Duration;

pub struct HttpQuoteSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteDto {
    symbol: String,
    company_name: String,
    latest_price: f64,
}

impl HttpQuoteSource {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build quote HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        let url = format!("{}/stable/stock/{}/quote", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QuoteError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    QuoteError::Transport {
                        reason: e.to_string(),
                    }
                }
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(QuoteError::Transport {
                    reason: format!("quote API returned status {}", status),
                });
            }
            _ => {}
        }

        let dto: QuoteDto = response.json().await.map_err(|e| QuoteError::Malformed {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;

        let price = Decimal::from_f64(dto.latest_price)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| QuoteError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("unusable price {}", dto.latest_price),
            })?;

        Ok(Some(Quote {
            symbol: dto.symbol.to_uppercase(),
            name: dto.company_name,
            price: price.round_dp(4),
        }))
    }
}
