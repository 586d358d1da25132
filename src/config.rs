use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Where quotes come from: a fixed in-process price table or the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    Mock,
    Iex,
}

impl std::str::FromStr for QuoteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(QuoteMode::Mock),
            "iex" => Ok(QuoteMode::Iex),
            _ => anyhow::bail!("Invalid QUOTE_MODE: {}. Must be 'mock' or 'iex'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub starting_cash: Decimal,
    pub quote_mode: QuoteMode,
    pub quote_api_url: String,
    pub quote_api_key: String,
    pub quote_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://paperbroker.db".to_string());

        let starting_cash_str =
            env::var("STARTING_CASH").unwrap_or_else(|_| "10000.00".to_string());
        let starting_cash =
            Decimal::from_str(&starting_cash_str).context("Failed to parse STARTING_CASH")?;

        let quote_mode_str = env::var("QUOTE_MODE").unwrap_or_else(|_| "mock".to_string());
        let quote_mode = QuoteMode::from_str(&quote_mode_str)?;

        let quote_api_url =
            env::var("QUOTE_API_URL").unwrap_or_else(|_| "https://cloud.iexapis.com".to_string());
        let quote_api_key = env::var("QUOTE_API_KEY").unwrap_or_default();
        if quote_mode == QuoteMode::Iex && quote_api_key.is_empty() {
            anyhow::bail!("QUOTE_API_KEY must be set when QUOTE_MODE=iex");
        }

        let quote_timeout_ms = env::var("QUOTE_TIMEOUT_MS")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u64>()
            .context("Failed to parse QUOTE_TIMEOUT_MS")?;

        Ok(Self {
            database_url,
            starting_cash,
            quote_mode,
            quote_api_url,
            quote_api_key,
            quote_timeout_ms,
        })
    }
}
