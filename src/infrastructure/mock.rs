//! Test doubles for the external collaborators.

use crate::domain::errors::QuoteError;
use crate::domain::ports::{CredentialHasher, QuoteSource};
use crate::domain::types::Quote;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Quote source backed by a fixed price table, with one-shot failure
/// injection for outage paths.
#[derive(Default)]
pub struct MockQuoteSource {
    quotes: RwLock<HashMap<String, Quote>>,
    fail_next: RwLock<bool>,
}

impl MockQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        let symbol = symbol.to_uppercase();
        self.quotes.write().await.insert(
            symbol.clone(),
            Quote {
                name: format!("{} Inc.", symbol),
                symbol,
                price,
            },
        );
    }

    /// Drop a symbol from the table, simulating a delisting.
    pub async fn remove(&self, symbol: &str) {
        self.quotes.write().await.remove(&symbol.to_uppercase());
    }

    /// Make the next lookup fail with a transport error.
    pub async fn fail_next(&self) {
        *self.fail_next.write().await = true;
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        let mut fail = self.fail_next.write().await;
        if *fail {
            *fail = false;
            return Err(QuoteError::Transport {
                reason: "injected outage".to_string(),
            });
        }
        drop(fail);

        Ok(self.quotes.read().await.get(&symbol.to_uppercase()).cloned())
    }
}

/// Reversible stand-in for the Argon2 hasher so engine tests stay fast.
pub struct PlainCredentialHasher;

impl CredentialHasher for PlainCredentialHasher {
    fn hash(&self, password: &str) -> anyhow::Result<String> {
        Ok(format!("plain${}", password))
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        digest
            .strip_prefix("plain$")
            .is_some_and(|stored| stored == password)
    }
}
