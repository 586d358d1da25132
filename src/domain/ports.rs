use crate::domain::errors::QuoteError;
use crate::domain::types::Quote;
use async_trait::async_trait;

/// External price-lookup capability. Idempotent and side-effect-free from the
/// core's perspective; implementations must bound their own timeout.
///
/// `Ok(None)` means the symbol is unknown (terminal for the request);
/// `Err(_)` means the source itself failed (retryable for timeouts/transport).
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>, QuoteError>;
}

/// Password digest creation and verification. Kept behind a trait so engine
/// tests can swap in a plain fake instead of paying for Argon2.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> anyhow::Result<String>;
    fn verify(&self, password: &str, digest: &str) -> bool;
}
