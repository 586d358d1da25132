use rust_decimal::Decimal;
use thiserror::Error;

/// Classification of a rejection, mirrored on every error enum below.
///
/// - `Validation`: malformed/missing input, user-correctable, not retryable as-is
/// - `BusinessRule`: valid input rejected by a ledger rule, recoverable by changing intent
/// - `ExternalLookup`: quote source unavailable (retryable) or symbol unknown (terminal)
/// - `Storage`: persistence/atomic-unit failure, fatal, surfaced untranslated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Validation,
    BusinessRule,
    ExternalLookup,
    Storage,
}

/// Errors from buy/sell operations.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("invalid share quantity {input:?}: must be a whole number >= 1")]
    InvalidQuantity { input: String },

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("insufficient funds: need ${need}, available ${available}")]
    InsufficientFunds { need: Decimal, available: Decimal },

    #[error("no open position in {symbol}")]
    NoPosition { symbol: String },

    #[error("insufficient shares of {symbol}: requested {requested}, held {held}")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        held: i64,
    },

    #[error("quote source unavailable: {0}")]
    QuoteUnavailable(#[from] QuoteError),

    #[error(transparent)]
    Storage(anyhow::Error),
}

impl TradeError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            TradeError::InvalidQuantity { .. } | TradeError::EmptySymbol => {
                RejectionKind::Validation
            }
            TradeError::InsufficientFunds { .. }
            | TradeError::NoPosition { .. }
            | TradeError::InsufficientShares { .. } => RejectionKind::BusinessRule,
            TradeError::UnknownSymbol { .. } | TradeError::QuoteUnavailable(_) => {
                RejectionKind::ExternalLookup
            }
            TradeError::Storage(_) => RejectionKind::Storage,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            TradeError::InvalidQuantity { .. } => "invalid_quantity",
            TradeError::EmptySymbol => "empty_symbol",
            TradeError::UnknownSymbol { .. } => "unknown_symbol",
            TradeError::InsufficientFunds { .. } => "insufficient_funds",
            TradeError::NoPosition { .. } => "no_position",
            TradeError::InsufficientShares { .. } => "insufficient_shares",
            TradeError::QuoteUnavailable(_) => "quote_unavailable",
            TradeError::Storage(_) => "storage_failure",
        }
    }

    /// True when retrying the identical request may succeed (transient quote outage).
    pub fn is_retryable(&self) -> bool {
        matches!(self, TradeError::QuoteUnavailable(q) if q.is_retryable())
    }
}

impl From<anyhow::Error> for TradeError {
    fn from(err: anyhow::Error) -> Self {
        TradeError::Storage(err)
    }
}

/// Errors from registration, authentication, password and cash-reload operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("missing field: {field}")]
    MissingField { field: &'static str },

    #[error("username already exists: {username}")]
    UsernameTaken { username: String },

    #[error("password and confirmation do not match")]
    PasswordMismatch,

    #[error("invalid username and/or password")]
    InvalidCredentials,

    #[error("new password must differ from the current one")]
    PasswordUnchanged,

    #[error("new password and confirmation do not match")]
    ConfirmationMismatch,

    #[error("reload amount must be positive, got {amount}")]
    InvalidAmount { amount: Decimal },

    #[error(transparent)]
    Storage(anyhow::Error),
}

impl AccountError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            AccountError::MissingField { .. }
            | AccountError::PasswordMismatch
            | AccountError::ConfirmationMismatch
            | AccountError::InvalidAmount { .. } => RejectionKind::Validation,
            AccountError::UsernameTaken { .. }
            | AccountError::InvalidCredentials
            | AccountError::PasswordUnchanged => RejectionKind::BusinessRule,
            AccountError::Storage(_) => RejectionKind::Storage,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            AccountError::MissingField { .. } => "missing_field",
            AccountError::UsernameTaken { .. } => "username_taken",
            AccountError::PasswordMismatch => "password_mismatch",
            AccountError::InvalidCredentials => "invalid_credentials",
            AccountError::PasswordUnchanged => "password_unchanged",
            AccountError::ConfirmationMismatch => "confirmation_mismatch",
            AccountError::InvalidAmount { .. } => "invalid_amount",
            AccountError::Storage(_) => "storage_failure",
        }
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        AccountError::Storage(err)
    }
}

/// Errors from the read-side views (portfolio, history, quote passthrough).
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("quote source unavailable: {0}")]
    QuoteUnavailable(#[from] QuoteError),

    #[error(transparent)]
    Storage(anyhow::Error),
}

impl ViewError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            ViewError::QuoteUnavailable(_) => RejectionKind::ExternalLookup,
            ViewError::Storage(_) => RejectionKind::Storage,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ViewError::QuoteUnavailable(q) if q.is_retryable())
    }
}

impl From<anyhow::Error> for ViewError {
    fn from(err: anyhow::Error) -> Self {
        ViewError::Storage(err)
    }
}

/// Transport-level failures from the quote source. An unknown symbol is not an
/// error at the port: `QuoteSource::lookup` returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("quote lookup timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("quote transport failure: {reason}")]
    Transport { reason: String },

    #[error("malformed quote payload for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },
}

impl QuoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, QuoteError::Timeout { .. } | QuoteError::Transport { .. })
    }
}
