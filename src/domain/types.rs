use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = i64;
pub type EntryId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Account row. `cash` is mutated only by the trade and account engines,
/// always together with (or, for off-ledger reloads, instead of) a ledger write.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub cash: Decimal,
    pub created_at: i64,
}

/// Immutable ledger record. Quantity is signed: positive = buy, negative = sell.
/// `total` carries the same sign as `quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
    pub total: Decimal,
    pub timestamp: i64,
}

impl LedgerEntry {
    pub fn side(&self) -> TradeSide {
        if self.quantity >= 0 {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        }
    }
}

/// A ledger record about to be appended (no id until the store assigns one).
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: UserId,
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
    pub total: Decimal,
    pub timestamp: i64,
}

impl NewLedgerEntry {
    /// Build a trade record from a quote. `shares` is the unsigned share count;
    /// the stored quantity and total are signed by `side`.
    pub fn from_trade(
        user_id: UserId,
        quote: &Quote,
        side: TradeSide,
        shares: i64,
        timestamp: i64,
    ) -> Self {
        let signed = match side {
            TradeSide::Buy => shares,
            TradeSide::Sell => -shares,
        };
        Self {
            user_id,
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            price: quote.price,
            quantity: signed,
            total: quote.price * Decimal::from(signed),
            timestamp,
        }
    }
}

/// Snapshot returned by the quote source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}

/// Result of a committed trade, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TradeReceipt {
    pub entry_id: EntryId,
    pub side: TradeSide,
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    pub price: Decimal,
    /// Cash moved by the trade, always positive.
    pub amount: Decimal,
    pub cash_after: Decimal,
}

/// Authenticated identity handed to the excluded session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
}

/// Format a money amount as `$1,234.50` (`-$12.00` for negatives).
pub fn usd(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).abs();
    let text = format!("{:.2}", rounded);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }

    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}${}.{}", sign, grouped, frac_part)
}
