//! Input validation for the engine boundary.
//!
//! Form-style checks are expressed as ordered predicate lists, run
//! first-match-wins, so rejection precedence is deterministic and testable.

use crate::domain::errors::{AccountError, TradeError};

/// Parse a raw share-count field into a whole share count >= 1.
///
/// Fractional ("3.5"), non-numeric, signed, zero and overflowing input is a
/// validation rejection, never silently floored or rounded.
pub fn parse_share_count(raw: &str) -> Result<i64, TradeError> {
    let trimmed = raw.trim();
    let reject = || TradeError::InvalidQuantity {
        input: raw.to_string(),
    };

    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(reject());
    }
    let shares: i64 = trimmed.parse().map_err(|_| reject())?;
    if shares < 1 {
        return Err(reject());
    }
    Ok(shares)
}

/// Normalize a raw symbol field: trimmed, uppercased, non-empty.
pub fn normalize_symbol(raw: &str) -> Result<String, TradeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TradeError::EmptySymbol);
    }
    Ok(trimmed.to_uppercase())
}

#[derive(Debug, Clone, Copy)]
pub struct RegistrationForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub confirmation: &'a str,
}

type RegistrationCheck = fn(&RegistrationForm<'_>) -> Option<AccountError>;

const REGISTRATION_CHECKS: &[RegistrationCheck] = &[
    |form| {
        form.username
            .trim()
            .is_empty()
            .then_some(AccountError::MissingField { field: "username" })
    },
    |form| {
        form.password
            .is_empty()
            .then_some(AccountError::MissingField { field: "password" })
    },
    |form| {
        form.confirmation
            .is_empty()
            .then_some(AccountError::MissingField {
                field: "confirmation",
            })
    },
    |form| (form.password != form.confirmation).then_some(AccountError::PasswordMismatch),
];

/// Run the registration checks in order; the first failing predicate wins.
/// Duplicate-username detection needs the store and stays in the engine.
pub fn validate_registration(form: &RegistrationForm<'_>) -> Result<(), AccountError> {
    for check in REGISTRATION_CHECKS {
        if let Some(rejection) = check(form) {
            return Err(rejection);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordChangeForm<'a> {
    pub current: &'a str,
    pub new: &'a str,
    pub confirmation: &'a str,
}

type PasswordChangeCheck = fn(&PasswordChangeForm<'_>) -> Option<AccountError>;

const PASSWORD_CHANGE_CHECKS: &[PasswordChangeCheck] = &[
    |form| {
        form.current
            .is_empty()
            .then_some(AccountError::MissingField { field: "password" })
    },
    |form| {
        form.new
            .is_empty()
            .then_some(AccountError::MissingField {
                field: "new password",
            })
    },
    |form| {
        form.confirmation
            .is_empty()
            .then_some(AccountError::MissingField {
                field: "confirmation",
            })
    },
];

/// Field-presence checks for a password change. Checks that need the stored
/// hash (current-password match, new != current, confirmation match) run in
/// the engine, in that order.
pub fn validate_password_change(form: &PasswordChangeForm<'_>) -> Result<(), AccountError> {
    for check in PASSWORD_CHANGE_CHECKS {
        if let Some(rejection) = check(form) {
            return Err(rejection);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::TradeError;

    #[test]
    fn whole_positive_quantities_accepted() {
        assert_eq!(parse_share_count("1").unwrap(), 1);
        assert_eq!(parse_share_count(" 42 ").unwrap(), 42);
        assert_eq!(parse_share_count("007").unwrap(), 7);
    }

    #[test]
    fn fractional_quantity_rejected() {
        let err = parse_share_count("3.5").unwrap_err();
        assert!(matches!(err, TradeError::InvalidQuantity { input } if input == "3.5"));
    }

    #[test]
    fn non_numeric_zero_and_negative_rejected() {
        for raw in ["", "  ", "abc", "0", "-2", "+3", "1e3", "9999999999999999999999"] {
            assert!(
                parse_share_count(raw).is_err(),
                "expected rejection for {:?}",
                raw
            );
        }
    }

    #[test]
    fn symbol_normalized_to_uppercase() {
        assert_eq!(normalize_symbol(" abc ").unwrap(), "ABC");
        assert!(matches!(
            normalize_symbol("   "),
            Err(TradeError::EmptySymbol)
        ));
    }

    #[test]
    fn registration_rejection_order_is_deterministic() {
        // Every field wrong: the username check must win.
        let form = RegistrationForm {
            username: "",
            password: "",
            confirmation: "different",
        };
        assert!(matches!(
            validate_registration(&form),
            Err(AccountError::MissingField { field: "username" })
        ));

        let form = RegistrationForm {
            username: "alice",
            password: "pw1",
            confirmation: "pw2",
        };
        assert!(matches!(
            validate_registration(&form),
            Err(AccountError::PasswordMismatch)
        ));
    }

    #[test]
    fn password_change_requires_all_fields() {
        let form = PasswordChangeForm {
            current: "old",
            new: "",
            confirmation: "",
        };
        assert!(matches!(
            validate_password_change(&form),
            Err(AccountError::MissingField {
                field: "new password"
            })
        ));
    }
}
