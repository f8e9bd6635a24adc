use chrono::NaiveDateTime;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Lifecycle of a payout request. Funds are reserved at request time, so
/// `Failed` is the only state that releases them back to the lecturer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
        }
    }

    /// Legal paths: pending -> processing -> completed | failed.
    pub fn can_transition(&self, to: WithdrawalStatus) -> bool {
        matches!(
            (self, to),
            (WithdrawalStatus::Pending, WithdrawalStatus::Processing)
                | (WithdrawalStatus::Processing, WithdrawalStatus::Completed)
                | (WithdrawalStatus::Processing, WithdrawalStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Completed | WithdrawalStatus::Failed)
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination account for a payout. Local account numbers are 10 digits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

impl BankDetails {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.bank_name.trim().is_empty() {
            return Err(LedgerError::MissingField("bank_name"));
        }
        if self.account_name.trim().is_empty() {
            return Err(LedgerError::MissingField("account_name"));
        }
        if !validate_account_number(&self.account_number) {
            return Err(LedgerError::InvalidBankAccount);
        }
        Ok(())
    }
}

fn validate_account_number(account_number: &str) -> bool {
    static RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\d{10}$").ok());
    match &*RE {
        Some(re) => re.is_match(account_number).unwrap_or(false),
        None => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub lecturer_id: String,
    pub amount: i64,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub status: WithdrawalStatus,
    pub reference: String,
    pub requested_at: Option<NaiveDateTime>,
    pub processed_at: Option<NaiveDateTime>,
}

impl Withdrawal {
    /// The reference is the request's idempotency key: callers that retry
    /// must pass their own, otherwise one is generated.
    pub fn new(
        lecturer_id: String,
        amount: i64,
        bank: BankDetails,
        reference: Option<String>,
    ) -> Self {
        Withdrawal {
            id: 0, // set by DB
            lecturer_id,
            amount,
            bank_name: bank.bank_name,
            account_number: bank.account_number,
            account_name: bank.account_name,
            status: WithdrawalStatus::Pending,
            reference: reference.unwrap_or_else(|| generate_reference("WD")),
            requested_at: None,
            processed_at: None,
        }
    }
}

/// Generates an idempotency reference like `WD-8F3A2C9B1D4E`.
pub fn generate_reference(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..12)
        .map(|_| {
            let digit = rng.random_range(0..16u8);
            std::char::from_digit(digit as u32, 16)
                .unwrap_or('0')
                .to_ascii_uppercase()
        })
        .collect();
    format!("{}-{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_number_must_be_ten_digits() {
        assert!(validate_account_number("0123456789"));
        assert!(!validate_account_number("123456789"));
        assert!(!validate_account_number("12345678901"));
        assert!(!validate_account_number("12345678ab"));
    }

    #[test]
    fn transition_table() {
        use WithdrawalStatus::*;
        assert!(Pending.can_transition(Processing));
        assert!(Processing.can_transition(Completed));
        assert!(Processing.can_transition(Failed));
        assert!(!Pending.can_transition(Completed));
        assert!(!Pending.can_transition(Failed));
        assert!(!Completed.can_transition(Failed));
        assert!(!Failed.can_transition(Pending));
    }
}
