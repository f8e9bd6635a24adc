use thiserror::Error;

/// Errors the ledger can surface to callers. Validation kinds are rejected
/// before anything is persisted; `Conflict` is returned only after the
/// bounded optimistic-retry loop has been exhausted.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("withdrawal amount {amount} is below the minimum of {minimum}")]
    BelowMinimumWithdrawal { amount: i64, minimum: i64 },

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("bank account number must be exactly 10 digits")]
    InvalidBankAccount,

    #[error("unknown or inactive affiliate code: {0}")]
    UnknownAffiliateCode(String),

    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("concurrent update conflict, retry the operation")]
    Conflict,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    /// True for errors caused by the caller's input rather than by the
    /// service or a concurrent writer.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::NonPositiveAmount(_)
                | LedgerError::MissingField(_)
                | LedgerError::BelowMinimumWithdrawal { .. }
                | LedgerError::InsufficientBalance { .. }
                | LedgerError::InvalidBankAccount
                | LedgerError::UnknownAffiliateCode(_)
                | LedgerError::IllegalTransition { .. }
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
