use thiserror::Error;

use super::model::OutPoint;
use super::token::{Category, TokenAmount};

/// Raised by `Ledger::apply` when a committed transaction spends an output
/// the ledger does not hold. This means validation and state have diverged;
/// the operation must be aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger consistency: spent output {}:{} is not in the ledger", .0.txid, .0.vout)]
    Consistency(OutPoint),
}

/// Reasons a candidate transaction is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// Structural problem: missing output, wrong output count, missing token, bad encoding.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("amount mismatch at output {index}: expected {expected}, got {actual}")]
    AmountMismatch {
        index: usize,
        expected: TokenAmount,
        actual: TokenAmount,
    },

    #[error("category mismatch: expected {expected}, found {found}")]
    CategoryMismatch { expected: Category, found: Category },

    #[error("destination mismatch at output {index}")]
    DestinationMismatch { index: usize },

    #[error("invalid signature on input {index}: {reason}")]
    SignatureInvalid { index: usize, reason: String },

    /// Input is not currently spendable (already spent or never created).
    #[error("unknown input {}:{}", .0.txid, .0.vout)]
    UnknownInput(OutPoint),

    #[error("duplicate input {}:{}", .0.txid, .0.vout)]
    DuplicateInput(OutPoint),

    #[error("value imbalance: {0}")]
    ValueImbalance(String),

    #[error("arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl TxError {
    /// Everything except a ledger consistency failure can be fixed by
    /// rebuilding the transaction and resubmitting.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TxError::Ledger(_))
    }
}
