//! Recurring-payout covenant over a simulated UTXO ledger.
//!
//! A [`covenant::PerpetuityContract`] locks a token balance that anyone may
//! release, but only by paying the beneficiary, the contract itself and the
//! executor exactly what the release rule dictates. The
//! [`transaction::Ledger`] holds outputs in memory and the
//! [`transaction::TransactionBuilder`] drives candidate transactions through
//! validation and commit.

pub mod api;
pub mod covenant;
pub mod transaction;
pub mod wallet;
