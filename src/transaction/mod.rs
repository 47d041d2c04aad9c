pub mod builder;
pub mod error;
pub mod model;
pub mod token;
pub mod utxo;
pub mod validation;

pub use builder::{TransactionBuilder, Unlocker};
pub use error::{LedgerError, TxError};
pub use model::{Address, OutPoint, Transaction, TxInput, TxOutput, UnlockProof, Utxo};
pub use token::{Category, Token, TokenAmount};
pub use utxo::Ledger;
pub use validation::{submit, validate_transaction};
