use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::error::TxError;
use super::token::{Category, Token, TokenAmount};
use crate::covenant::PerpetuityContract;

/// Opaque destination identifier. The ledger only compares addresses for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifies a specific transaction output by its txid and index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: String,
    pub vout: u32,
}

/// An unspent output as held by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub owner: Address,
    /// Base-currency value.
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub to: Address,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
}

impl TxOutput {
    pub fn new(to: Address, amount: u64) -> Self {
        Self {
            to,
            amount,
            token: None,
        }
    }

    pub fn with_token(to: Address, amount: u64, token: Token) -> Self {
        Self {
            to,
            amount,
            token: Some(token),
        }
    }
}

/// How an input proves it may be spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockProof {
    /// Plain ownership spend. `pubkey` is hex (compressed secp256k1),
    /// `signature` is hex DER ECDSA over the transaction sighash.
    Signature { pubkey: String, signature: String },
    /// Covenant spend. Carries the contract parameters so the locking
    /// address can be re-derived; no signature is involved.
    Release { contract: PerpetuityContract },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub utxo: Utxo,
    pub proof: UnlockProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// A stable identifier computed from content.
    pub txid: String,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Build a transaction and compute its txid deterministically from its content.
    /// TXID includes unlock proofs; SIGHASH (used for signing) excludes them.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let payload = serde_json::json!({
            "inputs": inputs,
            "outputs": outputs,
        });
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&payload).expect("json serialize"));
        let txid = hex::encode(hasher.finalize());

        Self {
            txid,
            inputs,
            outputs,
        }
    }

    /// Recompute the txid from content. Used to reject payloads whose
    /// claimed id does not match what they carry.
    pub fn computed_txid(&self) -> String {
        Transaction::new(self.inputs.clone(), self.outputs.clone()).txid
    }

    /// SHA-256 of the canonical signing payload.
    pub fn sighash(&self) -> [u8; 32] {
        sighash(self.inputs.iter().map(|i| &i.utxo.outpoint), &self.outputs)
    }

    /// Cheap structural checks that need no ledger access.
    pub fn check_shape(&self) -> Result<(), TxError> {
        if self.inputs.is_empty() {
            return Err(TxError::MalformedInput(
                "transaction must have at least one input".into(),
            ));
        }
        if self.outputs.is_empty() {
            return Err(TxError::MalformedInput(
                "transaction must have at least one output".into(),
            ));
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert(&input.utxo.outpoint) {
                return Err(TxError::DuplicateInput(input.utxo.outpoint.clone()));
            }
        }

        for (i, out) in self.outputs.iter().enumerate() {
            if out.amount == 0 {
                return Err(TxError::MalformedInput(format!(
                    "output {i} has zero base amount"
                )));
            }
            if out.token.as_ref().is_some_and(|t| t.amount.is_zero()) {
                return Err(TxError::MalformedInput(format!(
                    "output {i} carries a zero token amount"
                )));
            }
        }
        Ok(())
    }

    /// Base-currency and per-category token conservation: a spend can
    /// move value around but never create it.
    pub fn check_conservation(&self) -> Result<(), TxError> {
        let input_sum: u128 = self.inputs.iter().map(|i| i.utxo.amount as u128).sum();
        let output_sum = self.total_output_amount();
        if input_sum < output_sum {
            return Err(TxError::ValueImbalance(format!(
                "inputs total {input_sum} is less than outputs total {output_sum}"
            )));
        }

        let available = sum_tokens(self.inputs.iter().filter_map(|i| i.utxo.token.as_ref()))?;
        let spent = sum_tokens(self.outputs.iter().filter_map(|o| o.token.as_ref()))?;
        for (category, amount) in &spent {
            let have = available.get(category).copied().unwrap_or(TokenAmount::ZERO);
            if have < *amount {
                return Err(TxError::ValueImbalance(format!(
                    "category {category}: outputs carry {amount}, inputs only {have}"
                )));
            }
        }
        Ok(())
    }

    pub fn total_output_amount(&self) -> u128 {
        self.outputs.iter().map(|o| o.amount as u128).sum()
    }
}

/// Canonical signing digest: outpoints being spent plus the full output list.
pub fn sighash<'a>(
    outpoints: impl Iterator<Item = &'a OutPoint>,
    outputs: &[TxOutput],
) -> [u8; 32] {
    let lite_inputs: Vec<_> = outpoints
        .map(|op| serde_json::json!({ "txid": op.txid, "vout": op.vout }))
        .collect();
    let payload = serde_json::json!({
        "inputs": lite_inputs,
        "outputs": outputs,
    });
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&payload).expect("serialize signing payload"));
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

fn sum_tokens<'a>(
    tokens: impl Iterator<Item = &'a Token>,
) -> Result<BTreeMap<Category, TokenAmount>, TxError> {
    let mut totals: BTreeMap<Category, TokenAmount> = BTreeMap::new();
    for token in tokens {
        let entry = totals.entry(token.category.clone()).or_default();
        *entry = entry.checked_add(token.amount)?;
    }
    Ok(totals)
}
