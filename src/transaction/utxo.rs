use chrono::Utc;
use log::debug;
use std::collections::{HashMap, HashSet};

use super::error::{LedgerError, TxError};
use super::model::{Address, OutPoint, Transaction, Utxo};
use super::token::{Category, TokenAmount};

/// In-memory UTXO store bucketed by owning address.
/// The ledger does not validate anything; callers verify before `apply`.
#[derive(Debug, Default)]
pub struct Ledger {
    buckets: HashMap<Address, Vec<Utxo>>,
    /// outpoint -> owner, for spend lookups without scanning buckets.
    index: HashMap<OutPoint, Address>,
    applied: u64,
    last_applied_at: Option<i64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a single output under `address`. The UTXO's `owner` is
    /// rewritten to match the bucket it is filed under.
    pub fn add(&mut self, address: &Address, mut utxo: Utxo) {
        utxo.owner = address.clone();
        self.index.insert(utxo.outpoint.clone(), address.clone());
        self.buckets.entry(address.clone()).or_default().push(utxo);
    }

    /// Snapshot of the outputs currently owned by `address`.
    pub fn utxos_for(&self, address: &Address) -> Vec<Utxo> {
        self.buckets.get(address).cloned().unwrap_or_default()
    }

    pub fn find(&self, outpoint: &OutPoint) -> Option<&Utxo> {
        let owner = self.index.get(outpoint)?;
        self.buckets
            .get(owner)?
            .iter()
            .find(|u| &u.outpoint == outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.index.contains_key(outpoint)
    }

    /// Total token balance of `category` held by `address`.
    pub fn balance_of(
        &self,
        address: &Address,
        category: &Category,
    ) -> Result<TokenAmount, TxError> {
        self.buckets
            .get(address)
            .into_iter()
            .flatten()
            .filter_map(|u| u.token.as_ref())
            .filter(|t| &t.category == category)
            .try_fold(TokenAmount::ZERO, |acc, t| acc.checked_add(t.amount))
    }

    /// Commit a verified transaction: spend every input, then file every
    /// output under its destination. All inputs are checked before anything
    /// is touched, so a failure leaves the ledger unchanged.
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), LedgerError> {
        // A repeated outpoint is absent by the time it is spent a second time.
        let mut seen = HashSet::new();
        if let Some(missing) = tx
            .inputs
            .iter()
            .map(|i| &i.utxo.outpoint)
            .find(|op| !self.index.contains_key(*op) || !seen.insert(*op))
        {
            return Err(LedgerError::Consistency(missing.clone()));
        }

        for input in &tx.inputs {
            let op = &input.utxo.outpoint;
            if self.spend(op).is_none() {
                return Err(LedgerError::Consistency(op.clone()));
            }
        }

        for (i, out) in tx.outputs.iter().enumerate() {
            let utxo = Utxo {
                outpoint: OutPoint {
                    txid: tx.txid.clone(),
                    vout: i as u32,
                },
                owner: out.to.clone(),
                amount: out.amount,
                token: out.token.clone(),
            };
            self.add(&out.to, utxo);
        }

        self.applied += 1;
        self.last_applied_at = Some(Utc::now().timestamp());
        debug!(
            "LEDGER - applied txid={} (-{} +{}); utxo size now {}",
            tx.txid,
            tx.inputs.len(),
            tx.outputs.len(),
            self.len()
        );
        Ok(())
    }

    fn spend(&mut self, outpoint: &OutPoint) -> Option<Utxo> {
        let owner = self.index.remove(outpoint)?;
        let bucket = self.buckets.get_mut(&owner)?;
        let pos = bucket.iter().position(|u| &u.outpoint == outpoint)?;
        let spent = bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&owner);
        }
        Some(spent)
    }

    /// Drop all state. Dev/test support only.
    pub fn reset(&mut self) {
        self.buckets.clear();
        self.index.clear();
        self.applied = 0;
        self.last_applied_at = None;
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn address_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn last_applied_at(&self) -> Option<i64> {
        self.last_applied_at
    }
}
