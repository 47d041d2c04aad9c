use crate::covenant::{PerpetuityContract, ReleaseCase};
use crate::transaction::{Address, Ledger, OutPoint, Token, TokenAmount, TxInput, TxOutput, Utxo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Base-currency amount quoted per output in release plans.
pub const DEFAULT_DUST: u64 = 1000;

/// Shared application state: the simulated ledger and the contracts registered through the API.
pub struct AppState {
    pub ledger: Mutex<Ledger>,
    pub contracts: Mutex<HashMap<Address, PerpetuityContract>>,
    pub dust: u64,
}

impl AppState {
    pub fn new(dust: u64) -> Self {
        Self {
            ledger: Mutex::new(Ledger::new()),
            contracts: Mutex::new(HashMap::new()),
            dust,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_DUST)
    }
}

/* ---------- TX API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct NewTxRequest {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

#[derive(Serialize, Deserialize)]
pub struct NewTxResponse {
    pub txid: String,
}

/* ---------- Faucet API Models (dev) ---------- */

#[derive(Serialize, Deserialize)]
pub struct FaucetToken {
    /// Hex category; a fresh one is minted when absent.
    #[serde(default)]
    pub category: Option<String>,
    pub amount: TokenAmount,
}

#[derive(Serialize, Deserialize)]
pub struct FaucetRequest {
    pub address: Address,
    pub amount: u64,
    #[serde(default)]
    pub token: Option<FaucetToken>,
}

#[derive(Serialize, Deserialize)]
pub struct FaucetResponse {
    pub utxo: Utxo,
}

/* ---------- Contract API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct NewContractRequest {
    /// Hex pubkey hash of the beneficiary.
    pub beneficiary: String,
}

#[derive(Serialize, Deserialize)]
pub struct ContractResponse {
    pub address: Address,
    pub beneficiary: String,
    pub beneficiary_address: Address,
}

#[derive(Serialize, Deserialize)]
pub struct ContractStatusResponse {
    pub address: Address,
    pub beneficiary: String,
    /// True while any token-bearing output remains under the contract.
    pub active: bool,
    pub balances: Vec<Token>,
    pub utxos: Vec<Utxo>,
}

#[derive(Deserialize)]
pub struct PlanQuery {
    pub executor: Address,
}

#[derive(Serialize)]
pub struct PlanEntry {
    pub outpoint: OutPoint,
    #[serde(flatten)]
    pub case: ReleaseCase,
    pub outputs: Vec<TxOutput>,
}

#[derive(Serialize)]
pub struct PlanResponse {
    pub address: Address,
    pub plans: Vec<PlanEntry>,
}

/* ---------- Query API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct UtxosResponse {
    pub address: Address,
    pub balance: u128,
    pub utxos: Vec<Utxo>,
}

#[derive(Serialize, Deserialize)]
pub struct NewWalletResponse {
    pub private_key: String,
    pub public_key: String,
    pub pubkey_hash: String,
    pub address: Address,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub utxo_size: usize,
    pub addresses: usize,
    pub applied_txs: u64,
    pub last_applied_at: Option<i64>,
    pub contracts: usize,
}
