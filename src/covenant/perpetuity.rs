use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::transaction::{Address, TokenAmount, UnlockProof};
use crate::wallet::PubKeyHash;

/// Domain tag mixed into the locking address so a contract address can
/// never collide with a plain ownership address for the same identity.
const LOCK_TAG: &[u8] = b"perpetuity/v1:";

/// A recurring-payout covenant for one beneficiary.
///
/// Anyone may spend an output locked by the contract, but only through a
/// release transaction that pays the beneficiary exactly 2% of the locked
/// token balance, pays the executor 0.1% and re-locks the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpetuityContract {
    beneficiary: PubKeyHash,
}

impl PerpetuityContract {
    pub const PAYOUT_PERCENT: u128 = 2;
    pub const FEE_PER_MILLE: u128 = 1;
    pub const MIN_UNIT: TokenAmount = TokenAmount::new(1);

    pub fn instantiate(beneficiary: PubKeyHash) -> Self {
        Self { beneficiary }
    }

    pub fn beneficiary(&self) -> &PubKeyHash {
        &self.beneficiary
    }

    pub fn beneficiary_address(&self) -> Address {
        self.beneficiary.to_address()
    }

    /// Locking address: every output held under the covenant lives here.
    pub fn address(&self) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(LOCK_TAG);
        hasher.update(self.beneficiary.as_str().as_bytes());
        Address::new(hex::encode(hasher.finalize()))
    }

    /// Proof for spending a contract output through the release path.
    pub fn unlock_release(&self) -> UnlockProof {
        UnlockProof::Release {
            contract: self.clone(),
        }
    }
}
