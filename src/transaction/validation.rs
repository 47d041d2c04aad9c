use log::{debug, error, info};

use super::error::TxError;
use super::model::{Transaction, UnlockProof};
use super::utxo::Ledger;
use crate::covenant::verify_release;
use crate::wallet::{pubkey_to_address_hex, verify_signature_hex};

/// Full acceptance check against a ledger snapshot. Never mutates.
///
/// Order: shape, ledger presence, covenant rule, signatures, conservation.
/// A release proof is honoured on the first input only, so one set of
/// release outputs can never account for two covenant outputs.
pub fn validate_transaction(tx: &Transaction, ledger: &Ledger) -> Result<(), TxError> {
    if tx.txid != tx.computed_txid() {
        return Err(TxError::MalformedInput(
            "txid does not match transaction content".into(),
        ));
    }
    tx.check_shape()?;

    for input in &tx.inputs {
        let op = &input.utxo.outpoint;
        match ledger.find(op) {
            Some(held) if *held == input.utxo => {}
            _ => return Err(TxError::UnknownInput(op.clone())),
        }
    }

    let sighash = tx.sighash();
    for (index, input) in tx.inputs.iter().enumerate() {
        match &input.proof {
            UnlockProof::Release { .. } if index != 0 => {
                return Err(TxError::MalformedInput(format!(
                    "release proof only unlocks the first input, found at input {index}"
                )));
            }
            UnlockProof::Release { contract } => {
                let case = verify_release(contract, &input.utxo, &tx.outputs)?;
                debug!("TX {} input[{}]: release accepted as {:?}", tx.txid, index, case);
            }
            UnlockProof::Signature { pubkey, signature } => {
                let invalid = |reason: &str| TxError::SignatureInvalid {
                    index,
                    reason: reason.to_string(),
                };
                // Ownership: address derived from pubkey must match UTXO's owner
                let derived = pubkey_to_address_hex(pubkey).map_err(invalid)?;
                if derived != input.utxo.owner {
                    return Err(invalid("pubkey does not own referenced UTXO"));
                }
                if signature.is_empty() {
                    return Err(invalid("missing signature"));
                }
                if !verify_signature_hex(pubkey, signature, sighash).map_err(invalid)? {
                    return Err(invalid("signature does not verify"));
                }
            }
        }
    }

    tx.check_conservation()
}

/// Validate and commit as one step. On rejection the ledger is untouched.
pub fn submit(ledger: &mut Ledger, tx: &Transaction) -> Result<(), TxError> {
    validate_transaction(tx, ledger)?;
    if let Err(e) = ledger.apply(tx) {
        error!("SUBMIT - txid={} passed validation but failed to apply: {}", tx.txid, e);
        return Err(e.into());
    }
    info!(
        "SUBMIT - txid={} committed ({} inputs, {} outputs)",
        tx.txid,
        tx.inputs.len(),
        tx.outputs.len()
    );
    Ok(())
}
