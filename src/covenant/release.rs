//! The release rule: the only way to spend an output locked by a
//! [`PerpetuityContract`].
//!
//! The rule re-derives every token amount from the balance being spent and
//! requires the outputs to match exactly. Output positions carry roles:
//! index 0 pays the beneficiary, index 1 re-locks the remainder under the
//! contract (continuing case only), and the last output pays the executor.

use log::debug;
use serde::Serialize;

use super::perpetuity::PerpetuityContract;
use crate::transaction::{Address, Category, Token, TokenAmount, TxError, TxOutput, Utxo};

/// Which branch of the release rule applies to a given balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "case", rename_all = "snake_case")]
pub enum ReleaseCase {
    /// Beneficiary gets `payout`, the contract keeps `remainder`, executor gets `fee`.
    Continuing {
        payout: TokenAmount,
        remainder: TokenAmount,
        fee: TokenAmount,
    },
    /// Not enough left to pay the full fee: the executor takes `residual`
    /// and nothing is re-locked.
    PartialTerminal {
        payout: TokenAmount,
        residual: TokenAmount,
    },
    /// The payout consumes the whole balance; the executor output carries
    /// base currency only.
    Exhausted { payout: TokenAmount },
}

/// `max(1, floor(initial * 2 / 100))`
pub fn payout_for(initial: TokenAmount) -> Result<TokenAmount, TxError> {
    let raw = initial
        .checked_mul(PerpetuityContract::PAYOUT_PERCENT)?
        .div_floor(100);
    Ok(raw.max(PerpetuityContract::MIN_UNIT))
}

/// `max(1, floor(initial / 1000))`
pub fn fee_for(initial: TokenAmount) -> Result<TokenAmount, TxError> {
    let raw = initial
        .checked_mul(PerpetuityContract::FEE_PER_MILLE)?
        .div_floor(1000);
    Ok(raw.max(PerpetuityContract::MIN_UNIT))
}

impl ReleaseCase {
    pub fn for_initial(initial: TokenAmount) -> Result<Self, TxError> {
        if initial.is_zero() {
            return Err(TxError::MalformedInput(
                "perpetuity output carries no tokens".into(),
            ));
        }
        let payout = payout_for(initial)?;
        let fee = fee_for(initial)?;

        let after_payout = match initial.checked_sub(payout) {
            Some(rest) if !rest.is_zero() => rest,
            _ => return Ok(ReleaseCase::Exhausted { payout }),
        };
        match after_payout.checked_sub(fee) {
            Some(remainder) if !remainder.is_zero() => Ok(ReleaseCase::Continuing {
                payout,
                remainder,
                fee,
            }),
            _ => Ok(ReleaseCase::PartialTerminal {
                payout,
                residual: after_payout,
            }),
        }
    }

    pub fn payout(&self) -> TokenAmount {
        match *self {
            ReleaseCase::Continuing { payout, .. }
            | ReleaseCase::PartialTerminal { payout, .. }
            | ReleaseCase::Exhausted { payout } => payout,
        }
    }

    pub fn expected_outputs(&self) -> usize {
        match self {
            ReleaseCase::Continuing { .. } => 3,
            ReleaseCase::PartialTerminal { .. } | ReleaseCase::Exhausted { .. } => 2,
        }
    }

    /// Whether a release in this case leaves a live output under the contract.
    pub fn relocks(&self) -> bool {
        matches!(self, ReleaseCase::Continuing { .. })
    }
}

/// The token attachment of the output being released, which fixes the
/// category every continuing or payout output must carry.
fn locked_token(contract: &PerpetuityContract, spent: &Utxo) -> Result<Token, TxError> {
    if spent.owner != contract.address() {
        return Err(TxError::MalformedInput(
            "input is not locked by this perpetuity".into(),
        ));
    }
    spent
        .token
        .clone()
        .ok_or_else(|| TxError::MalformedInput("perpetuity output carries no tokens".into()))
}

fn expect_destination(outputs: &[TxOutput], index: usize, to: &Address) -> Result<(), TxError> {
    if &outputs[index].to != to {
        return Err(TxError::DestinationMismatch { index });
    }
    Ok(())
}

fn expect_token(
    outputs: &[TxOutput],
    index: usize,
    category: &Category,
    amount: TokenAmount,
) -> Result<(), TxError> {
    let token = outputs[index].token.as_ref().ok_or_else(|| {
        TxError::MalformedInput(format!("output {index} is missing its token attachment"))
    })?;
    if &token.category != category {
        return Err(TxError::CategoryMismatch {
            expected: category.clone(),
            found: token.category.clone(),
        });
    }
    if token.amount != amount {
        return Err(TxError::AmountMismatch {
            index,
            expected: amount,
            actual: token.amount,
        });
    }
    Ok(())
}

/// Check `outputs` against the release rule for `spent`. Returns the case
/// that matched.
pub fn verify_release(
    contract: &PerpetuityContract,
    spent: &Utxo,
    outputs: &[TxOutput],
) -> Result<ReleaseCase, TxError> {
    let locked = locked_token(contract, spent)?;
    let case = ReleaseCase::for_initial(locked.amount)?;
    debug!(
        "RELEASE - {}:{} initial={} -> {:?}",
        spent.outpoint.txid, spent.outpoint.vout, locked.amount, case
    );

    if outputs.len() != case.expected_outputs() {
        return Err(TxError::MalformedInput(format!(
            "release expects {} outputs, got {}",
            case.expected_outputs(),
            outputs.len()
        )));
    }

    let category = &locked.category;
    expect_destination(outputs, 0, &contract.beneficiary_address())?;
    expect_token(outputs, 0, category, case.payout())?;

    match case {
        ReleaseCase::Continuing { remainder, fee, .. } => {
            expect_destination(outputs, 1, &contract.address())?;
            expect_token(outputs, 1, category, remainder)?;
            expect_token(outputs, 2, category, fee)?;
        }
        ReleaseCase::PartialTerminal { residual, .. } => {
            expect_token(outputs, 1, category, residual)?;
        }
        ReleaseCase::Exhausted { .. } => {
            if outputs[1].token.is_some() {
                return Err(TxError::MalformedInput(
                    "exhausted release pays the executor in base currency only".into(),
                ));
            }
        }
    }
    Ok(case)
}

/// Accept/reject view of [`verify_release`].
pub fn accepts(contract: &PerpetuityContract, spent: &Utxo, outputs: &[TxOutput]) -> bool {
    verify_release(contract, spent, outputs).is_ok()
}

/// The case that applies to `spent` and the outputs a valid release must
/// carry, with `executor` collecting the fee and `dust` base currency on
/// every output.
pub fn plan_release(
    contract: &PerpetuityContract,
    spent: &Utxo,
    executor: &Address,
    dust: u64,
) -> Result<(ReleaseCase, Vec<TxOutput>), TxError> {
    let locked = locked_token(contract, spent)?;
    let category = locked.category;
    let case = ReleaseCase::for_initial(locked.amount)?;

    let mut outputs = vec![TxOutput::with_token(
        contract.beneficiary_address(),
        dust,
        Token::new(category.clone(), case.payout()),
    )];
    match case {
        ReleaseCase::Continuing { remainder, fee, .. } => {
            outputs.push(TxOutput::with_token(
                contract.address(),
                dust,
                Token::new(category.clone(), remainder),
            ));
            outputs.push(TxOutput::with_token(
                executor.clone(),
                dust,
                Token::new(category, fee),
            ));
        }
        ReleaseCase::PartialTerminal { residual, .. } => {
            outputs.push(TxOutput::with_token(
                executor.clone(),
                dust,
                Token::new(category, residual),
            ));
        }
        ReleaseCase::Exhausted { .. } => {
            outputs.push(TxOutput::new(executor.clone(), dust));
        }
    }
    Ok((case, outputs))
}
