use log::{debug, warn};

use super::error::TxError;
use super::model::{Transaction, TxInput, TxOutput, Utxo, sighash};
use super::utxo::Ledger;
use super::validation::submit;
use crate::covenant::PerpetuityContract;
use crate::wallet::Signer;

/// How the builder obtains the proof for an input.
pub enum Unlocker<'a> {
    /// Sign the final sighash with this capability.
    Signature(&'a dyn Signer),
    /// Spend through the perpetuity release rule.
    Release(PerpetuityContract),
}

/// Assembles a transaction in caller order and pushes it through the
/// submission pipeline.
#[derive(Default)]
pub struct TransactionBuilder<'a> {
    inputs: Vec<(Utxo, Unlocker<'a>)>,
    outputs: Vec<TxOutput>,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(mut self, utxo: Utxo, unlocker: Unlocker<'a>) -> Self {
        self.inputs.push((utxo, unlocker));
        self
    }

    pub fn add_output(mut self, output: TxOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn add_outputs(mut self, outputs: impl IntoIterator<Item = TxOutput>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    /// Compute the sighash over the assembled inputs and outputs, then
    /// attach a proof to every input.
    pub fn build(&self) -> Transaction {
        let digest = sighash(self.inputs.iter().map(|(u, _)| &u.outpoint), &self.outputs);
        let inputs = self
            .inputs
            .iter()
            .map(|(utxo, unlocker)| TxInput {
                utxo: utxo.clone(),
                proof: match unlocker {
                    Unlocker::Signature(signer) => signer.sign(digest),
                    Unlocker::Release(contract) => contract.unlock_release(),
                },
            })
            .collect();
        Transaction::new(inputs, self.outputs.clone())
    }

    /// Build, validate and commit. Returns the committed transaction; the
    /// caller re-queries the ledger to observe the new outputs.
    pub fn send(&self, ledger: &mut Ledger) -> Result<Transaction, TxError> {
        let tx = self.build();
        debug!(
            "BUILDER - sending txid={} (inputs={}, outputs={})",
            tx.txid,
            tx.inputs.len(),
            tx.outputs.len()
        );
        if let Err(e) = submit(ledger, &tx) {
            warn!("BUILDER - txid={} rejected: {}", tx.txid, e);
            return Err(e);
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covenant::plan_release;
    use crate::transaction::{
        Address, Category, OutPoint, Token, TokenAmount, UnlockProof, validate_transaction,
    };
    use crate::wallet::Wallet;

    const DUST: u64 = 1000;

    struct World {
        user: Wallet,
        service: Wallet,
        untrusted: Wallet,
        contract: PerpetuityContract,
        perpetual: Utxo,
        end_of_life: Utxo,
        fees: Utxo,
    }

    fn seed(
        ledger: &mut Ledger,
        txid: &str,
        owner: &Address,
        amount: u64,
        token: Option<Token>,
    ) -> Utxo {
        let utxo = Utxo {
            outpoint: OutPoint {
                txid: txid.into(),
                vout: 0,
            },
            owner: owner.clone(),
            amount,
            token,
        };
        ledger.add(owner, utxo.clone());
        utxo
    }

    fn world() -> (Ledger, World) {
        let mut ledger = Ledger::new();
        let user = Wallet::generate();
        let service = Wallet::generate();
        let untrusted = Wallet::generate();
        let contract = PerpetuityContract::instantiate(user.pubkey_hash());

        let perpetual = seed(
            &mut ledger,
            "perpetual",
            &contract.address(),
            DUST,
            Some(Token::new(Category::random(), 10_000_000u128)),
        );
        let end_of_life = seed(
            &mut ledger,
            "end-of-life",
            &contract.address(),
            DUST,
            Some(Token::new(Category::random(), 2u128)),
        );
        let fees = seed(&mut ledger, "fees", &service.address(), 100_000, None);

        let world = World {
            user,
            service,
            untrusted,
            contract,
            perpetual,
            end_of_life,
            fees,
        };
        (ledger, world)
    }

    fn category(u: &Utxo) -> Category {
        u.token.as_ref().map(|t| t.category.clone()).unwrap()
    }

    fn tok(u: &Utxo, amount: u128) -> Token {
        Token::new(category(u), amount)
    }

    /// Release of the 10,000,000-token output with explicit destinations and amounts.
    fn release<'a>(w: &'a World, to: [Address; 3], amounts: [u128; 3]) -> TransactionBuilder<'a> {
        let mut builder = TransactionBuilder::new()
            .add_input(w.perpetual.clone(), Unlocker::Release(w.contract.clone()))
            .add_input(w.fees.clone(), Unlocker::Signature(&w.service));
        for (to, amount) in to.into_iter().zip(amounts) {
            builder = builder.add_output(TxOutput::with_token(to, DUST, tok(&w.perpetual, amount)));
        }
        builder
    }

    fn honest<'a>(w: &'a World, executor: Address, amounts: [u128; 3]) -> TransactionBuilder<'a> {
        release(w, [w.user.address(), w.contract.address(), executor], amounts)
    }

    fn live_of(ledger: &Ledger, owner: &Address, cat: &Category) -> Vec<Utxo> {
        ledger
            .utxos_for(owner)
            .into_iter()
            .filter(|u| u.token.as_ref().is_some_and(|t| &t.category == cat))
            .collect()
    }

    #[test]
    fn release_when_invoked_user_gets_payout() {
        let (mut ledger, w) = world();
        honest(&w, w.service.address(), [200_000, 9_790_000, 10_000])
            .send(&mut ledger)
            .unwrap();

        let cat = category(&w.perpetual);
        assert_eq!(
            ledger.balance_of(&w.user.address(), &cat).unwrap(),
            TokenAmount::new(200_000)
        );
        assert_eq!(
            ledger.balance_of(&w.contract.address(), &cat).unwrap(),
            TokenAmount::new(9_790_000)
        );
        assert_eq!(
            ledger.balance_of(&w.service.address(), &cat).unwrap(),
            TokenAmount::new(10_000)
        );
        assert!(!ledger.contains(&w.perpetual.outpoint));
    }

    #[test]
    fn release_when_invoked_anyone_can_service() {
        let (mut ledger, w) = world();
        let res = honest(&w, w.untrusted.address(), [200_000, 9_790_000, 10_000])
            .send(&mut ledger);
        assert!(res.is_ok());
    }

    #[test]
    fn release_when_invoked_at_end_of_life() {
        let (mut ledger, w) = world();
        let cat = category(&w.end_of_life);
        TransactionBuilder::new()
            .add_input(w.end_of_life.clone(), Unlocker::Release(w.contract.clone()))
            .add_input(w.fees.clone(), Unlocker::Signature(&w.service))
            .add_output(TxOutput::with_token(w.user.address(), DUST, tok(&w.end_of_life, 1)))
            .add_output(TxOutput::with_token(
                w.untrusted.address(),
                DUST,
                tok(&w.end_of_life, 1),
            ))
            .send(&mut ledger)
            .unwrap();

        assert!(live_of(&ledger, &w.contract.address(), &cat).is_empty());
    }

    #[test]
    fn release_off_by_one_is_rejected_and_ledger_untouched() {
        let (mut ledger, w) = world();
        let cases = [
            [199_999, 9_790_000, 10_000],
            [200_001, 9_790_000, 10_000],
            [200_000, 9_789_999, 10_000],
            [200_000, 9_790_001, 10_000],
        ];
        let before = ledger.len();
        for amounts in cases {
            assert!(honest(&w, w.service.address(), amounts).send(&mut ledger).is_err());
        }
        assert_eq!(ledger.len(), before);
        assert_eq!(ledger.applied(), 0);
        assert!(ledger.contains(&w.perpetual.outpoint));
    }

    #[test]
    fn release_with_untrusted_payout_address_is_rejected() {
        let (mut ledger, w) = world();
        let to = [w.untrusted.address(), w.contract.address(), w.service.address()];
        let err = release(&w, to, [200_000, 9_790_000, 10_000])
            .send(&mut ledger)
            .unwrap_err();
        assert_eq!(err, TxError::DestinationMismatch { index: 0 });
    }

    #[test]
    fn release_with_untrusted_return_address_is_rejected() {
        let (mut ledger, w) = world();
        let to = [w.user.address(), w.untrusted.address(), w.service.address()];
        let err = release(&w, to, [200_000, 9_790_000, 10_000])
            .send(&mut ledger)
            .unwrap_err();
        assert_eq!(err, TxError::DestinationMismatch { index: 1 });
    }

    #[test]
    fn release_with_different_payout_token_is_rejected() {
        let (mut ledger, w) = world();
        let res = TransactionBuilder::new()
            .add_input(w.perpetual.clone(), Unlocker::Release(w.contract.clone()))
            .add_input(w.fees.clone(), Unlocker::Signature(&w.service))
            .add_output(TxOutput::with_token(
                w.user.address(),
                DUST,
                Token::new(Category::random(), 200_000u128),
            ))
            .add_output(TxOutput::with_token(
                w.contract.address(),
                DUST,
                tok(&w.perpetual, 9_790_000),
            ))
            .add_output(TxOutput::with_token(
                w.service.address(),
                DUST,
                tok(&w.perpetual, 210_000),
            ))
            .send(&mut ledger);
        assert!(matches!(res, Err(TxError::CategoryMismatch { .. })));
    }

    #[test]
    fn released_output_cannot_be_spent_twice() {
        let (mut ledger, w) = world();
        honest(&w, w.service.address(), [200_000, 9_790_000, 10_000])
            .send(&mut ledger)
            .unwrap();
        let err = honest(&w, w.service.address(), [200_000, 9_790_000, 10_000])
            .send(&mut ledger)
            .unwrap_err();
        assert!(matches!(err, TxError::UnknownInput(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn one_release_cannot_unlock_two_perpetuities() {
        let (mut ledger, w) = world();
        let cat = category(&w.perpetual);
        let twin = seed(
            &mut ledger,
            "twin",
            &w.contract.address(),
            DUST,
            Some(tok(&w.perpetual, 10_000_000)),
        );
        let plan = plan_release(&w.contract, &w.perpetual, &w.service.address(), DUST)
            .unwrap()
            .1;

        let err = TransactionBuilder::new()
            .add_input(w.perpetual.clone(), Unlocker::Release(w.contract.clone()))
            .add_input(twin.clone(), Unlocker::Release(w.contract.clone()))
            .add_input(w.fees.clone(), Unlocker::Signature(&w.service))
            .add_outputs(plan)
            .send(&mut ledger)
            .unwrap_err();
        assert!(matches!(err, TxError::MalformedInput(_)));
        assert!(ledger.contains(&w.perpetual.outpoint));
        assert!(ledger.contains(&twin.outpoint));
        assert_eq!(
            ledger.balance_of(&w.contract.address(), &cat).unwrap(),
            TokenAmount::new(20_000_000)
        );
    }

    #[test]
    fn release_must_be_the_first_input() {
        let (mut ledger, w) = world();
        let plan = plan_release(&w.contract, &w.perpetual, &w.service.address(), DUST)
            .unwrap()
            .1;

        let err = TransactionBuilder::new()
            .add_input(w.fees.clone(), Unlocker::Signature(&w.service))
            .add_input(w.perpetual.clone(), Unlocker::Release(w.contract.clone()))
            .add_outputs(plan)
            .send(&mut ledger)
            .unwrap_err();
        assert!(matches!(err, TxError::MalformedInput(_)));
        assert!(ledger.contains(&w.perpetual.outpoint));
        assert_eq!(ledger.applied(), 0);
    }

    #[test]
    fn perpetuity_runs_to_exhaustion() {
        let (mut ledger, w) = world();
        let initial = 150u128;
        let cat = Category::random();
        seed(
            &mut ledger,
            "small",
            &w.contract.address(),
            DUST,
            Some(Token::new(cat.clone(), initial)),
        );
        let executor = w.untrusted.address();
        let mut cycles = 0;

        // Each cycle re-queries the ledger for the live perpetuity output.
        while let Some(current) = live_of(&ledger, &w.contract.address(), &cat).pop() {
            let funding = seed(
                &mut ledger,
                &format!("funding-{cycles}"),
                &w.service.address(),
                2 * DUST,
                None,
            );
            let (_, plan) = plan_release(&w.contract, &current, &executor, DUST).unwrap();
            TransactionBuilder::new()
                .add_input(current, Unlocker::Release(w.contract.clone()))
                .add_input(funding, Unlocker::Signature(&w.service))
                .add_outputs(plan)
                .send(&mut ledger)
                .unwrap();
            cycles += 1;
            assert!(cycles <= initial, "perpetuity did not drain");
        }

        let paid = ledger.balance_of(&w.user.address(), &cat).unwrap();
        let fees = ledger.balance_of(&executor, &cat).unwrap();
        assert!(cycles > 1);
        assert_eq!(paid.get() + fees.get(), initial);
        assert_eq!(
            ledger.balance_of(&w.contract.address(), &cat).unwrap(),
            TokenAmount::ZERO
        );
    }

    #[test]
    fn plain_transfer_requires_owner_signature() {
        let (mut ledger, w) = world();
        let to = w.untrusted.address();

        let forged = TransactionBuilder::new()
            .add_input(w.fees.clone(), Unlocker::Signature(&w.untrusted))
            .add_output(TxOutput::new(to.clone(), 50_000))
            .send(&mut ledger);
        assert!(matches!(forged, Err(TxError::SignatureInvalid { index: 0, .. })));

        TransactionBuilder::new()
            .add_input(w.fees.clone(), Unlocker::Signature(&w.service))
            .add_output(TxOutput::new(to.clone(), 50_000))
            .send(&mut ledger)
            .unwrap();
        assert_eq!(ledger.utxos_for(&to).len(), 1);
    }

    #[test]
    fn tampered_outputs_break_the_signature() {
        let (ledger, w) = world();
        let signed = TransactionBuilder::new()
            .add_input(w.fees.clone(), Unlocker::Signature(&w.service))
            .add_output(TxOutput::new(w.untrusted.address(), 50_000))
            .build();
        let mut outputs = signed.outputs.clone();
        outputs[0].amount = 90_000;
        let tampered = Transaction::new(signed.inputs, outputs);

        let err = validate_transaction(&tampered, &ledger).unwrap_err();
        assert!(matches!(err, TxError::SignatureInvalid { .. }));
    }

    #[test]
    fn overspending_base_currency_is_rejected() {
        let (mut ledger, w) = world();
        let res = TransactionBuilder::new()
            .add_input(w.fees.clone(), Unlocker::Signature(&w.service))
            .add_output(TxOutput::new(w.untrusted.address(), 100_001))
            .send(&mut ledger);
        assert!(matches!(res, Err(TxError::ValueImbalance(_))));
    }

    #[test]
    fn proofs_follow_unlockers() {
        let (_, w) = world();
        let tx = honest(&w, w.service.address(), [200_000, 9_790_000, 10_000]).build();
        assert!(matches!(tx.inputs[0].proof, UnlockProof::Release { .. }));
        assert!(matches!(tx.inputs[1].proof, UnlockProof::Signature { .. }));
        assert_eq!(tx.outputs[0].to, w.user.address());
    }
}
