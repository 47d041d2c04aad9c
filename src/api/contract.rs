use actix_web::{HttpResponse, Responder, get, post, web};
use log::{error, info};
use std::collections::BTreeMap;

use super::models::{
    AppState, ContractResponse, ContractStatusResponse, NewContractRequest, PlanEntry, PlanQuery,
    PlanResponse,
};
use crate::covenant::{PerpetuityContract, plan_release};
use crate::transaction::{Address, Category, Token, TokenAmount, TxError, Utxo};
use crate::wallet::PubKeyHash;

fn lookup(state: &AppState, address: &Address) -> Option<PerpetuityContract> {
    let contracts = state.contracts.lock().expect("mutex poisoned");
    contracts.get(address).cloned()
}

fn token_balances(utxos: &[Utxo]) -> Result<Vec<Token>, TxError> {
    let mut totals: BTreeMap<Category, TokenAmount> = BTreeMap::new();
    for token in utxos.iter().filter_map(|u| u.token.as_ref()) {
        let entry = totals.entry(token.category.clone()).or_default();
        *entry = entry.checked_add(token.amount)?;
    }
    Ok(totals
        .into_iter()
        .map(|(category, amount)| Token::new(category, amount))
        .collect())
}

/// Instantiate a perpetuity for a beneficiary and remember it.
#[post("/contracts/")]
pub async fn create_contract(
    state: web::Data<AppState>,
    body: web::Json<NewContractRequest>,
) -> impl Responder {
    let beneficiary = match PubKeyHash::from_hex(body.beneficiary.trim()) {
        Ok(pkh) => pkh,
        Err(msg) => return HttpResponse::BadRequest().body(msg),
    };
    let contract = PerpetuityContract::instantiate(beneficiary);
    let address = contract.address();

    {
        let mut contracts = state.contracts.lock().expect("mutex poisoned");
        contracts.insert(address.clone(), contract.clone());
    }
    info!(
        "CONTRACT - perpetuity for {} locked at {}",
        contract.beneficiary(),
        address
    );

    HttpResponse::Ok().json(ContractResponse {
        address,
        beneficiary: contract.beneficiary().to_string(),
        beneficiary_address: contract.beneficiary_address(),
    })
}

/// Current state of a perpetuity: live outputs and token balances.
#[get("/contracts/{address}/")]
pub async fn get_contract(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let address = Address::new(path.into_inner().0);
    let Some(contract) = lookup(&state, &address) else {
        return HttpResponse::NotFound().body("unknown contract");
    };

    let utxos = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.utxos_for(&address)
    };
    let balances = match token_balances(&utxos) {
        Ok(b) => b,
        Err(e) => {
            error!("CONTRACT - balance of {} failed: {}", address, e);
            return HttpResponse::InternalServerError().body("balance overflow");
        }
    };

    HttpResponse::Ok().json(ContractStatusResponse {
        address,
        beneficiary: contract.beneficiary().to_string(),
        active: !balances.is_empty(),
        balances,
        utxos,
    })
}

/// The exact outputs a release must carry for every live output of the
/// contract, with `executor` collecting the fee.
#[get("/contracts/{address}/plan/")]
pub async fn get_release_plan(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
    query: web::Query<PlanQuery>,
) -> impl Responder {
    let address = Address::new(path.into_inner().0);
    let Some(contract) = lookup(&state, &address) else {
        return HttpResponse::NotFound().body("unknown contract");
    };

    let utxos = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.utxos_for(&address)
    };

    let mut plans = Vec::new();
    for utxo in utxos {
        let Some(token) = utxo.token.as_ref() else {
            continue;
        };
        match plan_release(&contract, &utxo, &query.executor, state.dust) {
            Ok((case, outputs)) => plans.push(PlanEntry {
                outpoint: utxo.outpoint.clone(),
                case,
                outputs,
            }),
            Err(e) => {
                return HttpResponse::BadRequest().body(e.to_string());
            }
        }
    }

    HttpResponse::Ok().json(PlanResponse { address, plans })
}
