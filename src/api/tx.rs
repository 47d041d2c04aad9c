use actix_web::{HttpResponse, Responder, post, web};
use log::{debug, error, info, warn};
use std::time::Instant;
use uuid::Uuid;

use super::models::{AppState, FaucetRequest, FaucetResponse, NewTxRequest, NewTxResponse};
use crate::transaction::{Category, OutPoint, Token, Transaction, Utxo, submit};

/// DEV Faucet: create a spendable UTXO directly in the ledger, optionally
/// carrying tokens. Without a category a new one is minted.
#[post("/faucet/")]
pub async fn post_faucet(
    state: web::Data<AppState>,
    body: web::Json<FaucetRequest>,
) -> impl Responder {
    let body = body.into_inner();
    if body.amount == 0 {
        return HttpResponse::BadRequest().body("amount must be > 0");
    }

    let token = match body.token {
        None => None,
        Some(t) if t.amount.is_zero() => {
            return HttpResponse::BadRequest().body("token amount must be > 0");
        }
        Some(t) => {
            let category = match t.category.as_deref().map(Category::from_hex) {
                None => Category::random(),
                Some(Ok(c)) => c,
                Some(Err(e)) => return HttpResponse::BadRequest().body(e.to_string()),
            };
            Some(Token::new(category, t.amount))
        }
    };

    let utxo = Utxo {
        outpoint: OutPoint {
            txid: Uuid::new_v4().simple().to_string(),
            vout: 0,
        },
        owner: body.address.clone(),
        amount: body.amount,
        token,
    };

    {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.add(&body.address, utxo.clone());
        debug!(
            "FAUCET - inserted UTXO {{ txid: {}, vout: 0 }} -> {{ addr: {}, amount: {} }}; UTXO size now {}",
            utxo.outpoint.txid,
            body.address,
            body.amount,
            ledger.len()
        );
    }

    HttpResponse::Ok().json(FaucetResponse { utxo })
}

/// Submit a signed transaction. Validation and commit happen under one
/// ledger lock, so two requests can never spend the same output.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    let t0 = Instant::now();
    let body = body.into_inner();
    debug!(
        "POST /tx/ - received: inputs={}, outputs={}",
        body.inputs.len(),
        body.outputs.len()
    );

    let tx = Transaction::new(body.inputs, body.outputs);
    debug!("POST /tx/ - built txid={}", tx.txid);

    let result = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        submit(&mut ledger, &tx)
    };

    match result {
        Ok(()) => {
            info!(
                "POST /tx/ - txid={} OK ({} ms)",
                tx.txid,
                t0.elapsed().as_millis()
            );
            HttpResponse::Ok().json(NewTxResponse { txid: tx.txid })
        }
        Err(e) if e.is_fatal() => {
            error!("POST /tx/ - txid={} aborted: {}", tx.txid, e);
            HttpResponse::InternalServerError().body("ledger consistency failure")
        }
        Err(e) => {
            // Callers only learn accept/reject; the clause stays in the log.
            warn!("POST /tx/ - txid={} rejected", tx.txid);
            debug!("POST /tx/ - txid={} rejection reason: {}", tx.txid, e);
            HttpResponse::BadRequest().body("transaction rejected")
        }
    }
}

/// DEV: drop every UTXO and commit counter.
#[post("/reset/")]
pub async fn post_reset(state: web::Data<AppState>) -> impl Responder {
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    ledger.reset();
    info!("RESET - ledger cleared");
    HttpResponse::NoContent().finish()
}
