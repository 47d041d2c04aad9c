use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let (utxo_size, addresses, applied_txs, last_applied_at) = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        (
            ledger.len(),
            ledger.address_count(),
            ledger.applied(),
            ledger.last_applied_at(),
        )
    };
    let contracts = {
        let contracts = state.contracts.lock().expect("mutex poisoned");
        contracts.len()
    };

    HttpResponse::Ok().json(StatsResponse {
        utxo_size,
        addresses,
        applied_txs,
        last_applied_at,
        contracts,
    })
}
