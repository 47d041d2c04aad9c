use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, UtxosResponse};
use crate::transaction::Address;

#[get("/utxos/{address}/")]
pub async fn get_utxos(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = Address::new(path.into_inner().0);

    let utxos = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.utxos_for(&address)
    };
    let balance = utxos.iter().map(|u| u.amount as u128).sum();

    HttpResponse::Ok().json(UtxosResponse {
        address,
        balance,
        utxos,
    })
}
