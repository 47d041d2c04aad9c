mod contract;
mod health;
pub mod models;
mod stats;
mod tx;
mod utxos;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(wallet::create_wallet)
            .service(tx::post_faucet)
            .service(tx::post_transaction)
            .service(tx::post_reset)
            .service(contract::create_contract)
            .service(contract::get_contract)
            .service(contract::get_release_plan)
            .service(utxos::get_utxos)
            .service(stats::get_stats),
    );
}
