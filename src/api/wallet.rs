use actix_web::{HttpResponse, Responder, post};

use super::models::NewWalletResponse;
use crate::wallet::{Signer, Wallet};

/// Dev helper: a fresh keypair. Key custody is the caller's problem.
#[post("/wallet/new/")]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::generate();
    HttpResponse::Ok().json(NewWalletResponse {
        private_key: wallet.secret_hex(),
        public_key: wallet.public_key_hex(),
        pubkey_hash: wallet.pubkey_hash().to_string(),
        address: wallet.address(),
    })
}
