use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use std::env;

use perpetuity_ledger::api::{self, AppState, models::DEFAULT_DUST};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let dust: u64 = env::var("DUST_AMOUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_DUST);

    log::info!("Starting perpetuity ledger API at http://{host}:{port} (dust={dust})");

    let state = web::Data::new(AppState::new(dust));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
