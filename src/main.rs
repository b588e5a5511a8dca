use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pesabridge::api::api_routes;
use pesabridge::config::CONFIG;
use pesabridge::connector::open_payments::OpenPaymentsConnector;
use pesabridge::disbursement::mpesa::{MpesaClient, MpesaConfig};
use pesabridge::ledger::in_memory::InMemoryLedger;
use pesabridge::quote::{FeeSchedule, QuoteEngine, RateTable};
use pesabridge::service::{SettlementService, SettlementSettings};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(CONFIG.log_level.as_str())
        .init();

    let call_timeout = Duration::from_millis(CONFIG.call_timeout_ms);

    let quotes = QuoteEngine::new(RateTable::default(), FeeSchedule::default());
    let ledger = InMemoryLedger::new();
    let connector = OpenPaymentsConnector::new(
        CONFIG.connector_url.clone(),
        CONFIG.connector_token.clone(),
        call_timeout,
    )?;
    let disbursement = MpesaClient::new(
        MpesaConfig {
            consumer_key: CONFIG.mpesa_consumer_key.clone(),
            consumer_secret: CONFIG.mpesa_consumer_secret.clone(),
            short_code: CONFIG.mpesa_short_code.clone(),
            initiator_name: CONFIG.mpesa_initiator_name.clone(),
            security_credential: CONFIG.mpesa_security_credential.clone(),
            base_url: CONFIG.mpesa_base_url().to_string(),
            callback_base_url: CONFIG.app_url.clone(),
        },
        call_timeout,
    )?;
    let settings = SettlementSettings {
        connector_attempts: CONFIG.connector_attempts,
        backoff_base: Duration::from_millis(CONFIG.backoff_base_ms),
        call_timeout,
        ..Default::default()
    };

    let service = Arc::new(SettlementService::new(
        quotes,
        ledger,
        connector,
        disbursement,
        settings,
    ));

    let app = api_routes(service)
        .layer(CompressionLayer::new()) // Gzip compression
        .layer(TimeoutLayer::new(Duration::from_secs(30))) // 30-second timeout
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([http::Method::GET, http::Method::POST])
                .allow_headers([http::header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http()); // Request tracing

    let addr = SocketAddr::from(([127, 0, 0, 1], CONFIG.port));
    info!("pesabridge listening at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
