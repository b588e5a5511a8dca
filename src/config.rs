use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub connector_url: String,
    pub connector_token: String,
    pub mpesa_consumer_key: String,
    pub mpesa_consumer_secret: String,
    pub mpesa_short_code: String,
    pub mpesa_initiator_name: String,
    pub mpesa_security_credential: String,
    pub mpesa_environment: String,
    /// Public base URL the payout rail posts callbacks to.
    pub app_url: String,
    pub call_timeout_ms: u64,
    pub connector_attempts: u32,
    pub backoff_base_ms: u64,
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            connector_url: env::var("CONNECTOR_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            connector_token: env::var("CONNECTOR_TOKEN").unwrap_or_default(),
            mpesa_consumer_key: env::var("MPESA_CONSUMER_KEY").unwrap_or_default(),
            mpesa_consumer_secret: env::var("MPESA_CONSUMER_SECRET").unwrap_or_default(),
            mpesa_short_code: env::var("MPESA_SHORTCODE").unwrap_or_else(|_| "174379".to_string()),
            mpesa_initiator_name: env::var("MPESA_INITIATOR_NAME")
                .unwrap_or_else(|_| "testapi".to_string()),
            mpesa_security_credential: env::var("MPESA_SECURITY_CREDENTIAL")
                .unwrap_or_else(|_| "test".to_string()),
            mpesa_environment: env::var("MPESA_ENVIRONMENT")
                .unwrap_or_else(|_| "sandbox".to_string()),
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            call_timeout_ms: env::var("CALL_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            connector_attempts: env::var("CONNECTOR_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            backoff_base_ms: env::var("BACKOFF_BASE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(200),
        }
    }

    pub fn mpesa_base_url(&self) -> &'static str {
        if self.mpesa_environment == "production" {
            "https://api.safaricom.co.ke"
        } else {
            "https://sandbox.safaricom.co.ke"
        }
    }
}

// Global static accessible everywhere
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
