use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::disbursement::{DisbursementClient, PayoutReceipt, PayoutRequest};
use crate::error::PaymentError;

// Refresh this long before the provider-reported expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct MpesaConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub short_code: String,
    pub initiator_name: String,
    pub security_credential: String,
    pub base_url: String,
    /// Public base URL the rail posts result/timeout callbacks to.
    pub callback_base_url: String,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    // the sandbox returns this as a string, e.g. "3599"
    expires_in: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct B2cRequest {
    initiator_name: String,
    security_credential: String,
    #[serde(rename = "CommandID")]
    command_id: &'static str,
    amount: i64,
    party_a: String,
    party_b: String,
    remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    queue_time_out_url: String,
    #[serde(rename = "ResultURL")]
    result_url: String,
    occasion: &'static str,
}

#[derive(Deserialize)]
struct B2cResponse {
    #[serde(rename = "ConversationID")]
    conversation_id: String,
}

/// M-Pesa B2C client. The OAuth bearer token is a process-wide cached
/// credential shared by concurrent payouts; refresh happens under the write
/// lock with a re-check so only one task hits the token endpoint.
#[derive(Clone)]
pub struct MpesaClient {
    http: reqwest::Client,
    config: MpesaConfig,
    session: Arc<RwLock<Option<CachedToken>>>,
}

impl MpesaClient {
    pub fn new(config: MpesaConfig, timeout: Duration) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PaymentError::Internal(format!("http client: {err}")))?;
        Ok(Self {
            http,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    async fn bearer_token(&self) -> Result<String, PaymentError> {
        {
            let session = self.session.read().await;
            if let Some(cached) = session.as_ref() {
                if cached.is_fresh() {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut session = self.session.write().await;
        // another payout may have refreshed while we waited for the lock
        if let Some(cached) = session.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.token.clone());
            }
        }

        let fetched = self.fetch_token().await?;
        let token = fetched.token.clone();
        *session = Some(fetched);
        Ok(token)
    }

    async fn fetch_token(&self) -> Result<CachedToken, PaymentError> {
        let basic = BASE64.encode(format!(
            "{}:{}",
            self.config.consumer_key, self.config.consumer_secret
        ));
        let response = self
            .http
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.config.base_url
            ))
            .header(http::header::AUTHORIZATION, format!("Basic {basic}"))
            .send()
            .await
            .map_err(|err| PaymentError::AuthFailure(err.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::AuthFailure(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| PaymentError::AuthFailure(format!("bad token response: {err}")))?;
        let lifetime = token.expires_in.parse::<u64>().unwrap_or(3600);
        debug!(expires_in = lifetime, "fetched disbursement session token");

        Ok(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime).saturating_sub(TOKEN_EXPIRY_MARGIN),
        })
    }
}

fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('+');
    match trimmed.strip_prefix('0') {
        Some(rest) => format!("254{rest}"),
        None => trimmed.to_string(),
    }
}

#[async_trait]
impl DisbursementClient for MpesaClient {
    async fn refresh_session(&self) -> Result<(), PaymentError> {
        {
            let mut session = self.session.write().await;
            *session = None;
        }
        self.bearer_token().await.map(|_| ())
    }

    async fn payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, PaymentError> {
        let token = self.bearer_token().await?;

        // The rail only accepts whole currency units; truncated exactly once
        // here, never rounded up.
        let body = B2cRequest {
            initiator_name: self.config.initiator_name.clone(),
            security_credential: self.config.security_credential.clone(),
            command_id: "BusinessPayment",
            amount: request.amount.whole_units_truncated(),
            party_a: self.config.short_code.clone(),
            party_b: normalize_phone(&request.recipient_phone),
            remarks: format!("Payment for transaction {}", request.transaction_id),
            queue_time_out_url: format!(
                "{}/disbursements/callback",
                self.config.callback_base_url
            ),
            result_url: format!("{}/disbursements/callback", self.config.callback_base_url),
            occasion: "Freelancer payment",
        };

        let response = self
            .http
            .post(format!(
                "{}/mpesa/b2c/v1/paymentrequest",
                self.config.base_url
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    // the request may have been received; outcome unknown
                    PaymentError::PayoutTimeout(err.to_string())
                } else {
                    PaymentError::PayoutRejected(format!("transport error: {err}"))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let accepted: B2cResponse = response
                .json()
                .await
                .map_err(|err| PaymentError::PayoutTimeout(format!("bad response: {err}")))?;
            return Ok(PayoutReceipt {
                provider_reference: accepted.conversation_id,
            });
        }

        let detail = response.text().await.unwrap_or_default();
        if status == http::StatusCode::UNAUTHORIZED {
            Err(PaymentError::AuthFailure(format!("{status}: {detail}")))
        } else if status.is_client_error() {
            Err(PaymentError::PayoutRejected(format!("{status}: {detail}")))
        } else {
            // 5xx: the provider may have accepted the payout before failing
            Err(PaymentError::PayoutTimeout(format!("{status}: {detail}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_phone;

    #[test]
    fn local_phone_numbers_gain_country_code() {
        assert_eq!(normalize_phone("0712345678"), "254712345678");
    }

    #[test]
    fn international_phone_numbers_pass_through() {
        assert_eq!(normalize_phone("+254712345678"), "254712345678");
        assert_eq!(normalize_phone("254712345678"), "254712345678");
    }
}
