use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::connector::{ConnectorClient, TransferReceipt, TransferRequest};
use crate::error::PaymentError;
use crate::money::{Money, AMOUNT_SCALE};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAmount {
    value: String,
    asset_code: &'static str,
    asset_scale: u32,
}

impl WireAmount {
    fn from_money(money: &Money) -> Self {
        Self {
            value: money.minor_units().to_string(),
            asset_code: money.currency().code(),
            asset_scale: AMOUNT_SCALE,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingPaymentRequest {
    source_amount: WireAmount,
    receive_amount: WireAmount,
    receiver: String,
}

#[derive(Deserialize)]
struct OutgoingPaymentResponse {
    id: String,
}

/// Live connector client speaking an Open-Payments style outgoing-payment
/// API. Auth is a pass-through bearer credential from configuration.
#[derive(Clone)]
pub struct OpenPaymentsConnector {
    http: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl OpenPaymentsConnector {
    pub fn new(
        base_url: String,
        auth_token: String,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PaymentError::Internal(format!("http client: {err}")))?;
        Ok(Self {
            http,
            base_url,
            auth_token,
        })
    }
}

#[async_trait]
impl ConnectorClient for OpenPaymentsConnector {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentError> {
        let body = OutgoingPaymentRequest {
            source_amount: WireAmount::from_money(&request.source_amount),
            receive_amount: WireAmount::from_money(&request.destination_amount),
            receiver: request.destination_account.clone(),
        };

        let response = self
            .http
            .post(format!("{}/outgoing-payments", self.base_url))
            .bearer_auth(&self.auth_token)
            .header("Idempotency-Key", request.transaction_id.to_string())
            .json(&body)
            .send()
            .await
            .map_err(|err| PaymentError::ConnectorUnavailable(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let payment: OutgoingPaymentResponse = response
                .json()
                .await
                .map_err(|err| PaymentError::ConnectorUnavailable(format!("bad response: {err}")))?;
            return Ok(TransferReceipt {
                provider_id: payment.id,
                settled_amount: request.destination_amount,
            });
        }

        let detail = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(PaymentError::ConnectorRejected(format!("{status}: {detail}")))
        } else {
            Err(PaymentError::ConnectorUnavailable(format!("{status}: {detail}")))
        }
    }
}
