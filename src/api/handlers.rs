use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::api::models::*;
use crate::connector::open_payments::OpenPaymentsConnector;
use crate::disbursement::mpesa::MpesaClient;
use crate::error::PaymentError;
use crate::ledger::{in_memory::InMemoryLedger, ReconciledOutcome};
use crate::models::{PricedQuote, Transaction};
use crate::service::{PaymentOrder, SettlementService};

/// Concrete service the server wires at startup.
pub type AppService = SettlementService<InMemoryLedger, OpenPaymentsConnector, MpesaClient>;

// Newtype wrapper for PaymentError to implement IntoResponse
pub struct ApiError(PaymentError);

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            PaymentError::InvalidInput(_, _)
            | PaymentError::CurrencyMismatch(_, _)
            | PaymentError::AmountOutOfRange => StatusCode::BAD_REQUEST,
            PaymentError::UnsupportedCurrencyPair(_, _) => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::InvalidTransition { .. }
            | PaymentError::NotAwaitingReconciliation(_) => StatusCode::CONFLICT,
            PaymentError::ConnectorUnavailable(_)
            | PaymentError::ConnectorRejected(_)
            | PaymentError::AuthFailure(_)
            | PaymentError::PayoutRejected(_)
            | PaymentError::PayoutTimeout(_) => StatusCode::BAD_GATEWAY,
            PaymentError::Storage(_) | PaymentError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

pub fn api_routes(service: Arc<AppService>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/quotes", post(create_quote))
        .route("/payments", post(create_payment))
        .route("/transactions", get(list_transactions))
        .route("/transactions/{transaction_id}", get(get_transaction))
        .route("/disbursements/callback", post(disbursement_callback))
        .with_state(service)
}

async fn health() -> &'static str {
    "OK"
}

async fn create_quote(
    State(service): State<Arc<AppService>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<PricedQuote>, ApiError> {
    let source = req.source_currency.parse()?;
    let target = match &req.target_currency {
        Some(code) => Some(code.parse()?),
        None => None,
    };
    Ok(Json(service.get_quote(source, target, req.source_amount)?))
}

async fn create_payment(
    State(service): State<Arc<AppService>>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let currency = req.currency.parse()?;
    let receipt = service
        .process(PaymentOrder {
            client_id: req.client_id,
            freelancer_id: req.freelancer_id,
            amount: req.amount,
            currency,
            recipient_phone: req.recipient_phone,
            idempotency_key: req.idempotency_key,
        })
        .await?;
    Ok(Json(PaymentResponse {
        status: receipt.status,
        transaction_id: receipt.transaction_id,
        message: receipt.message,
    }))
}

async fn list_transactions(
    State(service): State<Arc<AppService>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(
        service.list_transactions(query.limit.unwrap_or(50)).await?,
    ))
}

async fn get_transaction(
    State(service): State<Arc<AppService>>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Transaction>, ApiError> {
    Ok(Json(service.get_transaction(transaction_id).await?))
}

async fn disbursement_callback(
    State(service): State<Arc<AppService>>,
    Json(callback): Json<DisbursementCallback>,
) -> Result<Json<Transaction>, ApiError> {
    let outcome = match callback.outcome {
        CallbackOutcome::Paid => ReconciledOutcome::Paid {
            provider_reference: callback.provider_reference.ok_or_else(|| {
                PaymentError::InvalidInput(
                    "provider_reference".to_string(),
                    "required for a paid outcome".to_string(),
                )
            })?,
        },
        CallbackOutcome::Unpaid => ReconciledOutcome::Unpaid,
    };
    Ok(Json(
        service
            .report_async_result(callback.transaction_id, outcome)
            .await?,
    ))
}
