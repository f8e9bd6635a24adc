use actix_web::{Error, HttpResponse, error::InternalError, http::StatusCode, post, web};
use common::{BankDetails, WithdrawalStatus};
use serde::Deserialize;

use crate::handlers::ledger_error;
use crate::state::AppState;
use crate::withdrawals;

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequestBody {
    pub lecturer_id: String,
    pub amount: i64,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    /// Caller-supplied idempotency key. Generated when absent.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Inbound `WithdrawalRequested` event: reserves the amount and opens the
/// pending withdrawal. Retries carrying the same reference return the
/// original row.
#[post("/withdrawals")]
pub async fn request_withdrawal(
    body: web::Json<WithdrawalRequestBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();
    let bank = BankDetails {
        bank_name: body.bank_name,
        account_number: body.account_number,
        account_name: body.account_name,
    };
    let withdrawal = withdrawals::request(
        &app_state,
        &body.lecturer_id,
        body.amount,
        bank,
        body.reference.as_deref(),
    )
    .await
    .map_err(ledger_error)?;
    Ok(HttpResponse::Created().json(withdrawal))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalStatusBody {
    pub status: String,
}

/// Inbound `WithdrawalStatusChanged` from the finance back office.
#[post("/withdrawals/{id}/status")]
pub async fn change_withdrawal_status(
    path: web::Path<i64>,
    body: web::Json<WithdrawalStatusBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let to = match body.status.as_str() {
        "processing" => WithdrawalStatus::Processing,
        "completed" => WithdrawalStatus::Completed,
        "failed" => WithdrawalStatus::Failed,
        _ => {
            return Err(InternalError::new(
                "Withdrawal status must be 'processing', 'completed', or 'failed'.",
                StatusCode::BAD_REQUEST,
            )
            .into());
        }
    };

    let withdrawal = withdrawals::transition(&app_state, path.into_inner(), to)
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(withdrawal))
}
