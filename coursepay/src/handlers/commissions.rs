use actix_web::{Error, HttpResponse, get, post, web};
use common::BankDetails;
use serde::Deserialize;

use crate::commissions;
use crate::handlers::ledger_error;
use crate::state::AppState;

/// Admin approval of a pending commission.
#[post("/commissions/{id}/approve")]
pub async fn approve_commission(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let commission = commissions::approve(&app_state, path.into_inner())
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(commission))
}

/// Admin settlement of an approved or in-flight commission.
#[post("/commissions/{id}/paid")]
pub async fn mark_commission_paid(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let commission = commissions::mark_paid(&app_state, path.into_inner())
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(commission))
}

#[derive(Debug, Deserialize)]
pub struct PayoutRequestBody {
    pub amount: i64,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

#[post("/affiliates/{id}/payouts")]
pub async fn request_affiliate_payout(
    path: web::Path<String>,
    body: web::Json<PayoutRequestBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();
    let bank = BankDetails {
        bank_name: body.bank_name,
        account_number: body.account_number,
        account_name: body.account_name,
    };
    let payout = commissions::request_payout(&app_state, &path.into_inner(), body.amount, bank)
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Created().json(payout))
}

#[get("/affiliates/{id}/commissions")]
pub async fn get_commission_summary(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let summary = commissions::summary(&app_state, &path.into_inner())
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(summary))
}
