use actix_web::{Error, HttpResponse, get, web};

use crate::handlers::ledger_error;
use crate::state::AppState;
use crate::transactions;

/// `GetLecturerEarnings`: lifetime total, current reference-month earnings,
/// withdrawable balance, completed payouts and the newest-first history.
#[get("/lecturers/{id}/earnings")]
pub async fn get_lecturer_earnings(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let earnings = transactions::earnings(&app_state, &path.into_inner())
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(earnings))
}
