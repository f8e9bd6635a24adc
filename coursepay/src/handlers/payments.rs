use actix_web::{Error, HttpResponse, post, web};

use crate::handlers::ledger_error;
use crate::intake::{self, PaymentConfirmed};
use crate::state::AppState;

/// Inbound `PaymentConfirmed` event from the payment-gateway collaborator.
/// The gateway has already verified the signature; this endpoint is the
/// ledger intake only.
#[post("/payments/confirmed")]
pub async fn payment_confirmed(
    event: web::Json<PaymentConfirmed>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let outcome = intake::process(&app_state, &event)
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(outcome))
}
