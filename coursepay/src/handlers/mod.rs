mod commissions;
mod earnings;
mod enrollments;
mod payments;
mod withdrawals;

use actix_web::{Error, HttpResponse, Responder, error::InternalError, get, http::StatusCode};
pub use commissions::*;
use common::LedgerError;
pub use earnings::*;
pub use enrollments::*;
pub use payments::*;
pub use withdrawals::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Welcome to the Coursepay Ledger Service!")
}

/// Maps ledger errors onto HTTP: caller mistakes are 4xx with the specific
/// message, infrastructure failures are logged and hidden behind a 500.
pub(crate) fn ledger_error(e: LedgerError) -> Error {
    let status = match &e {
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::IllegalTransition { .. } | LedgerError::Conflict => StatusCode::CONFLICT,
        _ if e.is_validation() => StatusCode::BAD_REQUEST,
        LedgerError::Database(inner) => {
            log::error!("Database error: {}", inner);
            return InternalError::new(
                "Internal error. Please try again later.",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into();
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    InternalError::new(e.to_string(), status).into()
}
