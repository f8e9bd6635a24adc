use actix_web::{Error, HttpResponse, get, post, web};
use serde::Deserialize;

use crate::enrollments;
use crate::handlers::ledger_error;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LessonCompletedBody {
    pub lesson_id: String,
}

/// Inbound `LessonCompleted` event from the playback UI.
#[post("/enrollments/{id}/lessons")]
pub async fn lesson_completed(
    path: web::Path<i64>,
    body: web::Json<LessonCompletedBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let enrollment_id = path.into_inner();
    let progress = enrollments::complete_lesson(&app_state, enrollment_id, &body.lesson_id)
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "progress": progress })))
}

#[get("/enrollments/{id}/progress")]
pub async fn get_enrollment_progress(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let view = enrollments::progress(&app_state, path.into_inner())
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(view))
}

/// Re-derives the stored percentage after lessons were added or removed.
#[post("/enrollments/{id}/progress/sync")]
pub async fn sync_enrollment_progress(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let progress = enrollments::sync_progress(&app_state, path.into_inner())
        .await
        .map_err(ledger_error)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "progress": progress })))
}
