//! Reputation scan endpoints.
//!
//! Each scan classifies its target through [`ReputationClient`](crate::reputation::ReputationClient),
//! returns the verdict and records it in the caller's history on a
//! background task.

use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use validator::Validate;

use crate::{
    AppState,
    auth_middleware::AuthMiddleware,
    models::ScanKind,
    reputation::ReputationError,
    services::scan_history,
};

#[derive(Debug, Deserialize, Validate)]
pub struct ScanFileQuery {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScanUrlRequest {
    #[validate(url)]
    pub url: String,
}

/// Classifies an uploaded file.
///
/// # Request
/// `POST /api/scan/file?filename=report.pdf` with the file as the raw body.
///
/// # Success Response (200 OK)
/// A verdict, e.g. for a known file:
/// ```json
/// {
///   "label": "Malicious",
///   "score": 10,
///   "malicious_count": 7,
///   "total_engines": 70,
///   "threat_level": "High",
///   "signature": "EngineA",
///   "analysis": "Flagged by 7/70 vendors."
/// }
/// ```
/// Unknown files are uploaded for analysis and come back as `Queued` with
/// an `analysis_id`.
///
/// # Error Responses
/// - `400 Bad Request`: missing or invalid `filename`
/// - `413 Payload Too Large`: file above 32 MiB (nothing is sent upstream)
/// - `502 Bad Gateway`: reputation service failure
#[tracing::instrument(
    skip(user, data, query, body),
    fields(user_id = %user.id, filename = %query.filename, size = body.len())
)]
pub async fn scan_file(
    user: AuthMiddleware,
    data: web::Data<AppState>,
    query: web::Query<ScanFileQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ReputationError> {
    if let Err(e) = query.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})));
    }

    let verdict = data.reputation.classify_file(&body, &query.filename).await?;
    tracing::info!(label = verdict.label.as_str(), score = verdict.score, "File classified");

    scan_history::record_in_background(
        data.db.clone(),
        user.id,
        ScanKind::File,
        &query.filename,
        verdict.clone(),
    );
    Ok(HttpResponse::Ok().json(verdict))
}

/// Classifies a URL.
///
/// Submits the URL and polls its analysis a bounded number of times. When
/// the analysis has not finished, the verdict is `Queued`.
///
/// # Request Body (JSON)
/// ```json
/// { "url": "https://example.com/login" }
/// ```
#[tracing::instrument(skip(user, data, payload), fields(user_id = %user.id))]
pub async fn scan_url(
    user: AuthMiddleware,
    data: web::Data<AppState>,
    payload: web::Json<ScanUrlRequest>,
) -> Result<HttpResponse, ReputationError> {
    if let Err(e) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})));
    }

    let verdict = data.reputation.classify_url(&payload.url).await?;
    tracing::info!(label = verdict.label.as_str(), score = verdict.score, "URL classified");

    scan_history::record_in_background(
        data.db.clone(),
        user.id,
        ScanKind::Url,
        &payload.url,
        verdict.clone(),
    );
    Ok(HttpResponse::Ok().json(verdict))
}

/// Lists the caller's scans, newest first.
#[tracing::instrument(skip(user, data), fields(user_id = %user.id))]
pub async fn history(user: AuthMiddleware, data: web::Data<AppState>) -> impl Responder {
    match scan_history::for_user(&data.db, user.id).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            tracing::error!(error = ?e, "Failed to load scan history");
            HttpResponse::InternalServerError().json(serde_json::json!({"error": "database error"}))
        }
    }
}
