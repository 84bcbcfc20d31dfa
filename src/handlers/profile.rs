//! Profile endpoints for the authenticated user.

use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::{
    AppState, SupabaseService,
    auth_middleware::AuthMiddleware,
    models::{ProfileUpdate, UserData, UserProfile},
    services::profiles,
};

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 64))]
    pub current_password: String,
    #[validate(length(min = 8, max = 64))]
    pub new_password: String,
}

/// Loads the caller's profile, or the response to send when that fails.
async fn load_profile(data: &AppState, user: &AuthMiddleware) -> Result<UserProfile, HttpResponse> {
    match profiles::find(&data.db, user.id).await {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => Err(HttpResponse::NotFound().json(serde_json::json!({"error": "profile not found"}))),
        Err(e) => {
            tracing::error!(user.id = %user.id, error = ?e, "Failed to load profile");
            Err(HttpResponse::InternalServerError().json(serde_json::json!({"error": "database error"})))
        }
    }
}

/// Returns the caller's profile for the settings page.
///
/// Missing first and last names are returned as empty strings.
#[tracing::instrument(skip(user, data), fields(user_id = %user.id))]
pub async fn my_data(user: AuthMiddleware, data: web::Data<AppState>) -> impl Responder {
    match load_profile(&data, &user).await {
        Ok(profile) => HttpResponse::Ok().json(UserData::from(profile)),
        Err(response) => response,
    }
}

/// Updates first name, last name and phone number. Absent fields are kept.
///
/// `full_name` is recomputed from the resulting names. Returns the full
/// profile.
#[tracing::instrument(skip(user, data, payload), fields(user_id = %user.id))]
pub async fn update_me(
    user: AuthMiddleware,
    data: web::Data<AppState>,
    payload: web::Json<ProfileUpdate>,
) -> impl Responder {
    if let Err(e) = payload.validate() {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}));
    }

    let mut profile = match load_profile(&data, &user).await {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    profile.apply(payload.into_inner());

    if let Err(e) = profiles::save(&data.db, &profile).await {
        tracing::error!(error = ?e, "Failed to save profile");
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({"error": format!("profile update failed: {e}")}));
    }

    HttpResponse::Ok().json(profile)
}

/// Changes the password after re-checking the current one.
///
/// # Error Responses
/// - `400 Bad Request`: validation failure or `"Incorrect current password"`
/// - `502 Bad Gateway`: Supabase unreachable
#[tracing::instrument(skip(user, data, payload), fields(user_id = %user.id))]
pub async fn change_password(
    user: AuthMiddleware,
    data: web::Data<AppState>,
    payload: web::Json<ChangePasswordRequest>,
) -> impl Responder {
    if let Err(e) = payload.validate() {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}));
    }
    let supabase = &data.settings.supabase;

    let session = match SupabaseService::login(supabase, &user.email, &payload.current_password).await
    {
        Ok(session) => session,
        Err(e) if e.is_rejection() => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "Incorrect current password"}));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to verify current password");
            return HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()}));
        }
    };

    match SupabaseService::update_password(supabase, &session.access_token, &payload.new_password)
        .await
    {
        Ok(()) => {
            tracing::info!("Password changed");
            HttpResponse::Ok().json(serde_json::json!({"message": "Password updated successfully"}))
        }
        Err(e) if e.is_rejection() => {
            HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to change password");
            HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()}))
        }
    }
}

/// Stores a new profile picture.
///
/// The raw request body is the image. Its type is detected from the content,
/// not from headers; anything that is not an image is refused with `415`.
/// The object is named `{user_id}_{unix_ts}.{ext}`.
///
/// # Success Response (200 OK)
/// ```json
/// { "message": "Avatar uploaded successfully", "avatar_url": "https://..." }
/// ```
#[tracing::instrument(skip(user, data, body), fields(user_id = %user.id, size = body.len()))]
pub async fn upload_avatar(
    user: AuthMiddleware,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> impl Responder {
    let Some(kind) = infer::get(&body) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "Could not detect image type"}));
    };
    if kind.matcher_type() != infer::MatcherType::Image {
        return HttpResponse::UnsupportedMediaType().json(serde_json::json!({
            "error": format!("Detected non-image content: {}", kind.mime_type())
        }));
    }

    let object_name = format!("{}_{}.{}", user.id, Utc::now().timestamp(), kind.extension());
    let avatar_url = match SupabaseService::upload_avatar(
        &data.settings.supabase,
        &object_name,
        kind.mime_type(),
        body.to_vec(),
    )
    .await
    {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Avatar upload failed");
            return HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()}));
        }
    };

    if let Err(e) = profiles::set_avatar(&data.db, user.id, &avatar_url).await {
        tracing::error!(error = ?e, "Failed to save avatar url");
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({"error": "database error"}));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "message": "Avatar uploaded successfully",
        "avatar_url": avatar_url,
    }))
}
