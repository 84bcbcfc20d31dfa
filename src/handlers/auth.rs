//! Account endpoints: registration, login and password recovery.
//!
//! Credentials live in Supabase Auth; the local `user_profiles` table only
//! holds profile fields keyed by the Supabase user id.

use actix_web::{HttpResponse, Responder, web};
use reqwest::Url;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState, SupabaseService,
    config::SupabaseSettings,
    email::{OutgoingEmail, send_in_background, templates},
    models::{UserData, UserProfile},
    services::profiles,
};

pub const RESET_LINK_SENT: &str = "If the email exists, a reset link has been sent.";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, max = 254))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    /// Hashed recovery token from the `token` query parameter of the emailed link
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8, max = 64))]
    pub new_password: String,
}

/// Registers a new account.
///
/// # Request Body (JSON)
/// ```json
/// {
///   "username": "jane",
///   "email": "Jane@Example.com",
///   "password": "SecurePass123",
///   "first_name": "Jane",
///   "last_name": "Doe"
/// }
/// ```
///
/// The email is lower-cased before use. The username must be unused.
///
/// # Success Response (200 OK)
/// The stored profile (see [`UserData`]).
///
/// # Error Responses
/// - `400 Bad Request`: validation failure, `"Username already registered"`,
///   `"Email already registered"` or another rejection by Supabase
/// - `500 Internal Server Error`: database failure
/// - `502 Bad Gateway`: Supabase unreachable
///
/// # Side Effects
/// - Creates the Supabase account with username and names as metadata
/// - Inserts the `user_profiles` row, deleting the Supabase account again
///   when that fails
/// - Sends the welcome email in the background
#[tracing::instrument(skip(data, form), fields(username = %form.username))]
pub async fn register(
    data: web::Data<AppState>,
    form: web::Json<RegisterRequest>,
) -> impl Responder {
    if let Err(e) = form.validate() {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}));
    }
    let form = form.into_inner();
    let email = form.email.to_lowercase();

    match profiles::username_taken(&data.db, &form.username).await {
        Ok(true) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "Username already registered"}));
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(error = ?e, "Failed to check username availability");
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "database error"}));
        }
    }

    let metadata = serde_json::json!({
        "username": form.username,
        "first_name": form.first_name,
        "last_name": form.last_name,
    });

    let db = data.db.clone();
    let profile_email = email.clone();
    let RegisterRequest {
        username,
        password,
        first_name,
        last_name,
        ..
    } = form;
    let stored = open_account(
        &data.settings.supabase,
        &email,
        &password,
        metadata,
        |user_id| async move {
            let profile = UserProfile::new(user_id, profile_email, username, first_name, last_name);
            profiles::insert(&db, &profile).await.map(|()| profile)
        },
    )
    .await;
    let profile = match stored {
        Ok(profile) => profile,
        Err(response) => return response,
    };

    let dashboard = format!("{}/dashboard", data.settings.frontend_url);
    send_in_background(
        data.mailer.clone(),
        OutgoingEmail::new(
            templates::WELCOME_SUBJECT,
            vec![profile.email.clone()],
            templates::welcome(&profile.username, &dashboard),
        ),
    );

    tracing::info!(user.id = %profile.user_id, "User registration completed successfully");
    HttpResponse::Ok().json(UserData::from(profile))
}

/// Creates the Supabase account, then stores the local profile for its id.
///
/// When `store_profile` fails the Supabase user is deleted again, so the
/// email can be registered once more.
async fn open_account<T, F, Fut>(
    settings: &SupabaseSettings,
    email: &str,
    password: &str,
    metadata: serde_json::Value,
    store_profile: F,
) -> Result<T, HttpResponse>
where
    F: FnOnce(Uuid) -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let signup = match SupabaseService::register(settings, email, password, metadata).await {
        Ok(res) => res,
        Err(e) if e.is_duplicate_email() => {
            return Err(HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "Email already registered"})));
        }
        Err(e) if e.is_rejection() => {
            tracing::warn!(error = %e, "Supabase rejected registration");
            return Err(HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})));
        }
        Err(e) => {
            tracing::error!(error = %e, "User registration failed");
            return Err(HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()})));
        }
    };
    let user_id = signup.user().id;

    match store_profile(user_id).await {
        Ok(stored) => Ok(stored),
        Err(e) => {
            tracing::error!(user.id = %user_id, error = ?e, "Profile insert failed");
            if let Err(del) = SupabaseService::delete_user(settings, user_id).await {
                tracing::error!(user.id = %user_id, error = %del, "Failed to remove Supabase user");
            }
            if profiles::username_conflict(&e) {
                return Err(HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "Username already registered"})));
            }
            Err(HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": format!("profile insert failed: {e}")})))
        }
    }
}

/// Authenticates with username or email and password.
///
/// The identifier is first looked up as a username; otherwise it is treated
/// as an email address (lower-cased).
///
/// # Success Response (200 OK)
/// ```json
/// { "access_token": "eyJhbGciOiJIUzI1NiIs...", "token_type": "bearer" }
/// ```
///
/// # Error Responses
/// - `400 Bad Request`: validation failure
/// - `401 Unauthorized`: `"Incorrect username or password"`
/// - `502 Bad Gateway`: Supabase unreachable
#[tracing::instrument(skip(data, form))]
pub async fn login(data: web::Data<AppState>, form: web::Json<LoginRequest>) -> impl Responder {
    if let Err(e) = form.validate() {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}));
    }

    let email = match profiles::email_for_username(&data.db, &form.username).await {
        Ok(Some(email)) => email,
        Ok(None) => form.username.to_lowercase(),
        Err(e) => {
            tracing::error!(error = ?e, "Failed to resolve username");
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "database error"}));
        }
    };

    match SupabaseService::login(&data.settings.supabase, &email, &form.password).await {
        Ok(session) => {
            tracing::info!(user.id = %session.user.id, "User login successful");
            HttpResponse::Ok().json(serde_json::json!({
                "access_token": session.access_token,
                "token_type": "bearer",
            }))
        }
        Err(e) if e.is_rejection() => {
            tracing::warn!(error = %e, "User login failed");
            HttpResponse::Unauthorized()
                .insert_header(("WWW-Authenticate", "Bearer"))
                .json(serde_json::json!({"error": "Incorrect username or password"}))
        }
        Err(e) => {
            tracing::error!(error = %e, "User login failed");
            HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()}))
        }
    }
}

/// Starts password recovery.
///
/// Always answers with the same message so the endpoint does not reveal
/// which addresses have accounts. When Supabase issues a recovery token, the
/// reset email links to `{frontend_url}/auth/forgot-password?token={token}`
/// and is sent in the background.
#[tracing::instrument(skip(data, form))]
pub async fn forgot_password(
    data: web::Data<AppState>,
    form: web::Json<ForgotPasswordRequest>,
) -> impl Responder {
    if form.validate().is_err() {
        return HttpResponse::Ok().json(serde_json::json!({"message": RESET_LINK_SENT}));
    }
    let email = form.email.to_lowercase();

    match SupabaseService::recovery_token(&data.settings.supabase, &email).await {
        Ok(token) => match Url::parse_with_params(
            &format!("{}/auth/forgot-password", data.settings.frontend_url),
            &[("token", &token)],
        ) {
            Ok(link) => send_in_background(
                data.mailer.clone(),
                OutgoingEmail::new(
                    templates::PASSWORD_RESET_SUBJECT,
                    vec![email],
                    templates::password_reset(link.as_str()),
                ),
            ),
            Err(e) => {
                tracing::error!(error = %e, "Invalid frontend url for reset link");
            }
        },
        Err(e) if e.is_rejection() => {
            tracing::info!(error = %e, "No recovery token issued");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to request recovery token");
        }
    }

    HttpResponse::Ok().json(serde_json::json!({"message": RESET_LINK_SENT}))
}

/// Sets a new password using the token from a reset email.
///
/// The token is exchanged for a recovery session first; the password is then
/// updated with that session.
///
/// # Error Responses
/// - `400 Bad Request`: validation failure or `"Invalid token"` (unknown or expired)
/// - `502 Bad Gateway`: Supabase unreachable
#[tracing::instrument(skip(data, form))]
pub async fn reset_password(
    data: web::Data<AppState>,
    form: web::Json<ResetPasswordRequest>,
) -> impl Responder {
    if let Err(e) = form.validate() {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}));
    }
    let supabase = &data.settings.supabase;

    let session = match SupabaseService::verify_recovery(supabase, &form.token).await {
        Ok(session) => session,
        Err(e) if e.is_rejection() => {
            tracing::warn!(error = %e, "Recovery token rejected");
            return HttpResponse::BadRequest().json(serde_json::json!({"error": "Invalid token"}));
        }
        Err(e) => {
            tracing::error!(error = %e, "Recovery token check failed");
            return HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()}));
        }
    };

    match SupabaseService::update_password(supabase, &session.access_token, &form.new_password)
        .await
    {
        Ok(()) => {
            tracing::info!(user.id = %session.user.id, "Password reset completed");
            HttpResponse::Ok().json(serde_json::json!({"message": "Password updated successfully"}))
        }
        Err(e) if e.is_rejection() => {
            tracing::warn!(error = %e, "Password reset rejected");
            HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}))
        }
        Err(e) => {
            tracing::error!(error = %e, "Password reset failed");
            HttpResponse::BadGateway().json(serde_json::json!({"error": e.to_string()}))
        }
    }
}
