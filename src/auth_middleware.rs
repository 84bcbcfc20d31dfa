//! Authentication extractor resolving the caller from a Supabase access token.
//!
//! # Overview
//! [`AuthMiddleware`] is an Actix Web extractor that injects a [`UserContext`]
//! into handlers. In production it sends the bearer token to Supabase Auth
//! (`GET /auth/v1/user`) and builds the context from the returned user.
//! The resolved context is also stored in the request extensions so the
//! request logger can attribute the request.
//!
//! ## Test Mode
//! When the `TEST` environment variable is set in a debug build, the headers
//! below inject a user without contacting Supabase:
//!
//! - `X-Test-User-Id`: the user's UUID
//! - `X-Test-Email`: the user's email address
//! - `X-Test-Username` (optional): the username
//!
//! ```
//! use actix_web::test::TestRequest;
//!
//! let req = TestRequest::get()
//!     .uri("/api/scan/history")
//!     .insert_header(("X-Test-User-Id", "00000000-0000-0000-0000-000000000001"))
//!     .insert_header(("X-Test-Email", "jane@example.com"))
//!     .to_request();
//! ```
//!
//! # Errors
//! Returns 401 Unauthorized when the header is missing or malformed or the
//! token is rejected, and 502 Bad Gateway when Supabase cannot be reached.

use crate::{AppState, SupabaseService};
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use serde::Deserialize;
use std::{ops::Deref, str::FromStr};
use tracing::Span;
use uuid::Uuid;

/// The authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct UserContext {
    /// Supabase user id, also the key of `user_profiles`
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
}

/// Extractor yielding the authenticated [`UserContext`].
#[derive(Debug, Clone)]
pub struct AuthMiddleware(pub UserContext);

impl Deref for AuthMiddleware {
    type Target = UserContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Builds a context from the `X-Test-*` headers, if all required ones are present.
fn test_user(req: &HttpRequest) -> Option<Result<UserContext, actix_web::Error>> {
    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
    let (id, email) = (header("X-Test-User-Id")?, header("X-Test-Email")?);

    tracing::debug!(test_user_id = %id, test_email = %email, "Using test authentication headers");

    Some(
        Uuid::from_str(id)
            .map(|id| UserContext {
                id,
                email: email.to_string(),
                username: header("X-Test-Username").map(str::to_owned),
            })
            .map_err(|e| {
                tracing::error!(test_user_id = %id, error = ?e, "Invalid UUID in test headers");
                actix_web::error::ErrorBadRequest(format!("Invalid UUID: {e}"))
            }),
    )
}

fn bearer_token(req: &HttpRequest) -> Result<String, actix_web::Error> {
    req.headers()
        .get("Authorization")
        .ok_or_else(|| {
            tracing::warn!("No Authorization header present in request");
            actix_web::error::ErrorUnauthorized("no authorization header")
        })?
        .to_str()
        .map_err(|e| {
            tracing::warn!(error = ?e, "Invalid Authorization header format");
            actix_web::error::ErrorUnauthorized(format!("invalid header format {e}"))
        })?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
        .ok_or_else(|| {
            tracing::warn!("Authorization header missing Bearer prefix");
            actix_web::error::ErrorUnauthorized("invalid auth header")
        })
}

impl FromRequest for AuthMiddleware {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        if std::env::var("TEST").is_ok() && cfg!(debug_assertions) {
            if let Some(user) = test_user(req) {
                let result = user.map(|ctx| {
                    req.extensions_mut().insert(ctx.clone());
                    AuthMiddleware(ctx)
                });
                return Box::pin(async move { result });
            }
        }

        let req = req.clone();
        let app_data = req.app_data::<actix_web::web::Data<AppState>>().cloned();
        let token = bearer_token(&req);

        Box::pin(async move {
            let token = token?;
            let app_data = app_data
                .ok_or_else(|| actix_web::error::ErrorInternalServerError("AppState missing"))?;

            tracing::debug!("Validating token with Supabase");
            let user = SupabaseService::fetch_user(&app_data.settings.supabase, &token)
                .await
                .map_err(|e| {
                    if e.is_rejection() {
                        tracing::warn!(error = %e, "Supabase rejected token authentication");
                        actix_web::error::ErrorUnauthorized("Invalid or expired token")
                    } else {
                        tracing::error!(error = %e, "Failed to validate token with Supabase");
                        actix_web::error::ErrorBadGateway("authentication service unavailable")
                    }
                })?;

            let ctx = UserContext {
                id: user.id,
                username: user.username(),
                email: user.email,
            };

            tracing::info!(user_id = %ctx.id, "User authenticated successfully");
            Span::current().record("user_id", ctx.id.to_string());
            req.extensions_mut().insert(ctx.clone());
            Ok(AuthMiddleware(ctx))
        })
    }
}
