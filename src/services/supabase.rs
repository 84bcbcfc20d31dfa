//! Supabase service abstraction for authentication, recovery and avatar storage.
//!
//! Passwords, sessions and recovery tokens live entirely in Supabase Auth; this
//! module only forwards requests and maps responses into [`AuthError`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use truthlens_server::services::SupabaseService;
//!
//! # async fn run(settings: &truthlens_server::config::SupabaseSettings) -> Result<(), truthlens_server::data::AuthError> {
//! let session = SupabaseService::login(settings, "jane@example.com", "secure_password").await?;
//! println!("token expires in {}s", session.expires_in);
//! # Ok(())
//! # }
//! ```

use reqwest::{Response, StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    config::SupabaseSettings,
    handlers::data::{AuthError, AuthResponse, SignupResponse, User},
};

/// Error body returned by Supabase Auth.
#[derive(Debug, Deserialize)]
pub struct SupabaseErrorResponse {
    /// HTTP status code indicating the type of error
    pub code: u16,
    /// Machine-readable error identifier
    #[serde(default)]
    pub error_code: String,
    /// Human-readable error message
    pub msg: String,
}

/// Older GoTrue endpoints answer with the OAuth error shape instead.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Response of `admin/generate_link`. Newer GoTrue versions put the link
/// properties at the top level, older ones nest them under `properties`.
#[derive(Debug, Deserialize)]
struct GenerateLinkResponse {
    hashed_token: Option<String>,
    properties: Option<LinkProperties>,
}

#[derive(Debug, Deserialize)]
struct LinkProperties {
    hashed_token: Option<String>,
}

/// Service layer for Supabase operations.
pub struct SupabaseService;

impl SupabaseService {
    /// Creates an account. `metadata` is stored as the user's `user_metadata`.
    ///
    /// # Errors
    ///
    /// * `AuthError::Request` - network failure
    /// * `AuthError::Parse` - unexpected response body
    /// * `AuthError::Supabase` - rejected by Supabase (duplicate email, weak password, ...)
    pub async fn register(
        settings: &SupabaseSettings,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignupResponse, AuthError> {
        let res = reqwest::Client::new()
            .post(format!("{}/auth/v1/signup", settings.url))
            .header("apikey", &settings.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(connect_error)?;

        parse_response(res).await
    }

    /// Exchanges email and password for a session.
    pub async fn login(
        settings: &SupabaseSettings,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        let res = reqwest::Client::new()
            .post(format!(
                "{}/auth/v1/token?grant_type=password",
                settings.url
            ))
            .header("apikey", &settings.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .map_err(connect_error)?;

        parse_response(res).await
    }

    /// Resolves an access token to its user.
    pub async fn fetch_user(
        settings: &SupabaseSettings,
        access_token: &str,
    ) -> Result<User, AuthError> {
        let res = reqwest::Client::new()
            .get(format!("{}/auth/v1/user", settings.url))
            .bearer_auth(access_token)
            .header("apikey", &settings.anon_key)
            .send()
            .await
            .map_err(connect_error)?;

        parse_response(res).await
    }

    /// Issues a password recovery token for `email`.
    ///
    /// Uses the admin API so Supabase does not mail anything itself. The
    /// returned value is the hashed token; the caller embeds it in its own
    /// link and later trades it for a session with [`Self::verify_recovery`].
    pub async fn recovery_token(
        settings: &SupabaseSettings,
        email: &str,
    ) -> Result<String, AuthError> {
        let res = reqwest::Client::new()
            .post(format!("{}/auth/v1/admin/generate_link", settings.url))
            .bearer_auth(&settings.service_key)
            .header("apikey", &settings.service_key)
            .json(&serde_json::json!({
                "type": "recovery",
                "email": email,
            }))
            .send()
            .await
            .map_err(connect_error)?;

        let link: GenerateLinkResponse = parse_response(res).await?;
        link.hashed_token
            .or_else(|| link.properties.and_then(|p| p.hashed_token))
            .ok_or_else(|| AuthError::Parse("generate_link response has no hashed_token".into()))
    }

    /// Exchanges a recovery token for a session of the account it was issued for.
    pub async fn verify_recovery(
        settings: &SupabaseSettings,
        token_hash: &str,
    ) -> Result<AuthResponse, AuthError> {
        let res = reqwest::Client::new()
            .post(format!("{}/auth/v1/verify", settings.url))
            .header("apikey", &settings.anon_key)
            .json(&serde_json::json!({
                "type": "recovery",
                "token_hash": token_hash,
            }))
            .send()
            .await
            .map_err(connect_error)?;

        parse_response(res).await
    }

    /// Deletes an account. Used to undo a signup whose profile could not be stored.
    pub async fn delete_user(settings: &SupabaseSettings, user_id: Uuid) -> Result<(), AuthError> {
        let res = reqwest::Client::new()
            .delete(format!("{}/auth/v1/admin/users/{user_id}", settings.url))
            .bearer_auth(&settings.service_key)
            .header("apikey", &settings.service_key)
            .send()
            .await
            .map_err(connect_error)?;

        expect_success(res).await
    }

    /// Sets a new password for the user owning `access_token`.
    ///
    /// Works both with a regular session token and with the token issued by a
    /// recovery link.
    pub async fn update_password(
        settings: &SupabaseSettings,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let res = reqwest::Client::new()
            .put(format!("{}/auth/v1/user", settings.url))
            .bearer_auth(access_token)
            .header("apikey", &settings.anon_key)
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await
            .map_err(connect_error)?;

        let _: User = parse_response(res).await?;
        Ok(())
    }

    /// Stores an avatar image in Supabase Storage and returns its public URL.
    pub async fn upload_avatar(
        settings: &SupabaseSettings,
        object_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AuthError> {
        let res = reqwest::Client::new()
            .post(format!(
                "{}/storage/v1/object/{}/{object_name}",
                settings.url, settings.avatar_bucket
            ))
            .bearer_auth(&settings.service_key)
            .header("apikey", &settings.service_key)
            .header(CONTENT_TYPE, mime)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(connect_error)?;

        expect_success(res).await?;
        Ok(format!(
            "{}/storage/v1/object/public/{}/{object_name}",
            settings.url, settings.avatar_bucket
        ))
    }
}

fn connect_error(e: reqwest::Error) -> AuthError {
    AuthError::Request(format!(
        "Unable to connect to authentication service. Please try again later. (Error: {e})"
    ))
}

async fn read_body(res: Response) -> Result<(StatusCode, String), AuthError> {
    let status = res.status();
    let body = res.text().await.map_err(|e| {
        AuthError::Request(format!(
            "Received an invalid response from authentication service. (Error: {e})"
        ))
    })?;
    Ok((status, body))
}

async fn parse_response<T: DeserializeOwned>(res: Response) -> Result<T, AuthError> {
    let (status, body) = read_body(res).await?;
    if !status.is_success() {
        return Err(error_from(status, body));
    }

    serde_json::from_str(&body).map_err(|e| {
        AuthError::Parse(format!(
            "Received an invalid response from authentication service. (Error: {e})"
        ))
    })
}

/// Like [`parse_response`] for endpoints whose success body is irrelevant or empty.
async fn expect_success(res: Response) -> Result<(), AuthError> {
    let (status, body) = read_body(res).await?;
    if status.is_success() {
        Ok(())
    } else {
        Err(error_from(status, body))
    }
}

fn error_from(status: StatusCode, body: String) -> AuthError {
    if let Ok(s) = serde_json::from_str::<SupabaseErrorResponse>(&body) {
        return AuthError::Supabase {
            code: s.code,
            error_code: s.error_code,
            msg: s.msg,
        };
    }

    if let Ok(o) = serde_json::from_str::<OAuthErrorResponse>(&body) {
        return AuthError::Supabase {
            code: status.as_u16(),
            error_code: o.error,
            msg: o.error_description,
        };
    }

    AuthError::Supabase {
        code: status.as_u16(),
        error_code: "unexpected_response".to_string(),
        msg: body,
    }
}
