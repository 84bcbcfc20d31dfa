//! Supabase authentication data structures and error types.
//!
//! These structures mirror the subset of Supabase Auth API responses the
//! backend reads. Unknown fields are ignored, so additions on the Supabase
//! side do not break deserialization.
//!
//! # Examples
//!
//! ```json
//! {
//!   "access_token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
//!   "token_type": "bearer",
//!   "expires_in": 3600,
//!   "refresh_token": "v1.M2YwOTQxNzktZGYwNi00...",
//!   "user": { "id": "...", "email": "jane@example.com", "user_metadata": { ... } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Session returned by Supabase Auth after a password grant or signup.
///
/// The `access_token` is a JWT to be sent as `Authorization: Bearer {access_token}`
/// on authenticated requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// JWT access token for API authentication
    pub access_token: String,

    /// Token type, typically "bearer"
    pub token_type: String,

    /// Number of seconds until the access token expires
    #[serde(default)]
    pub expires_in: i64,

    /// Refresh token for obtaining new access tokens
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// User the session belongs to
    pub user: User,
}

/// User record from Supabase Auth.
///
/// `user_metadata` carries the profile fields supplied at signup
/// (username, first and last name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier, shared with the local `user_profiles` table
    pub id: Uuid,

    /// User's email address
    #[serde(default)]
    pub email: String,

    /// Custom metadata set by this application
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Username stored in the user metadata at signup.
    pub fn username(&self) -> Option<String> {
        self.user_metadata
            .get("username")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
    }
}

/// Response to `POST /auth/v1/signup`.
///
/// With email confirmation disabled Supabase returns a session; with it
/// enabled it returns the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignupResponse {
    Session(AuthResponse),
    User(User),
}

impl SignupResponse {
    pub fn user(&self) -> &User {
        match self {
            Self::Session(session) => &session.user,
            Self::User(user) => user,
        }
    }
}

/// Error types for authentication operations.
///
/// # Error Categories
///
/// - **Supabase**: Errors returned by Supabase Auth API
/// - **Request**: Network and HTTP client errors
/// - **Parse**: JSON deserialization failures
///
/// Errors are serialized with a `type` field for client-side handling:
/// ```json
/// {
///   "type": "supabase",
///   "code": 400,
///   "error_code": "invalid_credentials",
///   "msg": "Invalid login credentials"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthError {
    /// Error response directly from Supabase.
    ///
    /// - `400`: Invalid request (weak password, invalid email format)
    /// - `401`: Invalid credentials or token
    /// - `422`: User already exists
    /// - `429`: Rate limit exceeded
    #[error("Supabase error {code}: {msg} ({error_code})")]
    Supabase {
        /// HTTP status code from Supabase API
        code: u16,
        /// Machine-readable error identifier
        error_code: String,
        /// Human-readable error message
        msg: String,
    },

    /// Network or HTTP client request failures.
    #[error("Request failed: {0}")]
    Request(String),

    /// JSON parsing or deserialization failures.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl AuthError {
    /// True when Supabase reported that the email is already registered.
    pub fn is_duplicate_email(&self) -> bool {
        matches!(
            self,
            Self::Supabase { error_code, .. }
                if error_code == "user_already_exists" || error_code == "email_exists"
        )
    }

    /// True when Supabase answered with a 4xx, i.e. the input was rejected.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Supabase { code, .. } if (400..500).contains(code))
    }
}
