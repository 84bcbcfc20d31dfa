//! Data models for user profiles and scan history, plus shared application state.
//!
//! Models derive Serde and SQLx traits for (de)serialization and DB mapping.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Settings,
    db,
    email::{Mailer, mailer_from_settings},
    reputation::{ReputationClient, Verdict},
};

/// Profile data kept next to the Supabase account.
///
/// `full_name` mirrors `"{first_name} {last_name}"` and is recomputed on every
/// update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    /// Same id as the Supabase user
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    /// Public URL of the profile picture
    pub avatar: Option<String>,
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
    #[validate(length(min = 5, max = 20))]
    pub phone_number: Option<String>,
}

/// Profile as shown on the settings page; missing names become empty strings.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Builds a profile for a new account.
    pub fn new(
        user_id: Uuid,
        email: String,
        username: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Self {
        let mut profile = Self {
            user_id,
            email,
            username,
            first_name,
            last_name,
            full_name: None,
            phone_number: None,
            avatar: None,
        };
        profile.refresh_full_name();
        profile
    }

    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(first_name) = update.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            self.last_name = Some(last_name);
        }
        if let Some(phone_number) = update.phone_number {
            self.phone_number = Some(phone_number);
        }
        self.refresh_full_name();
    }

    fn refresh_full_name(&mut self) {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        let full = format!("{first} {last}").trim().to_string();
        self.full_name = (!full.is_empty()).then_some(full);
    }
}

impl From<UserProfile> for UserData {
    fn from(profile: UserProfile) -> Self {
        Self {
            email: profile.email,
            username: profile.username,
            first_name: profile.first_name.unwrap_or_default(),
            last_name: profile.last_name.unwrap_or_default(),
            phone_number: profile.phone_number,
            avatar: profile.avatar,
        }
    }
}

/// What a scan was run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    File,
    Url,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Url => "url",
        }
    }
}

/// One classification performed for a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// `file` or `url`
    pub kind: String,
    /// Filename or URL that was checked
    pub target: String,
    pub label: String,
    pub score: i64,
    pub threat_level: String,
    /// Full verdict as returned to the client
    pub verdict: sqlx::types::Json<Verdict>,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn new(user_id: Uuid, kind: ScanKind, target: &str, verdict: Verdict) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind: kind.as_str().to_string(),
            target: target.to_string(),
            label: verdict.label.as_str().to_string(),
            score: i64::try_from(verdict.score).unwrap_or(i64::MAX),
            threat_level: verdict.threat_level.as_str().to_string(),
            verdict: sqlx::types::Json(verdict),
            created_at: Utc::now(),
        }
    }
}

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// SQLx Postgres connection pool
    pub db: Arc<sqlx::PgPool>,
    pub settings: Arc<Settings>,
    pub reputation: ReputationClient,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Builds the state from validated settings.
    ///
    /// The database pool connects lazily, so this does not touch the network.
    ///
    /// # Errors
    ///
    /// Fails when the database URL cannot be parsed or the reputation client
    /// rejects its configuration.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let db = db::connect_pg_pool(&settings.database_url)?;
        let reputation = ReputationClient::new(settings.reputation.clone())?;
        let mailer = mailer_from_settings(settings.mail.clone());

        Ok(Self {
            db: Arc::new(db),
            settings: Arc::new(settings),
            reputation,
            mailer,
        })
    }
}
