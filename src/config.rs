//! Process configuration read once at startup.
//!
//! Values come from the environment (a `.env` file is loaded by `main`).
//! Missing required values abort startup.

use std::env;

use anyhow::{Context, anyhow};

use crate::reputation::ReputationConfig;

/// Supabase project credentials used for auth and storage.
#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    /// Supabase REST API URL
    pub url: String,
    /// Anonymous key for client operations
    pub anon_key: String,
    /// Service role key for admin operations
    pub service_key: String,
    /// Storage bucket holding profile pictures
    pub avatar_bucket: String,
}

/// HTTP email API settings.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Base URL of the web client; used for links in emails.
    pub frontend_url: String,
    pub supabase: SupabaseSettings,
    pub reputation: ReputationConfig,
    /// `None` when no mail API is configured.
    pub mail: Option<MailSettings>,
}

impl Settings {
    /// Reads all settings from the environment.
    ///
    /// Required: `DATABASE_URL`, `SUPABASE_URL`, `SUPABASE_ANON_KEY`,
    /// `SUPABASE_SERVICE_KEY`, `VIRUSTOTAL_API_KEY`.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = optional("APP_PORT")
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("APP_PORT must be a port number")?
            .unwrap_or(8000);

        let mail = match (optional("MAIL_API_URL"), optional("MAIL_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(MailSettings {
                api_url,
                api_key,
                from: optional("MAIL_FROM")
                    .unwrap_or_else(|| "TruthLens AI <no-reply@truthlens.ai>".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            host: optional("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_url: required("DATABASE_URL")?,
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string())
                .trim_end_matches('/')
                .to_string(),
            supabase: SupabaseSettings {
                url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
                anon_key: required("SUPABASE_ANON_KEY")?,
                service_key: required("SUPABASE_SERVICE_KEY")?,
                avatar_bucket: optional("SUPABASE_AVATAR_BUCKET")
                    .unwrap_or_else(|| "avatars".to_string()),
            },
            reputation: ReputationConfig::from_env()?,
            mail,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).ok_or_else(|| anyhow!("{key} must be set"))
}
