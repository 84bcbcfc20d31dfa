//! Reputation client configuration.

use std::{env, time::Duration};

use super::ReputationError;

/// Public VirusTotal v3 endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.virustotal.com/api/v3";

/// Bounded wait used when polling a URL analysis.
///
/// The client sleeps `interval` before every attempt and gives up after
/// `max_attempts` polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(1),
        }
    }
}

impl PollPolicy {
    /// Poll without waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReputationConfig {
    /// Sent as the `x-apikey` header on every request.
    pub api_key: String,
    pub base_url: String,
    /// Upper bound for a single round-trip.
    pub timeout: Duration,
    pub poll: PollPolicy,
}

impl ReputationConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Reads the client settings from the environment.
    ///
    /// `VIRUSTOTAL_API_KEY` is required. `VIRUSTOTAL_BASE_URL`,
    /// `VIRUSTOTAL_TIMEOUT`, `VIRUSTOTAL_POLL_ATTEMPTS` and
    /// `VIRUSTOTAL_POLL_INTERVAL` are optional; durations use humantime
    /// syntax (`1s`, `500ms`).
    pub fn from_env() -> Result<Self, ReputationError> {
        let api_key = env::var("VIRUSTOTAL_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ReputationError::Configuration(
                    "VIRUSTOTAL_API_KEY not found in environment variables".to_string(),
                )
            })?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = env::var("VIRUSTOTAL_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(timeout) = env_duration("VIRUSTOTAL_TIMEOUT")? {
            config.timeout = timeout;
        }
        if let Some(interval) = env_duration("VIRUSTOTAL_POLL_INTERVAL")? {
            config.poll.interval = interval;
        }
        if let Ok(raw) = env::var("VIRUSTOTAL_POLL_ATTEMPTS") {
            config.poll.max_attempts = raw.trim().parse().map_err(|e| {
                ReputationError::Configuration(format!("VIRUSTOTAL_POLL_ATTEMPTS: {e}"))
            })?;
        }

        Ok(config)
    }
}

fn env_duration(key: &str) -> Result<Option<Duration>, ReputationError> {
    match env::var(key) {
        Ok(raw) => humantime::parse_duration(raw.trim())
            .map(Some)
            .map_err(|e| ReputationError::Configuration(format!("{key}: {e}"))),
        Err(_) => Ok(None),
    }
}
