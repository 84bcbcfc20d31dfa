//! HTTP client for the VirusTotal v3 API.
//!
//! Files are looked up by SHA-256 first and only uploaded when the service has
//! never seen them. URLs are always submitted, then the analysis is polled for a
//! short, bounded time.

use std::sync::Arc;

use reqwest::{
    Client, Response, StatusCode,
    header::{HeaderMap, HeaderValue},
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use super::{
    AnalysisReport, FileReport, ReputationConfig, ReputationError, Verdict,
    score_analysis_report, score_file_report,
};

/// Largest file the remote service accepts on the plain upload endpoint.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Attributes<T> {
    attributes: T,
}

#[derive(Debug, Deserialize)]
struct AnalysisHandle {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisStatus {
    status: String,
    #[serde(default)]
    stats: AnalysisReport,
}

/// Hex-encoded SHA-256 of `bytes`, the key the remote service indexes files by.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Classifies files and URLs against the remote reputation database.
///
/// Cheap to clone; clones share the underlying connection pool. Calls are
/// independent of each other and hold no state between requests.
#[derive(Debug, Clone)]
pub struct ReputationClient {
    http: Client,
    config: Arc<ReputationConfig>,
}

impl ReputationClient {
    /// Builds a client. Fails with [`ReputationError::Configuration`] when the
    /// API key is empty or not a valid header value.
    pub fn new(config: ReputationConfig) -> Result<Self, ReputationError> {
        if config.api_key.trim().is_empty() {
            return Err(ReputationError::Configuration(
                "VIRUSTOTAL_API_KEY must not be empty".to_string(),
            ));
        }

        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|e| {
            ReputationError::Configuration(format!("invalid VIRUSTOTAL_API_KEY: {e}"))
        })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-apikey", api_key);

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Classifies a file by content hash, uploading it when the hash is unknown.
    ///
    /// Oversized content is rejected before any request is made. An upload
    /// yields a `Queued` verdict carrying the remote analysis id; uploads are
    /// never polled.
    #[tracing::instrument(skip(self, bytes), fields(filename = %filename, size = bytes.len()))]
    pub async fn classify_file(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<Verdict, ReputationError> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            tracing::warn!(limit = MAX_UPLOAD_BYTES, "Rejecting oversized file");
            return Err(ReputationError::SizeLimitExceeded {
                size: bytes.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let digest = sha256_hex(bytes);
        tracing::info!(sha256 = %digest, "Checking file hash");

        let res = self
            .http
            .get(self.endpoint(&format!("files/{digest}")))
            .send()
            .await?;

        match res.status() {
            StatusCode::OK => {
                let report: Envelope<Attributes<FileReport>> = read_json(res).await?;
                let verdict = score_file_report(&report.data.attributes);
                tracing::info!(
                    sha256 = %digest,
                    label = verdict.label.as_str(),
                    score = verdict.score,
                    "File report found"
                );
                Ok(verdict)
            }
            StatusCode::NOT_FOUND => {
                tracing::info!(sha256 = %digest, "Hash not found, uploading file");
                self.upload(bytes, filename).await
            }
            status => Err(remote_error(status, res).await),
        }
    }

    async fn upload(&self, bytes: &[u8], filename: &str) -> Result<Verdict, ReputationError> {
        let form = Form::new().part(
            "file",
            Part::bytes(bytes.to_vec()).file_name(filename.to_string()),
        );

        let res = self
            .http
            .post(self.endpoint("files"))
            .multipart(form)
            .send()
            .await?;

        if res.status() != StatusCode::OK {
            return Err(remote_error(res.status(), res).await);
        }

        let handle: Envelope<AnalysisHandle> = read_json(res).await?;
        tracing::info!(analysis_id = %handle.data.id, "File queued for scanning");
        Ok(Verdict::queued_upload(handle.data.id))
    }

    /// Submits a URL and waits for its analysis within the configured poll policy.
    ///
    /// Returns a `Queued` verdict when the analysis is still running after the
    /// last poll. Poll responses other than 200 are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn classify_url(&self, url: &str) -> Result<Verdict, ReputationError> {
        tracing::info!("Submitting URL for scanning");

        let res = self
            .http
            .post(self.endpoint("urls"))
            .form(&[("url", url)])
            .send()
            .await?;

        if res.status() != StatusCode::OK {
            return Err(remote_error(res.status(), res).await);
        }

        let handle: Envelope<AnalysisHandle> = read_json(res).await?;
        let analysis_id = handle.data.id;
        let report_url = self.endpoint(&format!("analyses/{analysis_id}"));
        let poll = self.config.poll;

        for attempt in 1..=poll.max_attempts {
            tokio::time::sleep(poll.interval).await;

            let res = self.http.get(&report_url).send().await?;
            if res.status() != StatusCode::OK {
                tracing::debug!(
                    attempt,
                    status = res.status().as_u16(),
                    "Analysis poll returned non-OK status"
                );
                continue;
            }

            let analysis: Envelope<Attributes<AnalysisStatus>> = read_json(res).await?;
            let attributes = analysis.data.attributes;
            if attributes.status == "completed" {
                let verdict = score_analysis_report(&attributes.stats);
                tracing::info!(
                    attempt,
                    analysis_id = %analysis_id,
                    label = verdict.label.as_str(),
                    "URL analysis completed"
                );
                return Ok(verdict);
            }

            tracing::debug!(attempt, status = %attributes.status, "URL analysis not ready");
        }

        tracing::info!(
            analysis_id = %analysis_id,
            attempts = poll.max_attempts,
            "URL analysis still pending after poll budget"
        );
        Ok(Verdict::queued_url())
    }
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ReputationError> {
    let body = res.text().await?;
    serde_json::from_str(&body).map_err(|e| ReputationError::MalformedResponse(e.to_string()))
}

async fn remote_error(status: StatusCode, res: Response) -> ReputationError {
    let body = res.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), body = %body, "Reputation service error");
    ReputationError::RemoteService {
        status: status.as_u16(),
        body,
    }
}
