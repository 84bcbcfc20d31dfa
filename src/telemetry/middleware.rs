//! Request logging middleware.
//!
//! Logs one line per finished request with method, path, status, latency
//! and (when the route authenticated the caller) the user id. Slow and
//! suspicious requests get an additional warning.

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use futures::future::{LocalBoxFuture, Ready, ok};
use std::{
    task::{Context, Poll},
    time::{Duration, Instant},
};
use uuid::Uuid;

use crate::auth_middleware::UserContext;

/// Requests slower than this are reported as slow.
const SLOW_REQUEST: Duration = Duration::from_secs(2);

#[derive(Clone, Default)]
pub struct RequestLoggingMiddleware;

impl RequestLoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLoggingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggingService { service })
    }
}

pub struct RequestLoggingService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();

        let method = req.method().to_string();
        let path = req.path().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();
        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let fut = self.service.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let duration = start_time.elapsed();
            let status_code = response.status().as_u16();
            // Set by the auth extractor when the route required a user.
            let user_id = response
                .request()
                .extensions()
                .get::<UserContext>()
                .map(|user| user.id);

            match status_code {
                500..=599 => tracing::error!(
                    request.id = %request_id,
                    http.method = %method,
                    http.path = %path,
                    http.status = status_code,
                    duration_ms = duration.as_millis() as u64,
                    user.id = ?user_id,
                    "Request failed"
                ),
                400..=499 => tracing::warn!(
                    request.id = %request_id,
                    http.method = %method,
                    http.path = %path,
                    http.status = status_code,
                    duration_ms = duration.as_millis() as u64,
                    user.id = ?user_id,
                    "Request rejected"
                ),
                _ => tracing::info!(
                    request.id = %request_id,
                    http.method = %method,
                    http.path = %path,
                    http.status = status_code,
                    duration_ms = duration.as_millis() as u64,
                    user.id = ?user_id,
                    "Request completed"
                ),
            }

            if duration > SLOW_REQUEST {
                tracing::warn!(
                    request.id = %request_id,
                    http.method = %method,
                    http.path = %path,
                    duration_ms = duration.as_millis() as u64,
                    threshold_ms = SLOW_REQUEST.as_millis() as u64,
                    "Slow request detected"
                );
            }

            if should_log_security_event(&path, status_code, &user_agent) {
                tracing::warn!(
                    request.id = %request_id,
                    http.method = %method,
                    http.path = %path,
                    http.status = status_code,
                    remote_addr = %remote_addr,
                    user_agent = %user_agent,
                    activity = classify_suspicious_activity(&path, status_code),
                    "Suspicious request pattern"
                );
            }

            Ok(response)
        })
    }
}

fn should_log_security_event(path: &str, status_code: u16, user_agent: &str) -> bool {
    match status_code {
        401 | 403 => true,
        404 if is_sensitive_path(path) => true,
        _ => is_suspicious_user_agent(user_agent) || is_potential_attack_pattern(path),
    }
}

fn is_sensitive_path(path: &str) -> bool {
    ["/.env", "/.git", "/config", "/backup", "/database", "/internal", "/admin"]
        .iter()
        .any(|pattern| path.contains(pattern))
}

fn is_suspicious_user_agent(user_agent: &str) -> bool {
    let ua_lower = user_agent.to_lowercase();
    ["sqlmap", "nikto", "nmap", "masscan", "scanner"]
        .iter()
        .any(|pattern| ua_lower.contains(pattern))
}

fn is_potential_attack_pattern(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    ["../", "..\\", "union select", "<script", "javascript:", "eval(", "exec("]
        .iter()
        .any(|pattern| path_lower.contains(pattern))
}

fn classify_suspicious_activity(path: &str, status_code: u16) -> &'static str {
    if status_code == 401 || status_code == 403 {
        "unauthorized_access_attempt"
    } else if status_code == 404 && is_sensitive_path(path) {
        "sensitive_endpoint_probing"
    } else if is_potential_attack_pattern(path) {
        "potential_injection_attempt"
    } else {
        "unknown_suspicious_activity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_security_events() {
        assert!(should_log_security_event("/api/scan/file", 401, "curl/8"));
        assert_eq!(
            classify_suspicious_activity("/api/scan/file", 401),
            "unauthorized_access_attempt"
        );
    }

    #[test]
    fn probing_and_injection_are_flagged() {
        assert!(should_log_security_event("/.env", 404, "curl/8"));
        assert_eq!(classify_suspicious_activity("/.env", 404), "sensitive_endpoint_probing");

        assert!(should_log_security_event("/api/../etc/passwd", 200, "curl/8"));
        assert_eq!(
            classify_suspicious_activity("/api/../etc/passwd", 200),
            "potential_injection_attempt"
        );

        assert!(should_log_security_event("/api/health", 200, "sqlmap/1.7"));
    }

    #[test]
    fn ordinary_requests_are_not_flagged() {
        assert!(!should_log_security_event("/api/health", 200, "Mozilla/5.0"));
        assert!(!should_log_security_event("/api/unknown", 404, "Mozilla/5.0"));
    }
}
