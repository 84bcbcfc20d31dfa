//! HTTP handlers and route registration.

pub mod auth;
pub mod data;
pub mod health;
pub mod profile;
pub mod scan;

use actix_web::web;

/// Largest request body accepted by `/scan/file`.
///
/// Above the reputation service's own limit so that oversized files reach the
/// size check and are answered with `413` and a JSON error.
pub const SCAN_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Largest avatar image accepted.
pub const AVATAR_BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Registers every route under `/api`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/forgot-password", web::post().to(auth::forgot_password))
                    .route("/reset-password", web::post().to(auth::reset_password))
                    .route("/myData", web::get().to(profile::my_data))
                    .route("/me", web::put().to(profile::update_me))
                    .route("/change-password", web::put().to(profile::change_password))
                    .service(
                        web::resource("/upload-avatar")
                            .app_data(web::PayloadConfig::new(AVATAR_BODY_LIMIT))
                            .route(web::post().to(profile::upload_avatar)),
                    ),
            )
            .service(
                web::scope("/scan")
                    .service(
                        web::resource("/file")
                            .app_data(web::PayloadConfig::new(SCAN_BODY_LIMIT))
                            .route(web::post().to(scan::scan_file)),
                    )
                    .route("/url", web::post().to(scan::scan_url))
                    .route("/history", web::get().to(scan::history)),
            ),
    );
}
