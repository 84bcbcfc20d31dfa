//! Account and profile endpoint tests. Supabase is replaced by a mock server.

mod common;

use actix_web::{App, test, web};
use common::{USER_EMAIL, USER_ID, enable_test_auth, test_state};
use truthlens_server::{configure_routes, email::templates};
use wiremock::matchers::{any, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[actix_web::test]
async fn health_check_works() {
    let (state, _) = test_state("http://127.0.0.1:1", "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}

#[actix_web::test]
async fn forgot_password_sends_reset_email() {
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/generate_link"))
        .and(header("apikey", "service-key"))
        .and(body_partial_json(serde_json::json!({
            "type": "recovery",
            "email": "jane@example.com",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action_link": "https://proj.supabase.co/auth/v1/verify?token=abc123&type=recovery",
            "hashed_token": "9f86d081884c7d65",
            "email": "jane@example.com"
        })))
        .expect(1)
        .mount(&supabase)
        .await;

    let (state, mailer) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/forgot-password")
        .set_json(serde_json::json!({"email": "Jane@Example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "If the email exists, a reset link has been sent.");

    let sent = mailer.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, templates::PASSWORD_RESET_SUBJECT);
    assert_eq!(sent[0].recipients, vec!["jane@example.com".to_string()]);
    assert!(
        sent[0]
            .html_body
            .contains("http://localhost:5173/auth/forgot-password?token=9f86d081884c7d65")
    );
    assert!(!sent[0].html_body.contains("supabase.co"));
}

#[actix_web::test]
async fn forgot_password_hides_unknown_addresses() {
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/generate_link"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": 404,
            "error_code": "user_not_found",
            "msg": "User with this email not found"
        })))
        .expect(1)
        .mount(&supabase)
        .await;

    let (state, mailer) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/forgot-password")
        .set_json(serde_json::json!({"email": "nobody@example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "If the email exists, a reset link has been sent.");

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(mailer.sent().is_empty());
}

#[actix_web::test]
async fn reset_password_with_rejected_token_is_bad_request() {
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .and(body_partial_json(serde_json::json!({
            "type": "recovery",
            "token_hash": "expired-token"
        })))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "code": 403,
            "error_code": "otp_expired",
            "msg": "Email link is invalid or has expired"
        })))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&supabase)
        .await;

    let (state, _) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/reset-password")
        .set_json(serde_json::json!({"token": "expired-token", "new_password": "N3wPassword!"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid token");
}

#[actix_web::test]
async fn emailed_reset_token_sets_new_password() {
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/generate_link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "properties": {
                "action_link": "https://proj.supabase.co/auth/v1/verify?token=abc123&type=recovery",
                "hashed_token": "c0ffee42"
            }
        })))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .and(header("apikey", "anon-key"))
        .and(body_partial_json(serde_json::json!({
            "type": "recovery",
            "token_hash": "c0ffee42"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "recovery-session",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": USER_ID, "email": USER_EMAIL }
        })))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer recovery-session"))
        .and(body_partial_json(serde_json::json!({"password": "N3wPassword!"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": USER_ID,
            "email": USER_EMAIL
        })))
        .expect(1)
        .mount(&supabase)
        .await;

    let (state, mailer) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/forgot-password")
        .set_json(serde_json::json!({"email": USER_EMAIL}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let sent = mailer.wait_for(1).await;
    let marker = "/auth/forgot-password?token=";
    let html = &sent[0].html_body;
    let start = html.find(marker).expect("reset link in email") + marker.len();
    let token: String = html[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    assert_eq!(token, "c0ffee42");

    let req = test::TestRequest::post()
        .uri("/api/auth/reset-password")
        .set_json(serde_json::json!({"token": token, "new_password": "N3wPassword!"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Password updated successfully");
}

#[actix_web::test]
async fn change_password_rejects_wrong_current_password() {
    enable_test_auth();
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&supabase)
        .await;

    let (state, _) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::put()
        .uri("/api/auth/change-password")
        .insert_header(("X-Test-User-Id", USER_ID))
        .insert_header(("X-Test-Email", USER_EMAIL))
        .set_json(serde_json::json!({
            "current_password": "wrong-password",
            "new_password": "N3wPassword!"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Incorrect current password");
}

#[actix_web::test]
async fn change_password_sets_new_password() {
    enable_test_auth();
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(body_partial_json(serde_json::json!({"email": USER_EMAIL})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": { "id": USER_ID, "email": USER_EMAIL }
        })))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer fresh-token"))
        .and(body_partial_json(serde_json::json!({"password": "N3wPassword!"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": USER_ID,
            "email": USER_EMAIL
        })))
        .expect(1)
        .mount(&supabase)
        .await;

    let (state, _) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::put()
        .uri("/api/auth/change-password")
        .insert_header(("X-Test-User-Id", USER_ID))
        .insert_header(("X-Test-Email", USER_EMAIL))
        .set_json(serde_json::json!({
            "current_password": "OldPassword1",
            "new_password": "N3wPassword!"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn avatar_upload_refuses_non_images() {
    enable_test_auth();
    let supabase = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&supabase)
        .await;

    let (state, _) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/upload-avatar")
        .insert_header(("X-Test-User-Id", USER_ID))
        .insert_header(("X-Test-Email", USER_EMAIL))
        .set_payload(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 415);

    let req = test::TestRequest::post()
        .uri("/api/auth/upload-avatar")
        .insert_header(("X-Test-User-Id", USER_ID))
        .insert_header(("X-Test-Email", USER_EMAIL))
        .set_payload("just some text")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn profile_routes_require_authentication() {
    let (state, _) = test_state("http://127.0.0.1:1", "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/auth/myData").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::get()
        .uri("/api/auth/myData")
        .insert_header(("Authorization", "Token abc"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}
