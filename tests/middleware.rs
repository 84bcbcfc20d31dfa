//! Auth extractor and request logging middleware tests.

mod common;

use actix_web::{App, HttpResponse, test, web};
use common::{USER_EMAIL, USER_ID, enable_test_auth, test_state};
use truthlens_server::{AuthMiddleware, telemetry::RequestLoggingMiddleware};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn whoami(user: AuthMiddleware) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
    }))
}

#[actix_web::test]
async fn bearer_token_is_resolved_through_supabase() {
    let supabase = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer good-token"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": USER_ID,
            "email": USER_EMAIL,
            "user_metadata": { "username": "jane" }
        })))
        .expect(1)
        .mount(&supabase)
        .await;

    let (state, _) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(RequestLoggingMiddleware::new())
            .route("/whoami", web::get().to(whoami)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("Authorization", "Bearer good-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], USER_ID);
    assert_eq!(body["username"], "jane");
}

#[actix_web::test]
async fn rejected_token_is_unauthorized() {
    let supabase = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "code": 403,
            "error_code": "bad_jwt",
            "msg": "invalid JWT"
        })))
        .mount(&supabase)
        .await;

    let (state, _) = test_state(&supabase.uri(), "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .route("/whoami", web::get().to(whoami)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("Authorization", "Bearer stale"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_headers_inject_user() {
    enable_test_auth();
    let (state, _) = test_state("http://127.0.0.1:1", "http://127.0.0.1:1");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(RequestLoggingMiddleware::new())
            .route("/whoami", web::get().to(whoami)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("X-Test-User-Id", USER_ID))
        .insert_header(("X-Test-Email", USER_EMAIL))
        .insert_header(("X-Test-Username", "jane"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], USER_EMAIL);
    assert_eq!(body["username"], "jane");

    let req = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("X-Test-User-Id", "not-a-uuid"))
        .insert_header(("X-Test-Email", USER_EMAIL))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
