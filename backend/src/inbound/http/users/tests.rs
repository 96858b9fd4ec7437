//! Tests for account and session handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::inbound::http::test_utils::{api_app, login_cookie};
use crate::test_support::InMemoryLogisticsStore;

#[fixture]
fn store() -> Arc<InMemoryLogisticsStore> {
    let store = Arc::new(InMemoryLogisticsStore::default());
    store.seed_user("clerk", "s3cret!", Role::LogisticsOfficer);
    store
}

async fn body_json(response: actix_web::dev::ServiceResponse) -> Value {
    let body = actix_test::read_body(response).await;
    serde_json::from_slice(&body).expect("JSON body")
}

#[rstest]
#[actix_web::test]
async fn login_sets_a_session_for_current_user(store: Arc<InMemoryLogisticsStore>) {
    let app = actix_test::init_service(api_app(&store)).await;
    let cookie = login_cookie(&app, "clerk", "s3cret!").await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users/me")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["username"], "clerk");
    assert_eq!(me["role"], "logistics_officer");
}

#[rstest]
#[case("clerk", "wrong")]
#[case("nobody", "s3cret!")]
#[actix_web::test]
async fn bad_credentials_are_unauthorised(
    store: Arc<InMemoryLogisticsStore>,
    #[case] username: &str,
    #[case] password: &str,
) {
    let app = actix_test::init_service(api_app(&store)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(&LoginRequest {
                username: username.to_owned(),
                password: password.to_owned(),
            })
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "invalid credentials");
}

#[rstest]
#[case("   ", "pw", "username")]
#[case("clerk", "", "password")]
#[actix_web::test]
async fn blank_login_fields_are_rejected(
    store: Arc<InMemoryLogisticsStore>,
    #[case] username: &str,
    #[case] password: &str,
    #[case] field: &str,
) {
    let app = actix_test::init_service(api_app(&store)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "username": username, "password": password }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert_eq!(payload["code"], "invalid_request");
    assert_eq!(payload["details"]["field"], field);
    assert_eq!(payload["details"]["code"], "missing_field");
}

#[rstest]
#[actix_web::test]
async fn me_requires_login(store: Arc<InMemoryLogisticsStore>) {
    let app = actix_test::init_service(api_app(&store)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get().uri("/api/v1/users/me").to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_web::test]
async fn registration_creates_accounts_with_requested_role(store: Arc<InMemoryLogisticsStore>) {
    let app = actix_test::init_service(api_app(&store)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(&CreateUserRequest {
                username: "officer".to_owned(),
                password: "pa55".to_owned(),
                role: Some("facility_officer".to_owned()),
            })
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["role"], "facility_officer");

    let _cookie = login_cookie(&app, "officer", "pa55").await;
}

#[rstest]
#[actix_web::test]
async fn registration_defaults_to_guest(store: Arc<InMemoryLogisticsStore>) {
    let app = actix_test::init_service(api_app(&store)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(json!({ "username": "visitor", "password": "pw" }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["role"], "guest");
}

#[rstest]
#[case(json!({ "username": "clerk", "password": "pw" }), StatusCode::CONFLICT, "duplicate_entity")]
#[case(json!({ "username": "x", "password": "pw", "role": "admiral" }), StatusCode::BAD_REQUEST, "invalid_field")]
#[case(json!({ "username": "x", "password": "" }), StatusCode::BAD_REQUEST, "invalid_field")]
#[actix_web::test]
async fn invalid_registrations_are_rejected(
    store: Arc<InMemoryLogisticsStore>,
    #[case] body: Value,
    #[case] status: StatusCode,
    #[case] code: &str,
) {
    let app = actix_test::init_service(api_app(&store)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(body)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), status);
    assert_eq!(body_json(response).await["details"]["code"], code);
}

#[rstest]
#[actix_web::test]
async fn logout_ends_the_session(store: Arc<InMemoryLogisticsStore>) {
    let app = actix_test::init_service(api_app(&store)).await;
    let cookie = login_cookie(&app, "clerk", "s3cret!").await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/logout")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let removal = response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session removal cookie");
    assert_eq!(removal.value(), "");
}
