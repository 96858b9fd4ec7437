//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use chrono::{TimeZone, Utc};
use serde_json::json;

use super::configure_api;
use super::state::HttpState;
use crate::domain::{AccountDirectory, InventoryService, TransferWorkflowService};
use crate::test_support::{InMemoryLogisticsStore, MutableClock};

/// Session middleware with a fresh key, cookie name `session` and the
/// `Secure` flag off for plain HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// The `session` cookie set by `response`.
pub fn session_cookie<B>(response: &ServiceResponse<B>) -> Cookie<'static> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Handler state backed by `store`, with the clock fixed at 2024-03-01.
pub fn in_memory_state(store: &Arc<InMemoryLogisticsStore>) -> HttpState {
    let now = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    HttpState::from_services(
        Arc::new(TransferWorkflowService::new(
            store.clone(),
            Arc::new(MutableClock::new(now)),
        )),
        Arc::new(InventoryService::new(store.clone())),
        Arc::new(AccountDirectory::new(store.clone())),
    )
}

/// App exposing the whole `/api/v1` surface over `store`.
pub fn api_app(
    store: &Arc<InMemoryLogisticsStore>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    App::new()
        .app_data(web::Data::new(in_memory_state(store)))
        .wrap(test_session_middleware())
        .service(web::scope("/api/v1").configure(configure_api))
}

/// Log in through the API and return the session cookie.
pub async fn login_cookie<S, B>(app: &S, username: &str, password: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    let response = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "username": username, "password": password }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login as {username}");
    session_cookie(&response)
}
