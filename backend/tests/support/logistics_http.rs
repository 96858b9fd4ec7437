//! Shared HTTP harness for integration suites.
//!
//! Each call builds a fresh app over the same in-memory store and session
//! key, so cookies issued by one request stay valid for the next.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use actix_http::Request;
use actix_session::SessionMiddleware;
use actix_session::config::CookieContentSecurity;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::{Cookie, Key, SameSite};
use actix_web::http::Method;
use actix_web::{App, test as actix_test, web};
use chrono::{TimeZone, Utc};
use logistics::Trace;
use logistics::domain::{
    AccountDirectory, InventoryService, TRACE_ID_HEADER, TransferWorkflowService,
};
use logistics::inbound::http::configure_api;
use logistics::inbound::http::state::HttpState;
use logistics::test_support::{InMemoryLogisticsStore, MutableClock};
use serde_json::Value;

/// Status, body and trace header of one response.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub status: u16,
    pub body: Option<Value>,
    pub trace_id: Option<String>,
    pub session_cookie: Option<Cookie<'static>>,
}

impl Snapshot {
    /// `details.code` of an error body.
    pub fn detail_code(&self) -> Option<&str> {
        self.body
            .as_ref()?
            .get("details")?
            .get("code")?
            .as_str()
    }

    /// String field of a JSON object body.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.body.as_ref()?.get(field)?.as_str()
    }
}

/// Store, session key and the cookies of logged-in users.
pub struct Harness {
    pub store: Arc<InMemoryLogisticsStore>,
    key: Key,
    clock: Arc<MutableClock>,
    cookies: HashMap<String, Cookie<'static>>,
}

impl Default for Harness {
    fn default() -> Self {
        let now = Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        Self {
            store: Arc::new(InMemoryLogisticsStore::default()),
            key: Key::generate(),
            clock: Arc::new(MutableClock::new(now)),
            cookies: HashMap::new(),
        }
    }
}

pub fn run_async<T>(future: impl Future<Output = T>) -> T {
    tokio::runtime::Runtime::new()
        .expect("runtime")
        .block_on(future)
}

fn parse_json_body(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(bytes).expect("json body"))
    }
}

impl Harness {
    fn state(&self) -> HttpState {
        HttpState::from_services(
            Arc::new(TransferWorkflowService::new(
                self.store.clone(),
                self.clock.clone(),
            )),
            Arc::new(InventoryService::new(self.store.clone())),
            Arc::new(AccountDirectory::new(self.store.clone())),
        )
    }

    async fn send(&self, request: Request) -> Snapshot {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), self.key.clone())
            .cookie_name("session".to_owned())
            .cookie_secure(false)
            .cookie_content_security(CookieContentSecurity::Private)
            .cookie_same_site(SameSite::Lax)
            .build();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(self.state()))
                .wrap(Trace)
                .service(web::scope("/api/v1").wrap(session).configure(configure_api)),
        )
        .await;
        let response = actix_test::call_service(&app, request).await;
        Snapshot {
            status: response.status().as_u16(),
            trace_id: response
                .headers()
                .get(TRACE_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(ToOwned::to_owned),
            session_cookie: response
                .response()
                .cookies()
                .find(|cookie| cookie.name() == "session")
                .map(Cookie::into_owned),
            body: parse_json_body(actix_test::read_body(response).await.as_ref()),
        }
    }

    /// Send `payload` to `path` as `user`, or anonymously when `user` is `None`.
    pub fn request(
        &self,
        user: Option<&str>,
        method: Method,
        path: &str,
        payload: Option<Value>,
    ) -> Snapshot {
        let mut request = actix_test::TestRequest::default().method(method).uri(path);
        if let Some(user) = user {
            let cookie = self
                .cookies
                .get(user)
                .unwrap_or_else(|| panic!("{user} is not logged in"));
            request = request.cookie(cookie.clone());
        }
        if let Some(payload) = payload {
            request = request.set_json(payload);
        }
        run_async(self.send(request.to_request()))
    }

    pub fn get(&self, user: &str, path: &str) -> Snapshot {
        self.request(Some(user), Method::GET, path, None)
    }

    pub fn post(&self, user: &str, path: &str, payload: Value) -> Snapshot {
        self.request(Some(user), Method::POST, path, Some(payload))
    }

    /// Log in and remember the session cookie under `username`.
    pub fn login(&mut self, username: &str, password: &str) -> Snapshot {
        let snapshot = self.request(
            None,
            Method::POST,
            "/api/v1/login",
            Some(serde_json::json!({ "username": username, "password": password })),
        );
        if let Some(cookie) = snapshot.session_cookie.clone() {
            self.cookies.insert(username.to_owned(), cookie);
        }
        snapshot
    }
}
