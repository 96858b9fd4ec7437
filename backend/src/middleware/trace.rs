//! Request tracing middleware.
//!
//! Every request runs inside a [`TraceId`] scope so handlers, services and
//! error constructors can correlate their output. An inbound `trace-id`
//! header carrying a UUID is adopted; anything else is replaced by a fresh
//! identifier. The identifier is echoed in the response header and the
//! request outcome is logged once it completes.

use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{info, warn};

use crate::domain::{TRACE_ID_HEADER, TraceId};

/// Middleware factory; wrap an `App` or scope with it.
///
/// ```
/// use actix_web::App;
/// use logistics::Trace;
///
/// let _app = App::new().wrap(Trace);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

/// Service produced by [`Trace`].
pub struct TraceMiddleware<S> {
    service: S,
}

fn inbound_trace_id(req: &ServiceRequest) -> Option<TraceId> {
    req.headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse().ok())
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
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
        let trace_id = inbound_trace_id(&req).unwrap_or_else(TraceId::generate);
        let method = req.method().clone();
        let path = req.path().to_owned();
        let started = Instant::now();
        // Scope the inner call too: extractors run when the future is built.
        let fut = TraceId::sync_scope(trace_id, || self.service.call(req));
        Box::pin(TraceId::scope(trace_id, async move {
            let mut res = fut.await?;
            match HeaderValue::from_str(&trace_id.to_string()) {
                Ok(value) => {
                    res.response_mut()
                        .headers_mut()
                        .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                }
                Err(error) => warn!(%error, %trace_id, "trace id is not a valid header value"),
            }
            info!(
                %trace_id,
                %method,
                path = %path,
                status = res.status().as_u16(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "request completed"
            );
            Ok(res)
        }))
    }
}

#[cfg(test)]
mod tests {
    //! Trace header propagation and scoping.
    use super::*;
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;

    use crate::domain::{ApiResult, Error as DomainError};

    async fn call(
        handler_uri: &str,
        inbound: Option<&str>,
    ) -> (ServiceResponse<actix_web::body::BoxBody>, String) {
        let app = test::init_service(
            App::new()
                .wrap(Trace)
                .route(
                    "/echo",
                    web::get().to(|| async {
                        let id = TraceId::current().map(|id| id.to_string());
                        HttpResponse::Ok().body(id.unwrap_or_default())
                    }),
                )
                .route(
                    "/fail",
                    web::get().to(|| async {
                        ApiResult::<HttpResponse>::Err(DomainError::not_found("missing"))
                    }),
                ),
        )
        .await;
        let mut req = test::TestRequest::get().uri(handler_uri);
        if let Some(value) = inbound {
            req = req.insert_header((TRACE_ID_HEADER, value));
        }
        let res = test::call_service(&app, req.to_request()).await;
        let header = res
            .headers()
            .get(TRACE_ID_HEADER)
            .expect("trace id header")
            .to_str()
            .expect("ascii header")
            .to_owned();
        (res, header)
    }

    #[rstest]
    #[actix_web::test]
    async fn handlers_see_the_header_trace_id() {
        let (res, header) = call("/echo", None).await;
        let body = test::read_body(res).await;
        assert_eq!(std::str::from_utf8(&body).expect("utf8"), header);
        assert!(header.parse::<TraceId>().is_ok());
    }

    #[rstest]
    #[actix_web::test]
    async fn valid_inbound_trace_ids_are_adopted() {
        let inbound = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
        let (_, header) = call("/echo", Some(inbound)).await;
        assert_eq!(header, inbound);
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_inbound_trace_ids_are_replaced() {
        let (_, header) = call("/echo", Some("not-a-uuid")).await;
        assert_ne!(header, "not-a-uuid");
        assert!(header.parse::<TraceId>().is_ok());
    }

    #[rstest]
    #[actix_web::test]
    async fn error_payloads_carry_the_trace_id() {
        let (res, header) = call("/fail", None).await;
        let body: DomainError = test::read_body_json(res).await;
        assert_eq!(body.trace_id(), Some(header.as_str()));
    }
}
