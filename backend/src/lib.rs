//! Logistics backend: facilities, assets and the transfer approval workflow.
//!
//! Layout follows ports and adapters: [`domain`] holds the entities, rules
//! and services; [`inbound`] exposes them over HTTP; [`outbound`] persists
//! them in PostgreSQL.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
