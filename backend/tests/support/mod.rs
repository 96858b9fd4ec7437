//! Helpers shared by integration suites.

pub mod logistics_http;
