//! HTTP inbound adapter exposing the logistics REST endpoints.
//!
//! Handlers translate JSON payloads into domain calls and map domain errors
//! back onto status codes. Everything except login, logout and account
//! registration requires a session.

use actix_web::web;

pub mod assets;
pub mod error;
pub mod facilities;
pub mod health;
pub mod reports;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod transfers;
pub mod users;
pub mod validation;

pub use error::ApiResult;

/// Register every API handler on `cfg`.
///
/// Mount this under the versioned prefix, e.g. `web::scope("/api/v1")`.
/// Literal transfer routes are registered before `/transfers/{id}` so the
/// path parameter never captures them. Extractor rejections use the same
/// JSON error payload as handler errors.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(validation::json_payload_error))
        .app_data(web::QueryConfig::default().error_handler(validation::query_payload_error))
        .app_data(web::PathConfig::default().error_handler(validation::path_error))
        .service(users::login)
        .service(users::logout)
        .service(users::create_user)
        .service(users::current_user)
        .service(facilities::list_facilities)
        .service(facilities::create_facility)
        .service(assets::list_assets)
        .service(assets::eligible_assets)
        .service(assets::create_asset)
        .service(assets::dispose_asset)
        .service(reports::asset_report)
        .service(transfers::create_transfer)
        .service(transfers::pending_transfers)
        .service(transfers::transfers_in_transit)
        .service(transfers::get_transfer)
        .service(transfers::decide_transfer)
        .service(transfers::record_transit);
}
