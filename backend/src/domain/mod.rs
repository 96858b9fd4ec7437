//! Domain primitives, workflow rules and services.
//!
//! Purpose: define strongly typed entities for users, facilities, assets and
//! transfer requests, the pure rules that govern transfers and disposals,
//! and the services that enforce roles before delegating to driven ports.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - TransferSnapshot — plans transfer transitions.
//! - TransferWorkflowService, InventoryService, AccountDirectory — driving
//!   port implementations.

pub mod account_service;
pub mod asset;
pub mod auth;
pub mod dates;
pub mod error;
pub mod facility;
pub mod inventory_service;
pub mod ports;
pub mod trace_id;
pub mod transfer;
pub mod transfer_service;
pub mod user;
mod validation;

pub use self::account_service::AccountDirectory;
pub use self::asset::{
    ASSET_DESCRIPTION_MAX, ASSET_TAG_MAX, Asset, AssetDisposal, AssetId, AssetListing,
    AssetLocation, AssetReportRow, DisposalViolation, NewAsset, plan_disposal,
};
pub use self::auth::{
    AccountValidationError, LoginCredentials, LoginValidationError, NewAccount, PasswordDigest,
    PasswordHashError,
};
pub use self::dates::{DATE_FORMAT, DateParseError, format_form_date, parse_form_date};
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::facility::{
    FACILITY_FIELD_MAX, Facility, FacilityId, FacilitySelector, FacilitySelectorParseError,
    NewFacility,
};
pub use self::inventory_service::InventoryService;
pub use self::trace_id::TraceId;
pub use self::transfer::{
    Decision, DecisionParseError, NewTransferRequest, TransferCommand, TransferDraft,
    TransferListing, TransferMutation, TransferPlan, TransferRequest, TransferRequestId,
    TransferRuleViolation, TransferSnapshot, TransferStage, TransitRecord, ensure_ordered,
    plan_request,
};
pub use self::transfer_service::TransferWorkflowService;
pub use self::user::{CallerIdentity, Role, USERNAME_MAX, User, UserId, UserValidationError, Username};
pub use self::validation::FieldValidationError;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use logistics::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
