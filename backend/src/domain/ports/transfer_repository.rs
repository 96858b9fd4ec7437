//! Port for transfer request persistence.
//!
//! Adapters apply each transition atomically: they lock the request, build a
//! [`TransferSnapshot`](crate::domain::TransferSnapshot), ask it for a plan
//! and write every planned mutation in one transaction. A rule violation
//! leaves the store untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    FacilityId, TransferCommand, TransferDraft, TransferListing, TransferRequest,
    TransferRequestId, TransferRuleViolation, TransferStage, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by transfer repository adapters.
    pub enum TransferRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "transfer repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "transfer repository query failed: {message}",
        /// No request has the given identifier.
        RequestNotFound { request_id: TransferRequestId } =>
            "transfer request {request_id} does not exist",
        /// The destination facility does not exist.
        FacilityNotFound { facility_id: FacilityId } =>
            "facility {facility_id} does not exist",
        /// The transition broke a workflow rule; nothing was written.
        Rejected { violation: TransferRuleViolation } =>
            "transfer rejected: {violation}",
    }
}

impl From<TransferRuleViolation> for TransferRepositoryError {
    fn from(violation: TransferRuleViolation) -> Self {
        Self::Rejected { violation }
    }
}

/// Port for creating transfer requests and applying their transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferRepository: Send + Sync {
    /// Validate `draft` against the asset's current location and insert a
    /// pending request.
    async fn create_request(
        &self,
        draft: TransferDraft,
        requested_by: UserId,
        requested_at: DateTime<Utc>,
    ) -> Result<TransferRequest, TransferRepositoryError>;

    /// Plan and apply `command` on the request, returning its new stage.
    async fn apply(
        &self,
        request_id: TransferRequestId,
        command: TransferCommand,
    ) -> Result<TransferStage, TransferRepositoryError>;

    /// Fetch one request with its display names.
    async fn find(
        &self,
        request_id: TransferRequestId,
    ) -> Result<Option<TransferListing>, TransferRepositoryError>;

    /// Requests awaiting a decision, oldest first.
    async fn list_pending(&self) -> Result<Vec<TransferListing>, TransferRepositoryError>;

    /// Approved requests that have not completed, oldest first.
    async fn list_in_transit(&self) -> Result<Vec<TransferListing>, TransferRepositoryError>;
}
