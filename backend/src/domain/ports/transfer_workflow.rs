//! Driving ports for the transfer workflow.
//!
//! Every call carries the caller's [`CallerIdentity`]; implementations decide
//! from its role whether the transition is allowed.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    CallerIdentity, Decision, Error, TransferDraft, TransferListing, TransferRequest,
    TransferRequestId, TransferStage,
};

/// Mutating transfer use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferWorkflow: Send + Sync {
    /// Open a pending request to move an asset.
    async fn request_transfer(
        &self,
        caller: CallerIdentity,
        draft: TransferDraft,
    ) -> Result<TransferRequest, Error>;

    /// Approve or reject a pending request.
    async fn decide(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
        decision: Decision,
    ) -> Result<TransferStage, Error>;

    /// Record the asset leaving its source facility.
    async fn record_load(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
        load_date: NaiveDate,
    ) -> Result<TransferStage, Error>;

    /// Record the asset arriving at its destination.
    async fn record_unload(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
        unload_date: NaiveDate,
    ) -> Result<TransferStage, Error>;

    /// Record both transit events at once.
    async fn record_load_and_unload(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
        load_date: NaiveDate,
        unload_date: NaiveDate,
    ) -> Result<TransferStage, Error>;
}

/// Read-only transfer use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferQuery: Send + Sync {
    /// Requests awaiting a facility officer's decision.
    async fn pending_approvals(&self, caller: CallerIdentity)
    -> Result<Vec<TransferListing>, Error>;

    /// Approved requests still travelling.
    async fn in_transit(&self, caller: CallerIdentity) -> Result<Vec<TransferListing>, Error>;

    /// One request with its stage and transit record.
    ///
    /// Readable by every signed-in role; `caller` is only recorded in logs.
    async fn transfer_history(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
    ) -> Result<TransferListing, Error>;
}
