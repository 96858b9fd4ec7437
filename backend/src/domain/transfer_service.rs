//! Transfer workflow service implementing the transfer driving ports.
//!
//! The service enforces roles and supplies timestamps from its clock; the
//! repository plans and applies each transition atomically.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::ports::{
    TransferQuery, TransferRepository, TransferRepositoryError, TransferWorkflow,
};
use crate::domain::{
    CallerIdentity, Decision, Error, Role, TransferCommand, TransferDraft, TransferListing,
    TransferRequest, TransferRequestId, TransferStage, ensure_ordered,
};

pub(crate) fn map_transfer_repository_error(error: TransferRepositoryError) -> Error {
    match error {
        TransferRepositoryError::Connection { message } => {
            debug!(%message, "transfer repository unavailable");
            Error::service_unavailable(format!("transfer repository unavailable: {message}"))
        }
        TransferRepositoryError::Query { message } => {
            debug!(%message, "transfer repository query failed");
            Error::internal(format!("transfer repository error: {message}"))
        }
        TransferRepositoryError::RequestNotFound { request_id } => {
            Error::not_found(format!("transfer request {request_id} does not exist"))
                .with_details(json!({ "code": "no_such_request" }))
        }
        TransferRepositoryError::FacilityNotFound { facility_id } => {
            Error::not_found(format!("facility {facility_id} does not exist"))
                .with_details(json!({ "code": "no_such_facility" }))
        }
        TransferRepositoryError::Rejected { violation } => Error::from(violation),
    }
}

/// Service implementing [`TransferWorkflow`] and [`TransferQuery`].
#[derive(Clone)]
pub struct TransferWorkflowService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> TransferWorkflowService<R> {
    /// Create a service over a transfer repository.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use logistics::domain::TransferWorkflowService;
    /// # use logistics::test_support::InMemoryLogisticsStore;
    /// # use mockable::DefaultClock;
    /// let store = Arc::new(InMemoryLogisticsStore::default());
    /// let _service = TransferWorkflowService::new(store, Arc::new(DefaultClock));
    /// ```
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> TransferWorkflowService<R>
where
    R: TransferRepository,
{
    async fn apply(
        &self,
        request_id: TransferRequestId,
        command: TransferCommand,
    ) -> Result<TransferStage, Error> {
        let stage = self
            .repo
            .apply(request_id, command)
            .await
            .map_err(map_transfer_repository_error)?;
        info!(request_id = request_id.value(), stage = %stage, "transfer advanced");
        Ok(stage)
    }
}

#[async_trait]
impl<R> TransferWorkflow for TransferWorkflowService<R>
where
    R: TransferRepository,
{
    async fn request_transfer(
        &self,
        caller: CallerIdentity,
        draft: TransferDraft,
    ) -> Result<TransferRequest, Error> {
        caller.require_any(&[Role::LogisticsOfficer], "request transfers")?;
        let request = self
            .repo
            .create_request(draft, caller.user_id(), self.clock.utc())
            .await
            .map_err(map_transfer_repository_error)?;
        info!(
            request_id = request.id.value(),
            asset_id = request.asset_id.value(),
            "transfer requested"
        );
        Ok(request)
    }

    async fn decide(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
        decision: Decision,
    ) -> Result<TransferStage, Error> {
        caller.require_any(&[Role::FacilityOfficer], "approve or reject transfers")?;
        self.apply(
            request_id,
            TransferCommand::Decide {
                decision,
                decided_by: caller.user_id(),
                decided_at: self.clock.utc(),
            },
        )
        .await
    }

    async fn record_load(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
        load_date: NaiveDate,
    ) -> Result<TransferStage, Error> {
        caller.require_any(&[Role::LogisticsOfficer], "record transit")?;
        self.apply(request_id, TransferCommand::Load { load_date })
            .await
    }

    async fn record_unload(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
        unload_date: NaiveDate,
    ) -> Result<TransferStage, Error> {
        caller.require_any(&[Role::LogisticsOfficer], "record transit")?;
        self.apply(request_id, TransferCommand::Unload { unload_date })
            .await
    }

    async fn record_load_and_unload(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
        load_date: NaiveDate,
        unload_date: NaiveDate,
    ) -> Result<TransferStage, Error> {
        caller.require_any(&[Role::LogisticsOfficer], "record transit")?;
        ensure_ordered(load_date, unload_date)?;
        self.apply(
            request_id,
            TransferCommand::LoadAndUnload {
                load_date,
                unload_date,
            },
        )
        .await
    }
}

#[async_trait]
impl<R> TransferQuery for TransferWorkflowService<R>
where
    R: TransferRepository,
{
    async fn pending_approvals(
        &self,
        caller: CallerIdentity,
    ) -> Result<Vec<TransferListing>, Error> {
        caller.require_any(&[Role::FacilityOfficer], "review pending transfers")?;
        self.repo
            .list_pending()
            .await
            .map_err(map_transfer_repository_error)
    }

    async fn in_transit(&self, caller: CallerIdentity) -> Result<Vec<TransferListing>, Error> {
        caller.require_any(&[Role::LogisticsOfficer], "review transfers in transit")?;
        self.repo
            .list_in_transit()
            .await
            .map_err(map_transfer_repository_error)
    }

    async fn transfer_history(
        &self,
        caller: CallerIdentity,
        request_id: TransferRequestId,
    ) -> Result<TransferListing, Error> {
        debug!(
            user_id = %caller.user_id(),
            role = %caller.role(),
            %request_id,
            "transfer history requested"
        );
        self.repo
            .find(request_id)
            .await
            .map_err(map_transfer_repository_error)?
            .ok_or_else(|| {
                map_transfer_repository_error(TransferRepositoryError::request_not_found(
                    request_id,
                ))
            })
    }
}

#[cfg(test)]
#[path = "transfer_service_tests.rs"]
mod tests;
