//! Inventory service implementing facility and asset driving ports.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::ports::{
    InventoryCommand, InventoryQuery, InventoryRepository, InventoryRepositoryError,
};
use crate::domain::{
    Asset, AssetDisposal, AssetListing, AssetReportRow, CallerIdentity, Error, Facility,
    FacilitySelector, NewAsset, NewFacility, Role,
};

const REGISTRARS: &[Role] = &[Role::LogisticsOfficer, Role::FacilityOfficer];

fn map_repository_error(error: InventoryRepositoryError) -> Error {
    match error {
        InventoryRepositoryError::Connection { message } => {
            debug!(%message, "inventory repository unavailable");
            Error::service_unavailable(format!("inventory repository unavailable: {message}"))
        }
        InventoryRepositoryError::Query { message } => {
            debug!(%message, "inventory repository query failed");
            Error::internal(format!("inventory repository error: {message}"))
        }
        InventoryRepositoryError::Duplicate { entity } => {
            Error::conflict(format!("{entity} already exists"))
                .with_details(json!({ "code": "duplicate_entity", "entity": entity }))
        }
        InventoryRepositoryError::FacilityNotFound { facility_id } => {
            Error::not_found(format!("facility {facility_id} does not exist"))
                .with_details(json!({ "code": "no_such_facility" }))
        }
        InventoryRepositoryError::AssetNotFound { tag } => {
            Error::not_found(format!("asset '{tag}' does not exist"))
                .with_details(json!({ "code": "no_such_asset" }))
        }
        InventoryRepositoryError::Rejected { violation } => Error::from(violation),
    }
}

/// Service implementing [`InventoryCommand`] and [`InventoryQuery`].
#[derive(Clone)]
pub struct InventoryService<R> {
    repo: Arc<R>,
}

impl<R> InventoryService<R> {
    /// Create a service over an inventory repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R> InventoryCommand for InventoryService<R>
where
    R: InventoryRepository,
{
    async fn register_facility(
        &self,
        caller: CallerIdentity,
        facility: NewFacility,
    ) -> Result<Facility, Error> {
        caller.require_any(REGISTRARS, "register facilities")?;
        let stored = self
            .repo
            .insert_facility(&facility)
            .await
            .map_err(map_repository_error)?;
        info!(facility_id = stored.id.value(), code = %stored.code, "facility registered");
        Ok(stored)
    }

    async fn register_asset(&self, caller: CallerIdentity, asset: NewAsset) -> Result<Asset, Error> {
        caller.require_any(REGISTRARS, "register assets")?;
        let stored = self
            .repo
            .insert_asset(&asset)
            .await
            .map_err(map_repository_error)?;
        info!(asset_id = stored.id.value(), tag = %stored.tag, "asset registered");
        Ok(stored)
    }

    async fn dispose_asset(
        &self,
        caller: CallerIdentity,
        disposal: AssetDisposal,
    ) -> Result<Asset, Error> {
        caller.require_any(&[Role::LogisticsOfficer], "dispose assets")?;
        let asset = self
            .repo
            .dispose_asset(&disposal)
            .await
            .map_err(map_repository_error)?;
        info!(asset_id = asset.id.value(), tag = %asset.tag, "asset disposed");
        Ok(asset)
    }
}

#[async_trait]
impl<R> InventoryQuery for InventoryService<R>
where
    R: InventoryRepository,
{
    async fn list_facilities(&self) -> Result<Vec<Facility>, Error> {
        self.repo
            .list_facilities()
            .await
            .map_err(map_repository_error)
    }

    async fn list_assets(&self) -> Result<Vec<AssetListing>, Error> {
        self.repo.list_assets().await.map_err(map_repository_error)
    }

    async fn transfer_eligible_assets(&self) -> Result<Vec<AssetListing>, Error> {
        self.repo
            .list_transfer_eligible()
            .await
            .map_err(map_repository_error)
    }

    async fn asset_report(
        &self,
        date: NaiveDate,
        facility: FacilitySelector,
    ) -> Result<Vec<AssetReportRow>, Error> {
        if let Some(facility_id) = facility.facility() {
            self.repo
                .find_facility(facility_id)
                .await
                .map_err(map_repository_error)?
                .ok_or_else(|| {
                    map_repository_error(InventoryRepositoryError::facility_not_found(facility_id))
                })?;
        }
        self.repo
            .asset_report(date, facility.facility())
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "inventory_service_tests.rs"]
mod tests;
