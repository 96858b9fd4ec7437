//! Driving ports for facility and asset inventory.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    Asset, AssetDisposal, AssetListing, AssetReportRow, CallerIdentity, Error, Facility,
    FacilitySelector, NewAsset, NewFacility,
};

/// Inventory mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryCommand: Send + Sync {
    /// Register a facility.
    async fn register_facility(
        &self,
        caller: CallerIdentity,
        facility: NewFacility,
    ) -> Result<Facility, Error>;

    /// Register an asset at its first facility.
    async fn register_asset(&self, caller: CallerIdentity, asset: NewAsset)
    -> Result<Asset, Error>;

    /// Retire an asset from the inventory.
    async fn dispose_asset(
        &self,
        caller: CallerIdentity,
        disposal: AssetDisposal,
    ) -> Result<Asset, Error>;
}

/// Inventory reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryQuery: Send + Sync {
    /// All facilities.
    async fn list_facilities(&self) -> Result<Vec<Facility>, Error>;

    /// All assets with their current facility.
    async fn list_assets(&self) -> Result<Vec<AssetListing>, Error>;

    /// Assets that can be put on a transfer request right now.
    async fn transfer_eligible_assets(&self) -> Result<Vec<AssetListing>, Error>;

    /// Where assets were on `date`.
    async fn asset_report(
        &self,
        date: NaiveDate,
        facility: FacilitySelector,
    ) -> Result<Vec<AssetReportRow>, Error>;
}
