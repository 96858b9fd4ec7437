//! Port for facility and asset persistence.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    Asset, AssetDisposal, AssetListing, AssetReportRow, DisposalViolation, Facility, FacilityId,
    NewAsset, NewFacility,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by inventory repository adapters.
    pub enum InventoryRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "inventory repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "inventory repository query failed: {message}",
        /// A unique column already holds the supplied value.
        Duplicate { entity: String } => "{entity} already exists",
        /// The referenced facility does not exist.
        FacilityNotFound { facility_id: FacilityId } =>
            "facility {facility_id} does not exist",
        /// No asset carries the given tag.
        AssetNotFound { tag: String } => "asset '{tag}' does not exist",
        /// The disposal broke an inventory rule; nothing was written.
        Rejected { violation: DisposalViolation } => "disposal rejected: {violation}",
    }
}

/// Port for registering facilities and assets and reading inventory views.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Insert a facility; code and common name must be unused.
    async fn insert_facility(
        &self,
        facility: &NewFacility,
    ) -> Result<Facility, InventoryRepositoryError>;

    /// All facilities ordered by id.
    async fn list_facilities(&self) -> Result<Vec<Facility>, InventoryRepositoryError>;

    /// Fetch one facility.
    async fn find_facility(
        &self,
        facility_id: FacilityId,
    ) -> Result<Option<Facility>, InventoryRepositoryError>;

    /// Insert an asset and open its first location in one transaction.
    async fn insert_asset(&self, asset: &NewAsset) -> Result<Asset, InventoryRepositoryError>;

    /// Every asset with its current facility, ordered by id.
    async fn list_assets(&self) -> Result<Vec<AssetListing>, InventoryRepositoryError>;

    /// Assets that are not disposed, have a current location and no open
    /// transfer request.
    async fn list_transfer_eligible(&self)
    -> Result<Vec<AssetListing>, InventoryRepositoryError>;

    /// Close the asset's current location and flag it disposed.
    async fn dispose_asset(
        &self,
        disposal: &AssetDisposal,
    ) -> Result<Asset, InventoryRepositoryError>;

    /// Location rows covering `date`, optionally limited to one facility.
    async fn asset_report(
        &self,
        date: NaiveDate,
        facility: Option<FacilityId>,
    ) -> Result<Vec<AssetReportRow>, InventoryRepositoryError>;
}
