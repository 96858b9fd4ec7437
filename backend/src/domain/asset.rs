//! Assets, their location history and disposal rules.
//!
//! An asset's location history is a sequence of [`AssetLocation`] rows. At
//! most one row per asset is open (no departure date); that row is the
//! asset's current location.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::validation::{FieldValidationError, required_text};
use super::{Error, Facility, FacilityId};

/// Maximum accepted length of an asset tag.
pub const ASSET_TAG_MAX: usize = 64;
/// Maximum accepted length of an asset description.
pub const ASSET_DESCRIPTION_MAX: usize = 512;

/// Serial identifier of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(i32);

impl AssetId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tracked physical asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: AssetId,
    pub tag: String,
    pub description: String,
    pub disposed: bool,
}

/// One stay of an asset at a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetLocation {
    pub asset_id: AssetId,
    pub facility_id: FacilityId,
    pub arrival: NaiveDate,
    pub departure: Option<NaiveDate>,
}

impl AssetLocation {
    /// Open a stay starting on `arrival`.
    #[must_use]
    pub const fn open(asset_id: AssetId, facility_id: FacilityId, arrival: NaiveDate) -> Self {
        Self {
            asset_id,
            facility_id,
            arrival,
            departure: None,
        }
    }

    /// Whether this stay is the asset's current location.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.departure.is_none()
    }

    /// Whether the asset was at the facility on `date`, inclusive at both
    /// ends.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.arrival <= date && self.departure.is_none_or(|departure| departure >= date)
    }
}

/// Validated asset registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    tag: String,
    description: String,
    facility_id: FacilityId,
    arrival: NaiveDate,
}

impl NewAsset {
    /// Validate and trim asset fields.
    pub fn try_new(
        tag: &str,
        description: &str,
        facility_id: FacilityId,
        arrival: NaiveDate,
    ) -> Result<Self, FieldValidationError> {
        Ok(Self {
            tag: required_text(tag, "tag", ASSET_TAG_MAX)?,
            description: required_text(description, "description", ASSET_DESCRIPTION_MAX)?,
            facility_id,
            arrival,
        })
    }

    /// Unique asset tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Free-form description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Facility where the asset first arrives.
    pub fn facility_id(&self) -> FacilityId {
        self.facility_id
    }

    /// Date of first arrival.
    pub fn arrival(&self) -> NaiveDate {
        self.arrival
    }
}

/// Asset joined with its current facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetListing {
    pub asset: Asset,
    pub current_facility: Option<Facility>,
    pub arrival: Option<NaiveDate>,
}

/// One row of the point-in-time asset report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReportRow {
    pub asset: Asset,
    pub facility: Facility,
    pub arrival: NaiveDate,
    pub departure: Option<NaiveDate>,
}

/// Request to dispose of an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDisposal {
    tag: String,
    date: NaiveDate,
}

impl AssetDisposal {
    /// Validate the tag of the asset being disposed.
    pub fn try_new(tag: &str, date: NaiveDate) -> Result<Self, FieldValidationError> {
        Ok(Self {
            tag: required_text(tag, "tag", ASSET_TAG_MAX)?,
            date,
        })
    }

    /// Tag of the asset being disposed.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Disposal date; closes the current location.
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Business rule broken by a disposal request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisposalViolation {
    /// The asset is already disposed.
    #[error("asset {asset_id} is already disposed")]
    AlreadyDisposed { asset_id: AssetId },
    /// An unfinished transfer request still references the asset.
    #[error("asset {asset_id} has an open transfer request")]
    TransferAlreadyOpen { asset_id: AssetId },
    /// Disposal would predate the asset's arrival at its current facility.
    #[error("disposal date {disposal} is before arrival date {arrival}")]
    IllogicalDates {
        arrival: NaiveDate,
        disposal: NaiveDate,
    },
}

impl DisposalViolation {
    /// Stable workflow code for clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AlreadyDisposed { .. } => "already_disposed",
            Self::TransferAlreadyOpen { .. } => "transfer_already_open",
            Self::IllogicalDates { .. } => "illogical_dates",
        }
    }
}

impl From<DisposalViolation> for Error {
    fn from(violation: DisposalViolation) -> Self {
        let details = json!({ "code": violation.code() });
        let message = violation.to_string();
        match violation {
            DisposalViolation::IllogicalDates { .. } => Error::invalid_request(message),
            DisposalViolation::AlreadyDisposed { .. }
            | DisposalViolation::TransferAlreadyOpen { .. } => Error::conflict(message),
        }
        .with_details(details)
    }
}

/// Decide how to dispose of `asset`.
///
/// Returns the closed form of the current location, or `None` when the
/// asset has no open location to close.
pub fn plan_disposal(
    asset: &Asset,
    current: Option<&AssetLocation>,
    has_open_request: bool,
    date: NaiveDate,
) -> Result<Option<AssetLocation>, DisposalViolation> {
    if asset.disposed {
        return Err(DisposalViolation::AlreadyDisposed { asset_id: asset.id });
    }
    if has_open_request {
        return Err(DisposalViolation::TransferAlreadyOpen { asset_id: asset.id });
    }
    let Some(location) = current else {
        return Ok(None);
    };
    if date < location.arrival {
        return Err(DisposalViolation::IllogicalDates {
            arrival: location.arrival,
            disposal: date,
        });
    }
    Ok(Some(AssetLocation {
        departure: Some(date),
        ..*location
    }))
}
