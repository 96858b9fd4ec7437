//! Asset transfer requests and the rules that move them between stages.
//!
//! A request travels `Pending -> Approved -> Loaded -> Completed`, or
//! `Pending -> Rejected`. Every transition is planned by [`TransferSnapshot::plan`]
//! against a consistent snapshot of the request, its transit record and the
//! asset's current location. The resulting [`TransferMutation`] list is applied
//! atomically by the store; a rule violation yields no mutations at all.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AssetId, AssetLocation, Error, Facility, FacilityId, UserId};

/// Serial identifier of a transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferRequestId(i32);

impl TransferRequestId {
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

impl fmt::Display for TransferRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub id: TransferRequestId,
    pub asset_id: AssetId,
    pub requested_by: UserId,
    pub source: FacilityId,
    pub destination: FacilityId,
    pub requested_at: DateTime<Utc>,
    pub approved: bool,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

/// Transit bookkeeping created when a request is approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitRecord {
    pub request_id: TransferRequestId,
    pub load_date: Option<NaiveDate>,
    pub unload_date: Option<NaiveDate>,
}

impl TransitRecord {
    /// Fresh record with neither date set.
    #[must_use]
    pub const fn empty(request_id: TransferRequestId) -> Self {
        Self {
            request_id,
            load_date: None,
            unload_date: None,
        }
    }
}

/// Stage of a transfer request derived from its flags and transit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStage {
    Pending,
    Rejected,
    Approved,
    Loaded,
    Completed,
}

impl TransferStage {
    /// Derive the stage of `request`.
    #[must_use]
    pub fn of(request: &TransferRequest, transit: Option<&TransitRecord>) -> Self {
        match (request.completed, request.approved) {
            (true, false) => Self::Rejected,
            (true, true) => Self::Completed,
            (false, false) => Self::Pending,
            (false, true) if transit.is_some_and(|t| t.load_date.is_some()) => Self::Loaded,
            (false, true) => Self::Approved,
        }
    }

    /// Whether no further transition is accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rejected => "rejected",
            Self::Approved => "approved",
            Self::Loaded => "loaded",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facility officer's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// Error returned for decisions other than `approve` or `reject`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("decision must be 'approve' or 'reject', got '{value}'")]
pub struct DecisionParseError {
    value: String,
}

impl FromStr for Decision {
    type Err = DecisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(DecisionParseError {
                value: s.to_owned(),
            }),
        }
    }
}

/// Caller-supplied fields of a new transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDraft {
    pub asset_id: AssetId,
    pub source: FacilityId,
    pub destination: FacilityId,
}

/// Validated request ready to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransferRequest {
    pub asset_id: AssetId,
    pub requested_by: UserId,
    pub source: FacilityId,
    pub destination: FacilityId,
    pub requested_at: DateTime<Utc>,
}

/// Transition requested on an existing transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferCommand {
    Decide {
        decision: Decision,
        decided_by: UserId,
        decided_at: DateTime<Utc>,
    },
    Load {
        load_date: NaiveDate,
    },
    Unload {
        unload_date: NaiveDate,
    },
    LoadAndUnload {
        load_date: NaiveDate,
        unload_date: NaiveDate,
    },
}

/// Single write the store performs while applying a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMutation {
    MarkCompleted,
    MarkApproved {
        approved_by: UserId,
        approved_at: DateTime<Utc>,
    },
    InsertTransit,
    SetLoadDate(NaiveDate),
    SetUnloadDate(NaiveDate),
    /// Close the location row matched by asset and arrival date.
    CloseLocation {
        asset_id: AssetId,
        arrival: NaiveDate,
        departure: NaiveDate,
    },
    OpenLocation(AssetLocation),
}

/// Ordered writes for one transition and the stage they lead to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub mutations: Vec<TransferMutation>,
    pub outcome: TransferStage,
}

/// Business rule broken by a transfer operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferRuleViolation {
    /// Source is not where the asset currently is.
    #[error("asset is at facility {current}, not at requested source {requested}")]
    InvalidSource {
        current: FacilityId,
        requested: FacilityId,
    },
    #[error("source and destination are both facility {facility}")]
    SameFacility { facility: FacilityId },
    /// The asset has no open location.
    #[error("asset {asset_id} has no current location")]
    NoSuchAsset { asset_id: AssetId },
    #[error("transfer request {request_id} has not been approved")]
    NotApproved { request_id: TransferRequestId },
    #[error("transfer request {request_id} has already been approved")]
    AlreadyApproved { request_id: TransferRequestId },
    #[error("transfer request {request_id} has already been loaded")]
    AlreadyLoaded { request_id: TransferRequestId },
    #[error("transfer request {request_id} has not been loaded yet")]
    NotYetLoaded { request_id: TransferRequestId },
    /// `later` precedes `earlier`.
    #[error("date {later} precedes {earlier}")]
    IllogicalDates { earlier: NaiveDate, later: NaiveDate },
    #[error("transfer request {request_id} is already completed")]
    AlreadyCompleted { request_id: TransferRequestId },
    #[error("asset {asset_id} already has an open transfer request")]
    TransferAlreadyOpen { asset_id: AssetId },
}

impl TransferRuleViolation {
    /// Stable workflow code for clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSource { .. } => "invalid_source",
            Self::SameFacility { .. } => "same_facility",
            Self::NoSuchAsset { .. } => "no_such_asset",
            Self::NotApproved { .. } => "not_approved",
            Self::AlreadyApproved { .. } => "already_approved",
            Self::AlreadyLoaded { .. } => "already_loaded",
            Self::NotYetLoaded { .. } => "not_yet_loaded",
            Self::IllogicalDates { .. } => "illogical_dates",
            Self::AlreadyCompleted { .. } => "already_completed",
            Self::TransferAlreadyOpen { .. } => "transfer_already_open",
        }
    }
}

impl From<TransferRuleViolation> for Error {
    fn from(violation: TransferRuleViolation) -> Self {
        let details = json!({ "code": violation.code() });
        let message = violation.to_string();
        match violation {
            TransferRuleViolation::InvalidSource { .. }
            | TransferRuleViolation::SameFacility { .. }
            | TransferRuleViolation::IllogicalDates { .. } => Error::invalid_request(message),
            TransferRuleViolation::NoSuchAsset { .. } => Error::not_found(message),
            TransferRuleViolation::NotApproved { .. }
            | TransferRuleViolation::AlreadyApproved { .. }
            | TransferRuleViolation::AlreadyLoaded { .. }
            | TransferRuleViolation::NotYetLoaded { .. }
            | TransferRuleViolation::AlreadyCompleted { .. }
            | TransferRuleViolation::TransferAlreadyOpen { .. } => Error::conflict(message),
        }
        .with_details(details)
    }
}

/// Check `later` does not precede `earlier`.
pub fn ensure_ordered(earlier: NaiveDate, later: NaiveDate) -> Result<(), TransferRuleViolation> {
    if later < earlier {
        return Err(TransferRuleViolation::IllogicalDates { earlier, later });
    }
    Ok(())
}

/// Validate a new request against the asset's current state.
///
/// `current_location` is the asset's open location row, if any, and
/// `has_open_request` reports whether another unfinished request already
/// references the asset.
pub fn plan_request(
    draft: TransferDraft,
    requested_by: UserId,
    requested_at: DateTime<Utc>,
    current_location: Option<&AssetLocation>,
    has_open_request: bool,
) -> Result<NewTransferRequest, TransferRuleViolation> {
    if draft.source == draft.destination {
        return Err(TransferRuleViolation::SameFacility {
            facility: draft.source,
        });
    }
    let location = current_location.ok_or(TransferRuleViolation::NoSuchAsset {
        asset_id: draft.asset_id,
    })?;
    if location.facility_id != draft.source {
        return Err(TransferRuleViolation::InvalidSource {
            current: location.facility_id,
            requested: draft.source,
        });
    }
    if has_open_request {
        return Err(TransferRuleViolation::TransferAlreadyOpen {
            asset_id: draft.asset_id,
        });
    }
    Ok(NewTransferRequest {
        asset_id: draft.asset_id,
        requested_by,
        source: draft.source,
        destination: draft.destination,
        requested_at,
    })
}

/// Consistent view of a request used to plan one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSnapshot {
    pub request: TransferRequest,
    pub transit: Option<TransitRecord>,
    pub current_location: Option<AssetLocation>,
}

impl TransferSnapshot {
    /// Current stage of the request.
    #[must_use]
    pub fn stage(&self) -> TransferStage {
        TransferStage::of(&self.request, self.transit.as_ref())
    }

    /// Plan `command`, or explain which rule forbids it.
    ///
    /// # Examples
    /// ```
    /// use chrono::{NaiveDate, TimeZone, Utc};
    /// use logistics::domain::{
    ///     AssetId, FacilityId, TransferCommand, TransferRequest, TransferRequestId,
    ///     TransferSnapshot, TransferStage, UserId, Decision,
    /// };
    ///
    /// let request = TransferRequest {
    ///     id: TransferRequestId::new(2),
    ///     asset_id: AssetId::new(1),
    ///     requested_by: UserId::new(7),
    ///     source: FacilityId::new(1),
    ///     destination: FacilityId::new(2),
    ///     requested_at: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
    ///     approved: false,
    ///     approved_by: None,
    ///     approved_at: None,
    ///     completed: false,
    /// };
    /// let snapshot = TransferSnapshot { request, transit: None, current_location: None };
    /// let plan = snapshot
    ///     .plan(&TransferCommand::Decide {
    ///         decision: Decision::Reject,
    ///         decided_by: UserId::new(9),
    ///         decided_at: Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap(),
    ///     })
    ///     .expect("pending requests can be rejected");
    /// assert_eq!(plan.outcome, TransferStage::Rejected);
    /// ```
    pub fn plan(&self, command: &TransferCommand) -> Result<TransferPlan, TransferRuleViolation> {
        if let TransferCommand::LoadAndUnload {
            load_date,
            unload_date,
        } = *command
        {
            ensure_ordered(load_date, unload_date)?;
        }
        if self.stage().is_terminal() {
            return Err(TransferRuleViolation::AlreadyCompleted {
                request_id: self.request.id,
            });
        }
        match *command {
            TransferCommand::Decide {
                decision,
                decided_by,
                decided_at,
            } => self.plan_decision(decision, decided_by, decided_at),
            TransferCommand::Load { load_date } => {
                let mutations = self.plan_load(load_date)?;
                Ok(TransferPlan {
                    mutations,
                    outcome: TransferStage::Loaded,
                })
            }
            TransferCommand::Unload { unload_date } => {
                let transit = self.require_transit()?;
                let load_date = transit.load_date.ok_or(TransferRuleViolation::NotYetLoaded {
                    request_id: self.request.id,
                })?;
                self.plan_unload(load_date, unload_date)
            }
            TransferCommand::LoadAndUnload {
                load_date,
                unload_date,
            } => {
                let mut mutations = self.plan_load(load_date)?;
                let unload = self.plan_unload(load_date, unload_date)?;
                mutations.extend(unload.mutations);
                Ok(TransferPlan {
                    mutations,
                    outcome: unload.outcome,
                })
            }
        }
    }

    fn plan_decision(
        &self,
        decision: Decision,
        decided_by: UserId,
        decided_at: DateTime<Utc>,
    ) -> Result<TransferPlan, TransferRuleViolation> {
        if self.request.approved {
            return Err(TransferRuleViolation::AlreadyApproved {
                request_id: self.request.id,
            });
        }
        Ok(match decision {
            Decision::Reject => TransferPlan {
                mutations: vec![TransferMutation::MarkCompleted],
                outcome: TransferStage::Rejected,
            },
            Decision::Approve => TransferPlan {
                mutations: vec![
                    TransferMutation::MarkApproved {
                        approved_by: decided_by,
                        approved_at: decided_at,
                    },
                    TransferMutation::InsertTransit,
                ],
                outcome: TransferStage::Approved,
            },
        })
    }

    fn require_transit(&self) -> Result<&TransitRecord, TransferRuleViolation> {
        match (&self.transit, self.request.approved) {
            (Some(transit), true) => Ok(transit),
            _ => Err(TransferRuleViolation::NotApproved {
                request_id: self.request.id,
            }),
        }
    }

    fn plan_load(&self, load_date: NaiveDate) -> Result<Vec<TransferMutation>, TransferRuleViolation> {
        let transit = self.require_transit()?;
        if transit.load_date.is_some() {
            return Err(TransferRuleViolation::AlreadyLoaded {
                request_id: self.request.id,
            });
        }
        let location = self
            .current_location
            .as_ref()
            .ok_or(TransferRuleViolation::NoSuchAsset {
                asset_id: self.request.asset_id,
            })?;
        if location.facility_id != self.request.source {
            return Err(TransferRuleViolation::InvalidSource {
                current: location.facility_id,
                requested: self.request.source,
            });
        }
        ensure_ordered(location.arrival, load_date)?;
        Ok(vec![
            TransferMutation::SetLoadDate(load_date),
            TransferMutation::CloseLocation {
                asset_id: location.asset_id,
                arrival: location.arrival,
                departure: load_date,
            },
        ])
    }

    fn plan_unload(
        &self,
        load_date: NaiveDate,
        unload_date: NaiveDate,
    ) -> Result<TransferPlan, TransferRuleViolation> {
        ensure_ordered(load_date, unload_date)?;
        Ok(TransferPlan {
            mutations: vec![
                TransferMutation::SetUnloadDate(unload_date),
                TransferMutation::OpenLocation(AssetLocation::open(
                    self.request.asset_id,
                    self.request.destination,
                    unload_date,
                )),
                TransferMutation::MarkCompleted,
            ],
            outcome: TransferStage::Completed,
        })
    }
}

/// Request joined with the names clients need to display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferListing {
    pub request: TransferRequest,
    pub asset_tag: String,
    pub source: Facility,
    pub destination: Facility,
    pub transit: Option<TransitRecord>,
}

impl TransferListing {
    /// Stage of the listed request.
    #[must_use]
    pub fn stage(&self) -> TransferStage {
        TransferStage::of(&self.request, self.transit.as_ref())
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
