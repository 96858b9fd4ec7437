//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types live here so
//! adapters stay thin.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use crate::domain::{
    Asset, AssetId, AssetLocation, Facility, FacilityId, PasswordDigest, Role, TransferRequest,
    TransferRequestId, TransitRecord, User, UserId, UserValidationError, Username,
};

use super::schema::{asset_at, assets, facilities, in_transit, requests, users};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub user_pk: i32,
    pub username: String,
    pub password: String,
    pub role_fk: i32,
}

impl UserRow {
    /// Decode the row, rejecting values the domain cannot represent.
    pub fn into_parts(self) -> Result<(User, PasswordDigest), UserValidationError> {
        let user = User {
            id: UserId::new(self.user_pk),
            username: Username::new(&self.username)?,
            role: Role::from_code(self.role_fk)?,
        };
        Ok((user, PasswordDigest::from_phc(self.password)))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub role_fk: i32,
}

// ---------------------------------------------------------------------------
// Facilities and assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = facilities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FacilityRow {
    pub facility_pk: i32,
    pub fcode: String,
    pub common_name: String,
    pub location: String,
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Self {
            id: FacilityId::new(row.facility_pk),
            code: row.fcode,
            common_name: row.common_name,
            location: row.location,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = facilities)]
pub(crate) struct NewFacilityRow<'a> {
    pub fcode: &'a str,
    pub common_name: &'a str,
    pub location: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = assets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AssetRow {
    pub asset_pk: i32,
    pub asset_tag: String,
    pub description: String,
    pub disposed: bool,
}

impl From<AssetRow> for Asset {
    fn from(row: AssetRow) -> Self {
        Self {
            id: AssetId::new(row.asset_pk),
            tag: row.asset_tag,
            description: row.description,
            disposed: row.disposed,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = assets)]
pub(crate) struct NewAssetRow<'a> {
    pub asset_tag: &'a str,
    pub description: &'a str,
    pub disposed: bool,
}

#[derive(Debug, Clone, Copy, Queryable, Selectable)]
#[diesel(table_name = asset_at)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AssetAtRow {
    pub asset_fk: i32,
    pub facility_fk: i32,
    pub arrive_dt: NaiveDate,
    pub depart_dt: Option<NaiveDate>,
}

impl From<AssetAtRow> for AssetLocation {
    fn from(row: AssetAtRow) -> Self {
        Self {
            asset_id: AssetId::new(row.asset_fk),
            facility_id: FacilityId::new(row.facility_fk),
            arrival: row.arrive_dt,
            departure: row.depart_dt,
        }
    }
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = asset_at)]
pub(crate) struct NewAssetAtRow {
    pub asset_fk: i32,
    pub facility_fk: i32,
    pub arrive_dt: NaiveDate,
    pub depart_dt: Option<NaiveDate>,
}

impl From<AssetLocation> for NewAssetAtRow {
    fn from(location: AssetLocation) -> Self {
        Self {
            asset_fk: location.asset_id.value(),
            facility_fk: location.facility_id.value(),
            arrive_dt: location.arrival,
            depart_dt: location.departure,
        }
    }
}

// ---------------------------------------------------------------------------
// Transfer requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RequestRow {
    pub request_pk: i32,
    pub asset_fk: i32,
    pub user_fk: i32,
    pub src_fk: i32,
    pub dest_fk: i32,
    pub request_dt: DateTime<Utc>,
    pub approved: bool,
    pub approving_user_fk: Option<i32>,
    pub approve_dt: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl From<RequestRow> for TransferRequest {
    fn from(row: RequestRow) -> Self {
        Self {
            id: TransferRequestId::new(row.request_pk),
            asset_id: AssetId::new(row.asset_fk),
            requested_by: UserId::new(row.user_fk),
            source: FacilityId::new(row.src_fk),
            destination: FacilityId::new(row.dest_fk),
            requested_at: row.request_dt,
            approved: row.approved,
            approved_by: row.approving_user_fk.map(UserId::new),
            approved_at: row.approve_dt,
            completed: row.completed,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = requests)]
pub(crate) struct NewRequestRow {
    pub asset_fk: i32,
    pub user_fk: i32,
    pub src_fk: i32,
    pub dest_fk: i32,
    pub request_dt: DateTime<Utc>,
    pub approved: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, Queryable, Selectable, Insertable)]
#[diesel(table_name = in_transit)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InTransitRow {
    pub request_fk: i32,
    pub load_dt: Option<NaiveDate>,
    pub unload_dt: Option<NaiveDate>,
}

impl From<InTransitRow> for TransitRecord {
    fn from(row: InTransitRow) -> Self {
        Self {
            request_id: TransferRequestId::new(row.request_fk),
            load_date: row.load_dt,
            unload_date: row.unload_dt,
        }
    }
}
