//! PostgreSQL-backed `InventoryRepository`.
//!
//! Facility and asset registration, disposal and the location report.
//! Registering an asset and disposing of one each run in a single
//! transaction.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{InventoryRepository, InventoryRepositoryError};
use crate::domain::{
    Asset, AssetDisposal, AssetId, AssetListing, AssetLocation, AssetReportRow, Facility,
    FacilityId, NewAsset, NewFacility, plan_disposal,
};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation,
};
use super::diesel_lookups::{current_location, has_open_request};
use super::models::{
    AssetAtRow, AssetRow, FacilityRow, NewAssetAtRow, NewAssetRow, NewFacilityRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{asset_at, assets, facilities, requests};

/// Diesel-backed implementation of the `InventoryRepository` port.
#[derive(Clone)]
pub struct DieselInventoryRepository {
    pool: DbPool,
}

impl DieselInventoryRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug)]
enum TxError {
    Diesel(DieselError),
    Port(InventoryRepositoryError),
}

impl From<DieselError> for TxError {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

impl From<InventoryRepositoryError> for TxError {
    fn from(error: InventoryRepositoryError) -> Self {
        Self::Port(error)
    }
}

fn map_pool_error(error: PoolError) -> InventoryRepositoryError {
    map_basic_pool_error(error, InventoryRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> InventoryRepositoryError {
    map_basic_diesel_error(
        error,
        InventoryRepositoryError::query,
        InventoryRepositoryError::connection,
    )
}

/// Map an insert failure, reporting unique violations as duplicates of
/// `entity`.
fn map_insert_error(entity: &'static str) -> impl Fn(DieselError) -> InventoryRepositoryError {
    move |error| {
        if unique_violation(&error).is_some() {
            InventoryRepositoryError::duplicate(entity)
        } else {
            map_diesel_error(error)
        }
    }
}

fn map_tx_error(entity: &'static str) -> impl Fn(TxError) -> InventoryRepositoryError {
    move |error| match error {
        TxError::Diesel(error) => map_insert_error(entity)(error),
        TxError::Port(error) => error,
    }
}

/// Attach each asset's open location and facility.
async fn load_asset_listings(
    conn: &mut AsyncPgConnection,
    rows: Vec<AssetRow>,
) -> Result<Vec<AssetListing>, DieselError> {
    let asset_ids: Vec<i32> = rows.iter().map(|row| row.asset_pk).collect();
    let open: HashMap<AssetId, AssetLocation> = asset_at::table
        .filter(asset_at::asset_fk.eq_any(asset_ids))
        .filter(asset_at::depart_dt.is_null())
        .select(AssetAtRow::as_select())
        .load::<AssetAtRow>(conn)
        .await?
        .into_iter()
        .map(AssetLocation::from)
        .map(|location| (location.asset_id, location))
        .collect();
    let facility_ids: Vec<i32> = open
        .values()
        .map(|location| location.facility_id.value())
        .collect();
    let sites: HashMap<FacilityId, Facility> = facilities::table
        .filter(facilities::facility_pk.eq_any(facility_ids))
        .select(FacilityRow::as_select())
        .load::<FacilityRow>(conn)
        .await?
        .into_iter()
        .map(Facility::from)
        .map(|facility| (facility.id, facility))
        .collect();

    Ok(rows
        .into_iter()
        .map(Asset::from)
        .map(|asset| {
            let location = open.get(&asset.id);
            AssetListing {
                current_facility: location.and_then(|row| sites.get(&row.facility_id).cloned()),
                arrival: location.map(|row| row.arrival),
                asset,
            }
        })
        .collect())
}

#[async_trait]
impl InventoryRepository for DieselInventoryRepository {
    async fn insert_facility(
        &self,
        facility: &NewFacility,
    ) -> Result<Facility, InventoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: FacilityRow = diesel::insert_into(facilities::table)
            .values(NewFacilityRow {
                fcode: facility.code(),
                common_name: facility.common_name(),
                location: facility.location(),
            })
            .returning(FacilityRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_insert_error("facility"))?;
        Ok(row.into())
    }

    async fn list_facilities(&self) -> Result<Vec<Facility>, InventoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<FacilityRow> = facilities::table
            .select(FacilityRow::as_select())
            .order_by(facilities::facility_pk)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(Facility::from).collect())
    }

    async fn find_facility(
        &self,
        facility_id: FacilityId,
    ) -> Result<Option<Facility>, InventoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<FacilityRow> = facilities::table
            .find(facility_id.value())
            .select(FacilityRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Facility::from))
    }

    async fn insert_asset(&self, asset: &NewAsset) -> Result<Asset, InventoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let facility_id = asset.facility_id();
        let arrival = asset.arrival();
        let row: AssetRow = conn
            .transaction(|conn| {
                async move {
                    let facility: Option<i32> = facilities::table
                        .find(facility_id.value())
                        .select(facilities::facility_pk)
                        .first(conn)
                        .await
                        .optional()?;
                    if facility.is_none() {
                        return Err(InventoryRepositoryError::facility_not_found(facility_id).into());
                    }
                    let row: AssetRow = diesel::insert_into(assets::table)
                        .values(NewAssetRow {
                            asset_tag: asset.tag(),
                            description: asset.description(),
                            disposed: false,
                        })
                        .returning(AssetRow::as_returning())
                        .get_result(conn)
                        .await?;
                    let first = AssetLocation::open(AssetId::new(row.asset_pk), facility_id, arrival);
                    diesel::insert_into(asset_at::table)
                        .values(NewAssetAtRow::from(first))
                        .execute(conn)
                        .await?;
                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error("asset"))?;
        Ok(row.into())
    }

    async fn list_assets(&self) -> Result<Vec<AssetListing>, InventoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let rows: Vec<AssetRow> = assets::table
                    .select(AssetRow::as_select())
                    .order_by(assets::asset_pk)
                    .load(conn)
                    .await?;
                load_asset_listings(conn, rows).await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn list_transfer_eligible(
        &self,
    ) -> Result<Vec<AssetListing>, InventoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let busy: HashSet<i32> = requests::table
                    .filter(requests::completed.eq(false))
                    .select(requests::asset_fk)
                    .load::<i32>(conn)
                    .await?
                    .into_iter()
                    .collect();
                let rows: Vec<AssetRow> = assets::table
                    .filter(assets::disposed.eq(false))
                    .select(AssetRow::as_select())
                    .order_by(assets::asset_pk)
                    .load::<AssetRow>(conn)
                    .await?
                    .into_iter()
                    .filter(|row| !busy.contains(&row.asset_pk))
                    .collect();
                let listings = load_asset_listings(conn, rows).await?;
                Ok(listings
                    .into_iter()
                    .filter(|listing| listing.current_facility.is_some())
                    .collect())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn dispose_asset(
        &self,
        disposal: &AssetDisposal,
    ) -> Result<Asset, InventoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: AssetRow = conn
            .transaction(|conn| {
                async move {
                    let asset: Asset = assets::table
                        .filter(assets::asset_tag.eq(disposal.tag()))
                        .select(AssetRow::as_select())
                        .for_update()
                        .first::<AssetRow>(conn)
                        .await
                        .optional()?
                        .map(Asset::from)
                        .ok_or_else(|| InventoryRepositoryError::asset_not_found(disposal.tag()))?;
                    let current = current_location(conn, asset.id).await?;
                    let open = has_open_request(conn, asset.id).await?;
                    let closed = plan_disposal(&asset, current.as_ref(), open, disposal.date())
                        .map_err(InventoryRepositoryError::rejected)?;
                    if let Some(closed) = closed {
                        diesel::update(
                            asset_at::table
                                .filter(asset_at::asset_fk.eq(asset.id.value()))
                                .filter(asset_at::depart_dt.is_null()),
                        )
                        .set(asset_at::depart_dt.eq(closed.departure))
                        .execute(conn)
                        .await?;
                    }
                    let row = diesel::update(assets::table.find(asset.id.value()))
                        .set(assets::disposed.eq(true))
                        .returning(AssetRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error("asset"))?;
        Ok(row.into())
    }

    async fn asset_report(
        &self,
        date: NaiveDate,
        facility: Option<FacilityId>,
    ) -> Result<Vec<AssetReportRow>, InventoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = asset_at::table
            .inner_join(assets::table)
            .inner_join(facilities::table)
            .filter(asset_at::arrive_dt.le(date))
            .filter(
                asset_at::depart_dt
                    .is_null()
                    .or(asset_at::depart_dt.ge(date)),
            )
            .select((
                AssetAtRow::as_select(),
                AssetRow::as_select(),
                FacilityRow::as_select(),
            ))
            .order_by((facilities::facility_pk, assets::asset_tag))
            .into_boxed();
        if let Some(facility_id) = facility {
            query = query.filter(asset_at::facility_fk.eq(facility_id.value()));
        }
        let rows: Vec<(AssetAtRow, AssetRow, FacilityRow)> = query
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|(location, asset, site)| AssetReportRow {
                asset: asset.into(),
                facility: site.into(),
                arrival: location.arrive_dt,
                departure: location.depart_dt,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for insert and transaction error mapping.
    use super::*;
    use crate::domain::DisposalViolation;
    use diesel::result::DatabaseErrorKind;
    use rstest::rstest;

    fn unique_error() -> DieselError {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_owned()),
        )
    }

    #[rstest]
    #[case("facility")]
    #[case("asset")]
    fn unique_violations_become_duplicates(#[case] entity: &'static str) {
        assert_eq!(
            map_insert_error(entity)(unique_error()),
            InventoryRepositoryError::duplicate(entity)
        );
    }

    #[rstest]
    fn other_failures_stay_query_errors() {
        assert!(matches!(
            map_insert_error("asset")(DieselError::NotFound),
            InventoryRepositoryError::Query { .. }
        ));
    }

    #[rstest]
    fn disposal_refusals_pass_through() {
        let violation = DisposalViolation::AlreadyDisposed {
            asset_id: AssetId::new(2),
        };
        let error = InventoryRepositoryError::rejected(violation);
        assert_eq!(map_tx_error("asset")(error.clone().into()), error);
    }
}
