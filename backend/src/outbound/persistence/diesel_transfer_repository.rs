//! PostgreSQL-backed `TransferRepository`.
//!
//! Every transition runs in one transaction. The request row, its transit
//! row and the asset row are locked `FOR UPDATE` before the snapshot is
//! planned, so concurrent edits of one request serialise and a rejected plan
//! rolls back without writing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{TransferRepository, TransferRepositoryError};
use crate::domain::{
    Facility, FacilityId, TransferCommand, TransferDraft, TransferListing, TransferMutation,
    TransferRequest, TransferRequestId, TransferRuleViolation, TransferSnapshot, TransferStage,
    TransitRecord, UserId, plan_request,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::diesel_lookups::{current_location, has_open_request, lock_asset};
use super::models::{
    FacilityRow, InTransitRow, NewAssetAtRow, NewRequestRow, RequestRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{asset_at, assets, facilities, in_transit, requests};

/// Diesel-backed implementation of the `TransferRepository` port.
#[derive(Clone)]
pub struct DieselTransferRepository {
    pool: DbPool,
}

impl DieselTransferRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a transaction: either Diesel or a domain refusal.
#[derive(Debug)]
enum TxError {
    Diesel(DieselError),
    Port(TransferRepositoryError),
}

impl From<DieselError> for TxError {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

impl From<TransferRepositoryError> for TxError {
    fn from(error: TransferRepositoryError) -> Self {
        Self::Port(error)
    }
}

impl From<TransferRuleViolation> for TxError {
    fn from(violation: TransferRuleViolation) -> Self {
        Self::Port(violation.into())
    }
}

fn map_pool_error(error: PoolError) -> TransferRepositoryError {
    map_basic_pool_error(error, TransferRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> TransferRepositoryError {
    map_basic_diesel_error(
        error,
        TransferRepositoryError::query,
        TransferRepositoryError::connection,
    )
}

fn map_tx_error(error: TxError) -> TransferRepositoryError {
    match error {
        TxError::Diesel(error) => map_diesel_error(error),
        TxError::Port(error) => error,
    }
}

/// Write one planned mutation; every mutation must touch exactly one row.
async fn apply_mutation(
    conn: &mut AsyncPgConnection,
    request_id: TransferRequestId,
    mutation: TransferMutation,
) -> Result<(), DieselError> {
    let request = requests::table.find(request_id.value());
    let transit = in_transit::table.find(request_id.value());
    let affected = match mutation {
        TransferMutation::MarkCompleted => {
            diesel::update(request)
                .set(requests::completed.eq(true))
                .execute(conn)
                .await?
        }
        TransferMutation::MarkApproved {
            approved_by,
            approved_at,
        } => {
            diesel::update(request)
                .set((
                    requests::approved.eq(true),
                    requests::approving_user_fk.eq(Some(approved_by.value())),
                    requests::approve_dt.eq(Some(approved_at)),
                ))
                .execute(conn)
                .await?
        }
        TransferMutation::InsertTransit => {
            diesel::insert_into(in_transit::table)
                .values(InTransitRow {
                    request_fk: request_id.value(),
                    load_dt: None,
                    unload_dt: None,
                })
                .execute(conn)
                .await?
        }
        TransferMutation::SetLoadDate(date) => {
            diesel::update(transit)
                .set(in_transit::load_dt.eq(Some(date)))
                .execute(conn)
                .await?
        }
        TransferMutation::SetUnloadDate(date) => {
            diesel::update(transit)
                .set(in_transit::unload_dt.eq(Some(date)))
                .execute(conn)
                .await?
        }
        TransferMutation::CloseLocation {
            asset_id,
            arrival,
            departure,
        } => {
            diesel::update(
                asset_at::table
                    .filter(asset_at::asset_fk.eq(asset_id.value()))
                    .filter(asset_at::arrive_dt.eq(arrival))
                    .filter(asset_at::depart_dt.is_null()),
            )
            .set(asset_at::depart_dt.eq(Some(departure)))
            .execute(conn)
            .await?
        }
        TransferMutation::OpenLocation(location) => {
            diesel::insert_into(asset_at::table)
                .values(NewAssetAtRow::from(location))
                .execute(conn)
                .await?
        }
    };
    if affected != 1 {
        debug!(?mutation, affected, "transfer mutation matched an unexpected row count");
        return Err(DieselError::NotFound);
    }
    Ok(())
}

/// Join request rows with their asset tags, facilities and transit rows.
async fn load_listings(
    conn: &mut AsyncPgConnection,
    rows: Vec<RequestRow>,
) -> Result<Vec<TransferListing>, DieselError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let asset_ids: Vec<i32> = rows.iter().map(|row| row.asset_fk).collect();
    let facility_ids: Vec<i32> = rows
        .iter()
        .flat_map(|row| [row.src_fk, row.dest_fk])
        .collect();
    let request_ids: Vec<i32> = rows.iter().map(|row| row.request_pk).collect();

    let tags: HashMap<i32, String> = assets::table
        .filter(assets::asset_pk.eq_any(asset_ids))
        .select((assets::asset_pk, assets::asset_tag))
        .load::<(i32, String)>(conn)
        .await?
        .into_iter()
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
    let transits: HashMap<TransferRequestId, TransitRecord> = in_transit::table
        .filter(in_transit::request_fk.eq_any(request_ids))
        .select(InTransitRow::as_select())
        .load::<InTransitRow>(conn)
        .await?
        .into_iter()
        .map(TransitRecord::from)
        .map(|record| (record.request_id, record))
        .collect();

    Ok(rows
        .into_iter()
        .map(TransferRequest::from)
        .filter_map(|request| {
            Some(TransferListing {
                asset_tag: tags.get(&request.asset_id.value())?.clone(),
                source: sites.get(&request.source)?.clone(),
                destination: sites.get(&request.destination)?.clone(),
                transit: transits.get(&request.id).copied(),
                request,
            })
        })
        .collect())
}

impl DieselTransferRepository {
    async fn list_where(
        &self,
        approved: bool,
    ) -> Result<Vec<TransferListing>, TransferRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let rows: Vec<RequestRow> = requests::table
                    .filter(requests::approved.eq(approved))
                    .filter(requests::completed.eq(false))
                    .select(RequestRow::as_select())
                    .order_by(requests::request_pk)
                    .load(conn)
                    .await?;
                load_listings(conn, rows).await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}

#[async_trait]
impl TransferRepository for DieselTransferRepository {
    async fn create_request(
        &self,
        draft: TransferDraft,
        requested_by: UserId,
        requested_at: DateTime<Utc>,
    ) -> Result<TransferRequest, TransferRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: RequestRow = conn
            .transaction(|conn| {
                async move {
                    lock_asset(conn, draft.asset_id).await?;
                    let current = current_location(conn, draft.asset_id).await?;
                    let open = has_open_request(conn, draft.asset_id).await?;
                    let new = plan_request(
                        draft,
                        requested_by,
                        requested_at,
                        current.as_ref(),
                        open,
                    )?;
                    let destination: Option<i32> = facilities::table
                        .find(new.destination.value())
                        .select(facilities::facility_pk)
                        .first(conn)
                        .await
                        .optional()?;
                    if destination.is_none() {
                        return Err(
                            TransferRepositoryError::facility_not_found(new.destination).into()
                        );
                    }
                    let row = diesel::insert_into(requests::table)
                        .values(NewRequestRow {
                            asset_fk: new.asset_id.value(),
                            user_fk: new.requested_by.value(),
                            src_fk: new.source.value(),
                            dest_fk: new.destination.value(),
                            request_dt: new.requested_at,
                            approved: false,
                            completed: false,
                        })
                        .returning(RequestRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;
        Ok(row.into())
    }

    async fn apply(
        &self,
        request_id: TransferRequestId,
        command: TransferCommand,
    ) -> Result<TransferStage, TransferRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let request: TransferRequest = requests::table
                    .find(request_id.value())
                    .select(RequestRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .map(TransferRequest::from)
                    .ok_or_else(|| TransferRepositoryError::request_not_found(request_id))?;
                let transit: Option<InTransitRow> = in_transit::table
                    .find(request_id.value())
                    .select(InTransitRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                lock_asset(conn, request.asset_id).await?;
                let snapshot = TransferSnapshot {
                    transit: transit.map(TransitRecord::from),
                    current_location: current_location(conn, request.asset_id).await?,
                    request,
                };
                let plan = snapshot.plan(&command)?;
                for mutation in plan.mutations {
                    apply_mutation(conn, request_id, mutation).await?;
                }
                Ok(plan.outcome)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_tx_error)
    }

    async fn find(
        &self,
        request_id: TransferRequestId,
    ) -> Result<Option<TransferListing>, TransferRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let listings = conn
            .transaction(|conn| {
                async move {
                    let rows: Vec<RequestRow> = requests::table
                        .find(request_id.value())
                        .select(RequestRow::as_select())
                        .load(conn)
                        .await?;
                    load_listings(conn, rows).await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        Ok(listings.into_iter().next())
    }

    async fn list_pending(&self) -> Result<Vec<TransferListing>, TransferRepositoryError> {
        self.list_where(false).await
    }

    async fn list_in_transit(&self) -> Result<Vec<TransferListing>, TransferRepositoryError> {
        self.list_where(true).await
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for transaction error mapping.
    use super::*;
    use crate::domain::AssetId;
    use diesel::result::DatabaseErrorKind;
    use rstest::rstest;

    #[rstest]
    fn rule_violations_pass_through_unchanged() {
        let violation = TransferRuleViolation::TransferAlreadyOpen {
            asset_id: AssetId::new(3),
        };
        let mapped = map_tx_error(TxError::from(violation.clone()));
        assert_eq!(mapped, TransferRepositoryError::rejected(violation));
    }

    #[rstest]
    fn missing_requests_stay_not_found() {
        let id = TransferRequestId::new(8);
        let mapped = map_tx_error(TransferRepositoryError::request_not_found(id).into());
        assert_eq!(mapped, TransferRepositoryError::request_not_found(id));
    }

    #[rstest]
    fn unexpected_row_counts_are_query_errors() {
        let mapped = map_tx_error(DieselError::NotFound.into());
        assert!(matches!(mapped, TransferRepositoryError::Query { .. }));
    }

    #[rstest]
    fn closed_connections_are_connection_errors() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("terminating connection".to_owned()),
        );
        assert!(matches!(
            map_tx_error(error.into()),
            TransferRepositoryError::Connection { .. }
        ));
    }

    #[rstest]
    fn pool_errors_are_connection_errors() {
        let mapped = map_pool_error(PoolError::checkout("timed out"));
        assert!(mapped.to_string().contains("timed out"));
    }
}
