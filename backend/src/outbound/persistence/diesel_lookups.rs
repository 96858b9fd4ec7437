//! Queries shared by the transfer and inventory adapters.
//!
//! All helpers take a borrowed connection so callers can run them inside
//! their own transaction.

use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::{AssetId, AssetLocation};

use super::models::AssetAtRow;
use super::schema::{asset_at, assets, requests};

/// The asset's open location row.
///
/// The partial unique index on `asset_at (asset_fk) WHERE depart_dt IS NULL`
/// guarantees at most one match.
pub(super) async fn current_location(
    conn: &mut AsyncPgConnection,
    asset_id: AssetId,
) -> Result<Option<AssetLocation>, DieselError> {
    let row: Option<AssetAtRow> = asset_at::table
        .filter(asset_at::asset_fk.eq(asset_id.value()))
        .filter(asset_at::depart_dt.is_null())
        .select(AssetAtRow::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(row.map(AssetLocation::from))
}

/// Whether an unfinished request references the asset.
pub(super) async fn has_open_request(
    conn: &mut AsyncPgConnection,
    asset_id: AssetId,
) -> Result<bool, DieselError> {
    diesel::select(diesel::dsl::exists(
        requests::table
            .filter(requests::asset_fk.eq(asset_id.value()))
            .filter(requests::completed.eq(false)),
    ))
    .get_result(conn)
    .await
}

/// Lock the asset row for the rest of the transaction.
///
/// A missing asset locks nothing; planning rejects it as `NoSuchAsset`
/// because it has no current location.
pub(super) async fn lock_asset(
    conn: &mut AsyncPgConnection,
    asset_id: AssetId,
) -> Result<(), DieselError> {
    assets::table
        .find(asset_id.value())
        .select(assets::asset_pk)
        .for_update()
        .load::<i32>(conn)
        .await?;
    Ok(())
}
