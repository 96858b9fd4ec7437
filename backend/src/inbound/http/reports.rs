//! Point-in-time asset report.
//!
//! ```text
//! GET /api/v1/reports/assets?date=03/01/2024&facility=All
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{AssetReportRow, Error, FacilitySelector, format_form_date};
use crate::inbound::http::ApiResult;
use crate::inbound::http::assets::AssetView;
use crate::inbound::http::facilities::FacilityView;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_date};

const DATE_FIELD: FieldName = FieldName::new("date");

/// Report filters.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssetReportQuery {
    /// Report date, `MM/DD/YYYY`.
    #[param(example = "03/01/2024")]
    pub date: Option<String>,
    /// `All` or a facility id; defaults to `All`.
    #[param(example = "All")]
    pub facility: Option<String>,
}

/// One asset stay covering the report date.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetReportRowView {
    pub asset: AssetView,
    pub facility: FacilityView,
    #[schema(example = "01/10/2024")]
    pub arrival_date: String,
    pub departure_date: Option<String>,
}

impl From<AssetReportRow> for AssetReportRowView {
    fn from(row: AssetReportRow) -> Self {
        Self {
            asset: AssetView::from(row.asset),
            facility: FacilityView::from(row.facility),
            arrival_date: format_form_date(row.arrival),
            departure_date: row.departure.map(format_form_date),
        }
    }
}

fn parse_selector(raw: Option<&str>) -> Result<FacilitySelector, Error> {
    match raw.map(str::trim) {
        None | Some("") => Ok(FacilitySelector::All),
        Some(value) => value.parse::<FacilitySelector>().map_err(|err| {
            Error::invalid_request(err.to_string())
                .with_details(json!({ "field": "facility", "code": "invalid_field" }))
        }),
    }
}

/// Where assets were on a given date, ordered by facility then tag.
#[utoipa::path(
    get,
    path = "/api/v1/reports/assets",
    params(AssetReportQuery),
    responses(
        (status = 200, description = "Report rows", body = [AssetReportRowView]),
        (status = 400, description = "Missing or malformed filter", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["reports"],
    operation_id = "assetReport"
)]
#[get("/reports/assets")]
pub async fn asset_report(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<AssetReportQuery>,
) -> ApiResult<web::Json<Vec<AssetReportRowView>>> {
    session.require_caller(state.accounts.as_ref()).await?;
    let AssetReportQuery { date, facility } = query.into_inner();
    let raw_date = date.ok_or_else(|| missing_field_error(DATE_FIELD))?;
    let date = parse_date(&raw_date, DATE_FIELD)?;
    let selector = parse_selector(facility.as_deref())?;
    let rows = state.inventory_query.asset_report(date, selector).await?;
    Ok(web::Json(
        rows.into_iter().map(AssetReportRowView::from).collect(),
    ))
}
