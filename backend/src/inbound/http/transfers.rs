//! Transfer workflow handlers.
//!
//! ```text
//! POST /api/v1/transfers {"assetId":1,"sourceFacilityId":1,"destinationFacilityId":2}
//! GET  /api/v1/transfers/pending
//! GET  /api/v1/transfers/in-transit
//! GET  /api/v1/transfers/{id}
//! POST /api/v1/transfers/{id}/decision {"decision":"approve"}
//! POST /api/v1/transfers/{id}/transit {"loadDate":"03/01/2024","unloadDate":"03/05/2024"}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{
    AssetId, CallerIdentity, Decision, Error, FacilityId, TransferDraft, TransferListing,
    TransferRequest, TransferRequestId, TransferStage, format_form_date,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::facilities::FacilityView;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_optional_date};

const DECISION_FIELD: FieldName = FieldName::new("decision");
const LOAD_DATE_FIELD: FieldName = FieldName::new("loadDate");
const UNLOAD_DATE_FIELD: FieldName = FieldName::new("unloadDate");

/// Transfer request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    pub asset_id: i32,
    pub source_facility_id: i32,
    pub destination_facility_id: i32,
}

/// Approval decision body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    #[schema(example = "approve")]
    pub decision: Option<String>,
}

/// Transit event body; at least one date is required.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitRequest {
    #[schema(example = "03/01/2024")]
    pub load_date: Option<String>,
    #[schema(example = "03/05/2024")]
    pub unload_date: Option<String>,
}

/// Stored request flags and participants.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequestView {
    pub id: i32,
    pub asset_id: i32,
    pub source_facility_id: i32,
    pub destination_facility_id: i32,
    pub requested_by: i32,
    #[schema(example = "2024-03-01T09:00:00Z")]
    pub requested_at: String,
    pub approved: bool,
    pub approved_by: Option<i32>,
    pub approved_at: Option<String>,
    pub completed: bool,
    #[schema(example = "pending")]
    pub stage: String,
}

impl TransferRequestView {
    fn with_stage(request: TransferRequest, stage: TransferStage) -> Self {
        Self {
            id: request.id.value(),
            asset_id: request.asset_id.value(),
            source_facility_id: request.source.value(),
            destination_facility_id: request.destination.value(),
            requested_by: request.requested_by.value(),
            requested_at: request.requested_at.to_rfc3339(),
            approved: request.approved,
            approved_by: request.approved_by.map(|id| id.value()),
            approved_at: request.approved_at.map(|at| at.to_rfc3339()),
            completed: request.completed,
            stage: stage.as_str().to_owned(),
        }
    }
}

impl From<TransferRequest> for TransferRequestView {
    fn from(request: TransferRequest) -> Self {
        let stage = TransferStage::of(&request, None);
        Self::with_stage(request, stage)
    }
}

/// Request with display names and transit dates.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferListingView {
    #[serde(flatten)]
    pub request: TransferRequestView,
    pub asset_tag: String,
    pub source: FacilityView,
    pub destination: FacilityView,
    pub load_date: Option<String>,
    pub unload_date: Option<String>,
}

impl From<TransferListing> for TransferListingView {
    fn from(listing: TransferListing) -> Self {
        let stage = listing.stage();
        let (load_date, unload_date) = listing.transit.map_or((None, None), |transit| {
            (
                transit.load_date.map(format_form_date),
                transit.unload_date.map(format_form_date),
            )
        });
        Self {
            request: TransferRequestView::with_stage(listing.request, stage),
            asset_tag: listing.asset_tag,
            source: FacilityView::from(listing.source),
            destination: FacilityView::from(listing.destination),
            load_date,
            unload_date,
        }
    }
}

/// Stage reached by a transition.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferStageView {
    pub request_id: i32,
    #[schema(example = "approved")]
    pub stage: String,
}

impl TransferStageView {
    fn new(request_id: TransferRequestId, stage: TransferStage) -> Self {
        Self {
            request_id: request_id.value(),
            stage: stage.as_str().to_owned(),
        }
    }
}

fn listing_views(listings: Vec<TransferListing>) -> Vec<TransferListingView> {
    listings.into_iter().map(TransferListingView::from).collect()
}

fn parse_decision(raw: Option<&str>) -> Result<Decision, Error> {
    let raw = raw
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| missing_field_error(DECISION_FIELD))?;
    raw.parse::<Decision>().map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({
            "field": DECISION_FIELD.as_str(),
            "code": "invalid_field",
        }))
    })
}

/// Route a transit body to the matching workflow operation.
async fn dispatch_transit(
    state: &HttpState,
    caller: CallerIdentity,
    request_id: TransferRequestId,
    body: &TransitRequest,
) -> Result<TransferStage, Error> {
    let load = parse_optional_date(body.load_date.as_deref(), LOAD_DATE_FIELD)?;
    let unload = parse_optional_date(body.unload_date.as_deref(), UNLOAD_DATE_FIELD)?;
    match (load, unload) {
        (Some(load), Some(unload)) => {
            state
                .transfers
                .record_load_and_unload(caller, request_id, load, unload)
                .await
        }
        (Some(load), None) => state.transfers.record_load(caller, request_id, load).await,
        (None, Some(unload)) => {
            state
                .transfers
                .record_unload(caller, request_id, unload)
                .await
        }
        (None, None) => Err(missing_field_error(LOAD_DATE_FIELD)),
    }
}

/// Open a transfer request for an asset.
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 201, description = "Request opened", body = TransferRequestView),
        (status = 400, description = "Invalid or same source", body = Error),
        (status = 403, description = "Role not permitted", body = Error),
        (status = 404, description = "Unknown asset or facility", body = Error),
        (status = 409, description = "Transfer already open", body = Error)
    ),
    tags = ["transfers"],
    operation_id = "createTransfer"
)]
#[post("/transfers")]
pub async fn create_transfer(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateTransferRequest>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let body = payload.into_inner();
    let draft = TransferDraft {
        asset_id: AssetId::new(body.asset_id),
        source: FacilityId::new(body.source_facility_id),
        destination: FacilityId::new(body.destination_facility_id),
    };
    let request = state.transfers.request_transfer(caller, draft).await?;
    Ok(HttpResponse::Created().json(TransferRequestView::from(request)))
}

/// Requests awaiting approval.
#[utoipa::path(
    get,
    path = "/api/v1/transfers/pending",
    responses(
        (status = 200, description = "Pending requests", body = [TransferListingView]),
        (status = 403, description = "Role not permitted", body = Error)
    ),
    tags = ["transfers"],
    operation_id = "listPendingTransfers"
)]
#[get("/transfers/pending")]
pub async fn pending_transfers(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<TransferListingView>>> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let listings = state.transfers_query.pending_approvals(caller).await?;
    Ok(web::Json(listing_views(listings)))
}

/// Approved requests still travelling.
#[utoipa::path(
    get,
    path = "/api/v1/transfers/in-transit",
    responses(
        (status = 200, description = "Requests in transit", body = [TransferListingView]),
        (status = 403, description = "Role not permitted", body = Error)
    ),
    tags = ["transfers"],
    operation_id = "listTransfersInTransit"
)]
#[get("/transfers/in-transit")]
pub async fn transfers_in_transit(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<TransferListingView>>> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let listings = state.transfers_query.in_transit(caller).await?;
    Ok(web::Json(listing_views(listings)))
}

/// One request with its stage and transit dates.
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    params(("id" = i32, Path, description = "Transfer request id")),
    responses(
        (status = 200, description = "Request", body = TransferListingView),
        (status = 404, description = "Unknown request", body = Error)
    ),
    tags = ["transfers"],
    operation_id = "getTransfer"
)]
#[get("/transfers/{id}")]
pub async fn get_transfer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<web::Json<TransferListingView>> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let request_id = TransferRequestId::new(path.into_inner());
    let listing = state
        .transfers_query
        .transfer_history(caller, request_id)
        .await?;
    Ok(web::Json(TransferListingView::from(listing)))
}

/// Approve or reject a pending request.
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/decision",
    params(("id" = i32, Path, description = "Transfer request id")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Stage after the decision", body = TransferStageView),
        (status = 400, description = "Missing or unknown decision", body = Error),
        (status = 403, description = "Role not permitted", body = Error),
        (status = 404, description = "Unknown request", body = Error),
        (status = 409, description = "Already approved or completed", body = Error)
    ),
    tags = ["transfers"],
    operation_id = "decideTransfer"
)]
#[post("/transfers/{id}/decision")]
pub async fn decide_transfer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<DecisionRequest>,
) -> ApiResult<web::Json<TransferStageView>> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let request_id = TransferRequestId::new(path.into_inner());
    let decision = parse_decision(payload.decision.as_deref())?;
    let stage = state.transfers.decide(caller, request_id, decision).await?;
    Ok(web::Json(TransferStageView::new(request_id, stage)))
}

/// Record load and/or unload dates.
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/transit",
    params(("id" = i32, Path, description = "Transfer request id")),
    request_body = TransitRequest,
    responses(
        (status = 200, description = "Stage after the transit event", body = TransferStageView),
        (status = 400, description = "Missing, malformed or illogical dates", body = Error),
        (status = 403, description = "Role not permitted", body = Error),
        (status = 404, description = "Unknown request", body = Error),
        (status = 409, description = "Transition not allowed in the current stage", body = Error)
    ),
    tags = ["transfers"],
    operation_id = "recordTransit"
)]
#[post("/transfers/{id}/transit")]
pub async fn record_transit(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<TransitRequest>,
) -> ApiResult<web::Json<TransferStageView>> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let request_id = TransferRequestId::new(path.into_inner());
    let stage = dispatch_transit(&state, caller, request_id, &payload).await?;
    Ok(web::Json(TransferStageView::new(request_id, stage)))
}
