//! Asset inventory handlers.
//!
//! ```text
//! GET  /api/v1/assets
//! POST /api/v1/assets {"tag":"A42","description":"Forklift","facilityId":1,"arrivalDate":"01/10/2024"}
//! POST /api/v1/assets/dispose {"tag":"A42","disposalDate":"04/01/2024"}
//! GET  /api/v1/assets/eligible
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Asset, AssetDisposal, AssetListing, Error, FacilityId, NewAsset, format_form_date,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::facilities::FacilityView;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_field_error, parse_date};

/// Asset registration body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    #[schema(example = "A42")]
    pub tag: String,
    #[schema(example = "Forklift")]
    pub description: String,
    pub facility_id: i32,
    #[schema(example = "01/10/2024")]
    pub arrival_date: String,
}

/// Disposal body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisposeAssetRequest {
    #[schema(example = "A42")]
    pub tag: String,
    #[schema(example = "04/01/2024")]
    pub disposal_date: String,
}

/// Asset fields shared by every asset response.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    pub id: i32,
    pub tag: String,
    pub description: String,
    pub disposed: bool,
}

impl From<Asset> for AssetView {
    fn from(asset: Asset) -> Self {
        Self {
            id: asset.id.value(),
            tag: asset.tag,
            description: asset.description,
            disposed: asset.disposed,
        }
    }
}

/// Asset with its current facility; both location fields are absent for
/// disposed assets.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetListingView {
    #[serde(flatten)]
    pub asset: AssetView,
    pub facility: Option<FacilityView>,
    #[schema(example = "01/10/2024")]
    pub arrival_date: Option<String>,
}

impl From<AssetListing> for AssetListingView {
    fn from(listing: AssetListing) -> Self {
        Self {
            asset: AssetView::from(listing.asset),
            facility: listing.current_facility.map(FacilityView::from),
            arrival_date: listing.arrival.map(format_form_date),
        }
    }
}

fn listing_views(listings: Vec<AssetListing>) -> Vec<AssetListingView> {
    listings.into_iter().map(AssetListingView::from).collect()
}

/// List every asset with its current facility.
#[utoipa::path(
    get,
    path = "/api/v1/assets",
    responses(
        (status = 200, description = "Assets", body = [AssetListingView]),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["assets"],
    operation_id = "listAssets"
)]
#[get("/assets")]
pub async fn list_assets(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<AssetListingView>>> {
    session.require_caller(state.accounts.as_ref()).await?;
    let assets = state.inventory_query.list_assets().await?;
    Ok(web::Json(listing_views(assets)))
}

/// Assets that may be put on a new transfer request.
#[utoipa::path(
    get,
    path = "/api/v1/assets/eligible",
    responses(
        (status = 200, description = "Transfer-eligible assets", body = [AssetListingView]),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["assets"],
    operation_id = "listEligibleAssets"
)]
#[get("/assets/eligible")]
pub async fn eligible_assets(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<AssetListingView>>> {
    session.require_caller(state.accounts.as_ref()).await?;
    let assets = state.inventory_query.transfer_eligible_assets().await?;
    Ok(web::Json(listing_views(assets)))
}

/// Register an asset at its first facility.
#[utoipa::path(
    post,
    path = "/api/v1/assets",
    request_body = CreateAssetRequest,
    responses(
        (status = 201, description = "Asset registered", body = AssetView),
        (status = 400, description = "Invalid request", body = Error),
        (status = 403, description = "Role not permitted", body = Error),
        (status = 404, description = "Unknown facility", body = Error),
        (status = 409, description = "Duplicate tag", body = Error)
    ),
    tags = ["assets"],
    operation_id = "createAsset"
)]
#[post("/assets")]
pub async fn create_asset(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateAssetRequest>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let request = payload.into_inner();
    let arrival = parse_date(&request.arrival_date, FieldName::new("arrivalDate"))?;
    let asset = NewAsset::try_new(
        &request.tag,
        &request.description,
        FacilityId::new(request.facility_id),
        arrival,
    )
    .map_err(|err| invalid_field_error(&err))?;
    let created = state.inventory.register_asset(caller, asset).await?;
    Ok(HttpResponse::Created().json(AssetView::from(created)))
}

/// Dispose of an asset, closing its current location.
#[utoipa::path(
    post,
    path = "/api/v1/assets/dispose",
    request_body = DisposeAssetRequest,
    responses(
        (status = 200, description = "Asset disposed", body = AssetView),
        (status = 400, description = "Invalid request or illogical date", body = Error),
        (status = 403, description = "Role not permitted", body = Error),
        (status = 404, description = "Unknown asset", body = Error),
        (status = 409, description = "Already disposed or transfer open", body = Error)
    ),
    tags = ["assets"],
    operation_id = "disposeAsset"
)]
#[post("/assets/dispose")]
pub async fn dispose_asset(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<DisposeAssetRequest>,
) -> ApiResult<web::Json<AssetView>> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let request = payload.into_inner();
    let date = parse_date(&request.disposal_date, FieldName::new("disposalDate"))?;
    let disposal =
        AssetDisposal::try_new(&request.tag, date).map_err(|err| invalid_field_error(&err))?;
    let asset = state.inventory.dispose_asset(caller, disposal).await?;
    Ok(web::Json(AssetView::from(asset)))
}

#[cfg(test)]
mod tests {
    //! Asset handler coverage over the in-memory store.
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::NaiveDate;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use crate::domain::Role;
    use crate::inbound::http::test_utils::{api_app, login_cookie};
    use crate::test_support::InMemoryLogisticsStore;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).expect("valid date")
    }

    #[fixture]
    fn store() -> Arc<InMemoryLogisticsStore> {
        let store = Arc::new(InMemoryLogisticsStore::default());
        store.seed_user("clerk", "pw", Role::LogisticsOfficer);
        store.seed_user("officer", "pw", Role::FacilityOfficer);
        let hq = store.seed_facility("HQ", "Headquarters", "Arlington");
        store.seed_asset("A42", hq.id, date(1, 10));
        store
    }

    #[rstest]
    #[actix_web::test]
    async fn registered_assets_are_listed_at_their_facility(store: Arc<InMemoryLogisticsStore>) {
        let app = actix_test::init_service(api_app(&store)).await;
        let cookie = login_cookie(&app, "officer", "pw").await;

        let created = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/assets")
                .cookie(cookie.clone())
                .set_json(json!({
                    "tag": "B7",
                    "description": "Pallet jack",
                    "facilityId": 1,
                    "arrivalDate": "02/01/2024"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/assets")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let b7 = listed
            .as_array()
            .expect("array")
            .iter()
            .find(|asset| asset["tag"] == "B7")
            .expect("B7 listed");
        assert_eq!(b7["facility"]["code"], "HQ");
        assert_eq!(b7["arrivalDate"], "02/01/2024");
        assert_eq!(b7["disposed"], false);
    }

    #[rstest]
    #[case(json!({"tag": "B7", "description": "x", "facilityId": 1, "arrivalDate": "2024-02-01"}), StatusCode::BAD_REQUEST, "invalid_date_format")]
    #[case(json!({"tag": "B7", "description": "x", "facilityId": 1, "arrivalDate": ""}), StatusCode::BAD_REQUEST, "missing_field")]
    #[case(json!({"tag": "B7", "description": "x", "facilityId": 99, "arrivalDate": "02/01/2024"}), StatusCode::NOT_FOUND, "no_such_facility")]
    #[case(json!({"tag": "A42", "description": "x", "facilityId": 1, "arrivalDate": "02/01/2024"}), StatusCode::CONFLICT, "duplicate_entity")]
    #[actix_web::test]
    async fn invalid_registrations_are_rejected(
        store: Arc<InMemoryLogisticsStore>,
        #[case] body: Value,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let app = actix_test::init_service(api_app(&store)).await;
        let cookie = login_cookie(&app, "clerk", "pw").await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/assets")
                .cookie(cookie)
                .set_json(body)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), status);
        let payload: Value = actix_test::read_body_json(response).await;
        assert_eq!(payload["details"]["code"], code);
    }

    #[rstest]
    #[actix_web::test]
    async fn disposed_assets_leave_the_eligible_list(store: Arc<InMemoryLogisticsStore>) {
        let app = actix_test::init_service(api_app(&store)).await;
        let cookie = login_cookie(&app, "clerk", "pw").await;

        let disposed: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/assets/dispose")
                .cookie(cookie.clone())
                .set_json(json!({"tag": "A42", "disposalDate": "04/01/2024"}))
                .to_request(),
        )
        .await;
        assert_eq!(disposed["disposed"], true);

        let eligible: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/assets/eligible")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(eligible, json!([]));

        let again = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/assets/dispose")
                .cookie(cookie)
                .set_json(json!({"tag": "A42", "disposalDate": "04/02/2024"}))
                .to_request(),
        )
        .await;
        assert_eq!(again.status(), StatusCode::CONFLICT);
        let payload: Value = actix_test::read_body_json(again).await;
        assert_eq!(payload["details"]["code"], "already_disposed");
    }

    #[rstest]
    #[actix_web::test]
    async fn facility_officers_may_not_dispose(store: Arc<InMemoryLogisticsStore>) {
        let app = actix_test::init_service(api_app(&store)).await;
        let cookie = login_cookie(&app, "officer", "pw").await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/assets/dispose")
                .cookie(cookie)
                .set_json(json!({"tag": "A42", "disposalDate": "04/01/2024"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let payload: Value = actix_test::read_body_json(response).await;
        assert_eq!(payload["details"]["code"], "role_required");
    }
}
