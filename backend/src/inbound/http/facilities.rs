//! Facility handlers.
//!
//! ```text
//! GET  /api/v1/facilities
//! POST /api/v1/facilities {"code":"HQ","commonName":"Headquarters","location":"Arlington"}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Facility, NewFacility};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::invalid_field_error;

/// Facility registration body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFacilityRequest {
    #[schema(example = "HQ")]
    pub code: String,
    #[schema(example = "Headquarters")]
    pub common_name: String,
    #[schema(example = "Arlington, VA")]
    pub location: String,
}

/// Facility as returned to clients.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FacilityView {
    pub id: i32,
    pub code: String,
    pub common_name: String,
    pub location: String,
}

impl From<Facility> for FacilityView {
    fn from(facility: Facility) -> Self {
        Self {
            id: facility.id.value(),
            code: facility.code,
            common_name: facility.common_name,
            location: facility.location,
        }
    }
}

/// List every facility.
#[utoipa::path(
    get,
    path = "/api/v1/facilities",
    responses(
        (status = 200, description = "Facilities", body = [FacilityView]),
        (status = 401, description = "Login required", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["facilities"],
    operation_id = "listFacilities"
)]
#[get("/facilities")]
pub async fn list_facilities(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<FacilityView>>> {
    session.require_caller(state.accounts.as_ref()).await?;
    let facilities = state.inventory_query.list_facilities().await?;
    Ok(web::Json(
        facilities.into_iter().map(FacilityView::from).collect(),
    ))
}

/// Register a facility.
#[utoipa::path(
    post,
    path = "/api/v1/facilities",
    request_body = CreateFacilityRequest,
    responses(
        (status = 201, description = "Facility registered", body = FacilityView),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Role not permitted", body = Error),
        (status = 409, description = "Duplicate code or name", body = Error)
    ),
    tags = ["facilities"],
    operation_id = "createFacility"
)]
#[post("/facilities")]
pub async fn create_facility(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateFacilityRequest>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller(state.accounts.as_ref()).await?;
    let CreateFacilityRequest {
        code,
        common_name,
        location,
    } = payload.into_inner();
    let facility = NewFacility::try_new(&code, &common_name, &location)
        .map_err(|err| invalid_field_error(&err))?;
    let created = state.inventory.register_facility(caller, facility).await?;
    Ok(HttpResponse::Created().json(FacilityView::from(created)))
}

#[cfg(test)]
mod tests {
    //! Facility handler coverage over the in-memory store.
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use crate::domain::Role;
    use crate::inbound::http::test_utils::{api_app, login_cookie};
    use crate::test_support::InMemoryLogisticsStore;

    #[fixture]
    fn store() -> Arc<InMemoryLogisticsStore> {
        let store = Arc::new(InMemoryLogisticsStore::default());
        store.seed_user("clerk", "pw", Role::LogisticsOfficer);
        store.seed_user("visitor", "pw", Role::Guest);
        store.seed_facility("HQ", "Headquarters", "Arlington");
        store
    }

    #[rstest]
    #[actix_web::test]
    async fn officers_register_facilities(store: Arc<InMemoryLogisticsStore>) {
        let app = actix_test::init_service(api_app(&store)).await;
        let cookie = login_cookie(&app, "clerk", "pw").await;

        let created = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/facilities")
                .cookie(cookie.clone())
                .set_json(json!({
                    "code": "DC",
                    "commonName": "Distribution Centre",
                    "location": "Baltimore"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/facilities")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let codes: Vec<&str> = listed
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|facility| facility["code"].as_str())
            .collect();
        assert_eq!(codes, ["HQ", "DC"]);
    }

    #[rstest]
    #[case(json!({"code": "HQ", "commonName": "Second HQ", "location": "X"}), StatusCode::CONFLICT, "duplicate_entity")]
    #[case(json!({"code": "  ", "commonName": "Depot", "location": "X"}), StatusCode::BAD_REQUEST, "invalid_field")]
    #[actix_web::test]
    async fn invalid_facilities_are_rejected(
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
                .uri("/api/v1/facilities")
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
    async fn guests_may_not_register_facilities(store: Arc<InMemoryLogisticsStore>) {
        let app = actix_test::init_service(api_app(&store)).await;
        let cookie = login_cookie(&app, "visitor", "pw").await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/facilities")
                .cookie(cookie)
                .set_json(json!({"code": "DC", "commonName": "Depot", "location": "X"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[rstest]
    #[actix_web::test]
    async fn listing_requires_login(store: Arc<InMemoryLogisticsStore>) {
        let app = actix_test::init_service(api_app(&store)).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/v1/facilities").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
