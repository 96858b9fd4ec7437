//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint, the request and response views
//! and the shared error payload. Swagger UI serves it in debug builds and
//! `cargo run --bin openapi-dump` prints it for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::assets::{
    AssetListingView, AssetView, CreateAssetRequest, DisposeAssetRequest,
};
use crate::inbound::http::facilities::{CreateFacilityRequest, FacilityView};
use crate::inbound::http::reports::AssetReportRowView;
use crate::inbound::http::transfers::{
    CreateTransferRequest, DecisionRequest, TransferListingView, TransferRequestView,
    TransferStageView, TransitRequest,
};
use crate::inbound::http::users::{CreateUserRequest, LoginRequest, UserView};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Logistics backend API",
        description = "Facility and asset inventory with a role-gated transfer approval workflow.",
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::create_user,
        crate::inbound::http::users::current_user,
        crate::inbound::http::facilities::list_facilities,
        crate::inbound::http::facilities::create_facility,
        crate::inbound::http::assets::list_assets,
        crate::inbound::http::assets::eligible_assets,
        crate::inbound::http::assets::create_asset,
        crate::inbound::http::assets::dispose_asset,
        crate::inbound::http::reports::asset_report,
        crate::inbound::http::transfers::create_transfer,
        crate::inbound::http::transfers::pending_transfers,
        crate::inbound::http::transfers::transfers_in_transit,
        crate::inbound::http::transfers::get_transfer,
        crate::inbound::http::transfers::decide_transfer,
        crate::inbound::http::transfers::record_transit,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        LoginRequest,
        CreateUserRequest,
        UserView,
        CreateFacilityRequest,
        FacilityView,
        CreateAssetRequest,
        DisposeAssetRequest,
        AssetView,
        AssetListingView,
        AssetReportRowView,
        CreateTransferRequest,
        DecisionRequest,
        TransitRequest,
        TransferRequestView,
        TransferListingView,
        TransferStageView,
    )),
    tags(
        (name = "users", description = "Accounts and sessions"),
        (name = "facilities", description = "Facility registry"),
        (name = "assets", description = "Asset intake, listing and disposal"),
        (name = "reports", description = "Point-in-time inventory reports"),
        (name = "transfers", description = "Transfer requests, approvals and transit"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated document.

    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn schema(name: &str) -> RefOr<Schema> {
        ApiDoc::openapi()
            .components
            .expect("components")
            .schemas
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("schema {name} registered"))
    }

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    #[case("Error", "code")]
    #[case("Error", "message")]
    #[case("Error", "traceId")]
    #[case("FacilityView", "commonName")]
    #[case("CreateAssetRequest", "arrivalDate")]
    #[case("CreateTransferRequest", "destinationFacilityId")]
    #[case("TransitRequest", "unloadDate")]
    fn schemas_use_camel_case_fields(#[case] name: &str, #[case] field: &str) {
        assert_object_schema_has_field(&schema(name), field);
    }

    #[rstest]
    #[case("/api/v1/login")]
    #[case("/api/v1/assets/dispose")]
    #[case("/api/v1/reports/assets")]
    #[case("/api/v1/transfers/{id}/decision")]
    #[case("/api/v1/transfers/{id}/transit")]
    #[case("/health/ready")]
    fn endpoints_are_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[rstest]
    fn session_cookie_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
    }
}
