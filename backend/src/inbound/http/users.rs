//! Account and session handlers.
//!
//! ```text
//! POST /api/v1/login {"username":"clerk","password":"s3cret!"}
//! POST /api/v1/logout
//! POST /api/v1/users {"username":"clerk","password":"s3cret!","role":"logistics_officer"}
//! GET  /api/v1/users/me
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{
    AccountValidationError, Error, LoginCredentials, LoginValidationError, NewAccount, Role, User,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Login request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Account registration body; `role` defaults to `guest`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[schema(example = "logistics_officer")]
    pub role: Option<String>,
}

/// Account as returned to clients.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub username: String,
    #[schema(example = "facility_officer")]
    pub role: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id.value(),
            username: user.username.as_str().to_owned(),
            role: user.role.as_str().to_owned(),
        }
    }
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyUsername => Error::invalid_request("username must not be empty")
            .with_details(json!({ "field": "username", "code": "missing_field" })),
        LoginValidationError::EmptyPassword => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "missing_field" })),
    }
}

fn map_account_validation_error(err: AccountValidationError) -> Error {
    let field = match &err {
        AccountValidationError::Username(_) => "username",
        AccountValidationError::EmptyPassword => "password",
    };
    Error::invalid_request(err.to_string())
        .with_details(json!({ "field": field, "code": "invalid_field" }))
}

fn parse_role(raw: Option<&str>) -> Result<Option<Role>, Error> {
    raw.map(|name| {
        name.parse::<Role>().map_err(|err| {
            Error::invalid_request(err.to_string())
                .with_details(json!({ "field": "role", "code": "invalid_field" }))
        })
    })
    .transpose()
}

/// Authenticate and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = UserView,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 503, description = "Account store unavailable", body = Error)
    ),
    tags = ["users"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<UserView>> {
    let LoginRequest { username, password } = payload.into_inner();
    let credentials = LoginCredentials::try_from_parts(&username, &password)
        .map_err(map_login_validation_error)?;
    let user = state.accounts.authenticate(&credentials).await?;
    session.persist_user(user.id)?;
    Ok(web::Json(UserView::from(user)))
}

/// End the current session.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 204, description = "Session cleared")),
    tags = ["users"],
    operation_id = "logout"
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::NoContent().finish()
}

/// Register an account.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserView),
        (status = 400, description = "Invalid request", body = Error),
        (status = 409, description = "Username already taken", body = Error),
        (status = 503, description = "Account store unavailable", body = Error)
    ),
    tags = ["users"],
    operation_id = "createUser",
    security([])
)]
#[post("/users")]
pub async fn create_user(
    state: web::Data<HttpState>,
    payload: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    let CreateUserRequest {
        username,
        password,
        role,
    } = payload.into_inner();
    let role = parse_role(role.as_deref())?;
    let account =
        NewAccount::try_new(&username, &password, role).map_err(map_account_validation_error)?;
    let user = state.accounts.create_user(account).await?;
    Ok(HttpResponse::Created().json(UserView::from(user)))
}

/// The logged-in account.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current account", body = UserView),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserView>> {
    let user_id = session.require_user_id()?;
    let user = state.accounts.current_user(user_id).await?;
    Ok(web::Json(UserView::from(user)))
}

#[cfg(test)]
mod tests;
