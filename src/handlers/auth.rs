use crate::{
    auth::AuthUser,
    errors::{ErrorResponse, ServiceError},
    handlers::{common::created_response, AppState},
    services::users::{
        ChangePasswordRequest, CreateUserRequest, LoginRequest, LoginResponse, UpdateUserRequest,
        UserResponse,
    },
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use tracing::info;

/// Create the first manager account on an empty installation
#[utoipa::path(
    post,
    path = "/api/auth/setup",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Manager account created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Setup already completed", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn setup(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.setup_first_manager(payload).await?;
    Ok(created_response(user, "Manager account created"))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account disabled", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = state.services.users.authenticate(payload).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Revoke the presented token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Token revoked"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> ApiResult<()> {
    state.auth.revoke(&user.token_id, user.expires_at).await;
    info!(user_id = user.user_id, "User logged out");
    Ok(Json(ApiResponse::message("Logged out")))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current account", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<UserResponse> {
    let account = state.services.users.get(user.user_id).await?;
    Ok(Json(ApiResponse::success(account)))
}

#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    state
        .services
        .users
        .change_password(user.user_id, payload)
        .await?;
    Ok(Json(ApiResponse::message("Password changed")))
}

/// Create a staff or manager account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.create_user(payload).await?;
    Ok(created_response(user, "Account created"))
}

#[utoipa::path(
    get,
    path = "/api/auth/users",
    responses(
        (status = 200, description = "All accounts", body = ApiResponse<Vec<UserResponse>>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserResponse>> {
    let users = state.services.users.list().await?;
    Ok(Json(ApiResponse::success(users)))
}

#[utoipa::path(
    put,
    path = "/api/auth/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Email taken", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    user: AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    let updated = state
        .services
        .users
        .update(id, payload, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(updated).with_message("Account updated")))
}

#[utoipa::path(
    delete,
    path = "/api/auth/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Account is referenced by audit entries", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    user: AuthUser,
) -> ApiResult<()> {
    state.services.users.delete(id, user.user_id).await?;
    Ok(Json(ApiResponse::message("Account deleted")))
}
