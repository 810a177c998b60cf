use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateUserRequest,
    UserView,
};
use super::services;
use crate::auth::extractors::{AuthUser, RequireAdmin};
use crate::error::AppError;
use crate::extract::{validate_payload, AppJson};
use crate::response::{ApiResponse, PaginationQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/profile/password", patch(change_password))
        .route("/users/admin", get(admin_list))
        .route("/users/admin/:id", get(admin_get).put(admin_update))
        .route("/users/admin/:id/deactivate", patch(admin_deactivate))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    validate_payload(&payload)?;
    let response = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    validate_payload(&payload)?;
    let response = services::login(&state, payload).await?;
    Ok(Json(ApiResponse::ok(response)))
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    let user = services::get_active(&state, caller.id).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    validate_payload(&payload)?;
    let user = services::update(&state, caller.id, payload).await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[instrument(skip(state, payload))]
async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    validate_payload(&payload)?;
    services::change_password(&state, caller.id, payload).await?;
    Ok(Json(ApiResponse::ok_with((), "Password updated")))
}

#[instrument(skip(state))]
async fn admin_list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<UserView>>>, AppError> {
    let (users, meta) = services::list(&state, &page).await?;
    Ok(Json(ApiResponse::page(users, meta)))
}

#[instrument(skip(state))]
async fn admin_get(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    let user = services::get_active(&state, id).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

#[instrument(skip(state, payload))]
async fn admin_update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserView>>, AppError> {
    validate_payload(&payload)?;
    let user = services::update(&state, id, payload).await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[instrument(skip(state))]
async fn admin_deactivate(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if admin.id == id {
        return Err(AppError::Forbidden(
            "Cannot deactivate your own account".to_string(),
        ));
    }
    services::deactivate(&state, id).await?;
    Ok(Json(ApiResponse::ok_with((), "User deactivated")))
}
