use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateOrderRequest, OrderListQuery, UpdateOrderRequest, UpdateStatusRequest};
use super::repo::{Order, OrderFilter};
use super::services;
use crate::auth::extractors::AuthUser;
use crate::error::AppError;
use crate::extract::{validate_payload, AppJson};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pedidos", get(list_orders).post(create_order))
        .route("/pedidos/stats", get(order_stats))
        .route(
            "/pedidos/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/pedidos/:id/status", patch(update_order_status))
}

/// Non-admin callers may only touch orders they own.
fn ensure_can_access(caller: &AuthUser, order: &Order) -> Result<(), AppError> {
    if caller.is_admin() || order.user_id == caller.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have access to this order".to_string(),
        ))
    }
}

#[instrument(skip(state, payload))]
async fn create_order(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), AppError> {
    validate_payload(&payload)?;
    let order = services::create(&state, caller.id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(order))))
}

#[instrument(skip(state))]
async fn list_orders(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<Vec<Order>>>, AppError> {
    let filter = OrderFilter {
        status: query.status,
        client_name: query.client_name.clone(),
        owner: (!caller.is_admin()).then_some(caller.id),
    };
    let (orders, meta) = services::list(&state, &filter, &query.pagination()).await?;
    Ok(Json(ApiResponse::page(orders, meta)))
}

#[instrument(skip(state))]
async fn get_order(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let order = services::get(&state, id).await?;
    ensure_can_access(&caller, &order)?;
    Ok(Json(ApiResponse::ok(order)))
}

#[instrument(skip(state, payload))]
async fn update_order(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    validate_payload(&payload)?;
    let order = services::get(&state, id).await?;
    ensure_can_access(&caller, &order)?;
    let order = services::update(&state, id, payload).await?;
    Ok(Json(ApiResponse::ok(order)))
}

#[instrument(skip(state, payload))]
async fn update_order_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let order = services::get(&state, id).await?;
    ensure_can_access(&caller, &order)?;
    let order = services::update_status(&state, id, payload.status).await?;
    Ok(Json(ApiResponse::ok(order)))
}

#[instrument(skip(state))]
async fn delete_order(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let order = services::get(&state, id).await?;
    ensure_can_access(&caller, &order)?;
    services::delete(&state, id).await?;
    Ok(Json(ApiResponse::ok_with((), "Order deleted")))
}

#[instrument(skip(state))]
async fn order_stats(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<ApiResponse<BTreeMap<&'static str, i64>>>, AppError> {
    let stats = services::stats(&state).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::Role;
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    fn order_owned_by(user_id: i64) -> Order {
        Order {
            id: 10,
            user_id,
            client_name: "Casa Pepe".into(),
            size: super::super::repo::PortionSize::Medium,
            notes: None,
            price: Decimal::from(12),
            status: super::super::repo::OrderStatus::Pending,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn caller(id: i64, role: Role) -> AuthUser {
        AuthUser {
            id,
            email: "c@x.com".into(),
            role,
        }
    }

    #[test]
    fn owner_and_admin_pass_the_ownership_check() {
        let order = order_owned_by(7);
        assert!(ensure_can_access(&caller(7, Role::User), &order).is_ok());
        assert!(ensure_can_access(&caller(99, Role::Admin), &order).is_ok());
    }

    #[test]
    fn stranger_is_forbidden() {
        let order = order_owned_by(7);
        let err = ensure_can_access(&caller(8, Role::User), &order).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
