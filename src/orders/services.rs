use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::info;

use super::dto::{CreateOrderRequest, UpdateOrderRequest};
use super::repo::{Order, OrderFilter, OrderStatus};
use crate::error::{AppError, Result};
use crate::response::{PageMeta, PaginationQuery};
use crate::state::AppState;

/// Upper bound on a single order's price.
fn price_ceiling() -> Decimal {
    Decimal::from(10_000)
}

fn check_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::Domain("Price must be positive".to_string()));
    }
    if price > price_ceiling() {
        return Err(AppError::Domain(format!(
            "Price must not exceed {}",
            price_ceiling()
        )));
    }
    Ok(())
}

pub async fn create(state: &AppState, owner_id: i64, req: CreateOrderRequest) -> Result<Order> {
    check_price(req.price)?;
    let order = Order::create(
        &state.db,
        owner_id,
        &req.client_name,
        req.size,
        req.notes.as_deref(),
        req.price,
    )
    .await?;
    info!(order_id = order.id, owner_id, "order created");
    Ok(order)
}

pub async fn get(state: &AppState, id: i64) -> Result<Order> {
    Order::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
}

pub async fn list(
    state: &AppState,
    filter: &OrderFilter,
    page: &PaginationQuery,
) -> Result<(Vec<Order>, PageMeta)> {
    let total = Order::count(&state.db, filter).await?;
    let orders = Order::list(&state.db, filter, page.limit(), page.offset()).await?;
    let meta = PageMeta::new(page.page(), page.limit(), total);
    Ok((orders, meta))
}

pub async fn update(state: &AppState, id: i64, req: UpdateOrderRequest) -> Result<Order> {
    get(state, id).await?;
    if let Some(price) = req.price {
        check_price(price)?;
    }
    let order = Order::update(
        &state.db,
        id,
        req.client_name.as_deref(),
        req.size,
        req.notes.as_deref(),
        req.price,
        None,
    )
    .await?;
    info!(order_id = id, "order updated");
    Ok(order)
}

pub async fn update_status(state: &AppState, id: i64, status: OrderStatus) -> Result<Order> {
    let current = get(state, id).await?;
    if current.status.is_terminal() {
        return Err(AppError::Domain(format!(
            "Cannot change status of a {} order",
            current.status.as_str()
        )));
    }
    let order = Order::update(&state.db, id, None, None, None, None, Some(status)).await?;
    info!(order_id = id, status = status.as_str(), "order status changed");
    Ok(order)
}

pub async fn delete(state: &AppState, id: i64) -> Result<()> {
    let order = get(state, id).await?;
    if order.status == OrderStatus::Delivered {
        return Err(AppError::Domain(
            "Cannot delete a delivered order".to_string(),
        ));
    }
    Order::delete(&state.db, id).await?;
    info!(order_id = id, "order deleted");
    Ok(())
}

pub async fn stats(state: &AppState) -> Result<BTreeMap<&'static str, i64>> {
    let rows = Order::status_counts(&state.db).await?;
    Ok(to_status_map(rows))
}

fn to_status_map(rows: Vec<(OrderStatus, i64)>) -> BTreeMap<&'static str, i64> {
    rows.into_iter()
        .map(|(status, count)| (status.as_str(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_must_be_positive() {
        assert!(check_price(Decimal::ZERO).is_err());
        assert!(check_price(Decimal::from(-5)).is_err());
        assert!(check_price(Decimal::new(1, 2)).is_ok()); // 0.01
    }

    #[test]
    fn price_has_a_ceiling() {
        assert!(check_price(Decimal::from(10_000)).is_ok());
        assert!(check_price(Decimal::from(10_001)).is_err());
    }

    #[test]
    fn stats_map_only_contains_present_statuses() {
        let map = to_status_map(vec![
            (OrderStatus::Pending, 3),
            (OrderStatus::Delivered, 1),
        ]);
        assert_eq!(map.get("pending"), Some(&3));
        assert_eq!(map.get("delivered"), Some(&1));
        assert!(!map.contains_key("cancelled"));
    }
}
