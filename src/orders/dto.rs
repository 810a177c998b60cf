use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::repo::{OrderStatus, PortionSize};
use crate::response::PaginationQuery;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 2, max = 100, message = "must be 2-100 characters"))]
    pub client_name: String,
    pub size: PortionSize,
    #[validate(length(max = 200, message = "must not exceed 200 characters"))]
    pub notes: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 2, max = 100, message = "must be 2-100 characters"))]
    pub client_name: Option<String>,
    pub size: Option<PortionSize>,
    #[validate(length(max = 200, message = "must not exceed 200 characters"))]
    pub notes: Option<String>,
    pub price: Option<Decimal>,
}

/// Unknown status values fail deserialization, which is the rejection path.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub client_name: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

impl OrderListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_short_client_name() {
        let req = CreateOrderRequest {
            client_name: "x".into(),
            size: PortionSize::Small,
            notes: None,
            price: Decimal::from(10),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("client_name"));
    }

    #[test]
    fn create_rejects_oversized_notes() {
        let req = CreateOrderRequest {
            client_name: "Casa Pepe".into(),
            size: PortionSize::Large,
            notes: Some("x".repeat(201)),
            price: Decimal::from(10),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("notes"));
    }

    #[test]
    fn list_query_defaults() {
        let q: OrderListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
        assert!(q.status.is_none());
        assert!(q.client_name.is_none());
    }
}
