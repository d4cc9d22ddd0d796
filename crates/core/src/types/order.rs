//! Order types served by the order service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::OrderId;
use super::status::OrderStatus;

/// An order as returned by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

/// A priced line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub sku: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    pub quantity: u32,
    #[serde(default)]
    pub line_total: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_wire() {
        let json = serde_json::json!({
            "id": 17,
            "status": "PENDING",
            "total": 12.5,
            "items": [
                {
                    "sku": "TEA-01",
                    "name": "Green tea",
                    "quantity": 2,
                    "unitPrice": 6.25,
                    "lineTotal": 12.5
                }
            ]
        });

        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.id, OrderId::new(17));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Decimal::new(125, 1));
        assert_eq!(order.items[0].quantity, 2);
    }

    #[test]
    fn test_order_tolerates_missing_optional_fields() {
        let order: Order = serde_json::from_value(serde_json::json!({"id": 5})).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.items.is_empty());
        assert_eq!(order.total, Decimal::ZERO);
    }
}
