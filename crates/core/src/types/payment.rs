//! Payment types served by the payment service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, PaymentId};
use super::status::PaymentStatus;

/// Payload for paying an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: OrderId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
}

/// A payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub provider_txn_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_from_wire() {
        let json = serde_json::json!({
            "id": 3,
            "orderId": 17,
            "status": "CAPTURED",
            "amount": 12.5,
            "providerTxnId": "txn_123",
            "createdAt": "2025-03-01T10:00:00Z"
        });

        let payment: Payment = serde_json::from_value(json).unwrap();
        assert_eq!(payment.status, PaymentStatus::Captured);
        assert_eq!(payment.provider_txn_id.as_deref(), Some("txn_123"));
        assert!(payment.created_at.is_some());
        assert!(payment.updated_at.is_none());
    }

    #[test]
    fn test_payment_request_sends_numeric_amount() {
        let request = PaymentRequest {
            order_id: OrderId::new(17),
            amount: Decimal::new(1250, 2),
            payment_method_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"orderId": 17, "amount": 12.5}));
    }
}
