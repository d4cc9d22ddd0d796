//! Payment commands.

use rust_decimal::Decimal;
use tradepost_core::{OrderId, PaymentId};
use tradepost_gateway::Gateway;

use super::{CliError, print_json};

pub async fn pay(gateway: &Gateway, order_id: i64, amount: Decimal) -> Result<(), CliError> {
    let payment = gateway.payments().pay(OrderId::new(order_id), amount).await?;
    tracing::info!("Payment {} is {}", payment.id, payment.status);
    print_json(&payment)
}

pub async fn show(gateway: &Gateway, id: i64) -> Result<(), CliError> {
    print_json(&gateway.payments().get(PaymentId::new(id)).await?)
}
