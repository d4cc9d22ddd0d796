//! Order commands.

use clap::Subcommand;
use tradepost_core::{Cart, Order, OrderId};
use tradepost_gateway::Gateway;

use super::{CliError, current_user, print_json};

#[derive(Subcommand)]
pub enum OrdersAction {
    /// Place an order for the signed-in account
    Create {
        /// Order lines as SKU or SKU:QTY
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Orders placed or viewed from this machine
    List,
    /// Show one order
    Get { id: i64 },
    /// Cancel an order
    Cancel { id: i64 },
    /// Confirm an order
    Confirm { id: i64 },
}

#[allow(clippy::print_stdout)]
pub async fn run(gateway: &Gateway, action: OrdersAction) -> Result<(), CliError> {
    let orders = gateway.orders();
    match action {
        OrdersAction::Create { lines } => {
            let cart = parse_cart(&lines)?;
            let user = current_user(gateway).await?;
            let order = orders.create(user.id, cart.lines()).await?;
            tracing::info!("Order {} placed", order.id);
            print_json(&order)?;
        }
        OrdersAction::List => {
            let mine = orders.list_mine().await;
            if mine.is_empty() {
                println!("No orders yet");
            }
            for order in &mine {
                print_summary(order);
            }
        }
        OrdersAction::Get { id } => print_json(&orders.get(OrderId::new(id)).await?)?,
        OrdersAction::Cancel { id } => {
            report_transition(orders.cancel(OrderId::new(id)).await?, id, "canceled")?;
        }
        OrdersAction::Confirm { id } => {
            report_transition(orders.confirm(OrderId::new(id)).await?, id, "confirmed")?;
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_summary(order: &Order) {
    println!(
        "#{:<8} {:<10} {:>10.2}",
        order.id,
        order.status.to_string(),
        order.total
    );
}

#[allow(clippy::print_stdout)]
fn report_transition(order: Option<Order>, id: i64, verb: &str) -> Result<(), CliError> {
    match order {
        Some(order) => print_json(&order),
        None => {
            println!("Order {id} {verb}");
            Ok(())
        }
    }
}

/// Build a cart from `SKU[:QTY]` arguments. Repeated SKUs are merged.
fn parse_cart(args: &[String]) -> Result<Cart, CliError> {
    let mut cart = Cart::new();
    for arg in args {
        let (sku, quantity) = match arg.rsplit_once(':') {
            Some((sku, qty)) => (
                sku,
                qty.parse::<u32>()
                    .map_err(|_| CliError::InvalidLine(arg.clone()))?,
            ),
            None => (arg.as_str(), 1),
        };
        cart.add(sku, quantity)?;
    }
    Ok(cart)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_cart_defaults_quantity_and_merges() {
        let cart = parse_cart(&args(&["TEA-01:2", "MUG-07", "TEA-01:1"])).unwrap();
        let lines: Vec<_> = cart
            .lines()
            .iter()
            .map(|l| (l.sku.as_str(), l.quantity))
            .collect();
        assert_eq!(lines, [("TEA-01", 3), ("MUG-07", 1)]);
    }

    #[test]
    fn test_parse_cart_rejects_bad_lines() {
        assert!(matches!(
            parse_cart(&args(&["TEA-01:two"])),
            Err(CliError::InvalidLine(_))
        ));
        assert!(matches!(parse_cart(&args(&["TEA-01:0"])), Err(CliError::Cart(_))));
        assert!(matches!(parse_cart(&args(&[":3"])), Err(CliError::Cart(_))));
    }
}
