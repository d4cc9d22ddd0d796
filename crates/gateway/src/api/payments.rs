use rust_decimal::Decimal;
use tracing::instrument;
use tradepost_core::{OrderId, Payment, PaymentId, PaymentRequest};

use super::to_body;
use crate::config::Service;
use crate::dispatch::{Dispatcher, RequestOptions};
use crate::error::Result;

/// Payment service.
#[derive(Debug, Clone, Copy)]
pub struct PaymentsApi<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> PaymentsApi<'a> {
    pub(super) const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Pay `amount` towards an order.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn pay(&self, order_id: OrderId, amount: Decimal) -> Result<Payment> {
        let request = PaymentRequest {
            order_id,
            amount,
            payment_method_id: None,
        };
        self.dispatcher
            .call(Service::Payments, "", RequestOptions::post(to_body(&request)?))
            .await?
            .into_json()
    }

    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn get(&self, id: PaymentId) -> Result<Payment> {
        self.dispatcher
            .call(Service::Payments, &id.to_string(), RequestOptions::get())
            .await?
            .into_json()
    }
}
