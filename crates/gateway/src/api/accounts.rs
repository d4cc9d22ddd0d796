use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;
use tradepost_core::{Account, AccountId, AccountUpdate, Address, AddressRequest, NewAccount};

use super::to_body;
use crate::config::Service;
use crate::dispatch::{Dispatcher, RequestOptions};
use crate::error::Result;

/// Account service.
#[derive(Debug, Clone, Copy)]
pub struct AccountsApi<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> AccountsApi<'a> {
    pub(super) const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn get(&self, id: AccountId) -> Result<Account> {
        self.dispatcher
            .call(Service::Accounts, &id.to_string(), RequestOptions::get())
            .await?
            .into_json()
    }

    /// Create an account record, authorized by `token` rather than the
    /// stored session token.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self, token))]
    pub async fn create(&self, account: &NewAccount, token: &SecretString) -> Result<Account> {
        let options = RequestOptions::post(to_body(account)?)
            .header("Authorization", format!("Bearer {}", token.expose_secret()));
        self.dispatcher
            .call(Service::Accounts, "", options)
            .await?
            .into_json()
    }

    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn update(&self, id: AccountId, update: &AccountUpdate) -> Result<Account> {
        self.dispatcher
            .call(
                Service::Accounts,
                &id.to_string(),
                RequestOptions::put(to_body(update)?),
            )
            .await?
            .into_json()
    }

    /// Add an address; returns the account's full address list.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self, address))]
    pub async fn add_address(
        &self,
        id: AccountId,
        address: &AddressRequest,
    ) -> Result<Vec<Address>> {
        self.dispatcher
            .call(
                Service::Accounts,
                &format!("{id}/addresses"),
                RequestOptions::post(to_body(address)?),
            )
            .await?
            .into_json()
    }
}
