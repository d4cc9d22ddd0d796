//! Account commands.

use clap::Subcommand;
use tradepost_core::{AccountUpdate, AddressRequest, AddressType};
use tradepost_gateway::Gateway;

use super::{CliError, current_account, print_json};

#[derive(Subcommand)]
pub enum AccountAction {
    /// Show the signed-in account
    Show,
    /// Change email and username
    Update {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        username: String,
    },
    /// Add a shipping or billing address
    AddAddress {
        /// `shipping` or `billing`
        #[arg(long = "type", default_value = "shipping")]
        kind: AddressType,

        #[arg(long)]
        line1: String,

        #[arg(long)]
        line2: Option<String>,

        #[arg(long)]
        city: String,

        #[arg(long)]
        zip: Option<String>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        recipient: Option<String>,

        #[arg(long)]
        default: bool,
    },
}

pub async fn run(gateway: &Gateway, action: AccountAction) -> Result<(), CliError> {
    let id = current_account(gateway).await?;
    let accounts = gateway.accounts();

    match action {
        AccountAction::Show => print_json(&accounts.get(id).await?)?,
        AccountAction::Update { email, username } => {
            let account = accounts.update(id, &AccountUpdate { email, username }).await?;
            gateway.session().refresh().await;
            print_json(&account)?;
        }
        AccountAction::AddAddress {
            kind,
            line1,
            line2,
            city,
            zip,
            country,
            recipient,
            default,
        } => {
            let address = AddressRequest {
                kind,
                recipient,
                line1,
                line2,
                city,
                zip,
                country,
                is_default: default,
                ..AddressRequest::default()
            };
            print_json(&accounts.add_address(id, &address).await?)?;
        }
    }
    Ok(())
}
