//! Tradepost CLI - shop against the Tradepost services from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session is kept in $TRADEPOST_STATE_DIR)
//! tpost login -l ada@example.com -p secret
//!
//! # Browse the catalog
//! tpost items search tea --page 0 --size 12
//!
//! # Place an order and pay for it
//! tpost orders create TEA-01:2 MUG-07
//! tpost pay 42 19.90
//!
//! # Orders created or viewed from this machine
//! tpost orders list
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `whoami` / `signup` - Session management
//! - `items` - Catalog search and maintenance
//! - `orders` - Place, view, cancel and confirm orders
//! - `account` - View and edit the signed-in account
//! - `pay` / `payment` - Payments

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tradepost_gateway::{Gateway, GatewayConfig};

mod commands;

#[derive(Parser)]
#[command(name = "tpost")]
#[command(author, version, about = "Tradepost command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        /// Email or username
        #[arg(short, long)]
        login: String,

        #[arg(short, long, env = "TRADEPOST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout {
        /// Also forget the locally remembered order ids
        #[arg(long)]
        forget_orders: bool,
    },
    /// Show the signed-in user
    Whoami,
    /// Register credentials and create the matching account
    Signup {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "TRADEPOST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Browse and maintain the catalog
    Items {
        #[command(subcommand)]
        action: commands::catalog::ItemsAction,
    },
    /// Place and manage orders
    Orders {
        #[command(subcommand)]
        action: commands::orders::OrdersAction,
    },
    /// View and edit the signed-in account
    Account {
        #[command(subcommand)]
        action: commands::account::AccountAction,
    },
    /// Pay towards an order
    Pay {
        order_id: i64,
        amount: Decimal,
    },
    /// Show a payment
    Payment { id: i64 },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tradepost_gateway=info,tradepost_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::from_env()?;
    let gateway = Gateway::new(&config)?;

    match cli.command {
        Commands::Login { login, password } => {
            commands::session::login(&gateway, &login, &password).await?;
        }
        Commands::Logout { forget_orders } => {
            commands::session::logout(&gateway, forget_orders).await?;
        }
        Commands::Whoami => commands::session::whoami(&gateway).await?,
        Commands::Signup {
            email,
            username,
            password,
        } => commands::session::sign_up(&gateway, &email, &username, &password).await?,
        Commands::Items { action } => commands::catalog::run(&gateway, action).await?,
        Commands::Orders { action } => commands::orders::run(&gateway, action).await?,
        Commands::Account { action } => commands::account::run(&gateway, action).await?,
        Commands::Pay { order_id, amount } => {
            commands::payments::pay(&gateway, order_id, amount).await?;
        }
        Commands::Payment { id } => commands::payments::show(&gateway, id).await?,
    }
    Ok(())
}
