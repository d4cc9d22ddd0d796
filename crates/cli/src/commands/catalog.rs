//! Catalog commands.

use clap::Subcommand;
use rust_decimal::Decimal;
use tradepost_core::{ItemId, ItemUpdate, NewItem};
use tradepost_gateway::{Gateway, SearchQuery, api::DEFAULT_PAGE_SIZE};

use super::{CliError, print_json};

#[derive(Subcommand)]
pub enum ItemsAction {
    /// Search the catalog
    Search {
        /// Free-text query
        q: Option<String>,

        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        size: u32,
    },
    /// Show one item
    Get { id: String },
    /// Add an item to the catalog
    Create {
        #[arg(long)]
        sku: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        price: Decimal,

        #[arg(long, default_value_t = 0)]
        stock: i64,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        picture_url: Option<String>,
    },
    /// Change an item
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        price: Option<Decimal>,

        #[arg(long)]
        active: Option<bool>,
    },
}

#[allow(clippy::print_stdout)]
pub async fn run(gateway: &Gateway, action: ItemsAction) -> Result<(), CliError> {
    match action {
        ItemsAction::Search { q, page, size } => {
            let results = gateway.items().search(&SearchQuery { q, page, size }).await?;
            for item in &results.content {
                println!(
                    "{:<12} {:<32} {:>10}  stock {}",
                    item.sku, item.name, item.price, item.stock
                );
            }
            println!(
                "page {} of {} ({} items)",
                page + 1,
                results.total_pages.max(1),
                results.total_elements
            );
        }
        ItemsAction::Get { id } => print_json(&gateway.items().get(&ItemId::new(id)).await?)?,
        ItemsAction::Create {
            sku,
            name,
            price,
            stock,
            description,
            picture_url,
        } => {
            let item = NewItem {
                sku,
                name,
                description,
                categories: Vec::new(),
                price,
                stock,
                active: true,
                url: None,
                picture_url,
            };
            print_json(&gateway.items().create(&item).await?)?;
        }
        ItemsAction::Update {
            id,
            name,
            description,
            price,
            active,
        } => {
            let update = ItemUpdate {
                name,
                description,
                price,
                active,
                ..ItemUpdate::default()
            };
            print_json(&gateway.items().update(&ItemId::new(id), &update).await?)?;
        }
    }
    Ok(())
}
