use clap::{Args, Subcommand};

use super::{confirm, truncate, OutputFormat};
use shopdesk_core::{Item, ShopContext};

#[derive(Args)]
pub struct ItemCommand {
    #[command(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand)]
pub enum ItemSubcommand {
    /// Add an item to the catalog
    Add {
        /// Item name
        name: String,

        /// Selling price
        #[arg(long)]
        price: f64,

        /// Purchase price
        #[arg(long)]
        purchase_price: Option<f64>,

        /// Category ID
        #[arg(long)]
        category: Option<String>,

        /// Unit ID
        #[arg(long)]
        unit: Option<String>,

        /// Barcode
        #[arg(long)]
        barcode: Option<String>,

        /// Image file name in the image cache
        #[arg(long)]
        image: Option<String>,

        /// Track stock, starting at this quantity
        #[arg(long)]
        stock: Option<f64>,
    },

    /// List items
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only pinned items
        #[arg(long)]
        pinned: bool,
    },

    /// Show an item by ID or barcode
    Show {
        /// Item ID or barcode
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an item
    Update {
        /// Item ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New selling price
        #[arg(long)]
        price: Option<f64>,

        /// New purchase price
        #[arg(long)]
        purchase_price: Option<f64>,

        /// New category ID
        #[arg(long)]
        category: Option<String>,

        /// Pin or unpin the item
        #[arg(long)]
        pinned: Option<bool>,
    },

    /// Delete an item and its cached image
    Delete {
        /// Item ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl ItemCommand {
    pub async fn run(&self, shop: &ShopContext) -> Result<(), Box<dyn std::error::Error>> {
        let items = &shop.services().items;

        match &self.command {
            ItemSubcommand::Add {
                name,
                price,
                purchase_price,
                category,
                unit,
                barcode,
                image,
                stock,
            } => {
                if name.trim().is_empty() {
                    return Err("Item name cannot be empty".into());
                }
                if *price < 0.0 {
                    return Err("Price cannot be negative".into());
                }

                let mut item = Item::new(name.trim(), *price);
                if let Some(purchase_price) = purchase_price {
                    item = item.with_purchase_price(*purchase_price);
                }
                if let Some(category) = category {
                    item = item.with_category(category);
                }
                if let Some(unit) = unit {
                    item = item.with_unit(unit);
                }
                if let Some(barcode) = barcode {
                    item = item.with_barcode(barcode);
                }
                if let Some(image) = image {
                    item = item.with_image(image);
                }
                if let Some(stock) = stock {
                    item = item.with_stock(*stock);
                }

                if !items.add(&item).await? {
                    return Err("Offline: item was not saved".into());
                }
                println!("Created item:");
                println!("{}", item);
                Ok(())
            }

            ItemSubcommand::List { format, pinned } => {
                let list = if *pinned {
                    items.pinned().await?
                } else {
                    items.list_for_display().await
                };

                if list.is_empty() {
                    println!("No items found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&list)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  {:>10}  {:>8}", "ID", "NAME", "PRICE", "STOCK");
                        println!("{}", "-".repeat(90));
                        for item in &list {
                            let stock = if item.use_stock {
                                format!("{}", item.stock)
                            } else {
                                "-".to_string()
                            };
                            println!(
                                "{:<36}  {:<30}  {:>10.2}  {:>8}",
                                item.id,
                                truncate(&item.name, 30),
                                item.price,
                                stock
                            );
                        }
                        println!("\nTotal: {} item(s)", list.len());
                    }
                }
                Ok(())
            }

            ItemSubcommand::Show { identifier, format } => {
                let item = match items.get(identifier).await? {
                    Some(item) => Some(item),
                    None => items.find_by_barcode(identifier).await?,
                };
                let Some(item) = item else {
                    return Err(format!("Item not found: {}", identifier).into());
                };

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&item)?),
                    OutputFormat::Text => println!("{}", item),
                }
                Ok(())
            }

            ItemSubcommand::Update {
                id,
                name,
                price,
                purchase_price,
                category,
                pinned,
            } => {
                let has_updates = name.is_some()
                    || price.is_some()
                    || purchase_price.is_some()
                    || category.is_some()
                    || pinned.is_some();
                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let Some(mut item) = items.get(id).await? else {
                    return Err(format!("Item not found: {}", id).into());
                };
                if let Some(name) = name {
                    item.name = name.clone();
                }
                if let Some(price) = price {
                    item.price = *price;
                }
                if let Some(purchase_price) = purchase_price {
                    item.purchase_price = *purchase_price;
                }
                if let Some(category) = category {
                    item.category_id = Some(category.clone());
                }
                if let Some(pinned) = pinned {
                    item.pinned = *pinned;
                }
                item.touch();

                if !items.update(&item).await? {
                    return Err("Offline: item was not saved".into());
                }
                println!("Updated item:");
                println!("{}", item);
                Ok(())
            }

            ItemSubcommand::Delete { id, force } => {
                let Some(item) = items.get(id).await? else {
                    return Err(format!("Item not found: {}", id).into());
                };

                if !force && !confirm(&format!("Delete item '{}'?", item.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                if !items.delete(id).await? {
                    return Err("Offline: item was not deleted".into());
                }
                println!("Deleted item: {}", item.name);
                Ok(())
            }
        }
    }
}
