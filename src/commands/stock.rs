use clap::{Args, Subcommand};

use super::{truncate, OutputFormat};
use shopdesk_core::ShopContext;

#[derive(Args)]
pub struct StockCommand {
    #[command(subcommand)]
    pub command: StockSubcommand,
}

#[derive(Subcommand)]
pub enum StockSubcommand {
    /// Add stock to an item
    Add {
        /// Item ID
        id: String,

        /// Quantity to add
        quantity: f64,
    },

    /// Remove stock from an item; refused if there is not enough
    Remove {
        /// Item ID
        id: String,

        /// Quantity to remove
        quantity: f64,
    },

    /// List items below the minimum stock level
    Low {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl StockCommand {
    pub async fn run(&self, shop: &ShopContext) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            StockSubcommand::Add { id, quantity } => {
                if *quantity <= 0.0 {
                    return Err("Quantity must be a positive number".into());
                }
                if !shop.add_stock_by_quantity(id, *quantity).await? {
                    return Err("Offline: stock was not changed".into());
                }
                println!("Added {} to {}", quantity, id);
                Ok(())
            }

            StockSubcommand::Remove { id, quantity } => {
                if *quantity <= 0.0 {
                    return Err("Quantity must be a positive number".into());
                }
                if !shop.remove_stock_by_quantity(id, *quantity).await? {
                    return Err(format!("Stock of {} was not changed", id).into());
                }
                println!("Removed {} from {}", quantity, id);
                Ok(())
            }

            StockSubcommand::Low { format } => {
                let minimum = shop.settings().minimum_stock;
                let mut low = shop.services().items.get_all().await?;
                low.retain(|item| item.is_below(minimum));

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&low)?),
                    OutputFormat::Text => {
                        if low.is_empty() {
                            println!("No items below {}", minimum);
                            return Ok(());
                        }
                        println!("{:<36}  {:<30}  {:>8}", "ID", "NAME", "STOCK");
                        println!("{}", "-".repeat(78));
                        for item in &low {
                            println!(
                                "{:<36}  {:<30}  {:>8}",
                                item.id,
                                truncate(&item.name, 30),
                                item.stock
                            );
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
