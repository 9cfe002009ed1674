use clap::Args;

use super::truncate;
use shopdesk_core::{FetchOptions, ShopContext};

#[derive(Args)]
pub struct FetchCommand {
    /// Report items below the minimum stock level
    #[arg(long)]
    pub alarm: bool,

    /// Back up the catalog and export the spreadsheets
    #[arg(long)]
    pub backup: bool,
}

impl FetchCommand {
    pub async fn run(&self, shop: &ShopContext) -> Result<(), Box<dyn std::error::Error>> {
        let data = shop
            .fetch_data(FetchOptions {
                minimum_stock_alarm: self.alarm,
                backup: self.backup,
            })
            .await?;

        println!(
            "Loaded {} item(s), {} category(ies), {} unit(s)",
            data.items.len(),
            data.categories.len(),
            data.units.len()
        );

        if self.alarm {
            if data.low_stock.is_empty() {
                println!("Stock levels OK");
            } else {
                println!("\nLow stock:");
                for item in &data.low_stock {
                    println!("  {:<30}  {:>8}", truncate(&item.name, 30), item.stock);
                }
            }
        }

        if self.backup {
            match &data.backup {
                Some(report) => {
                    if !report.blob_written {
                        println!("\nBackup blob not written (offline)");
                    }
                    println!("\nExported:");
                    for file in &report.files {
                        println!("  {}", file);
                    }
                }
                None => println!("\nNo backup made"),
            }
        }

        Ok(())
    }
}
