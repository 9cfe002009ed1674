use clap::{Args, Subcommand};

use super::{truncate, OutputFormat};
use shopdesk_core::{Category, ShopContext, Unit};

#[derive(Args)]
pub struct CategoryCommand {
    #[command(subcommand)]
    pub command: CategorySubcommand,
}

#[derive(Subcommand)]
pub enum CategorySubcommand {
    /// Create a category
    Add {
        /// Category name
        name: String,
    },

    /// List categories
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a category
    Delete {
        /// Category ID
        id: String,
    },
}

impl CategoryCommand {
    pub async fn run(&self, shop: &ShopContext) -> Result<(), Box<dyn std::error::Error>> {
        let categories = &shop.services().categories;

        match &self.command {
            CategorySubcommand::Add { name } => {
                if name.trim().is_empty() {
                    return Err("Category name cannot be empty".into());
                }
                let category = Category::new(name.trim());
                if !categories.add(&category).await? {
                    return Err("Offline: category was not saved".into());
                }
                println!("Created category {} ({})", category.name, category.id);
                Ok(())
            }

            CategorySubcommand::List { format } => {
                let list = categories.get_all().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                    OutputFormat::Text => {
                        if list.is_empty() {
                            println!("No categories found");
                            return Ok(());
                        }
                        println!("{:<36}  NAME", "ID");
                        println!("{}", "-".repeat(60));
                        for category in &list {
                            println!("{:<36}  {}", category.id, category.name);
                        }
                    }
                }
                Ok(())
            }

            CategorySubcommand::Delete { id } => {
                if !categories.delete(id).await? {
                    return Err("Offline: category was not deleted".into());
                }
                println!("Deleted category {}", id);
                Ok(())
            }
        }
    }
}

#[derive(Args)]
pub struct UnitCommand {
    #[command(subcommand)]
    pub command: UnitSubcommand,
}

#[derive(Subcommand)]
pub enum UnitSubcommand {
    /// Create a unit
    Add {
        /// Unit name (e.g., "box", "pcs")
        name: String,

        /// Explicit unit ID (defaults to a new UUID)
        #[arg(long)]
        id: Option<String>,
    },

    /// List units with their conversions
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Link two units: one FROM equals FACTOR of TO
    Link {
        from: String,
        to: String,
        factor: f64,
    },

    /// Remove the conversion between two units
    Unlink { a: String, b: String },

    /// Convert a quantity between linked units
    Convert {
        quantity: f64,
        from: String,
        to: String,
    },

    /// Delete a unit and every conversion pointing at it
    Delete {
        /// Unit ID
        id: String,
    },
}

impl UnitCommand {
    pub async fn run(&self, shop: &ShopContext) -> Result<(), Box<dyn std::error::Error>> {
        let units = &shop.services().units;

        match &self.command {
            UnitSubcommand::Add { name, id } => {
                let mut unit = Unit::new(name.trim());
                if let Some(id) = id {
                    unit = unit.with_id(id);
                }
                if !units.add(&unit).await? {
                    return Err("Offline: unit was not saved".into());
                }
                println!("Created unit {} ({})", unit.name, unit.id);
                Ok(())
            }

            UnitSubcommand::List { format } => {
                let list = units.get_all().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                    OutputFormat::Text => {
                        if list.is_empty() {
                            println!("No units found");
                            return Ok(());
                        }
                        for unit in &list {
                            println!("{} ({})", truncate(&unit.name, 30), unit.id);
                            for (target, conversion) in &unit.conversions {
                                println!("  -> {} x{}", target, conversion.multiplier());
                            }
                        }
                    }
                }
                Ok(())
            }

            UnitSubcommand::Link { from, to, factor } => {
                if !units.link(from, to, *factor).await? {
                    return Err("Offline: link was not saved".into());
                }
                println!("Linked: 1 {} = {} {}", from, factor, to);
                Ok(())
            }

            UnitSubcommand::Unlink { a, b } => {
                if !units.unlink(a, b).await? {
                    return Err("Offline: unlink was not saved".into());
                }
                println!("Unlinked {} and {}", a, b);
                Ok(())
            }

            UnitSubcommand::Convert { quantity, from, to } => {
                match units.convert(*quantity, from, to).await? {
                    Some(result) => println!("{} {} = {} {}", quantity, from, result, to),
                    None => return Err(format!("No conversion from {} to {}", from, to).into()),
                }
                Ok(())
            }

            UnitSubcommand::Delete { id } => {
                if units.remove(id).await? {
                    println!("Deleted unit {}", id);
                } else {
                    println!("Unit {} not deleted (missing or offline)", id);
                }
                Ok(())
            }
        }
    }
}
