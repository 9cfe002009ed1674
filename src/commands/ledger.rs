use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};

use super::{today, truncate, OutputFormat};
use shopdesk_core::ShopContext;

#[derive(Args)]
pub struct CashflowCommand {
    #[command(subcommand)]
    pub command: CashflowSubcommand,
}

#[derive(Subcommand)]
pub enum CashflowSubcommand {
    /// Record a cash movement now; negative amounts are outgoing
    Record {
        /// Description
        name: String,

        /// Amount
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },

    /// Show the records of one day
    Day {
        /// Day (YYYY-MM-DD, UTC), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the records of the last days
    Range {
        /// Number of days, ending today (UTC)
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl CashflowCommand {
    pub async fn run(&self, shop: &ShopContext) -> Result<(), Box<dyn std::error::Error>> {
        let cashflows = &shop.services().cashflows;

        match &self.command {
            CashflowSubcommand::Record { name, amount } => {
                if name.trim().is_empty() {
                    return Err("Description cannot be empty".into());
                }
                if !cashflows.record(Utc::now(), name.trim(), *amount).await? {
                    return Err("Offline: record was not saved".into());
                }
                println!("Recorded {:.2} ({})", amount, name.trim());
                Ok(())
            }

            CashflowSubcommand::Day { date, format } => {
                let day = date.unwrap_or_else(today);
                let flow = cashflows.day(day).await?;

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&flow)?),
                    OutputFormat::Text => {
                        println!("Cashflow {}", day);
                        println!("{}", "-".repeat(50));
                        for record in &flow.records {
                            println!(
                                "{}  {:<30}  {:>10.2}",
                                record.date.format("%H:%M"),
                                truncate(&record.name, 30),
                                record.amount
                            );
                        }
                        println!("{}", "-".repeat(50));
                        println!("Income:   {:>10.2}", flow.income());
                        println!("Outgoing: {:>10.2}", flow.outgoing());
                        println!("Balance:  {:>10.2}", flow.balance());
                    }
                }
                Ok(())
            }

            CashflowSubcommand::Range { days, format } => {
                if *days == 0 {
                    return Err("--days must be at least 1".into());
                }
                let records = cashflows.range(today(), *days).await?;

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                    OutputFormat::Text => {
                        if records.is_empty() {
                            println!("No records in the last {} day(s)", days);
                            return Ok(());
                        }
                        for record in &records {
                            println!(
                                "{}  {:<30}  {:>10.2}",
                                record.date.format("%Y-%m-%d %H:%M"),
                                truncate(&record.name, 30),
                                record.amount
                            );
                        }
                        let balance: f64 = records.iter().map(|r| r.amount).sum();
                        println!("\nBalance: {:.2}", balance);
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Args)]
pub struct CreditCommand {
    #[command(subcommand)]
    pub command: CreditSubcommand,
}

#[derive(Subcommand)]
pub enum CreditSubcommand {
    /// List credit entries
    List {
        /// Include settled entries
        #[arg(long)]
        all: bool,

        /// Only entries of this customer
        #[arg(long)]
        customer: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Record a payment against a credit entry
    Pay {
        /// Credit entry ID
        id: String,

        /// Amount paid
        amount: f64,
    },
}

impl CreditCommand {
    pub async fn run(&self, shop: &ShopContext) -> Result<(), Box<dyn std::error::Error>> {
        let creditbooks = &shop.services().creditbooks;

        match &self.command {
            CreditSubcommand::List {
                all,
                customer,
                format,
            } => {
                let mut entries = match customer {
                    Some(customer) => creditbooks.for_customer(customer).await?,
                    None => creditbooks.get_all().await?,
                };
                if !all {
                    entries.retain(|entry| !entry.paid);
                }
                entries.sort_by_key(|entry| entry.date);

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
                    OutputFormat::Text => {
                        if entries.is_empty() {
                            println!("No credit entries found");
                            return Ok(());
                        }
                        println!("{:<36}  {:<20}  {:>10}  {:<10}", "ID", "CUSTOMER", "OWED", "DATE");
                        println!("{}", "-".repeat(84));
                        for entry in &entries {
                            println!(
                                "{:<36}  {:<20}  {:>10.2}  {}",
                                entry.id,
                                truncate(&entry.customer, 20),
                                entry.amount,
                                entry.date.format("%Y-%m-%d")
                            );
                        }
                    }
                }
                Ok(())
            }

            CreditSubcommand::Pay { id, amount } => {
                let Some(entry) = creditbooks.pay(id, *amount).await? else {
                    return Err(format!("Credit entry not found: {}", id).into());
                };
                if entry.paid {
                    println!("Credit {} settled", entry.id);
                } else {
                    println!("Credit {}: {:.2} remaining", entry.id, entry.amount);
                }
                Ok(())
            }
        }
    }
}
