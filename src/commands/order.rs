use chrono::NaiveDate;
use clap::{Args, Subcommand};

use super::{confirm, today, truncate, OutputFormat};
use shopdesk_core::models::Discount;
use shopdesk_core::{OrderStatus, ShopContext};

#[derive(Args)]
pub struct OrderCommand {
    #[command(subcommand)]
    pub command: OrderSubcommand,
}

#[derive(Subcommand)]
pub enum OrderSubcommand {
    /// Sell items: fills the cart and checks it out
    Sell {
        /// Item and quantity as ID:QTY (repeatable)
        #[arg(long = "item", short, required = true, value_parser = parse_line)]
        items: Vec<(String, f64)>,

        /// Customer name
        #[arg(long, default_value = "")]
        customer: String,

        /// Leave the order unpaid and open a credit entry
        #[arg(long)]
        unpaid: bool,

        /// Fixed discount amount
        #[arg(long, conflicts_with = "discount_percent")]
        discount: Option<f64>,

        /// Discount as a percentage of the total
        #[arg(long)]
        discount_percent: Option<f64>,

        /// Tax or service charge percentage added after the discount
        #[arg(long, default_value_t = 0.0)]
        tag: f64,
    },

    /// List orders of a day
    List {
        /// Day (YYYY-MM-DD, UTC), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show an order
    Show {
        /// Order ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Set a status flag on an order (paid, cooking, ready)
    Status {
        /// Order ID
        id: String,

        /// Status to set
        status: OrderStatus,

        /// Clear the flag instead of setting it
        #[arg(long)]
        off: bool,
    },

    /// Delete orders dated within a range of days
    Clear {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Put the stock of an order back
    Restock {
        /// Order ID
        id: String,
    },
}

fn parse_line(s: &str) -> Result<(String, f64), String> {
    let (id, quantity) = match s.rsplit_once(':') {
        Some((id, quantity)) => (id, quantity),
        None => (s, "1"),
    };
    if id.is_empty() {
        return Err(format!("Missing item ID in '{}'", s));
    }
    let quantity: f64 = quantity
        .parse()
        .map_err(|_| format!("Invalid quantity in '{}'", s))?;
    if quantity <= 0.0 {
        return Err(format!("Quantity must be positive in '{}'", s));
    }
    Ok((id.to_string(), quantity))
}

impl OrderCommand {
    pub async fn run(&self, shop: &ShopContext) -> Result<(), Box<dyn std::error::Error>> {
        let orders = &shop.services().orders;

        match &self.command {
            OrderSubcommand::Sell {
                items,
                customer,
                unpaid,
                discount,
                discount_percent,
                tag,
            } => {
                shop.clear_cart().await;
                for (id, quantity) in items {
                    if !shop.add_to_cart(id, *quantity).await? {
                        shop.clear_cart().await;
                        return Err(format!("Item not found: {}", id).into());
                    }
                }

                let discount = match (discount, discount_percent) {
                    (Some(amount), _) => Discount::Amount(*amount),
                    (None, Some(rate)) => Discount::Percent(*rate),
                    (None, None) => Discount::None,
                };
                shop.set_cart_adjustments(discount, *tag).await;

                let order = shop.checkout(customer, !unpaid).await?;
                println!("Checked out order:");
                println!("{}", order);
                if let Some(credit) = &order.creditbook_id {
                    println!("Credit entry: {}", credit);
                }
                Ok(())
            }

            OrderSubcommand::List { date, format } => {
                let day = date.unwrap_or_else(today);
                let list = orders.on_day(day).await?;

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                    OutputFormat::Text => {
                        if list.is_empty() {
                            println!("No orders on {}", day);
                            return Ok(());
                        }
                        println!(
                            "{:<36}  {:<5}  {:<20}  {:>10}  PAID",
                            "ID", "TIME", "CUSTOMER", "TOTAL"
                        );
                        println!("{}", "-".repeat(84));
                        let mut total = 0.0;
                        for order in &list {
                            total += order.pay_amount;
                            println!(
                                "{:<36}  {:<5}  {:<20}  {:>10.2}  {}",
                                order.id,
                                order.date.format("%H:%M"),
                                truncate(&order.customer, 20),
                                order.pay_amount,
                                if order.paid { "yes" } else { "no" }
                            );
                        }
                        println!("\n{} order(s), {:.2} total", list.len(), total);
                    }
                }
                Ok(())
            }

            OrderSubcommand::Show { id, format } => {
                let Some(order) = orders.get(id).await? else {
                    return Err(format!("Order not found: {}", id).into());
                };
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&order)?),
                    OutputFormat::Text => println!("{}", order),
                }
                Ok(())
            }

            OrderSubcommand::Status { id, status, off } => {
                match orders.set_status(id, *status, !off).await? {
                    Some(order) => println!("Updated order {}", order.id),
                    None => return Err(format!("Order not found: {}", id).into()),
                }
                Ok(())
            }

            OrderSubcommand::Clear { from, to, force } => {
                if from > to {
                    return Err("--from must not be after --to".into());
                }
                if !force && !confirm(&format!("Delete all orders from {} to {}?", from, to))? {
                    println!("Clear cancelled.");
                    return Ok(());
                }
                let removed = orders.clear_between(*from, *to).await?;
                println!("Deleted {} order(s)", removed);
                Ok(())
            }

            OrderSubcommand::Restock { id } => {
                let Some(order) = orders.get(id).await? else {
                    return Err(format!("Order not found: {}", id).into());
                };
                if !shop.add_stock_by_order(&order).await? {
                    return Err("Offline: stock was not changed".into());
                }
                println!("Restocked items of order {}", order.id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("cola:3").unwrap(), ("cola".to_string(), 3.0));
        assert_eq!(parse_line("tea").unwrap(), ("tea".to_string(), 1.0));
        assert_eq!(parse_line("rice:0.5").unwrap(), ("rice".to_string(), 0.5));
        assert!(parse_line(":2").is_err());
        assert!(parse_line("cola:x").is_err());
        assert!(parse_line("cola:-1").is_err());
    }
}
