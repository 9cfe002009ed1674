mod catalog;
mod config_cmd;
mod fetch;
mod item;
mod ledger;
mod order;
mod stock;

pub use catalog::{CategoryCommand, UnitCommand};
pub use config_cmd::ConfigCommand;
pub use fetch::FetchCommand;
pub use item::ItemCommand;
pub use ledger::{CashflowCommand, CreditCommand};
pub use order::OrderCommand;
pub use stock::StockCommand;

use chrono::{NaiveDate, Utc};
use clap::ValueEnum;
use std::io::{self, Write};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Shortens `name` to `width` characters for table output.
pub(crate) fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() > width {
        let head: String = name.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// The current day as orders and cashflow buckets key it (UTC).
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Asks a yes/no question on stdin; anything but "y" is no.
pub(crate) fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Cola", 30), "Cola");
        assert_eq!(truncate("Sparkling mineral water", 10), "Sparkli...");
    }

    #[tokio::test]
    async fn test_today_reads_the_bucket_just_recorded() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let pool = shopdesk_core::init_db(&temp_dir.path().join("shop.db"))
            .await
            .unwrap();
        let images = shopdesk_core::ImageCache::new(temp_dir.path().join("images"));
        let services = shopdesk_core::Services::local(pool, images);

        services
            .cashflows
            .record(Utc::now(), "float", 20.0)
            .await
            .unwrap();

        let flow = services.cashflows.day(today()).await.unwrap();
        assert_eq!(flow.income(), 20.0);
    }
}
