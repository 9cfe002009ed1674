//! Spreadsheet export of the catalog, today's orders and recent cashflow.
//!
//! Files are plain CSV byte buffers handed to a [`HostBridge`], which decides
//! where they end up.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::models::{CashRecord, Item, OrderHistory};
use crate::store::StoreError;

/// Receives exported files from the shop context.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Stores `bytes` under `filename` and returns where it went.
    async fn export(&self, filename: &str, bytes: Vec<u8>) -> Result<String, StoreError>;
}

/// Writes exports into one directory.
#[derive(Debug, Clone)]
pub struct DirectoryBridge {
    dir: PathBuf,
}

impl DirectoryBridge {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl HostBridge for DirectoryBridge {
    async fn export(&self, filename: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Exported {}", path.display());
        Ok(path.to_string_lossy().to_string())
    }
}

/// Outcome of one backup run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupReport {
    /// False when the blob upload was skipped (offline).
    pub blob_written: bool,
    /// Locations returned by the host bridge, in export order.
    pub files: Vec<String>,
}

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub(crate) fn items_csv(items: &[Item]) -> Vec<u8> {
    let mut csv = String::from("id,name,category_id,unit_id,barcode,price,purchase_price,use_stock,stock,expires\n");
    for item in items {
        csv.push_str(&format!(
            "{},{},{},{},{},{:.2},{:.2},{},{},{}\n",
            field(&item.id),
            field(&item.name),
            field(item.category_id.as_deref().unwrap_or_default()),
            field(item.unit_id.as_deref().unwrap_or_default()),
            field(item.barcode.as_deref().unwrap_or_default()),
            item.price,
            item.purchase_price,
            item.use_stock,
            item.stock,
            item.expires.map(|d| d.to_string()).unwrap_or_default()
        ));
    }
    csv.into_bytes()
}

pub(crate) fn orders_csv(orders: &[OrderHistory]) -> Vec<u8> {
    let mut csv = String::from("id,date,cashier,customer,items,amount,discount,tag,pay_amount,paid\n");
    for order in orders {
        csv.push_str(&format!(
            "{},{},{},{},{},{:.2},{:.2},{:.2},{:.2},{}\n",
            field(&order.id),
            order.date.format("%Y-%m-%d %H:%M:%S"),
            field(&order.cashier),
            field(&order.customer),
            order.items.len(),
            order.amount,
            order.discount,
            order.tag,
            order.pay_amount,
            order.paid
        ));
    }
    csv.into_bytes()
}

pub(crate) fn cashflow_csv(records: &[CashRecord]) -> Vec<u8> {
    let mut csv = String::from("date,name,amount\n");
    for record in records {
        csv.push_str(&format!(
            "{},{},{:.2}\n",
            record.date.format("%Y-%m-%d %H:%M:%S"),
            field(&record.name),
            record.amount
        ));
    }
    csv.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_field_quoting() {
        assert_eq!(field("plain"), "plain");
        assert_eq!(field("a,b"), "\"a,b\"");
        assert_eq!(field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_items_csv() {
        let item = Item::new("Cola, can", 1.5).with_id("i1").with_stock(4.0);
        let csv = String::from_utf8(items_csv(&[item])).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,name,"));
        assert_eq!(lines[1], "i1,\"Cola, can\",,,,1.50,0.00,true,4,");
    }

    #[test]
    fn test_cashflow_csv() {
        let record = CashRecord {
            name: "sale".to_string(),
            amount: -2.5,
            date: Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap(),
        };
        let csv = String::from_utf8(cashflow_csv(&[record])).unwrap();
        assert_eq!(csv, "date,name,amount\n2024-03-09 08:30:00,sale,-2.50\n");
    }

    #[tokio::test]
    async fn test_directory_bridge_writes_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let bridge = DirectoryBridge::new(temp_dir.path().join("backup"));

        let location = bridge.export("items.csv", b"id\n".to_vec()).await.unwrap();

        assert_eq!(std::fs::read(&location).unwrap(), b"id\n");
    }
}
