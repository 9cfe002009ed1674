//! Shop context: catalog refresh, the current cart, checkout and backups.
//!
//! Everything here goes through [`Services`]; the context never holds a
//! store directly.

mod backup;
mod stock;

pub use backup::{BackupReport, DirectoryBridge, HostBridge};

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{
    Cart, Cashflow, Category, Creditbook, Discount, Item, OrderHistory, Totals, Unit,
};
use crate::service::Services;
use crate::store::{Entity, StoreError};
use backup::{cashflow_csv, items_csv, orders_csv};

/// Days of cashflow in the weekly export.
const CASHFLOW_WEEK: u32 = 7;

#[derive(Debug, Clone)]
pub struct ShopSettings {
    /// Items tracking stock below this level are reported by the low-stock alarm.
    pub minimum_stock: f64,
    pub cashier: String,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            minimum_stock: 5.0,
            cashier: "cashier".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub minimum_stock_alarm: bool,
    pub backup: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ShopData {
    pub items: Vec<Item>,
    pub categories: Vec<Category>,
    pub units: Vec<Unit>,
    pub low_stock: Vec<Item>,
    pub backup: Option<BackupReport>,
}

pub struct ShopContext {
    services: Services,
    bridge: Arc<dyn HostBridge>,
    settings: ShopSettings,
    cart: Mutex<Cart>,
}

impl ShopContext {
    pub fn new(services: Services, bridge: Arc<dyn HostBridge>, settings: ShopSettings) -> Self {
        Self {
            services,
            bridge,
            settings,
            cart: Mutex::new(Cart::new()),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn settings(&self) -> &ShopSettings {
        &self.settings
    }

    /// Reloads the catalog. Clears the cart first; optionally reports low
    /// stock and writes a backup.
    pub async fn fetch_data(&self, options: FetchOptions) -> Result<ShopData, StoreError> {
        self.cart.lock().await.clear();

        let (items, categories, units) = tokio::try_join!(
            self.services.items.get_all(),
            self.services.categories.get_all(),
            self.services.units.get_all(),
        )?;
        tracing::debug!(
            "Fetched {} item(s), {} categorie(s), {} unit(s)",
            items.len(),
            categories.len(),
            units.len()
        );

        let low_stock = if options.minimum_stock_alarm {
            self.low_stock(&items)
        } else {
            Vec::new()
        };

        let backup = if options.backup && !items.is_empty() {
            match self.backup(&items).await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!("Backup failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(ShopData {
            items,
            categories,
            units,
            low_stock,
            backup,
        })
    }

    fn low_stock(&self, items: &[Item]) -> Vec<Item> {
        let low: Vec<Item> = items
            .iter()
            .filter(|item| item.is_below(self.settings.minimum_stock))
            .cloned()
            .collect();
        if !low.is_empty() {
            let names: Vec<&str> = low.iter().map(|item| item.name.as_str()).collect();
            tracing::warn!(
                "Stock below {}: {}",
                self.settings.minimum_stock,
                names.join(", ")
            );
        }
        low
    }

    /// Writes the backup blob and exports the CSV files through the bridge.
    pub async fn backup(&self, items: &[Item]) -> Result<BackupReport, StoreError> {
        let blob_written = self.services.items.backup(items).await?;

        let today = Utc::now().date_naive();
        let orders = self.services.orders.on_day(today).await?;
        let day = self.services.cashflows.day(today).await?;
        let week = self.services.cashflows.range(today, CASHFLOW_WEEK).await?;

        let stamp = today.format("%Y-%m-%d");
        let exports = [
            (format!("items_{}.csv", stamp), items_csv(items)),
            (format!("orders_{}.csv", stamp), orders_csv(&orders)),
            (format!("cashflow_{}.csv", stamp), cashflow_csv(&day.records)),
            (format!("cashflow_week_{}.csv", stamp), cashflow_csv(&week)),
        ];

        let mut files = Vec::with_capacity(exports.len());
        for (filename, bytes) in exports {
            files.push(self.bridge.export(&filename, bytes).await?);
        }
        tracing::info!("Backup exported {} file(s)", files.len());

        Ok(BackupReport {
            blob_written,
            files,
        })
    }

    pub async fn cart(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    pub async fn cart_totals(&self) -> Totals {
        self.cart.lock().await.totals()
    }

    /// Adds `quantity` of the item to the cart. Returns false if the item
    /// does not exist.
    pub async fn add_to_cart(&self, item_id: &str, quantity: f64) -> Result<bool, StoreError> {
        let Some(item) = self.services.items.get(item_id).await? else {
            return Ok(false);
        };
        self.cart.lock().await.add(&item, quantity);
        Ok(true)
    }

    /// Sets the quantity of the item's cart line and re-prices it for the new
    /// quantity. Returns false if the cart has no such line.
    pub async fn set_cart_quantity(&self, item_id: &str, quantity: f64) -> Result<bool, StoreError> {
        let item = self.services.items.get(item_id).await?;
        let mut cart = self.cart.lock().await;
        if !cart.set_quantity(item_id, quantity) {
            return Ok(false);
        }
        if let Some(item) = item {
            cart.reprice(&item);
        }
        Ok(true)
    }

    pub async fn remove_from_cart(&self, item_id: &str) -> bool {
        self.cart.lock().await.remove(item_id)
    }

    pub async fn clear_cart(&self) {
        self.cart.lock().await.clear();
    }

    /// Sets the discount and the tag rate applied on top of the cart total.
    pub async fn set_cart_adjustments(&self, discount: Discount, tag_rate: f64) {
        let mut cart = self.cart.lock().await;
        cart.discount = discount;
        cart.tag_rate = tag_rate;
    }

    /// Turns the cart into an order.
    ///
    /// Stores the order, removes its stock, then records the income in the
    /// day's cashflow or opens a credit entry when it is unpaid. Every write
    /// must be stored; if one fails or is skipped, the steps already done are
    /// undone and the cart is left as it was. The cart stays locked
    /// throughout.
    pub async fn checkout(&self, customer: &str, paid: bool) -> Result<OrderHistory, StoreError> {
        let mut cart = self.cart.lock().await;
        let mut order = self
            .services
            .orders
            .checkout(&cart, &self.settings.cashier, customer, paid)
            .await?;

        if let Err(e) = self.settle(&mut order, customer, paid).await {
            tracing::warn!("Checkout of order {} failed, rolling back: {}", order.id, e);
            if let Err(undo) = self.services.orders.delete(&order.id).await {
                tracing::warn!("Failed to remove order {}: {}", order.id, undo);
            }
            return Err(e);
        }

        cart.clear();
        Ok(order)
    }

    async fn settle(
        &self,
        order: &mut OrderHistory,
        customer: &str,
        paid: bool,
    ) -> Result<(), StoreError> {
        self.take_order_stock(order).await?;

        let booked = if paid {
            self.record_income(order).await
        } else {
            self.open_credit(order, customer).await
        };
        if let Err(e) = booked {
            // Exact unless consumption was clamped at zero.
            if let Err(undo) = self.add_stock_by_order(order).await {
                tracing::warn!("Failed to restore stock of order {}: {}", order.id, undo);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn record_income(&self, order: &OrderHistory) -> Result<(), StoreError> {
        let label = format!("order {}", order.id);
        let stored = self
            .services
            .cashflows
            .record(order.date, &label, order.pay_amount)
            .await?;
        StoreError::require(stored, Cashflow::TABLE)
    }

    async fn open_credit(&self, order: &mut OrderHistory, customer: &str) -> Result<(), StoreError> {
        let creditbooks = &self.services.creditbooks;
        let credit = Creditbook::new(customer, order.pay_amount).for_order(&order.id);
        StoreError::require(creditbooks.add(&credit).await?, Creditbook::TABLE)?;

        order.creditbook_id = Some(credit.id.clone());
        let linked = self
            .services
            .orders
            .update(order)
            .await
            .and_then(|stored| StoreError::require(stored, OrderHistory::TABLE));
        if let Err(e) = linked {
            order.creditbook_id = None;
            if let Err(undo) = creditbooks.delete(&credit.id).await {
                tracing::warn!("Failed to remove credit {}: {}", credit.id, undo);
            }
            return Err(e);
        }
        Ok(())
    }
}
