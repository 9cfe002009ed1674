//! Stock mutation.
//!
//! Each helper reads the catalog with its revision, changes it in memory and
//! writes it back checked against that revision. A concurrent writer makes
//! the helper fail with [`StoreError::Conflict`] instead of being overwritten.

use std::collections::BTreeMap;

use super::ShopContext;
use crate::models::{Item, OrderHistory};
use crate::store::StoreError;

impl ShopContext {
    async fn mutate_stock<F>(&self, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut [Item]) -> Result<bool, StoreError> + Send,
    {
        let items = &self.services.items;
        let mut snapshot = items.snapshot().await?;
        if !mutate(snapshot.items.as_mut_slice())? {
            return Ok(false);
        }
        items.replace(&snapshot.items, Some(snapshot.revision)).await
    }

    pub async fn add_stock_by_quantity(&self, item_id: &str, quantity: f64) -> Result<bool, StoreError> {
        self.mutate_stock(|items| {
            find(items, item_id)?.add_stock(quantity);
            Ok(true)
        })
        .await
    }

    /// Removes `quantity` from the item. Returns false without writing when
    /// the item tracks stock and has less than `quantity`.
    pub async fn remove_stock_by_quantity(
        &self,
        item_id: &str,
        quantity: f64,
    ) -> Result<bool, StoreError> {
        self.mutate_stock(|items| {
            let item = find(items, item_id)?;
            if !item.has_stock_for(quantity) {
                tracing::warn!(
                    "Not enough stock for {}: {} < {}",
                    item.name,
                    item.stock,
                    quantity
                );
                return Ok(false);
            }
            item.consume_stock(quantity);
            Ok(true)
        })
        .await
    }

    /// Puts the stock of a cancelled or returned order back.
    pub async fn add_stock_by_order(&self, order: &OrderHistory) -> Result<bool, StoreError> {
        let demand = order.stock_demand();
        self.mutate_stock(|items| Ok(apply_demand(items, &demand, Item::add_stock)))
            .await
    }

    pub async fn remove_stock_by_order(&self, order: &OrderHistory) -> Result<bool, StoreError> {
        let demand = order.stock_demand();
        self.mutate_stock(|items| Ok(apply_demand(items, &demand, Item::consume_stock)))
            .await
    }

    /// Removes the order's stock at checkout. Unlike the public helpers, a
    /// write the backend skipped is an error here.
    pub(super) async fn take_order_stock(&self, order: &OrderHistory) -> Result<(), StoreError> {
        let demand = order.stock_demand();
        let mut changed = false;
        let stored = self
            .mutate_stock(|items| {
                changed = apply_demand(items, &demand, Item::consume_stock);
                Ok(changed)
            })
            .await?;
        if changed {
            StoreError::require(stored, "items")?;
        }
        Ok(())
    }

    /// Removes the stock the current cart would consume, bundles included.
    pub async fn remove_stock_by_cart(&self) -> Result<bool, StoreError> {
        let demand = self.cart.lock().await.stock_demand();
        self.mutate_stock(|items| Ok(apply_demand(items, &demand, Item::consume_stock)))
            .await
    }
}

fn find<'a>(items: &'a mut [Item], id: &str) -> Result<&'a mut Item, StoreError> {
    items
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| StoreError::NotFound(format!("item {}", id)))
}

/// Applies `change` to every stock-tracking item in `demand`. Returns whether
/// anything changed.
fn apply_demand(
    items: &mut [Item],
    demand: &BTreeMap<String, f64>,
    change: fn(&mut Item, f64),
) -> bool {
    let mut changed = false;
    for item in items.iter_mut().filter(|item| item.use_stock) {
        if let Some(&quantity) = demand.get(&item.id) {
            change(item, quantity);
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cart, CartItem};
    use crate::service::tests::local_services;
    use crate::shop::tests::context;

    fn stock_of(items: &[Item], id: &str) -> f64 {
        items.iter().find(|i| i.id == id).map(|i| i.stock).unwrap()
    }

    #[tokio::test]
    async fn test_remove_more_than_stock_is_refused() {
        let ctx = local_services().await;
        let (shop, _) = context(ctx.services.clone());
        let item = Item::new("Cola", 1.0).with_id("i1").with_stock(10.0);
        shop.services().items.add(&item).await.unwrap();

        assert!(!shop.remove_stock_by_quantity("i1", 15.0).await.unwrap());
        assert_eq!(shop.services().items.get("i1").await.unwrap().unwrap().stock, 10.0);

        assert!(shop.remove_stock_by_quantity("i1", 4.0).await.unwrap());
        assert!(shop.add_stock_by_quantity("i1", 1.5).await.unwrap());
        assert_eq!(shop.services().items.get("i1").await.unwrap().unwrap().stock, 7.5);
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let ctx = local_services().await;
        let (shop, _) = context(ctx.services.clone());
        let err = shop.add_stock_by_quantity("ghost", 1.0).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_consumption_clamps_at_zero() {
        let mut item = Item::new("Ice", 1.0).with_stock(5.0);
        for quantity in [2.0, 2.0, 4.0] {
            item.consume_stock(quantity);
        }
        assert_eq!(item.stock, 0.0);
    }

    #[tokio::test]
    async fn test_stock_by_order_includes_bundles() {
        let ctx = local_services().await;
        let (shop, _) = context(ctx.services.clone());
        let burger = Item::new("Burger", 5.0).with_id("burger").with_stock(10.0);
        let fries = Item::new("Fries", 2.0).with_id("fries").with_stock(10.0);
        let combo = Item::new("Combo", 6.0).with_id("combo");
        let items = &shop.services().items;
        for item in [&burger, &fries, &combo] {
            items.add(item).await.unwrap();
        }

        let mut cart = Cart::new();
        cart.push(CartItem::from_item(&combo, 2.0).with_children(vec![
            CartItem::from_item(&burger, 1.0),
            CartItem::from_item(&fries, 1.0),
        ]));
        cart.add(&burger, 1.0);
        let order = OrderHistory::from_cart(&cart, "sam", "", true);

        assert!(shop.remove_stock_by_order(&order).await.unwrap());
        let all = items.get_all().await.unwrap();
        assert_eq!(stock_of(&all, "burger"), 7.0);
        assert_eq!(stock_of(&all, "fries"), 8.0);

        assert!(shop.add_stock_by_order(&order).await.unwrap());
        let all = items.get_all().await.unwrap();
        assert_eq!(stock_of(&all, "burger"), 10.0);
        assert_eq!(stock_of(&all, "fries"), 10.0);
    }

    #[tokio::test]
    async fn test_remove_stock_by_cart() {
        let ctx = local_services().await;
        let (shop, _) = context(ctx.services.clone());
        let cola = Item::new("Cola", 1.0).with_id("cola").with_stock(3.0);
        shop.services().items.add(&cola).await.unwrap();
        shop.add_to_cart("cola", 5.0).await.unwrap();

        assert!(shop.remove_stock_by_cart().await.unwrap());
        assert_eq!(shop.services().items.get("cola").await.unwrap().unwrap().stock, 0.0);
    }

    #[tokio::test]
    async fn test_interleaved_saves() {
        let ctx = local_services().await;
        let (shop, _) = context(ctx.services.clone());
        let items = &shop.services().items;
        items
            .add(&Item::new("Cola", 1.0).with_id("i1").with_stock(10.0))
            .await
            .unwrap();

        // Two writers read the same catalog and each add one unit.
        let mut first = items.snapshot().await.unwrap();
        let mut second = items.snapshot().await.unwrap();
        first.items[0].add_stock(1.0);
        second.items[0].add_stock(1.0);

        // Unchecked: the last write wins and one increment is lost.
        items.save_all(&first.items).await.unwrap();
        items.save_all(&second.items).await.unwrap();
        assert_eq!(items.get("i1").await.unwrap().unwrap().stock, 11.0);

        // Checked: the stale writer is rejected.
        let mut first = items.snapshot().await.unwrap();
        let mut second = items.snapshot().await.unwrap();
        first.items[0].add_stock(1.0);
        second.items[0].add_stock(1.0);
        assert!(items.replace(&first.items, Some(first.revision)).await.unwrap());
        let err = items
            .replace(&second.items, Some(second.revision))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(items.get("i1").await.unwrap().unwrap().stock, 12.0);

        // The helpers take the checked path and see the latest revision.
        assert!(shop.add_stock_by_quantity("i1", 1.0).await.unwrap());
        assert_eq!(items.get("i1").await.unwrap().unwrap().stock, 13.0);
    }
}
