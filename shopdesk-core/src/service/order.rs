use chrono::NaiveDate;

use super::Service;
use crate::models::{Cart, OrderHistory, OrderStatus};
use crate::store::{Entity, StoreError};

impl Service<OrderHistory> {
    /// Freezes the cart into a new order and stores it.
    ///
    /// Stock and cashflow are left alone; the shop context does those. Fails
    /// with [`StoreError::Skipped`] when the backend did not store the order.
    pub async fn checkout(
        &self,
        cart: &Cart,
        cashier: &str,
        customer: &str,
        paid: bool,
    ) -> Result<OrderHistory, StoreError> {
        if cart.is_empty() {
            return Err(StoreError::Invalid("cannot check out an empty cart".to_string()));
        }
        let order = OrderHistory::from_cart(cart, cashier, customer, paid);
        StoreError::require(self.add(&order).await?, OrderHistory::TABLE)?;
        tracing::info!("Order {} checked out ({:.2})", order.id, order.pay_amount);
        Ok(order)
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: OrderStatus,
        value: bool,
    ) -> Result<Option<OrderHistory>, StoreError> {
        let Some(mut order) = self.get(id).await? else {
            return Ok(None);
        };
        order.set_status(status, value);
        self.update(&order).await?;
        Ok(Some(order))
    }

    pub async fn on_day(&self, day: NaiveDate) -> Result<Vec<OrderHistory>, StoreError> {
        self.between(day, day).await
    }

    /// Orders dated within `from..=to`, oldest first.
    pub async fn between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<OrderHistory>, StoreError> {
        let mut orders = self.get_all().await?;
        orders.retain(|order| (from..=to).contains(&order.day()));
        orders.sort_by_key(|order| order.date);
        Ok(orders)
    }

    /// Deletes every order dated within `from..=to`; returns how many went.
    pub async fn clear_between(&self, from: NaiveDate, to: NaiveDate) -> Result<usize, StoreError> {
        let mut removed = 0;
        for order in self.between(from, to).await? {
            if self.delete(&order.id).await? {
                removed += 1;
            }
        }
        tracing::info!("Cleared {} order(s) between {} and {}", removed, from, to);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use crate::service::tests::{local_services, offline_services};
    use crate::store::Store;
    use chrono::{TimeZone, Utc};

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(&Item::new("Cola", 2.0).with_id("cola"), 3.0);
        cart
    }

    #[tokio::test]
    async fn test_checkout_stores_order() {
        let ctx = local_services().await;
        let orders = &ctx.services.orders;

        let order = orders.checkout(&cart(), "sam", "", true).await.unwrap();

        assert_eq!(order.amount, 6.0);
        assert_eq!(orders.get(&order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart() {
        let ctx = local_services().await;
        let result = ctx.services.orders.checkout(&Cart::new(), "sam", "", true).await;
        assert!(matches!(result, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_checkout_fails_when_order_is_not_stored() {
        let ctx = offline_services().await;
        let result = ctx.services.orders.checkout(&cart(), "sam", "", true).await;

        assert!(matches!(result, Err(StoreError::Skipped(_))));
        let mirror = crate::local::LocalStore::<OrderHistory>::new(ctx.pool.clone());
        assert!(mirror.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_status() {
        let ctx = local_services().await;
        let orders = &ctx.services.orders;
        let order = orders.checkout(&cart(), "sam", "", false).await.unwrap();

        let updated = orders
            .set_status(&order.id, OrderStatus::Ready, true)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.ready);
        assert!(orders.get(&order.id).await.unwrap().unwrap().ready);
        assert_eq!(orders.set_status("nope", OrderStatus::Paid, true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_between_only_touches_range() {
        let ctx = local_services().await;
        let orders = &ctx.services.orders;
        let day = |d| Utc.with_ymd_and_hms(2024, 3, d, 10, 0, 0).unwrap();
        for d in [1, 2, 3, 4] {
            let order = OrderHistory::from_cart(&cart(), "sam", "", true).with_date(day(d));
            orders.add(&order).await.unwrap();
        }

        let from = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        assert_eq!(orders.on_day(from).await.unwrap().len(), 1);
        assert_eq!(orders.clear_between(from, to).await.unwrap(), 2);

        let left: Vec<u32> = orders
            .get_all()
            .await
            .unwrap()
            .iter()
            .map(|o| chrono::Datelike::day(&o.day()))
            .collect();
        assert_eq!(left, vec![1, 4]);
    }
}
