use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::cart::{stock_demand, Cart, CartItem};

/// Status flags that may change after checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Paid,
    Cooking,
    Ready,
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paid" => Ok(OrderStatus::Paid),
            "cooking" => Ok(OrderStatus::Cooking),
            "ready" => Ok(OrderStatus::Ready),
            other => Err(format!(
                "Invalid order status '{}'. Valid values: paid, cooking, ready",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderHistory {
    pub id: String,
    pub cashier: String,
    #[serde(default)]
    pub customer: String,
    pub items: Vec<CartItem>,
    pub amount: f64,
    pub discount: f64,
    pub tag: f64,
    pub pay_amount: f64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub cooking: bool,
    #[serde(default)]
    pub ready: bool,
    pub creditbook_id: Option<String>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl OrderHistory {
    /// Freezes the cart into an order. Totals are computed once here.
    pub fn from_cart(
        cart: &Cart,
        cashier: impl Into<String>,
        customer: impl Into<String>,
        paid: bool,
    ) -> Self {
        let totals = cart.totals();
        Self {
            id: Uuid::new_v4().to_string(),
            cashier: cashier.into(),
            customer: customer.into(),
            items: cart.lines.clone(),
            amount: totals.amount,
            discount: totals.discount,
            tag: totals.tag,
            pay_amount: totals.pay_amount,
            date: Utc::now(),
            paid,
            cooking: false,
            ready: false,
            creditbook_id: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn set_status(&mut self, status: OrderStatus, value: bool) {
        match status {
            OrderStatus::Paid => self.paid = value,
            OrderStatus::Cooking => self.cooking = value,
            OrderStatus::Ready => self.ready = value,
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    pub fn stock_demand(&self) -> BTreeMap<String, f64> {
        stock_demand(&self.items)
    }
}

impl fmt::Display for OrderHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Order {} ({})",
            self.id,
            self.date.format("%Y-%m-%d %H:%M")
        )?;
        if !self.customer.is_empty() {
            writeln!(f, "Customer: {}", self.customer)?;
        }
        for line in &self.items {
            writeln!(
                f,
                "  {} x {} @ {:.2} = {:.2}",
                line.quantity,
                line.name,
                line.price,
                line.subtotal()
            )?;
        }
        writeln!(f, "Amount: {:.2}", self.amount)?;
        if self.discount > 0.0 {
            writeln!(f, "Discount: {:.2}", self.discount)?;
        }
        if self.tag > 0.0 {
            writeln!(f, "Tag: {:.2}", self.tag)?;
        }
        write!(
            f,
            "Pay: {:.2}{}",
            self.pay_amount,
            if self.paid { "" } else { " (unpaid)" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    #[test]
    fn test_from_cart_copies_totals() {
        let mut cart = Cart::new();
        cart.add(&Item::new("Tea", 3.0).with_id("tea"), 2.0);
        cart.tag_rate = 10.0;

        let order = OrderHistory::from_cart(&cart, "alice", "Bob", true);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.amount, 6.0);
        assert!((order.pay_amount - 6.6).abs() < 1e-9);
        assert!(order.paid);
        assert_eq!(order.stock_demand()["tea"], 2.0);
    }

    #[test]
    fn test_set_status() {
        let mut order = OrderHistory::from_cart(&Cart::new(), "alice", "", false);
        order.set_status(OrderStatus::Cooking, true);
        order.set_status(OrderStatus::Paid, true);
        assert!(order.cooking && order.paid && !order.ready);
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Ready".parse::<OrderStatus>(), Ok(OrderStatus::Ready));
        assert!("done".parse::<OrderStatus>().is_err());
    }
}
