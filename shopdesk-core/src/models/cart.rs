//! In-memory cart used between item selection and checkout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Item;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub item_id: String,
    pub name: String,
    pub quantity: f64,
    /// Unit price.
    pub price: f64,
    #[serde(default)]
    pub custom_price: bool,
    /// Components of a grouped bundle, quantities per one bundle.
    #[serde(default)]
    pub children: Vec<CartItem>,
}

impl CartItem {
    pub fn from_item(item: &Item, quantity: f64) -> Self {
        Self {
            item_id: item.id.clone(),
            name: item.name.clone(),
            quantity,
            price: item.price_for(quantity),
            custom_price: false,
            children: Vec::new(),
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self.custom_price = true;
        self
    }

    pub fn with_children(mut self, children: Vec<CartItem>) -> Self {
        self.children = children;
        self
    }

    pub fn subtotal(&self) -> f64 {
        self.quantity * self.price
    }

    /// Adds the stock this line consumes (bundle children included) to `demand`.
    pub fn collect_demand(&self, multiplier: f64, demand: &mut BTreeMap<String, f64>) {
        let quantity = self.quantity * multiplier;
        *demand.entry(self.item_id.clone()).or_insert(0.0) += quantity;
        for child in &self.children {
            child.collect_demand(quantity, demand);
        }
    }
}

/// Total stock demand per item id for a list of lines.
pub fn stock_demand(lines: &[CartItem]) -> BTreeMap<String, f64> {
    let mut demand = BTreeMap::new();
    for line in lines {
        line.collect_demand(1.0, &mut demand);
    }
    demand
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Discount {
    #[default]
    None,
    Amount(f64),
    Percent(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Totals {
    pub amount: f64,
    pub discount: f64,
    /// Tax or service charge added on top of the discounted amount.
    pub tag: f64,
    pub pay_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Cart {
    pub lines: Vec<CartItem>,
    pub discount: Discount,
    /// Percentage applied after the discount.
    pub tag_rate: f64,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds `quantity` of `item`, merging into an existing line unless that
    /// line carries a custom price.
    pub fn add(&mut self, item: &Item, quantity: f64) {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.item_id == item.id && !l.custom_price && l.children.is_empty())
        {
            line.quantity += quantity;
            line.price = item.price_for(line.quantity);
            return;
        }
        self.lines.push(CartItem::from_item(item, quantity));
    }

    pub fn push(&mut self, line: CartItem) {
        self.lines.push(line);
    }

    /// Sets the quantity of the first line for `item_id`; zero or less removes it.
    pub fn set_quantity(&mut self, item_id: &str, quantity: f64) -> bool {
        let Some(index) = self.lines.iter().position(|l| l.item_id == item_id) else {
            return false;
        };
        if quantity <= 0.0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = quantity;
        }
        true
    }

    /// Re-prices the plain lines of `item` for their quantity. Lines with a
    /// custom price and bundles keep their price.
    pub fn reprice(&mut self, item: &Item) {
        for line in self
            .lines
            .iter_mut()
            .filter(|l| l.item_id == item.id && !l.custom_price && l.children.is_empty())
        {
            line.price = item.price_for(line.quantity);
        }
    }

    pub fn remove(&mut self, item_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.item_id != item_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn totals(&self) -> Totals {
        let amount: f64 = self.lines.iter().map(CartItem::subtotal).sum();
        let discount = match self.discount {
            Discount::None => 0.0,
            Discount::Amount(value) => value.clamp(0.0, amount),
            Discount::Percent(rate) => amount * rate.clamp(0.0, 100.0) / 100.0,
        };
        let tag = (amount - discount) * self.tag_rate / 100.0;
        Totals {
            amount,
            discount,
            tag,
            pay_amount: amount - discount + tag,
        }
    }

    pub fn stock_demand(&self) -> BTreeMap<String, f64> {
        stock_demand(&self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceVariant;

    fn item(id: &str, price: f64) -> Item {
        Item::new(id, price).with_id(id)
    }

    #[test]
    fn test_add_merges_same_item() {
        let mut cart = Cart::new();
        let cola = item("cola", 2.0);
        cart.add(&cola, 1.0);
        cart.add(&cola, 2.0);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 3.0);
    }

    #[test]
    fn test_custom_price_line_is_not_merged() {
        let mut cart = Cart::new();
        let cola = item("cola", 2.0);
        cart.push(CartItem::from_item(&cola, 1.0).with_price(1.0));
        cart.add(&cola, 1.0);
        assert_eq!(cart.lines.len(), 2);
    }

    #[test]
    fn test_totals_with_discount_and_tag() {
        let mut cart = Cart::new();
        cart.add(&item("a", 10.0), 2.0);
        cart.add(&item("b", 5.0), 1.0);
        cart.discount = Discount::Amount(5.0);
        cart.tag_rate = 10.0;

        let totals = cart.totals();
        assert_eq!(totals.amount, 25.0);
        assert_eq!(totals.discount, 5.0);
        assert_eq!(totals.tag, 2.0);
        assert_eq!(totals.pay_amount, 22.0);
    }

    #[test]
    fn test_discount_never_exceeds_amount() {
        let mut cart = Cart::new();
        cart.add(&item("a", 3.0), 1.0);
        cart.discount = Discount::Amount(10.0);
        assert_eq!(cart.totals().pay_amount, 0.0);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(&item("a", 1.0), 1.0);
        assert!(cart.set_quantity("a", 0.0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity("missing", 1.0));
    }

    #[test]
    fn test_reprice_follows_quantity_variants() {
        let mut cart = Cart::new();
        let rice = item("rice", 10.0).with_variants(vec![PriceVariant::new("sack", 5.0, 8.0)]);
        cart.add(&rice, 1.0);
        cart.push(CartItem::from_item(&rice, 1.0).with_price(9.0));

        cart.set_quantity("rice", 6.0);
        cart.reprice(&rice);
        assert_eq!(cart.lines[0].price, 8.0);
        assert_eq!(cart.lines[1].price, 9.0);

        cart.set_quantity("rice", 2.0);
        cart.reprice(&rice);
        assert_eq!(cart.lines[0].price, 10.0);
    }

    #[test]
    fn test_stock_demand_includes_bundle_children() {
        let mut cart = Cart::new();
        let bundle = CartItem::from_item(&item("combo", 8.0), 2.0).with_children(vec![
            CartItem::from_item(&item("burger", 5.0), 1.0),
            CartItem::from_item(&item("fries", 2.0), 2.0),
        ]);
        cart.push(bundle);
        cart.add(&item("fries", 2.0), 1.0);

        let demand = cart.stock_demand();
        assert_eq!(demand["combo"], 2.0);
        assert_eq!(demand["burger"], 2.0);
        assert_eq!(demand["fries"], 5.0);
    }
}
