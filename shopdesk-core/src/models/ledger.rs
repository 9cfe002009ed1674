//! Cashflow day buckets and credit book entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One signed movement: income positive, outgoing negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashRecord {
    pub name: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// All cash movements of one calendar day; the id is the day (`YYYY-MM-DD`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cashflow {
    pub id: String,
    #[serde(default)]
    pub records: Vec<CashRecord>,
}

impl Cashflow {
    pub fn day_id(day: NaiveDate) -> String {
        day.format("%Y-%m-%d").to_string()
    }

    pub fn new(day: NaiveDate) -> Self {
        Self {
            id: Self::day_id(day),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, amount: f64, date: DateTime<Utc>) {
        self.records.push(CashRecord {
            name: name.into(),
            amount,
            date,
        });
    }

    pub fn income(&self) -> f64 {
        self.records.iter().filter(|r| r.amount > 0.0).map(|r| r.amount).sum()
    }

    pub fn outgoing(&self) -> f64 {
        self.records.iter().filter(|r| r.amount < 0.0).map(|r| r.amount).sum()
    }

    pub fn balance(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }
}

/// Outstanding credit of a customer, optionally tied to an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Creditbook {
    pub id: String,
    pub customer: String,
    pub order_id: Option<String>,
    /// Remaining balance.
    pub amount: f64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub paid: bool,
}

impl Creditbook {
    pub fn new(customer: impl Into<String>, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            customer: customer.into(),
            order_id: None,
            amount: amount.max(0.0),
            date: Utc::now(),
            paid: amount <= 0.0,
        }
    }

    pub fn for_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// Applies a payment and returns the remaining balance.
    pub fn pay(&mut self, amount: f64) -> f64 {
        self.amount = (self.amount - amount).max(0.0);
        self.paid = self.amount == 0.0;
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cashflow_totals() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let mut flow = Cashflow::new(day);
        flow.push("sale", 50.0, at);
        flow.push("ice", -12.5, at);
        flow.push("sale", 20.0, at);

        assert_eq!(flow.id, "2024-03-09");
        assert_eq!(flow.income(), 70.0);
        assert_eq!(flow.outgoing(), -12.5);
        assert_eq!(flow.balance(), 57.5);
    }

    #[test]
    fn test_creditbook_pay_clamps() {
        let mut book = Creditbook::new("Ann", 30.0);
        assert!(!book.paid);
        assert_eq!(book.pay(10.0), 20.0);
        assert_eq!(book.pay(50.0), 0.0);
        assert!(book.paid);
    }
}
