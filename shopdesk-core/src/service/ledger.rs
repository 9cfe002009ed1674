use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::Service;
use crate::models::{CashRecord, Cashflow, Creditbook};
use crate::store::StoreError;

impl Service<Cashflow> {
    /// The bucket for `day`, empty if nothing was recorded yet.
    pub async fn day(&self, day: NaiveDate) -> Result<Cashflow, StoreError> {
        Ok(self
            .get(&Cashflow::day_id(day))
            .await?
            .unwrap_or_else(|| Cashflow::new(day)))
    }

    /// Appends one record to the bucket of the day `at` falls on.
    pub async fn record(
        &self,
        at: DateTime<Utc>,
        name: &str,
        amount: f64,
    ) -> Result<bool, StoreError> {
        let mut flow = self.day(at.date_naive()).await?;
        flow.push(name, amount, at);
        self.update(&flow).await
    }

    /// Records of the `days` days ending at `end`, oldest first.
    ///
    /// Reads one day bucket at a time.
    pub async fn range(&self, end: NaiveDate, days: u32) -> Result<Vec<CashRecord>, StoreError> {
        let mut records = Vec::new();
        for offset in (0..days).rev() {
            let day = end - Duration::days(i64::from(offset));
            if let Some(flow) = self.get(&Cashflow::day_id(day)).await? {
                records.extend(flow.records);
            }
        }
        records.sort_by_key(|record| record.date);
        Ok(records)
    }
}

impl Service<Creditbook> {
    /// Applies a payment. Returns the updated entry, or `None` if it does
    /// not exist.
    pub async fn pay(&self, id: &str, amount: f64) -> Result<Option<Creditbook>, StoreError> {
        if amount < 0.0 {
            return Err(StoreError::Invalid(format!("negative payment {}", amount)));
        }
        let Some(mut entry) = self.get(id).await? else {
            return Ok(None);
        };
        let remaining = entry.pay(amount);
        self.update(&entry).await?;
        tracing::info!("Credit {} paid {:.2}, {:.2} remaining", id, amount, remaining);
        Ok(Some(entry))
    }

    pub async fn outstanding(&self) -> Result<Vec<Creditbook>, StoreError> {
        let mut entries = self.get_all().await?;
        entries.retain(|entry| !entry.paid);
        Ok(entries)
    }

    pub async fn for_customer(&self, customer: &str) -> Result<Vec<Creditbook>, StoreError> {
        let mut entries = self.get_all().await?;
        entries.retain(|entry| entry.customer == customer);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::local_services;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_record_appends_to_day_bucket() {
        let ctx = local_services().await;
        let flows = &ctx.services.cashflows;
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();

        flows.record(at, "sale", 10.0).await.unwrap();
        flows.record(at + Duration::hours(2), "ice", -4.0).await.unwrap();

        let flow = flows.day(at.date_naive()).await.unwrap();
        assert_eq!(flow.id, "2024-03-09");
        assert_eq!(flow.records.len(), 2);
        assert_eq!(flow.balance(), 6.0);
    }

    #[tokio::test]
    async fn test_range_is_sorted_and_bounded() {
        let ctx = local_services().await;
        let flows = &ctx.services.cashflows;
        let at = |d, h| Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap();
        flows.record(at(9, 15), "late", 3.0).await.unwrap();
        flows.record(at(9, 9), "early", 2.0).await.unwrap();
        flows.record(at(7, 12), "before", 1.0).await.unwrap();
        flows.record(at(1, 12), "outside", 100.0).await.unwrap();

        let end = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let names: Vec<String> = flows
            .range(end, 7)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["before", "early", "late"]);
    }

    #[tokio::test]
    async fn test_pay_clamps_and_marks_paid() {
        let ctx = local_services().await;
        let credits = &ctx.services.creditbooks;
        let entry = Creditbook::new("Ana", 50.0);
        credits.add(&entry).await.unwrap();

        let partial = credits.pay(&entry.id, 20.0).await.unwrap().unwrap();
        assert_eq!(partial.amount, 30.0);
        assert_eq!(credits.outstanding().await.unwrap().len(), 1);

        let settled = credits.pay(&entry.id, 80.0).await.unwrap().unwrap();
        assert_eq!(settled.amount, 0.0);
        assert!(settled.paid);
        assert!(credits.outstanding().await.unwrap().is_empty());
        assert_eq!(credits.for_customer("Ana").await.unwrap().len(), 1);
    }
}
