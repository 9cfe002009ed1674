use super::Service;
use crate::models::{link_units, unlink_units, Unit};
use crate::store::StoreError;

impl Service<Unit> {
    /// Links two units so that one `from_id` equals `factor` of `to_id`.
    ///
    /// Both reciprocal entries are written in one whole-collection replace
    /// checked against the revision they were read at.
    pub async fn link(&self, from_id: &str, to_id: &str, factor: f64) -> Result<bool, StoreError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(StoreError::Invalid(format!(
                "conversion factor must be positive, got {}",
                factor
            )));
        }
        let mut snapshot = self.snapshot().await?;
        let (from, to) = pair_mut(&mut snapshot.items, from_id, to_id)?;
        link_units(from, to, factor);
        self.replace(&snapshot.items, Some(snapshot.revision)).await
    }

    pub async fn unlink(&self, a_id: &str, b_id: &str) -> Result<bool, StoreError> {
        let mut snapshot = self.snapshot().await?;
        let (a, b) = pair_mut(&mut snapshot.items, a_id, b_id)?;
        unlink_units(a, b);
        self.replace(&snapshot.items, Some(snapshot.revision)).await
    }

    /// Converts `quantity` from one unit into another. `None` when the units
    /// are not linked.
    pub async fn convert(
        &self,
        quantity: f64,
        from_id: &str,
        to_id: &str,
    ) -> Result<Option<f64>, StoreError> {
        let from = self.get(from_id).await?;
        Ok(from.and_then(|unit| unit.convert(quantity, to_id)))
    }

    /// Deletes a unit together with every conversion that points at it.
    pub async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut snapshot = self.snapshot().await?;
        let before = snapshot.items.len();
        snapshot.items.retain(|unit| unit.id != id);
        if snapshot.items.len() == before {
            return Ok(false);
        }
        for unit in &mut snapshot.items {
            unit.conversions.remove(id);
        }
        self.replace(&snapshot.items, Some(snapshot.revision)).await
    }
}

fn pair_mut<'a>(
    units: &'a mut [Unit],
    a: &str,
    b: &str,
) -> Result<(&'a mut Unit, &'a mut Unit), StoreError> {
    let position = |id: &str| {
        units
            .iter()
            .position(|unit| unit.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("unit {}", id)))
    };
    let i = position(a)?;
    let j = position(b)?;
    if i == j {
        return Err(StoreError::Invalid(format!("cannot link unit {} to itself", a)));
    }
    if i < j {
        let (left, right) = units.split_at_mut(j);
        Ok((&mut left[i], &mut right[0]))
    } else {
        let (left, right) = units.split_at_mut(i);
        Ok((&mut right[0], &mut left[j]))
    }
}

#[cfg(test)]
mod tests {
    use crate::service::tests::local_services;
    use crate::models::Unit;
    use crate::store::StoreError;

    #[tokio::test]
    async fn test_link_is_reciprocal() {
        let ctx = local_services().await;
        let units = &ctx.services.units;
        units.add(&Unit::new("box").with_id("box")).await.unwrap();
        units.add(&Unit::new("pcs").with_id("pcs")).await.unwrap();

        assert!(units.link("box", "pcs", 12.0).await.unwrap());

        assert_eq!(units.convert(2.0, "box", "pcs").await.unwrap(), Some(24.0));
        assert_eq!(units.convert(24.0, "pcs", "box").await.unwrap(), Some(2.0));

        let boxes = units.get("box").await.unwrap().unwrap();
        let pieces = units.get("pcs").await.unwrap().unwrap();
        assert!(!boxes.conversions["pcs"].inverse);
        assert!(pieces.conversions["box"].inverse);
    }

    #[tokio::test]
    async fn test_link_unknown_unit_writes_nothing() {
        let ctx = local_services().await;
        let units = &ctx.services.units;
        units.add(&Unit::new("box").with_id("box")).await.unwrap();

        let err = units.link("box", "crate", 6.0).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(units.get("box").await.unwrap().unwrap().conversions.is_empty());
    }

    #[tokio::test]
    async fn test_link_rejects_bad_factor() {
        let ctx = local_services().await;
        let units = &ctx.services.units;
        units.add(&Unit::new("a").with_id("a")).await.unwrap();
        units.add(&Unit::new("b").with_id("b")).await.unwrap();

        assert!(units.link("a", "b", 0.0).await.is_err());
        assert!(units.link("a", "a", 2.0).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_strips_conversions() {
        let ctx = local_services().await;
        let units = &ctx.services.units;
        units.add(&Unit::new("box").with_id("box")).await.unwrap();
        units.add(&Unit::new("pcs").with_id("pcs")).await.unwrap();
        units.link("box", "pcs", 12.0).await.unwrap();

        assert!(units.remove("box").await.unwrap());
        assert!(!units.remove("box").await.unwrap());

        let pieces = units.get("pcs").await.unwrap().unwrap();
        assert!(pieces.conversions.is_empty());
        assert_eq!(units.convert(1.0, "pcs", "box").await.unwrap(), None);
    }
}
