//! Units of measure and their conversion table.
//!
//! Each unit keeps a map from other unit ids to a [`Conversion`]. A link
//! between two units is always stored on both sides: the unit the factor was
//! given for keeps it as is, the other side keeps the same factor marked as
//! `inverse`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Conversion {
    pub factor: f64,
    #[serde(default)]
    pub inverse: bool,
}

impl Conversion {
    /// Multiplier turning a quantity of the owning unit into the target unit.
    pub fn multiplier(&self) -> f64 {
        if self.inverse {
            1.0 / self.factor
        } else {
            self.factor
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub conversions: BTreeMap<String, Conversion>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            conversions: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Converts `quantity` of this unit into the unit `target_id`.
    pub fn convert(&self, quantity: f64, target_id: &str) -> Option<f64> {
        if target_id == self.id {
            return Some(quantity);
        }
        self.conversions
            .get(target_id)
            .map(|c| quantity * c.multiplier())
    }
}

/// Links `from` and `to` so that one `from` equals `factor` of `to`.
///
/// Both conversion maps are updated; callers must persist both units together.
pub fn link_units(from: &mut Unit, to: &mut Unit, factor: f64) {
    from.conversions.insert(
        to.id.clone(),
        Conversion {
            factor,
            inverse: false,
        },
    );
    to.conversions.insert(
        from.id.clone(),
        Conversion {
            factor,
            inverse: true,
        },
    );
}

pub fn unlink_units(a: &mut Unit, b: &mut Unit) {
    a.conversions.remove(&b.id);
    b.conversions.remove(&a.id);
}
