use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Id and name of the placeholder returned when the catalog cannot be read.
pub const ERROR_ITEM_ID: &str = "error";
pub const ERROR_ITEM_NAME: &str = "Error";

/// Alternative price applied from a minimum quantity upwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceVariant {
    pub name: String,
    pub min_quantity: f64,
    pub price: f64,
}

impl PriceVariant {
    pub fn new(name: impl Into<String>, min_quantity: f64, price: f64) -> Self {
        Self {
            name: name.into(),
            min_quantity,
            price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<String>,
    pub unit_id: Option<String>,
    pub barcode: Option<String>,
    pub image: Option<String>,
    /// Only meaningful when `use_stock` is set.
    #[serde(default)]
    pub stock: f64,
    #[serde(default)]
    pub use_stock: bool,
    pub price: f64,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub price_variants: Vec<PriceVariant>,
    pub expires: Option<NaiveDate>,
    pub last_edited: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
}

impl Item {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            category_id: None,
            unit_id: None,
            barcode: None,
            image: None,
            stock: 0.0,
            use_stock: false,
            price,
            purchase_price: 0.0,
            price_variants: Vec::new(),
            expires: None,
            last_edited: Utc::now(),
            pinned: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Enables stock tracking with the given starting quantity.
    pub fn with_stock(mut self, stock: f64) -> Self {
        self.use_stock = true;
        self.stock = stock.max(0.0);
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_unit(mut self, unit_id: impl Into<String>) -> Self {
        self.unit_id = Some(unit_id.into());
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_purchase_price(mut self, purchase_price: f64) -> Self {
        self.purchase_price = purchase_price;
        self
    }

    pub fn with_variants(mut self, variants: Vec<PriceVariant>) -> Self {
        self.price_variants = variants;
        self
    }

    /// Placeholder shown in place of the catalog when it could not be read.
    pub fn error_placeholder() -> Self {
        Self::new(ERROR_ITEM_NAME, 0.0).with_id(ERROR_ITEM_ID)
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == ERROR_ITEM_ID && self.name == ERROR_ITEM_NAME
    }

    pub fn touch(&mut self) {
        self.last_edited = Utc::now();
    }

    pub fn add_stock(&mut self, quantity: f64) {
        self.stock = (self.stock + quantity).max(0.0);
        self.touch();
    }

    /// Removes `quantity` from stock, clamping at zero.
    pub fn consume_stock(&mut self, quantity: f64) {
        self.stock = (self.stock - quantity).max(0.0);
        self.touch();
    }

    /// True when the item either does not track stock or has at least `quantity`.
    pub fn has_stock_for(&self, quantity: f64) -> bool {
        !self.use_stock || self.stock >= quantity
    }

    pub fn is_below(&self, threshold: f64) -> bool {
        self.use_stock && self.stock < threshold
    }

    /// Unit price for a sale of `quantity`: the variant with the highest
    /// threshold not above the quantity, else the base price.
    pub fn price_for(&self, quantity: f64) -> f64 {
        self.price_variants
            .iter()
            .filter(|v| v.min_quantity <= quantity)
            .max_by(|a, b| a.min_quantity.total_cmp(&b.min_quantity))
            .map(|v| v.price)
            .unwrap_or(self.price)
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires.is_some_and(|d| d < today)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2})", self.name, self.price)?;
        if self.use_stock {
            write!(f, " stock: {}", self.stock)?;
        }
        if self.pinned {
            write!(f, " [pinned]")?;
        }
        Ok(())
    }
}
