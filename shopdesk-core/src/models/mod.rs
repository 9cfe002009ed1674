mod cart;
mod contact;
mod item;
mod ledger;
mod order;
mod unit;

pub use cart::{stock_demand, Cart, CartItem, Discount, Totals};
pub use contact::{Category, ContactInfo, Customer, Supplier};
pub use item::{Item, PriceVariant, ERROR_ITEM_ID, ERROR_ITEM_NAME};
pub use ledger::{CashRecord, Cashflow, Creditbook};
pub use order::{OrderHistory, OrderStatus};
pub use unit::{link_units, unlink_units, Conversion, Unit};
