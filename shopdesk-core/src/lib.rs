//! Shopdesk Core Library
//!
//! Data access for the Shopdesk point of sale: entities, local and remote
//! stores, service facades and the shop context that ties them together.

pub mod codec;
pub mod images;
pub mod local;
pub mod models;
pub mod remote;
pub mod service;
pub mod shop;
pub mod store;

pub use images::ImageCache;
pub use local::init_db;
pub use models::{
    Cart, CartItem, Cashflow, Category, Creditbook, Customer, Item, OrderHistory, OrderStatus,
    Supplier, Unit,
};
pub use remote::{Connectivity, HttpProbe, ManualConnectivity, RemoteClient};
pub use service::{Backend, ItemService, Service, Services};
pub use shop::{BackupReport, DirectoryBridge, FetchOptions, HostBridge, ShopContext, ShopData, ShopSettings};
pub use store::{Entity, Snapshot, Store, StoreError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
