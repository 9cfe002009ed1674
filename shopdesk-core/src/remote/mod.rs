//! Remote persistence against the Shopdesk document server.
//!
//! - [`CollectionStore`]: one document per record (categories, orders, ...).
//! - [`BucketStore`]: the whole collection as one gzip JSON blob (items).
//! - [`UnitDocumentStore`]: all units inside a single document.
//! - [`OfflineFallback`]: wraps any of the above with connectivity checks and
//!   a local mirror.

mod bucket;
mod client;
mod collection;
mod offline;
pub mod protocol;
mod units;

pub use bucket::BucketStore;
pub use client::RemoteClient;
pub use collection::CollectionStore;
pub use offline::{Connectivity, HttpProbe, ManualConnectivity, OfflineBlobs, OfflineFallback};
pub use units::UnitDocumentStore;
