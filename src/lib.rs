//! Shopdesk: point-of-sale command line and document server.
//!
//! The data layer lives in `shopdesk-core`; this crate holds the server the
//! remote stores talk to.

pub mod server;
