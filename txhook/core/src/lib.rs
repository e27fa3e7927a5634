//! Tracing model shared by txhook crates: spans and transactions, the hub
//! that starts them, and the carrier whose extension table holds the
//! transaction factory.

pub mod config;
pub mod extension;
pub mod hub;
pub mod trace;

pub use extension::{add_tracing_extensions, main_carrier, Carrier, Extensions, PatchOutcome};
pub use hub::{current_hub, Hub, Integration, TransactionObserver};
