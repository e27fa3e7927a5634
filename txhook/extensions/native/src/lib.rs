//! Transaction-start interception for native SDK consumers.
//!
//! Native SDKs require every transaction and span to carry an operation
//! label; the host's own default never reaches them. [`install`] wraps the
//! registered transaction factory so missing labels become
//! [`SPAN_OP_DEFAULT`], and forwards start/finish to a lifecycle observer.

mod install;
mod lifecycle;
mod patch;

pub use install::{install, install_tracing_extensions, InstallStatus, PATCH_NAME};
pub use lifecycle::LifecycleLogger;
pub use patch::{PatchedTransaction, StartTransactionPatch, SPAN_OP_DEFAULT};
