//! txhook: give every transaction and span an operation label, and tell a
//! lifecycle observer when transactions start and finish.
//!
//! Call [`init`] once during startup, after the tracing library has registered
//! its transaction factory and after integrations are added to the hub. It
//! wires the process-wide hub; use [`init_hub`] for one of your own.

use anyhow::Context;

pub use txhook_core::trace::{
    ChildSpanContext, SamplingContext, Span, Timestamp, TraceError, Transaction,
    TransactionContext, TransactionFactory,
};
pub use txhook_core::{
    add_tracing_extensions, config, current_hub, main_carrier, Carrier, Hub, Integration,
    TransactionObserver,
};
pub use txhook_native::{install, InstallStatus, LifecycleLogger, SPAN_OP_DEFAULT};

const ENV_TXHOOK_LOGLEVEL: &str = "TXHOOK_LOGLEVEL";

/// Initialize logging and settings, then patch the process-wide hub.
pub fn init() -> InstallStatus {
    init_hub(current_hub())
}

/// Initialize logging and settings, then patch `hub`.
///
/// Best effort: bad `TXHOOK_*` values are logged and fall back to their
/// defaults, and a carrier without a transaction factory is left untouched
/// (`InstallStatus::NoFactory`).
pub fn init_hub(hub: &Hub) -> InstallStatus {
    // try_init: the host may have installed a logger already
    let _ = env_logger::try_init_from_env(env_logger::Env::new().filter(ENV_TXHOOK_LOGLEVEL));

    if let Err(err) = config::sync_env_settings().context("failed to read TXHOOK_* settings") {
        log::warn!("{err:#}, keeping defaults");
    }

    let status = install(hub);
    log::info!("txhook initialized: {status:?}");
    status
}
