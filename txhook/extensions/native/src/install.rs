use std::sync::Arc;

use txhook_core::config;
use txhook_core::trace::TransactionFactory;
use txhook_core::{Extensions, Hub, PatchOutcome, TransactionObserver};

use crate::patch::StartTransactionPatch;

/// Name the start-transaction patch is recorded under in [`Extensions`].
pub const PATCH_NAME: &str = "native.start_transaction";

/// What [`install_tracing_extensions`] did. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Installed,
    /// The registered factory already carries the patch; it was left alone.
    AlreadyInstalled,
    /// No factory is registered yet; the registry was left untouched.
    NoFactory,
    /// Disabled through `txhook.enabled`.
    Disabled,
}

/// Wrap the factory registered in `extensions` with [`StartTransactionPatch`].
///
/// Must run after the tracing library registered its factory. Calling it
/// again is harmless: the patch is applied once per registered factory.
pub fn install_tracing_extensions(
    extensions: &Extensions,
    observer: Option<Arc<dyn TransactionObserver>>,
) -> InstallStatus {
    if !config::is_enabled() {
        log::info!("start_transaction patch disabled by {}", config::ENABLED);
        return InstallStatus::Disabled;
    }

    let lifecycle = observer.is_some();
    let outcome = extensions.patch_start_transaction(PATCH_NAME, move |original| {
        Arc::new(StartTransactionPatch::new(original, observer)) as Arc<dyn TransactionFactory>
    });

    match outcome {
        PatchOutcome::Patched => {
            log::debug!("start_transaction patched [lifecycle hooks: {lifecycle}]");
            InstallStatus::Installed
        }
        PatchOutcome::AlreadyPatched => {
            log::debug!("start_transaction already patched, skipping");
            InstallStatus::AlreadyInstalled
        }
        PatchOutcome::Missing => {
            log::debug!("no start_transaction extension registered, skipping");
            InstallStatus::NoFactory
        }
    }
}

/// Install the patch on `hub`'s carrier, notifying the hub's lifecycle
/// observer unless `txhook.lifecycle` is off.
///
/// The observer is looked up once, here, not per transaction.
pub fn install(hub: &Hub) -> InstallStatus {
    let observer = if config::lifecycle_enabled() {
        hub.transaction_observer()
    } else {
        log::debug!("lifecycle hooks disabled by {}", config::LIFECYCLE);
        None
    };
    install_tracing_extensions(hub.carrier().extensions(), observer)
}
