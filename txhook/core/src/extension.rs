use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::trace::{SpanTransactionFactory, TransactionFactory};

/// The process-wide carrier.
///
/// Composition roots should pass this (or a carrier of their own) explicitly;
/// nothing in this crate reaches for it behind the caller's back.
pub static MAIN_CARRIER: Lazy<Arc<Carrier>> = Lazy::new(|| Arc::new(Carrier::default()));

pub fn main_carrier() -> Arc<Carrier> {
    MAIN_CARRIER.clone()
}

/// Shared state a tracing session hangs off of.
#[derive(Default)]
pub struct Carrier {
    extensions: Extensions,
}

impl Carrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}

/// Result of [`Extensions::patch_start_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched,
    AlreadyPatched,
    Missing,
}

#[derive(Default)]
struct ExtensionTable {
    start_transaction: Option<Arc<dyn TransactionFactory>>,
    // names of patches applied to the current start_transaction
    patches: BTreeSet<String>,
}

/// Extension points registered by the tracing library.
///
/// Reads happen on every transaction start; writes happen once at startup,
/// so a `RwLock` keeps the hot path uncontended.
#[derive(Default)]
pub struct Extensions {
    table: RwLock<ExtensionTable>,
}

impl Extensions {
    /// The currently registered transaction factory, if any.
    pub fn start_transaction(&self) -> Option<Arc<dyn TransactionFactory>> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .start_transaction
            .clone()
    }

    pub fn has_start_transaction(&self) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .start_transaction
            .is_some()
    }

    /// Register `factory`, returning the one it replaces.
    ///
    /// Patches applied to the previous factory do not carry over.
    pub fn set_start_transaction(
        &self,
        factory: Arc<dyn TransactionFactory>,
    ) -> Option<Arc<dyn TransactionFactory>> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table.patches.clear();
        table.start_transaction.replace(factory)
    }

    /// Remove the registered factory and forget all patches.
    pub fn clear(&self) -> Option<Arc<dyn TransactionFactory>> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table.patches.clear();
        table.start_transaction.take()
    }

    /// Replace the registered factory with `wrap(original)`.
    ///
    /// The check and the swap happen under one write lock. A patch name is
    /// applied at most once per registered factory; nothing happens when no
    /// factory is registered.
    pub fn patch_start_transaction<F>(&self, name: &str, wrap: F) -> PatchOutcome
    where
        F: FnOnce(Arc<dyn TransactionFactory>) -> Arc<dyn TransactionFactory>,
    {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if table.patches.contains(name) {
            return PatchOutcome::AlreadyPatched;
        }
        let Some(original) = table.start_transaction.take() else {
            return PatchOutcome::Missing;
        };
        table.start_transaction = Some(wrap(original));
        table.patches.insert(name.to_string());
        PatchOutcome::Patched
    }

    pub fn is_patched(&self, name: &str) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .patches
            .contains(name)
    }
}

/// Register the default span-backed transaction factory on `carrier`.
///
/// Keeps an already registered factory. Returns whether one was added.
pub fn add_tracing_extensions(carrier: &Carrier) -> bool {
    let extensions = carrier.extensions();
    let mut table = extensions
        .table
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if table.start_transaction.is_some() {
        return false;
    }
    table.start_transaction = Some(Arc::new(SpanTransactionFactory::new()));
    log::debug!("registered default start_transaction extension");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Hub;
    use crate::trace::{factory_fn, SpanTransaction, TraceError, Transaction, TransactionContext};

    fn failing_factory() -> Arc<dyn TransactionFactory> {
        factory_fn(|_hub, _ctx, _sampling| Err(TraceError::Factory("boom".to_string())))
    }

    #[test]
    fn test_patch_without_factory_is_noop() {
        let extensions = Extensions::default();
        let outcome = extensions.patch_start_transaction("test", |original| original);

        assert_eq!(outcome, PatchOutcome::Missing);
        assert!(!extensions.has_start_transaction(), "No factory may be added");
        assert!(!extensions.is_patched("test"));
    }

    #[test]
    fn test_patch_applies_once_per_name() {
        let extensions = Extensions::default();
        extensions.set_start_transaction(failing_factory());

        let mut wraps = 0;
        let first = extensions.patch_start_transaction("test", |original| {
            wraps += 1;
            original
        });
        let second = extensions.patch_start_transaction("test", |original| {
            wraps += 1;
            original
        });

        assert_eq!(first, PatchOutcome::Patched);
        assert_eq!(second, PatchOutcome::AlreadyPatched);
        assert_eq!(wraps, 1, "Factory must not be wrapped twice");
        assert!(extensions.is_patched("test"));
    }

    #[test]
    fn test_replacing_factory_resets_patches() {
        let extensions = Extensions::default();
        extensions.set_start_transaction(failing_factory());
        extensions.patch_start_transaction("test", |original| original);

        let previous = extensions.set_start_transaction(failing_factory());

        assert!(previous.is_some());
        assert!(!extensions.is_patched("test"));
        assert_eq!(
            extensions.patch_start_transaction("test", |original| original),
            PatchOutcome::Patched
        );
    }

    #[test]
    fn test_add_tracing_extensions_keeps_existing_factory() {
        let carrier = Arc::new(Carrier::new());
        carrier.extensions().set_start_transaction(failing_factory());

        assert!(!add_tracing_extensions(&carrier));

        let hub = Hub::new(carrier.clone());
        let result = hub.start_transaction(&mut TransactionContext::new("kept"), None);
        assert!(matches!(result, Err(TraceError::Factory(_))));
    }

    #[test]
    fn test_add_tracing_extensions_registers_default() {
        let carrier = Arc::new(Carrier::new());
        assert!(add_tracing_extensions(&carrier));
        assert!(carrier.extensions().has_start_transaction());

        let hub = Hub::new(carrier);
        let tx = hub
            .start_transaction(&mut TransactionContext::new("checkout").with_op("ui"), None)
            .unwrap();
        assert_eq!(tx.name(), "checkout");
        assert_eq!(tx.op().as_deref(), Some("ui"));

        let root = SpanTransaction::from_context(&TransactionContext::new("other"), true);
        assert_ne!(root.trace_id(), tx.trace_id(), "Each transaction starts a new trace");
    }
}
