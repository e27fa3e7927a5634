use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use txhook_core::trace::Transaction;
use txhook_core::{Integration, TransactionObserver};

/// Integration that logs transaction start and finish and keeps counts.
#[derive(Debug, Default)]
pub struct LifecycleLogger {
    started: AtomicU64,
    finished: AtomicU64,
}

impl LifecycleLogger {
    pub const NAME: &'static str = "LifecycleLogger";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    pub fn finished(&self) -> u64 {
        self.finished.load(Ordering::Relaxed)
    }

    /// Transactions started but not yet finished.
    pub fn in_flight(&self) -> u64 {
        self.started().saturating_sub(self.finished())
    }
}

impl Integration for LifecycleLogger {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transaction_observer(self: Arc<Self>) -> Option<Arc<dyn TransactionObserver>> {
        Some(self)
    }
}

impl TransactionObserver for LifecycleLogger {
    fn on_transaction_start(&self, transaction: &dyn Transaction) {
        self.started.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "transaction started [{}] op={} trace={} sampled={}",
            transaction.name(),
            transaction.op().unwrap_or_default(),
            transaction.trace_id(),
            transaction.sampled()
        );
    }

    fn on_transaction_finish(&self, transaction: &dyn Transaction) {
        self.finished.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "transaction finishing [{}] op={} trace={}",
            transaction.name(),
            transaction.op().unwrap_or_default(),
            transaction.trace_id()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txhook_core::trace::{SpanTransaction, TransactionContext};
    use txhook_core::{Carrier, Hub};

    #[test]
    fn test_counts_start_and_finish() {
        let logger = LifecycleLogger::new();
        let tx = SpanTransaction::from_context(&TransactionContext::new("screen"), true);

        logger.on_transaction_start(&tx);
        assert_eq!(logger.in_flight(), 1);

        logger.on_transaction_finish(&tx);
        assert_eq!(logger.started(), 1);
        assert_eq!(logger.finished(), 1);
        assert_eq!(logger.in_flight(), 0);
    }

    #[test]
    fn test_resolves_as_hub_observer() {
        let hub = Hub::new(Arc::new(Carrier::new()));
        hub.add_integration(Arc::new(LifecycleLogger::new()));

        assert!(hub.get_integration(LifecycleLogger::NAME).is_some());
        assert!(hub.transaction_observer().is_some());
    }
}
