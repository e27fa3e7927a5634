use std::sync::Arc;

use txhook_core::trace::{
    ChildSpanContext, SamplingContext, Span, Timestamp, TraceError, Transaction,
    TransactionContext, TransactionFactory,
};
use txhook_core::{Hub, TransactionObserver};

/// Operation label given to transactions and spans started without one.
pub const SPAN_OP_DEFAULT: &str = "default";

fn default_op(op: &mut Option<String>) {
    if op.as_deref().map_or(true, str::is_empty) {
        *op = Some(SPAN_OP_DEFAULT.to_string());
    }
}

/// Decorates a transaction factory so that native SDK consumers always see
/// an operation label, and so an observer hears about transaction start and
/// finish.
pub struct StartTransactionPatch {
    original: Arc<dyn TransactionFactory>,
    observer: Option<Arc<dyn TransactionObserver>>,
}

impl StartTransactionPatch {
    pub fn new(
        original: Arc<dyn TransactionFactory>,
        observer: Option<Arc<dyn TransactionObserver>>,
    ) -> Self {
        StartTransactionPatch { original, observer }
    }
}

impl TransactionFactory for StartTransactionPatch {
    fn start_transaction(
        &self,
        hub: &Hub,
        ctx: &mut TransactionContext,
        sampling: Option<&SamplingContext>,
    ) -> Result<Arc<dyn Transaction>, TraceError> {
        // native SDKs reject transactions without an op
        default_op(&mut ctx.op);

        let inner = self.original.start_transaction(hub, ctx, sampling)?;
        let transaction: Arc<dyn Transaction> = Arc::new(PatchedTransaction {
            inner,
            observer: self.observer.clone(),
        });

        if let Some(observer) = &self.observer {
            observer.on_transaction_start(transaction.as_ref());
        }
        Ok(transaction)
    }
}

/// A transaction produced by [`StartTransactionPatch`].
///
/// Child requests get the default op, and finishing notifies the observer
/// before the wrapped transaction finishes.
pub struct PatchedTransaction {
    inner: Arc<dyn Transaction>,
    observer: Option<Arc<dyn TransactionObserver>>,
}

impl PatchedTransaction {
    pub fn inner(&self) -> &Arc<dyn Transaction> {
        &self.inner
    }
}

impl Transaction for PatchedTransaction {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn op(&self) -> Option<String> {
        self.inner.op()
    }

    fn trace_id(&self) -> u64 {
        self.inner.trace_id()
    }

    fn span_id(&self) -> u64 {
        self.inner.span_id()
    }

    fn sampled(&self) -> bool {
        self.inner.sampled()
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    fn start_child(&self, mut ctx: ChildSpanContext) -> Result<Span, TraceError> {
        default_op(&mut ctx.op);
        self.inner.start_child(ctx)
    }

    fn finish(&self, end_timestamp: Option<Timestamp>) -> Result<Option<Timestamp>, TraceError> {
        if let Some(observer) = &self.observer {
            observer.on_transaction_finish(self);
        }
        self.inner.finish(end_timestamp)
    }
}
