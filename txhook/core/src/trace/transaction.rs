use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ChildSpanContext, SamplingContext, Span, Timestamp, TraceError, TransactionContext};
use crate::hub::Hub;

/// A root unit of traced work.
///
/// Handles are shared as `Arc<dyn Transaction>`, so implementations use
/// interior mutability for `start_child` and `finish`.
pub trait Transaction: Send + Sync {
    fn name(&self) -> String;
    fn op(&self) -> Option<String>;
    fn trace_id(&self) -> u64;
    fn span_id(&self) -> u64;
    fn sampled(&self) -> bool;
    fn is_finished(&self) -> bool;

    /// Starts a child span that inherits this transaction's trace identity.
    fn start_child(&self, ctx: ChildSpanContext) -> Result<Span, TraceError>;

    /// Finishes the transaction at `end_timestamp`, or now when `None`.
    ///
    /// Returns the recorded end timestamp, if the implementation records one.
    fn finish(&self, end_timestamp: Option<Timestamp>) -> Result<Option<Timestamp>, TraceError>;
}

/// Creates transactions for a hub.
///
/// The context is taken by `&mut` so a factory may fill in defaults that the
/// caller can observe after the call.
pub trait TransactionFactory: Send + Sync {
    fn start_transaction(
        &self,
        hub: &Hub,
        ctx: &mut TransactionContext,
        sampling: Option<&SamplingContext>,
    ) -> Result<Arc<dyn Transaction>, TraceError>;
}

/// Adapts a closure into a [`TransactionFactory`].
pub struct FnFactory<F>(F);

impl<F> TransactionFactory for FnFactory<F>
where
    F: Fn(
            &Hub,
            &mut TransactionContext,
            Option<&SamplingContext>,
        ) -> Result<Arc<dyn Transaction>, TraceError>
        + Send
        + Sync,
{
    fn start_transaction(
        &self,
        hub: &Hub,
        ctx: &mut TransactionContext,
        sampling: Option<&SamplingContext>,
    ) -> Result<Arc<dyn Transaction>, TraceError> {
        (self.0)(hub, ctx, sampling)
    }
}

/// Wraps `f` as a shareable transaction factory.
pub fn factory_fn<F>(f: F) -> Arc<dyn TransactionFactory>
where
    F: Fn(
            &Hub,
            &mut TransactionContext,
            Option<&SamplingContext>,
        ) -> Result<Arc<dyn Transaction>, TraceError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnFactory(f))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The host's transaction: a root [`Span`] plus the children started from it.
#[derive(Debug)]
pub struct SpanTransaction {
    root: Mutex<Span>,
    children: Mutex<Vec<Span>>,
    sampled: bool,
}

impl SpanTransaction {
    pub fn from_context(ctx: &TransactionContext, sampled: bool) -> Self {
        let op = ctx.op.as_deref();
        let mut root = match ctx.trace_id {
            Some(trace_id) => Span::continue_trace(trace_id, ctx.parent_span_id, &ctx.name, op),
            None => Span::new_root(&ctx.name, op),
        };
        root.description = ctx.description.clone();
        root.attrs = ctx.attributes.clone();

        SpanTransaction {
            root: Mutex::new(root),
            children: Mutex::new(vec![]),
            sampled,
        }
    }

    /// Snapshot of the root span.
    pub fn root(&self) -> Span {
        lock(&self.root).clone()
    }

    /// Snapshot of the child spans started so far, in start order.
    pub fn children(&self) -> Vec<Span> {
        lock(&self.children).clone()
    }
}

impl Transaction for SpanTransaction {
    fn name(&self) -> String {
        lock(&self.root).name.clone()
    }

    fn op(&self) -> Option<String> {
        lock(&self.root).op.clone()
    }

    fn trace_id(&self) -> u64 {
        lock(&self.root).trace_id
    }

    fn span_id(&self) -> u64 {
        lock(&self.root).span_id
    }

    fn sampled(&self) -> bool {
        self.sampled
    }

    fn is_finished(&self) -> bool {
        lock(&self.root).is_ended()
    }

    fn start_child(&self, ctx: ChildSpanContext) -> Result<Span, TraceError> {
        let root = lock(&self.root);
        if root.is_ended() {
            return Err(TraceError::SpanAlreadyClosed);
        }

        let name = ctx
            .description
            .clone()
            .or_else(|| ctx.op.clone())
            .unwrap_or_else(|| root.name.clone());
        let mut child = Span::new_child(&root, name, ctx.op.as_deref());
        child.description = ctx.description;
        child.attrs = ctx.attributes;
        if let Some(start) = ctx.start_timestamp {
            child.start = start;
        }
        drop(root);

        lock(&self.children).push(child.clone());
        Ok(child)
    }

    fn finish(&self, end_timestamp: Option<Timestamp>) -> Result<Option<Timestamp>, TraceError> {
        let mut root = lock(&self.root);
        let end = root.finish_at(end_timestamp)?;
        log::debug!(
            "transaction finished [{}] trace={} took={:?} children={}",
            root.name,
            root.trace_id,
            root.duration().unwrap_or_default(),
            lock(&self.children).len()
        );
        Ok(Some(end))
    }
}

pub type Sampler = dyn Fn(&TransactionContext, Option<&SamplingContext>) -> bool + Send + Sync;

/// The host's default transaction factory.
///
/// The sampling decision comes from the context when it carries one (a
/// continued trace), otherwise from the sampler, otherwise it is sampled.
#[derive(Default)]
pub struct SpanTransactionFactory {
    sampler: Option<Box<Sampler>>,
}

impl SpanTransactionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sampler<F>(sampler: F) -> Self
    where
        F: Fn(&TransactionContext, Option<&SamplingContext>) -> bool + Send + Sync + 'static,
    {
        SpanTransactionFactory {
            sampler: Some(Box::new(sampler)),
        }
    }
}

impl TransactionFactory for SpanTransactionFactory {
    fn start_transaction(
        &self,
        _hub: &Hub,
        ctx: &mut TransactionContext,
        sampling: Option<&SamplingContext>,
    ) -> Result<Arc<dyn Transaction>, TraceError> {
        let sampled = match (ctx.sampled, &self.sampler) {
            (Some(sampled), _) => sampled,
            (None, Some(sampler)) => sampler(&*ctx, sampling),
            (None, None) => true,
        };
        log::debug!(
            "starting transaction [{}] op={:?} sampled={sampled}",
            ctx.name,
            ctx.op
        );
        Ok(Arc::new(SpanTransaction::from_context(ctx, sampled)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::trace::attr;

    #[test]
    fn test_child_inherits_trace_identity() {
        let tx = SpanTransaction::from_context(&TransactionContext::new("checkout"), true);
        let child = tx
            .start_child(ChildSpanContext::new().with_op("db").with_description("select"))
            .unwrap();

        assert_eq!(child.trace_id, tx.trace_id());
        assert_eq!(child.parent_id, Some(tx.span_id()));
        assert_eq!(child.op.as_deref(), Some("db"));
        assert_eq!(child.name, "select", "Description names the child");
        assert_eq!(tx.children(), vec![child]);
    }

    #[test]
    fn test_child_forwards_attributes_and_start() {
        let tx = SpanTransaction::from_context(&TransactionContext::new("checkout"), true);
        let start = Timestamp(5);
        let child = tx
            .start_child(ChildSpanContext {
                attributes: vec![attr("rows", 3)],
                start_timestamp: Some(start),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(child.start, start);
        assert_eq!(child.attrs, vec![attr("rows", 3)]);
        assert_eq!(child.name, "checkout", "Unnamed child falls back to the transaction name");
    }

    #[test]
    fn test_continued_transaction_uses_remote_ids() {
        let ctx = TransactionContext::new("downstream").continuing(99, 12);
        let tx = SpanTransaction::from_context(&ctx, false);

        assert_eq!(tx.trace_id(), 99);
        assert_eq!(tx.root().parent_id, Some(12));
        assert!(!tx.sampled());
    }

    #[test]
    fn test_finish_records_end_and_closes() {
        let tx = SpanTransaction::from_context(&TransactionContext::new("checkout"), true);

        assert_eq!(tx.finish(Some(Timestamp(u128::MAX))).unwrap(), Some(Timestamp(u128::MAX)));
        assert!(tx.is_finished());
        assert_eq!(
            tx.root().duration(),
            Some(Duration::from_nanos(u64::MAX)),
            "Out-of-range durations saturate"
        );
        assert!(matches!(
            tx.start_child(ChildSpanContext::new()),
            Err(TraceError::SpanAlreadyClosed)
        ));
        assert!(matches!(tx.finish(None), Err(TraceError::SpanAlreadyClosed)));
    }
}
