mod context;
mod span;
mod transaction;

use thiserror::Error;

pub use context::{ChildSpanContext, SamplingContext, TransactionContext};
pub use span::{attr, Attribute, Span, Timestamp};
pub use transaction::{
    factory_fn, FnFactory, Sampler, SpanTransaction, SpanTransactionFactory, Transaction,
    TransactionFactory,
};

/// Represents errors that can occur during tracing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// An operation was attempted on a span that has already been closed.
    #[error("span has already been closed")]
    SpanAlreadyClosed,

    /// No transaction factory is registered on the carrier.
    #[error("no start_transaction extension registered")]
    TracingExtensionMissing,

    #[error("transaction factory failed: {0}")]
    Factory(String),
}
