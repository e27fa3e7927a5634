use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TraceError;

// Global atomic counters for generating unique IDs.
static NEXT_TRACE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SPAN_ID: AtomicU64 = AtomicU64::new(1);

fn next_trace_id() -> u64 {
    NEXT_TRACE_ID.fetch_add(1, Ordering::Relaxed)
}

fn next_span_id() -> u64 {
    NEXT_SPAN_ID.fetch_add(1, Ordering::Relaxed)
}

// --- Timestamp ---

/// Nanoseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u128);

impl Timestamp {
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or_else(|_| Timestamp(0), |d| Timestamp(d.as_nanos()))
    }

    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        if self.0 > earlier.0 {
            Duration::from_nanos(u64::try_from(self.0 - earlier.0).unwrap_or(u64::MAX))
        } else {
            Duration::from_nanos(0)
        }
    }
}

impl From<u128> for Timestamp {
    fn from(nanos: u128) -> Self {
        Timestamp(nanos)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute(pub String, pub Value);

pub fn attr<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Attribute {
    Attribute(key.into(), value.into())
}

impl Attribute {
    pub fn key(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> &Value {
        &self.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub trace_id: u64,
    pub span_id: u64,
    pub parent_id: Option<u64>,

    pub name: String,
    /// Operation label categorizing the work this span represents.
    pub op: Option<String>,
    pub description: Option<String>,

    pub start: Timestamp,
    pub end: Option<Timestamp>,

    pub attrs: Vec<Attribute>,
}

impl Span {
    /// Creates a new root span (starts a new trace).
    pub fn new_root<N: Into<String>>(name: N, op: Option<&str>) -> Self {
        Self::with_ids(next_trace_id(), None, name, op)
    }

    /// Creates a span that continues a trace started elsewhere, e.g. one
    /// whose identity arrived through an incoming request.
    pub fn continue_trace<N: Into<String>>(
        trace_id: u64,
        parent_id: Option<u64>,
        name: N,
        op: Option<&str>,
    ) -> Self {
        Self::with_ids(trace_id, parent_id, name, op)
    }

    /// Creates a new child span within an existing trace.
    pub fn new_child<N: Into<String>>(parent: &Span, name: N, op: Option<&str>) -> Self {
        Self::with_ids(parent.trace_id, Some(parent.span_id), name, op)
    }

    fn with_ids<N: Into<String>>(
        trace_id: u64,
        parent_id: Option<u64>,
        name: N,
        op: Option<&str>,
    ) -> Self {
        Span {
            trace_id,
            span_id: next_span_id(),
            parent_id,
            name: name.into(),
            op: op.map(|o| o.to_string()),
            description: None,
            start: Timestamp::now(),
            end: None,
            attrs: vec![],
        }
    }

    /// Ends this span at `end`, or now when no timestamp is given.
    pub fn finish_at(&mut self, end: Option<Timestamp>) -> Result<Timestamp, TraceError> {
        if self.end.is_some() {
            return Err(TraceError::SpanAlreadyClosed);
        }
        let end = end.unwrap_or_else(Timestamp::now);
        self.end = Some(end);
        Ok(end)
    }

    /// Ends this span now. Ending an already ended span keeps the first end time.
    pub fn finish(&mut self) {
        let _ = self.finish_at(None);
    }

    /// Returns the duration of this span if it has been ended.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|et| et.duration_since(self.start))
    }

    pub fn is_ended(&self) -> bool {
        self.end.is_some()
    }
}
