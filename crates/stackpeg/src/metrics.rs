//! Per-parser tracing metrics.
//!
//! With the `trace` option on, the invocation wrapper accumulates counters
//! and timings per display name; the driver flushes them to the configured
//! sink when the run finishes.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;

/// Counters collected for one parser (keyed by display name).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserMetrics {
    /// Times the parser was invoked.
    pub invocations: u64,
    /// Invocations that succeeded.
    pub successes: u64,
    /// Wall time spent in the parser excluding its children, in nanoseconds.
    pub self_nanos: u64,
    /// Wall time spent in the parser including its children, in nanoseconds.
    pub total_nanos: u64,
}

/// Receiver for per-parser metrics after a traced run.
pub trait MetricsSink {
    /// Called once per distinct parser display name.
    fn record(&self, name: &str, metrics: &ParserMetrics);
}

/// In-flight timing for one wrapper invocation.
#[derive(Debug)]
struct ActiveTimer {
    name: Arc<str>,
    started: Instant,
    child_nanos: u64,
}

/// Accumulates metrics during a traced parse.
#[derive(Debug, Default)]
pub(crate) struct MetricsTable {
    by_name: FxHashMap<Arc<str>, ParserMetrics>,
    active: Vec<ActiveTimer>,
}

impl MetricsTable {
    pub(crate) fn enter(&mut self, name: Arc<str>) {
        self.active.push(ActiveTimer { name, started: Instant::now(), child_nanos: 0 });
    }

    pub(crate) fn exit(&mut self, success: bool) {
        let Some(timer) = self.active.pop() else {
            return;
        };
        let total = u64::try_from(timer.started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        if let Some(parent) = self.active.last_mut() {
            parent.child_nanos = parent.child_nanos.saturating_add(total);
        }
        let entry = self.by_name.entry(timer.name).or_default();
        entry.invocations += 1;
        if success {
            entry.successes += 1;
        }
        entry.total_nanos = entry.total_nanos.saturating_add(total);
        entry.self_nanos =
            entry.self_nanos.saturating_add(total.saturating_sub(timer.child_nanos));
    }

    pub(crate) fn flush(&self, sink: &dyn MetricsSink) {
        for (name, metrics) in &self.by_name {
            sink.record(name, metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Capture {
        rows: RefCell<Vec<(String, ParserMetrics)>>,
    }

    impl MetricsSink for Capture {
        fn record(&self, name: &str, metrics: &ParserMetrics) {
            self.rows.borrow_mut().push((name.to_string(), *metrics));
        }
    }

    #[test]
    fn test_counts_and_nesting() {
        let mut table = MetricsTable::default();
        table.enter(Arc::from("outer"));
        table.enter(Arc::from("inner"));
        table.exit(true);
        table.exit(false);

        let sink = Capture::default();
        table.flush(&sink);
        let rows = sink.rows.borrow();
        assert_eq!(rows.len(), 2);
        for (name, m) in rows.iter() {
            assert_eq!(m.invocations, 1);
            assert_eq!(m.successes, u64::from(name == "inner"));
            assert!(m.self_nanos <= m.total_nanos);
        }
    }

    #[test]
    fn test_unbalanced_exit_is_ignored() {
        let mut table = MetricsTable::default();
        table.exit(true);
        let sink = Capture::default();
        table.flush(&sink);
        assert!(sink.rows.borrow().is_empty());
    }
}
