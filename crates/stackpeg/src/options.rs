//! Parse-run configuration.

use crate::metrics::MetricsSink;
use crate::parser::Parser;
use crate::state::Val;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Options recognized by the driver and consulted by combinators.
///
/// The plain flags serialize; the whitespace parser, metrics sink, and
/// custom values are runtime-only.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maintain the live call stack and snapshot it whenever the furthest
    /// error position advances.
    pub record_call_stack: bool,
    /// Run the well-formedness analysis before parsing and refuse to parse
    /// an ill-formed grammar. On by default.
    pub well_formedness_check: bool,
    /// Collect per-parser timing and count metrics into the sink.
    pub trace: bool,
    /// Record trailing-whitespace runs so matched substrings handed to
    /// actions exclude them.
    pub track_whitespace: bool,
    /// Whitespace parser used by `word`/`token` wrappers. `None` selects
    /// the built-in `[ \t\r\n]*`.
    #[serde(skip)]
    pub whitespace: Option<Parser>,
    /// Metrics receiver; consulted only when `trace` is on.
    #[serde(skip)]
    pub metrics: Option<Rc<dyn MetricsSink>>,
    /// Opaque user key/value pairs accessible to actions.
    #[serde(skip)]
    pub custom: FxHashMap<String, Val>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            record_call_stack: false,
            well_formedness_check: true,
            trace: false,
            track_whitespace: false,
            whitespace: None,
            metrics: None,
            custom: FxHashMap::default(),
        }
    }
}

impl ParseOptions {
    /// Create the default option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set call-stack recording.
    pub fn with_record_call_stack(mut self, on: bool) -> Self {
        self.record_call_stack = on;
        self
    }

    /// Enable or disable the pre-parse well-formedness analysis.
    pub fn with_well_formedness_check(mut self, on: bool) -> Self {
        self.well_formedness_check = on;
        self
    }

    /// Enable metric collection.
    pub fn with_trace(mut self, on: bool) -> Self {
        self.trace = on;
        self
    }

    /// Enable whitespace-span tracking.
    pub fn with_track_whitespace(mut self, on: bool) -> Self {
        self.track_whitespace = on;
        self
    }

    /// Use a custom whitespace parser for `word`/`token` wrappers.
    pub fn with_whitespace(mut self, ws: Parser) -> Self {
        self.whitespace = Some(ws);
        self
    }

    /// Install a metrics sink.
    pub fn with_metrics(mut self, sink: Rc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Attach an opaque user value under `key`.
    pub fn with_custom(mut self, key: impl Into<String>, value: Val) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    /// Look up an opaque user value.
    pub fn custom(&self, key: &str) -> Option<&Val> {
        self.custom.get(key)
    }
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("record_call_stack", &self.record_call_stack)
            .field("well_formedness_check", &self.well_formedness_check)
            .field("trace", &self.trace)
            .field("track_whitespace", &self.track_whitespace)
            .field("whitespace", &self.whitespace.as_ref().map(|p| p.display_name()))
            .field("metrics", &self.metrics.as_ref().map(|_| "<sink>"))
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
