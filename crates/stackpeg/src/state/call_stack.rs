//! Call-stack frames recorded during a parse.

use std::fmt;
use std::sync::Arc;

/// One invoked parser on the live call stack: its display name and the
/// input position it was invoked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Rule label when the parser has one, variant name otherwise.
    pub name: Arc<str>,
    /// Input position at invocation.
    pub pos: usize,
}

impl CallFrame {
    /// Create a frame.
    pub fn new(name: impl Into<Arc<str>>, pos: usize) -> Self {
        Self { name: name.into(), pos }
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.pos)
    }
}
