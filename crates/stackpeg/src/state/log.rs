//! The user-visible side-effect log.
//!
//! Any parser or action that mutates user-owned state (a symbol table, a
//! scope chain) must route the mutation through this log so that
//! backtracking can rewind it exactly. Applying entries in order from a
//! checkpoint yields the live state; truncating the log to that checkpoint
//! atomically rolls the state back. No ambient mutation bypassing the log
//! is permitted.

use std::cell::RefCell;
use std::rc::Rc;

/// A reversible mutation on user-owned state.
///
/// The apply closure runs once when the effect is appended; the undo
/// closure runs if the log is truncated past it. Entries are never mutated
/// after append.
pub struct SideEffect {
    apply: Box<dyn Fn()>,
    undo: Box<dyn Fn()>,
}

impl SideEffect {
    /// Build an effect from raw apply/undo closures.
    ///
    /// The closures must be exact inverses: `undo` after `apply` restores
    /// the state observed before `apply`.
    pub fn new(apply: impl Fn() + 'static, undo: impl Fn() + 'static) -> Self {
        Self { apply: Box::new(apply), undo: Box::new(undo) }
    }

    /// Build an effect over a shared user-state handle.
    pub fn on_state<S: 'static>(
        state: &Rc<RefCell<S>>,
        apply: impl Fn(&mut S) + 'static,
        undo: impl Fn(&mut S) + 'static,
    ) -> Self {
        let apply_handle = Rc::clone(state);
        let undo_handle = Rc::clone(state);
        Self::new(
            move || apply(&mut apply_handle.borrow_mut()),
            move || undo(&mut undo_handle.borrow_mut()),
        )
    }

    fn run_apply(&self) {
        (self.apply)();
    }

    fn run_undo(&self) {
        (self.undo)();
    }
}

impl std::fmt::Debug for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SideEffect")
    }
}

/// Append-only log of reversible mutations, truncated on backtrack.
#[derive(Debug, Default)]
pub struct SideEffectLog {
    entries: Vec<SideEffect>,
}

impl SideEffectLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the effect's apply closure and append it.
    pub fn apply(&mut self, effect: SideEffect) {
        effect.run_apply();
        self.entries.push(effect);
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Undo entries past `n` in reverse order and drop them.
    pub fn truncate(&mut self, n: usize) {
        while self.entries.len() > n {
            if let Some(effect) = self.entries.pop() {
                effect.run_undo();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_effect(counter: &Rc<RefCell<Vec<i32>>>, n: i32) -> SideEffect {
        SideEffect::on_state(
            counter,
            move |v| v.push(n),
            move |v| {
                v.pop();
            },
        )
    }

    #[test]
    fn test_apply_runs_effect() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut log = SideEffectLog::new();
        log.apply(counter_effect(&seen, 1));
        log.apply(counter_effect(&seen, 2));
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_truncate_undoes_in_reverse() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut log = SideEffectLog::new();
        for n in 1..=4 {
            log.apply(counter_effect(&seen, n));
        }
        log.truncate(1);
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(log.len(), 1);
        // Truncating to the current length is a no-op.
        log.truncate(1);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_truncate_to_zero_restores_initial_state() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut log = SideEffectLog::new();
        log.apply(counter_effect(&seen, 7));
        log.truncate(0);
        assert!(seen.borrow().is_empty());
        assert!(log.is_empty());
    }
}
