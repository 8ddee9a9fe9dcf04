use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::debug;

use crate::Operator;

/// Process-wide record of which fast-pathed operators user code redefined
/// on a builtin class.
///
/// Written by the method-definition machinery, read when generated code
/// passes the `overridden` flag to a fast path. Flags never reset.
#[derive(Debug)]
pub struct RedefinitionTable {
    flags: [AtomicBool; Operator::COUNT],
    generation: AtomicU64,
}

impl RedefinitionTable {
    pub fn new() -> Self {
        Self {
            flags: [const { AtomicBool::new(false) }; Operator::COUNT],
            generation: AtomicU64::new(0),
        }
    }

    pub fn mark(&self, op: Operator) {
        if !self.flags[op as usize].swap(true, Ordering::Relaxed) {
            let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("operator `{}` redefined (generation {generation})", op.name());
        }
    }

    #[inline(always)]
    pub fn is_overridden(&self, op: Operator) -> bool {
        self.flags[op as usize].load(Ordering::Relaxed)
    }

    /// Bumped once per newly redefined operator; compiled code can compare
    /// it against the value it was generated under.
    #[inline(always)]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }
}

impl Default for RedefinitionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_is_sticky_and_counted_once() {
        let table = RedefinitionTable::new();
        assert!(Operator::ALL.iter().all(|&op| !table.is_overridden(op)));

        table.mark(Operator::Plus);
        table.mark(Operator::Plus);
        assert!(table.is_overridden(Operator::Plus));
        assert!(!table.is_overridden(Operator::Minus));
        assert_eq!(table.generation(), 1);

        table.mark(Operator::Aref);
        assert_eq!(table.generation(), 2);
    }
}
