use crate::{ClassRef, Value};

/// Call-site storage the generic dispatcher keeps its own state in.
///
/// The kernel never looks inside; it only threads the cache through to
/// [`crate::Dispatcher::dispatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct SendCache {
    pub words: [u64; 4],
}

impl SendCache {
    pub const fn new() -> Self {
        Self { words: [0; 4] }
    }
}

/// Monomorphic instance-variable cache.
///
/// Starts [`IvarCache::Virgin`] and resolves at most once. A resolved cache
/// that sees another class goes through the generic lookup for that access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, u8)]
pub enum IvarCache {
    #[default]
    Virgin,
    Resolved {
        class: ClassRef,
        slot: u32,
    },
    /// The receiver's ivars do not live in slots.
    Uncacheable,
}

/// Constant cache keyed on the resolved outer scope.
///
/// Redefining a constant in the same scope does not invalidate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ConstCache {
    outer: Value,
    value: Value,
}

impl ConstCache {
    pub const fn new() -> Self {
        Self {
            outer: Value::UNDEF,
            value: Value::UNDEF,
        }
    }

    #[inline(always)]
    pub fn lookup(&self, outer: ClassRef) -> Option<Value> {
        if self.outer == outer.value() && !self.value.is_undef() {
            Some(self.value)
        } else {
            None
        }
    }

    #[inline]
    pub fn fill(&mut self, outer: ClassRef, value: Value) {
        self.outer = outer.value();
        self.value = value;
    }
}

impl Default for ConstCache {
    fn default() -> Self {
        Self::new()
    }
}
