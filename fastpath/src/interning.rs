use std::{
    collections::HashMap,
    ffi::{CStr, CString, c_char},
    num::NonZeroU32,
    sync::Arc,
};

use parking_lot::RwLock;

use crate::selector::SEEDED_NAMES;

/// An interned name: instance variable ids, selectors, constant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    /// Symbol of the `index`-th seeded name. Every [`Interner`] interns the
    /// seeded names first and in order, so these ids are the same everywhere.
    pub const fn seeded(index: u32) -> Self {
        match NonZeroU32::new(index + 1) {
            Some(id) => Self(id),
            None => panic!("seeded symbol index overflow"),
        }
    }

    /// Symbol with raw id `id`, `None` for zero.
    #[inline(always)]
    pub const fn from_id(id: u32) -> Option<Self> {
        match NonZeroU32::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    #[inline(always)]
    pub const fn id(self) -> u32 {
        self.0.get()
    }

    #[inline(always)]
    fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// A native call-target identifier: a pointer to an interned,
/// NUL-terminated name. Equal names always yield the same pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NativeSelector(*const c_char);

impl NativeSelector {
    pub const NULL: Self = Self(core::ptr::null());

    #[inline(always)]
    pub fn as_ptr(self) -> *const c_char {
        self.0
    }

    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// # Safety
    ///
    /// `ptr` must be null or point to a NUL-terminated name that outlives
    /// the selector.
    #[inline(always)]
    pub unsafe fn from_ptr(ptr: *const c_char) -> Self {
        Self(ptr)
    }
}

unsafe impl Send for NativeSelector {}
unsafe impl Sync for NativeSelector {}

struct Entry {
    text: Arc<str>,
    // boxed so the bytes keep their address when `entries` grows
    c_text: Box<CStr>,
}

struct InternerImpl {
    entries: Vec<Entry>,
    ids: HashMap<Arc<str>, Symbol>,
    by_address: HashMap<usize, Symbol>,
}

/// Shared symbol table. Cloning shares the table.
#[derive(Clone)]
pub struct Interner(Arc<RwLock<InternerImpl>>);

impl InternerImpl {
    fn new() -> Self {
        let mut new = Self {
            entries: Vec::new(),
            ids: HashMap::new(),
            by_address: HashMap::new(),
        };
        for name in SEEDED_NAMES {
            new.get_or_add(name);
        }
        new
    }

    fn get_or_add(&mut self, value: &str) -> Symbol {
        if let Some(&id) = self.ids.get(value) {
            return id;
        }
        // C names stop at the first NUL
        let c_bytes = value.split('\0').next().unwrap_or_default();
        let c_text = CString::new(c_bytes)
            .unwrap_or_default()
            .into_boxed_c_str();
        let text = Arc::<str>::from(value);
        let id = Symbol::seeded(self.entries.len() as u32);
        self.by_address.insert(c_text.as_ptr() as usize, id);
        self.ids.insert(text.clone(), id);
        self.entries.push(Entry { text, c_text });
        id
    }
}

impl Interner {
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(InternerImpl::new())))
    }

    pub fn intern(&self, value: &str) -> Symbol {
        if let Some(&id) = self.0.read().ids.get(value) {
            return id;
        }
        self.0.write().get_or_add(value)
    }

    pub fn lookup(&self, value: &str) -> Option<Symbol> {
        self.0.read().ids.get(value).copied()
    }

    pub fn name(&self, symbol: Symbol) -> Option<Arc<str>> {
        self.0
            .read()
            .entries
            .get(symbol.index())
            .map(|e| e.text.clone())
    }

    /// Stable NUL-terminated name of `symbol`, valid as long as any clone of
    /// this interner is alive.
    pub fn c_name(&self, symbol: Symbol) -> Option<*const c_char> {
        self.0
            .read()
            .entries
            .get(symbol.index())
            .map(|e| e.c_text.as_ptr())
    }

    /// Register `name` as a native call target.
    pub fn selector(&self, name: &str) -> NativeSelector {
        let symbol = self.intern(name);
        match self.c_name(symbol) {
            Some(ptr) => NativeSelector(ptr),
            None => NativeSelector::NULL,
        }
    }

    /// Symbol a native selector was registered for.
    pub fn selector_symbol(&self, selector: NativeSelector) -> Option<Symbol> {
        self.0
            .read()
            .by_address
            .get(&(selector.as_ptr() as usize))
            .copied()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
