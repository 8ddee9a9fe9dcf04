use std::sync::atomic::{AtomicU32, Ordering};

use crate::{ClassRef, Tagged, Value};

/// Bookkeeping flags stored atomically in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct HeaderFlags(pub u32);

impl HeaderFlags {
    /// Mutation of the object raises.
    pub const FROZEN: Self = Self(1 << 0);
    /// Instance variables live in a dynamic table instead of slots.
    pub const DYNAMIC_IVARS: Self = Self(1 << 1);

    #[inline(always)]
    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }
}

/// The 16-byte header at the start of every heap object.
///
/// ```text
/// word 0:     class (tagged reference)
/// word 1 lo:  flags (atomic)
/// word 1 hi:  reserved (zero)
/// ```
///
/// The class word comes first so that reading the first word of any
/// reference yields its runtime class.
#[repr(C)]
pub struct Header {
    class: Value,
    flags: AtomicU32,
    _reserved: u32,
}

const _: () = assert!(size_of::<Header>() == 16);

impl Header {
    pub fn new(class: ClassRef) -> Self {
        Self {
            class: class.value(),
            flags: AtomicU32::new(0),
            _reserved: 0,
        }
    }

    #[inline(always)]
    pub fn class(&self) -> ClassRef {
        Tagged::from_value(self.class)
    }

    /// Reclassify the object. Only the class subsystem does this
    /// (singleton classes, `become`).
    #[inline(always)]
    pub fn set_class(&mut self, class: ClassRef) {
        self.class = class.value();
    }

    // ── flags ──────────────────────────────────────────────────────

    #[inline(always)]
    pub fn flags(&self) -> HeaderFlags {
        HeaderFlags(self.flags.load(Ordering::Relaxed))
    }

    #[inline(always)]
    pub fn has_flag(&self, flag: HeaderFlags) -> bool {
        self.flags().contains(flag)
    }

    #[inline(always)]
    pub fn add_flag(&self, flag: HeaderFlags) {
        self.flags.fetch_or(flag.0, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn remove_flag(&self, flag: HeaderFlags) {
        self.flags.fetch_and(!flag.0, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn is_frozen(&self) -> bool {
        self.has_flag(HeaderFlags::FROZEN)
    }

    #[inline(always)]
    pub fn freeze(&self) {
        self.add_flag(HeaderFlags::FROZEN);
    }
}

impl core::fmt::Debug for Header {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Header")
            .field("class", &self.class)
            .field("flags", &self.flags())
            .finish()
    }
}

/// Header of a reference, `None` for immediates and singletons.
///
/// # Safety
///
/// If `value` is a reference it must point to a live heap object.
#[inline(always)]
pub unsafe fn header_of<'a>(value: Value) -> Option<&'a Header> {
    if value.is_ref() {
        // SAFETY: every heap object starts with a header
        Some(unsafe { value.as_ref::<Header>() })
    } else {
        None
    }
}

/// Exact runtime class of a reference, `None` for special constants.
///
/// # Safety
///
/// Same as [`header_of`].
#[inline(always)]
pub unsafe fn class_of_ref(value: Value) -> Option<ClassRef> {
    unsafe { header_of(value) }.map(Header::class)
}
