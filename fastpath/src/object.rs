use crate::{ClassRef, Header, Symbol, Value, WriteBarrier};

// ── Field ──────────────────────────────────────────────────────────

/// A heap word that may hold a reference.
///
/// The only way to change it is [`Field::store`], which hands the word to
/// the collector's write barrier.
#[derive(Debug)]
#[repr(transparent)]
pub struct Field(Value);

impl Field {
    /// A field that was allocated but never assigned.
    pub const fn unassigned() -> Self {
        Self(Value::UNDEF)
    }

    #[inline(always)]
    pub fn get(&self) -> Value {
        self.0
    }

    #[inline(always)]
    pub fn store<B: WriteBarrier + ?Sized>(&mut self, barrier: &mut B, value: Value) {
        barrier.record_reference(&mut self.0, value);
    }
}

// ── IvarSlot ───────────────────────────────────────────────────────

/// One entry of an object's instance-variable table.
#[derive(Debug)]
#[repr(C)]
pub struct IvarSlot {
    pub name: Symbol,
    pub value: Field,
}

const _: () = assert!(size_of::<IvarSlot>() == 16);

impl IvarSlot {
    pub const fn new(name: Symbol) -> Self {
        Self {
            name,
            value: Field::unassigned(),
        }
    }
}

// ── RObject ────────────────────────────────────────────────────────

/// A plain object with a slot-backed instance-variable table.
///
/// ```text
/// [Header 16B] [num_slots: u32] [reserved: u32] [slots: *mut IvarSlot]
/// ```
///
/// The slot table is allocated and grown by the class-layout subsystem; the
/// kernel only reads `num_slots` and indexes into `slots`.
#[repr(C)]
pub struct RObject {
    pub header: Header,
    num_slots: u32,
    _reserved: u32,
    slots: *mut IvarSlot,
}

const _: () = assert!(size_of::<RObject>() == 32);

impl RObject {
    pub fn new(class: ClassRef) -> Self {
        Self {
            header: Header::new(class),
            num_slots: 0,
            _reserved: 0,
            slots: core::ptr::null_mut(),
        }
    }

    #[inline(always)]
    pub fn slot_count(&self) -> u32 {
        self.num_slots
    }

    /// # Safety
    ///
    /// `index < slot_count()` and the attached table must be live.
    #[inline(always)]
    pub unsafe fn slot(&self, index: u32) -> &IvarSlot {
        debug_assert!(index < self.num_slots);
        unsafe { &*self.slots.add(index as usize) }
    }

    /// # Safety
    ///
    /// `index < slot_count()` and the attached table must be live.
    #[inline(always)]
    pub unsafe fn slot_mut(&mut self, index: u32) -> &mut IvarSlot {
        debug_assert!(index < self.num_slots);
        unsafe { &mut *self.slots.add(index as usize) }
    }

    /// Point the object at a (re)allocated slot table.
    ///
    /// # Safety
    ///
    /// `slots` must point to `count` initialised [`IvarSlot`]s that stay
    /// live until the next call.
    pub unsafe fn attach_slots(&mut self, slots: *mut IvarSlot, count: u32) {
        self.slots = slots;
        self.num_slots = count;
    }
}

impl core::fmt::Debug for RObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RObject")
            .field("header", &self.header)
            .field("num_slots", &self.num_slots)
            .finish()
    }
}
