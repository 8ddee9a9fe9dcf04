/// Tag constants.
const IMMEDIATE_MASK: u64 = 0b1;
const IMMEDIATE_TAG_MASK: u64 = 0b11;
const FIXNUM_TAG: u64 = 0b01;
const FLOAT_TAG: u64 = 0b11;
const REF_ALIGN_MASK: u64 = 0b111;
/// Every raw word below this (with the low bit clear) is a singleton.
const SINGLETON_LIMIT: u64 = 0b1000;

/// Smallest integer an immediate can hold (62-bit signed).
pub const FIXNUM_MIN: i64 = -(1_i64 << 61);
/// Largest integer an immediate can hold (62-bit signed).
pub const FIXNUM_MAX: i64 = (1_i64 << 61) - 1;

/// A tagged 64-bit value.
///
/// Encoding:
/// - **Fixnum**:    `...XXXX01`: 62-bit signed integer.
/// - **Float**:     `...XXXX11`: `f64` whose two lowest mantissa bits are
///   replaced by the tag.
/// - **Singleton**: `0b000` false, `0b010` true, `0b100` nil, `0b110` undef.
/// - **Reference**: `...XXX000` (and `>= 8`): 8-byte aligned heap pointer
///   whose first word is the object's class.
///
/// Numeric immediates are exactly the words with the low bit set, so the
/// fast paths only need one `AND` per operand to decide eligibility.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

/// What a [`Value`] is, derived from its bits alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    Fixnum(i64),
    Float(f64),
    True,
    False,
    Nil,
    Undef,
    Reference,
}

impl Value {
    pub const FALSE: Value = Value(0b000);
    pub const TRUE: Value = Value(0b010);
    pub const NIL: Value = Value(0b100);
    /// "Not computed": marks unassigned slots, empty caches and failed ABI
    /// calls. Never visible to user code.
    pub const UNDEF: Value = Value(0b110);

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    // ── Numeric immediates ─────────────────────────────────────────

    /// Fixnum or float immediate. Never a reference.
    #[inline(always)]
    pub const fn is_immediate(self) -> bool {
        self.0 & IMMEDIATE_MASK == IMMEDIATE_MASK
    }

    #[inline(always)]
    pub const fn is_fixnum(self) -> bool {
        self.0 & IMMEDIATE_TAG_MASK == FIXNUM_TAG
    }

    #[inline(always)]
    pub const fn is_float(self) -> bool {
        self.0 & IMMEDIATE_TAG_MASK == FLOAT_TAG
    }

    /// Whether `n` fits the immediate integer range.
    #[inline(always)]
    pub const fn fixable(n: i64) -> bool {
        n >= FIXNUM_MIN && n <= FIXNUM_MAX
    }

    #[inline(always)]
    pub fn from_i64(n: i64) -> Self {
        debug_assert!(Self::fixable(n), "fixnum overflow: {n}");
        Self(((n << 2) as u64) | FIXNUM_TAG)
    }

    #[inline(always)]
    pub fn try_from_i64(n: i64) -> Option<Self> {
        Self::fixable(n).then(|| Self::from_i64(n))
    }

    /// # Safety
    ///
    /// The value must be a fixnum.
    #[inline(always)]
    pub unsafe fn to_i64(self) -> i64 {
        debug_assert!(self.is_fixnum());
        (self.0 as i64) >> 2
    }

    #[inline(always)]
    pub fn as_fixnum(self) -> Option<i64> {
        // SAFETY: checked
        self.is_fixnum().then(|| unsafe { self.to_i64() })
    }

    /// Encode a float immediate. The two lowest mantissa bits are lost.
    #[inline(always)]
    pub fn from_f64(f: f64) -> Self {
        Self((f.to_bits() & !IMMEDIATE_TAG_MASK) | FLOAT_TAG)
    }

    /// # Safety
    ///
    /// The value must be a float immediate.
    #[inline(always)]
    pub unsafe fn to_f64(self) -> f64 {
        debug_assert!(self.is_float());
        f64::from_bits(self.0 & !IMMEDIATE_TAG_MASK)
    }

    #[inline(always)]
    pub fn as_float(self) -> Option<f64> {
        // SAFETY: checked
        self.is_float().then(|| unsafe { self.to_f64() })
    }

    /// Widen either kind of numeric immediate to `f64`.
    ///
    /// # Safety
    ///
    /// The value must be a numeric immediate.
    #[inline(always)]
    pub unsafe fn immediate_to_f64(self) -> f64 {
        debug_assert!(self.is_immediate());
        if self.is_float() {
            unsafe { self.to_f64() }
        } else {
            unsafe { self.to_i64() as f64 }
        }
    }

    // ── Singletons ─────────────────────────────────────────────────

    #[inline(always)]
    pub const fn from_bool(b: bool) -> Self {
        if b { Self::TRUE } else { Self::FALSE }
    }

    #[inline(always)]
    pub const fn is_singleton(self) -> bool {
        self.0 < SINGLETON_LIMIT && self.0 & IMMEDIATE_MASK == 0
    }

    #[inline(always)]
    pub const fn is_bool(self) -> bool {
        self.0 == Self::TRUE.0 || self.0 == Self::FALSE.0
    }

    #[inline(always)]
    pub const fn is_nil(self) -> bool {
        self.0 == Self::NIL.0
    }

    #[inline(always)]
    pub const fn is_undef(self) -> bool {
        self.0 == Self::UNDEF.0
    }

    /// Everything except `false` and `nil` is true.
    #[inline(always)]
    pub const fn is_truthy(self) -> bool {
        self.0 != Self::FALSE.0 && self.0 != Self::NIL.0
    }

    /// Immediate or singleton: has no heap object behind it.
    #[inline(always)]
    pub const fn is_special_const(self) -> bool {
        self.is_immediate() || self.is_singleton()
    }

    /// The unassigned marker reads as nil.
    #[inline(always)]
    pub const fn undef_to_nil(self) -> Self {
        if self.is_undef() { Self::NIL } else { self }
    }

    // ── Reference ──────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_ref(self) -> bool {
        self.0 & REF_ALIGN_MASK == 0 && self.0 >= SINGLETON_LIMIT
    }

    #[inline(always)]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        let addr = ptr as u64;
        debug_assert!(addr & REF_ALIGN_MASK == 0, "pointer not aligned");
        debug_assert!(addr >= SINGLETON_LIMIT, "null reference");
        Self(addr)
    }

    #[inline(always)]
    pub fn as_ptr<T>(self) -> *mut T {
        debug_assert!(self.is_ref());
        self.0 as *mut T
    }

    /// # Safety
    ///
    /// The value must be a reference to a valid, live `T`.
    #[inline(always)]
    pub unsafe fn as_ref<'a, T>(self) -> &'a T {
        debug_assert!(self.is_ref());
        unsafe { &*(self.0 as *const T) }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Self::TRUE => ValueKind::True,
            Self::FALSE => ValueKind::False,
            Self::NIL => ValueKind::Nil,
            Self::UNDEF => ValueKind::Undef,
            // SAFETY: tags checked
            v if v.is_fixnum() => ValueKind::Fixnum(unsafe { v.to_i64() }),
            v if v.is_float() => ValueKind::Float(unsafe { v.to_f64() }),
            _ => ValueKind::Reference,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::NIL
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::from_bool(b)
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind() {
            ValueKind::Fixnum(n) => write!(f, "Fixnum({n})"),
            ValueKind::Float(x) => write!(f, "Float({x})"),
            ValueKind::True => f.write_str("true"),
            ValueKind::False => f.write_str("false"),
            ValueKind::Nil => f.write_str("nil"),
            ValueKind::Undef => f.write_str("undef"),
            ValueKind::Reference => write!(f, "Ref(0x{:x})", self.0),
        }
    }
}
