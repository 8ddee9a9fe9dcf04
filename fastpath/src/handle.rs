use crate::Value;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// A typed tagged value.
///
/// The underlying bits are the same as [`Value`] but `T` names the expected
/// heap layout of the referenced object. Dereferencing is unsafe, the caller
/// must guarantee the value actually points to a valid `T`.
#[repr(transparent)]
pub struct Tagged<T> {
    value: Value,
    _marker: PhantomData<*const T>,
}

/// Opaque marker for class objects. Their layout belongs to the class
/// subsystem, the kernel only compares class identities.
pub enum Class {}

/// Identity of a runtime class, as stored in every object header.
pub type ClassRef = Tagged<Class>;

impl<T> Tagged<T> {
    #[inline(always)]
    pub const fn from_value(value: Value) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub const fn value(self) -> Value {
        self.value
    }

    #[inline(always)]
    pub fn is_ref(self) -> bool {
        self.value.is_ref()
    }

    /// Dereference as a shared reference to `T`.
    ///
    /// # Safety
    ///
    /// The value must be a reference to a valid, live `T`.
    #[inline(always)]
    pub unsafe fn as_ref<'a>(self) -> &'a T {
        unsafe { self.value.as_ref() }
    }

    #[inline(always)]
    pub fn as_ptr(self) -> *mut T {
        self.value.as_ptr()
    }
}

// manual impls: derives would demand `T: Clone` etc. although only the
// pointer is copied
impl<T> Clone for Tagged<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Tagged<T> {}

impl<T> PartialEq for Tagged<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Tagged<T> {}

impl<T> Hash for Tagged<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> core::fmt::Debug for Tagged<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Tagged({:?})", self.value)
    }
}

impl<T> From<Value> for Tagged<T> {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl<T> From<Tagged<T>> for Value {
    fn from(handle: Tagged<T>) -> Self {
        handle.value
    }
}
