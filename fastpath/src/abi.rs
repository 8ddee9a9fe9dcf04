//! C entry points for generated code.
//!
//! Every function takes the [`KernelContext`] of the calling thread first.
//! Operations that fail store the error in the context and return
//! [`Value::UNDEF`] (or write a zeroed native value); generated code checks
//! [`fp_has_error`] after calls that can fail and unwinds through the VM.
//!
//! # Safety
//!
//! All pointers handed to these functions must be valid for the duration
//! of the call: the context, the call-site caches owned by the generated
//! code, out-pointers, and C strings. Every reference-tagged `Value` must
//! be a live object of the context's runtime.

use std::ffi::{CStr, c_char, c_void};

use log::debug;

use crate::masgn;
use crate::native;
use crate::numeric;
use crate::scope::{self, ConstLookup};
use crate::{
    ClassRef, ConstCache, IvarCache, NativeSelector, Runtime, RuntimeError, SendCache, Symbol,
    Tagged, Value, Visibility, container, glue, ivar,
};

/// Per-thread state generated code threads through every kernel call.
pub struct KernelContext<'rt> {
    runtime: &'rt mut dyn Runtime,
    error: Option<RuntimeError>,
}

impl<'rt> KernelContext<'rt> {
    pub fn new(runtime: &'rt mut dyn Runtime) -> Self {
        Self {
            runtime,
            error: None,
        }
    }

    pub fn runtime(&mut self) -> &mut dyn Runtime {
        &mut *self.runtime
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn take_error(&mut self) -> Option<RuntimeError> {
        self.error.take()
    }

    #[inline(always)]
    fn settle_or<T>(&mut self, result: Result<T, RuntimeError>, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                debug!("kernel call failed: {err}");
                self.error = Some(err);
                fallback
            }
        }
    }

    #[inline(always)]
    fn settle(&mut self, result: Result<Value, RuntimeError>) -> Value {
        self.settle_or(result, Value::UNDEF)
    }
}

#[inline(always)]
fn symbol(id: u32) -> Result<Symbol, RuntimeError> {
    Symbol::from_id(id).ok_or_else(|| RuntimeError::ArgumentError {
        message: "symbol id 0".into(),
    })
}

#[inline(always)]
fn class(value: Value) -> ClassRef {
    Tagged::from_value(value)
}

/// # Safety
///
/// `ptr` must be a valid, NUL-terminated C string.
unsafe fn type_signature<'a>(ptr: *const c_char) -> Result<&'a str, RuntimeError> {
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| RuntimeError::ArgumentError {
            message: "type signature is not UTF-8".into(),
        })
}

/// Whether the last failing call left an error behind.
///
/// # Safety
///
/// `ctx` must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_has_error(ctx: *const KernelContext<'_>) -> u8 {
    unsafe { (*ctx).has_error() as u8 }
}

// ── Inline caches ──────────────────────────────────────────────────

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_ivar_get(
    ctx: *mut KernelContext<'_>,
    object: Value,
    name: u32,
    cache: *mut IvarCache,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    let cache = unsafe { &mut *cache };
    let result =
        symbol(name).map(|name| unsafe { ivar::ivar_get(&mut *ctx.runtime, object, name, cache) });
    ctx.settle(result)
}

/// Returns `value`.
///
/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_ivar_set(
    ctx: *mut KernelContext<'_>,
    object: Value,
    name: u32,
    value: Value,
    cache: *mut IvarCache,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    let cache = unsafe { &mut *cache };
    let result = symbol(name)
        .and_then(|name| unsafe { ivar::ivar_set(&mut *ctx.runtime, object, name, value, cache) })
        .map(|()| value);
    ctx.settle(result)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_cvar_get(
    ctx: *mut KernelContext<'_>,
    klass: Value,
    id: u32,
    check: u8,
    dynamic_class: u8,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    let result = symbol(id).and_then(|id| {
        scope::cvar_get(&mut *ctx.runtime, class(klass), id, check != 0, dynamic_class != 0)
    });
    ctx.settle(result)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_cvar_set(
    ctx: *mut KernelContext<'_>,
    klass: Value,
    id: u32,
    value: Value,
    dynamic_class: u8,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    let result = symbol(id).and_then(|id| {
        scope::cvar_set(&mut *ctx.runtime, class(klass), id, value, dynamic_class != 0)
    });
    ctx.settle(result)
}

/// `flags` is a [`ConstLookup`] bit set.
///
/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_get_const(
    ctx: *mut KernelContext<'_>,
    outer: Value,
    cache: *mut ConstCache,
    path: u32,
    flags: u32,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    let cache = unsafe { &mut *cache };
    let result = symbol(path).and_then(|path| {
        scope::get_const(&mut *ctx.runtime, class(outer), cache, path, ConstLookup(flags))
    });
    ctx.settle(result)
}

/// Returns `value`.
///
/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_set_const(
    ctx: *mut KernelContext<'_>,
    outer: Value,
    id: u32,
    value: Value,
    dynamic_class: u8,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    let result = symbol(id)
        .and_then(|id| {
            scope::set_const(&mut *ctx.runtime, class(outer), id, value, dynamic_class != 0)
        })
        .map(|()| value);
    ctx.settle(result)
}

// ── Operators ──────────────────────────────────────────────────────

macro_rules! binary_operators {
    (@call safe $op:path, $($arg:expr),*) => {
        $op($($arg),*)
    };
    (@call unsafe $op:path, $($arg:expr),*) => {
        unsafe { $op($($arg),*) }
    };
    ($kind:tt: $($name:ident => $op:path),* $(,)?) => {$(
        /// # Safety
        ///
        /// See the module documentation.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(
            ctx: *mut KernelContext<'_>,
            cache: *mut SendCache,
            left: Value,
            right: Value,
            overridden: u8,
        ) -> Value {
            let ctx = unsafe { &mut *ctx };
            let cache = unsafe { &mut *cache };
            let result = binary_operators!(
                @call $kind $op,
                &mut *ctx.runtime, cache, left, right, overridden != 0
            );
            ctx.settle(result)
        }
    )*};
}

binary_operators! { safe:
    fp_fast_plus => numeric::fast_plus,
    fp_fast_minus => numeric::fast_minus,
    fp_fast_mult => numeric::fast_mult,
    fp_fast_div => numeric::fast_div,
    fp_fast_lt => numeric::fast_lt,
    fp_fast_le => numeric::fast_le,
    fp_fast_gt => numeric::fast_gt,
    fp_fast_ge => numeric::fast_ge,
    fp_fast_eq => numeric::fast_eq,
    fp_fast_eqq => numeric::fast_eqq,
    fp_fast_neq => numeric::fast_neq,
}

// Receivers of the container operators have their headers read.
binary_operators! { unsafe:
    fp_fast_aref => container::fast_aref,
    fp_fast_shift => container::fast_shift,
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_fast_aset(
    ctx: *mut KernelContext<'_>,
    cache: *mut SendCache,
    receiver: Value,
    index: Value,
    value: Value,
    overridden: u8,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    let cache = unsafe { &mut *cache };
    let result =
        unsafe { container::fast_aset(&mut *ctx.runtime, cache, receiver, index, value, overridden != 0) };
    ctx.settle(result)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_when_splat(
    ctx: *mut KernelContext<'_>,
    cache: *mut SendCache,
    overridden: u8,
    compared_to: Value,
    splat: Value,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    let cache = unsafe { &mut *cache };
    let result = masgn::when_splat(&mut *ctx.runtime, cache, overridden != 0, compared_to, splat);
    ctx.settle(result)
}

// ── Glue ───────────────────────────────────────────────────────────

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_set_current_scope(ctx: *mut KernelContext<'_>, module: Value, scope: i32) {
    let ctx = unsafe { &mut *ctx };
    let result = match Visibility::from_raw(scope) {
        Some(visibility) => {
            glue::set_current_scope(&mut *ctx.runtime, class(module), visibility);
            Ok(())
        }
        None => Err(RuntimeError::ArgumentError {
            message: format!("unknown scope {scope}"),
        }),
    };
    ctx.settle_or(result, ());
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_get_special(ctx: *mut KernelContext<'_>, code: c_char) -> Value {
    let ctx = unsafe { &mut *ctx };
    glue::get_special(&mut *ctx.runtime, code as i8)
}

// ── Sequences ──────────────────────────────────────────────────────

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_masgn_before_splat(ctx: *mut KernelContext<'_>, ary: Value, offset: u32) -> Value {
    let ctx = unsafe { &mut *ctx };
    masgn::before_splat(&*ctx.runtime, ary, offset as usize)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_masgn_after_splat(
    ctx: *mut KernelContext<'_>,
    ary: Value,
    before: u32,
    after: u32,
    offset: u32,
) -> Value {
    let ctx = unsafe { &mut *ctx };
    masgn::after_splat(&*ctx.runtime, ary, before as usize, after as usize, offset as usize)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_masgn_splat(ctx: *mut KernelContext<'_>, ary: Value, before: u32, after: u32) -> Value {
    let ctx = unsafe { &mut *ctx };
    masgn::splat(&mut *ctx.runtime, ary, before as usize, after as usize)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_to_a(ctx: *mut KernelContext<'_>, value: Value) -> Value {
    let ctx = unsafe { &mut *ctx };
    let result = masgn::to_a(&mut *ctx.runtime, value);
    ctx.settle(result)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_to_ary(ctx: *mut KernelContext<'_>, value: Value) -> Value {
    let ctx = unsafe { &mut *ctx };
    let result = masgn::to_ary(&mut *ctx.runtime, value);
    ctx.settle(result)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_ary_cat(ctx: *mut KernelContext<'_>, ary: Value, value: Value) -> Value {
    let ctx = unsafe { &mut *ctx };
    let result = masgn::ary_cat(&mut *ctx.runtime, ary, value);
    ctx.settle(result)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_ary_dup(ctx: *mut KernelContext<'_>, ary: Value) -> Value {
    let ctx = unsafe { &mut *ctx };
    masgn::ary_dup(&mut *ctx.runtime, ary)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_rary_new(ctx: *mut KernelContext<'_>, len: u32) -> Value {
    let ctx = unsafe { &mut *ctx };
    masgn::rary_new(&mut *ctx.runtime, len as usize)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_rary_aset(ctx: *mut KernelContext<'_>, ary: Value, index: u32, value: Value) {
    let ctx = unsafe { &mut *ctx };
    let result = masgn::rary_aset(&mut *ctx.runtime, ary, index as usize, value);
    ctx.settle_or(result, ());
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_rhash_new(ctx: *mut KernelContext<'_>) -> Value {
    let ctx = unsafe { &mut *ctx };
    masgn::rhash_new(&mut *ctx.runtime)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_rhash_store(ctx: *mut KernelContext<'_>, hash: Value, key: Value, value: Value) {
    let ctx = unsafe { &mut *ctx };
    let result = masgn::rhash_store(&mut *ctx.runtime, hash, key, value);
    ctx.settle_or(result, ());
}

// ── Value → native ─────────────────────────────────────────────────

macro_rules! to_native {
    ($($name:ident => $conv:path: $ty:ty),* $(,)?) => {$(
        /// Writes zero on failure.
        ///
        /// # Safety
        ///
        /// See the module documentation.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(ctx: *mut KernelContext<'_>, value: Value, out: *mut $ty) {
            let ctx = unsafe { &mut *ctx };
            let result = $conv(&mut *ctx.runtime, value);
            let native = ctx.settle_or(result, 0 as $ty);
            unsafe { out.write(native) };
        }
    )*};
}

to_native! {
    fp_value_to_i8 => native::value_to_i8: i8,
    fp_value_to_u8 => native::value_to_u8: u8,
    fp_value_to_i16 => native::value_to_i16: i16,
    fp_value_to_u16 => native::value_to_u16: u16,
    fp_value_to_i32 => native::value_to_i32: i32,
    fp_value_to_u32 => native::value_to_u32: u32,
    fp_value_to_i64 => native::value_to_i64: i64,
    fp_value_to_u64 => native::value_to_u64: u64,
    fp_value_to_f32 => native::value_to_f32: f32,
    fp_value_to_f64 => native::value_to_f64: f64,
}

/// # Safety
///
/// `out` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_value_to_bool(value: Value, out: *mut u8) {
    unsafe { out.write(native::value_to_bool(value) as u8) };
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_value_to_handle(ctx: *mut KernelContext<'_>, value: Value, out: *mut *mut c_void) {
    let ctx = unsafe { &mut *ctx };
    let result = native::value_to_handle(&mut *ctx.runtime, value);
    let handle = ctx.settle_or(result, core::ptr::null_mut());
    unsafe { out.write(handle) };
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_value_to_cstr(ctx: *mut KernelContext<'_>, value: Value, out: *mut *const c_char) {
    let ctx = unsafe { &mut *ctx };
    let result = native::value_to_cstr(&mut *ctx.runtime, value);
    let text = ctx.settle_or(result, core::ptr::null());
    unsafe { out.write(text) };
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_value_to_selector(
    ctx: *mut KernelContext<'_>,
    value: Value,
    out: *mut NativeSelector,
) {
    let ctx = unsafe { &mut *ctx };
    let result = native::value_to_selector(&mut *ctx.runtime, value);
    let selector = ctx.settle_or(result, NativeSelector::NULL);
    unsafe { out.write(selector) };
}

/// `type_sig` is the full pointer signature, e.g. `^{CGPoint=dd}`.
/// Returns the address it also writes to `out`.
///
/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_value_to_cptr(
    ctx: *mut KernelContext<'_>,
    value: Value,
    type_sig: *const c_char,
    out: *mut *mut c_void,
) -> *mut c_void {
    let ctx = unsafe { &mut *ctx };
    let result = unsafe { type_signature(type_sig) }
        .and_then(|sig| native::value_to_cptr(&mut *ctx.runtime, value, sig));
    let address = ctx.settle_or(result, core::ptr::null_mut());
    unsafe { out.write(address) };
    address
}

// ── native → Value ─────────────────────────────────────────────────

macro_rules! from_native {
    ($($name:ident => $conv:path: $ty:ty),* $(,)?) => {$(
        #[unsafe(no_mangle)]
        pub extern "C" fn $name(native: $ty) -> Value {
            $conv(native)
        }
    )*};
}

from_native! {
    fp_i8_to_value => native::i8_to_value: i8,
    fp_u8_to_value => native::u8_to_value: u8,
    fp_i16_to_value => native::i16_to_value: i16,
    fp_u16_to_value => native::u16_to_value: u16,
    fp_i32_to_value => native::i32_to_value: i32,
    fp_u32_to_value => native::u32_to_value: u32,
    fp_f32_to_value => native::f32_to_value: f32,
    fp_f64_to_value => native::f64_to_value: f64,
    fp_bool_to_value => native::bool_to_value: u8,
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_i64_to_value(ctx: *mut KernelContext<'_>, n: i64) -> Value {
    let ctx = unsafe { &mut *ctx };
    native::i64_to_value(&mut *ctx.runtime, n)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_u64_to_value(ctx: *mut KernelContext<'_>, n: u64) -> Value {
    let ctx = unsafe { &mut *ctx };
    native::u64_to_value(&mut *ctx.runtime, n)
}

/// # Safety
///
/// See the module documentation; `ptr` may be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_cstr_to_value(ctx: *mut KernelContext<'_>, ptr: *const c_char) -> Value {
    let ctx = unsafe { &mut *ctx };
    unsafe { native::cstr_to_value(&mut *ctx.runtime, ptr) }
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_selector_to_value(ctx: *mut KernelContext<'_>, selector: NativeSelector) -> Value {
    let ctx = unsafe { &mut *ctx };
    native::selector_to_value(&mut *ctx.runtime, selector)
}

/// # Safety
///
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fp_handle_to_value(ctx: *mut KernelContext<'_>, handle: *mut c_void) -> Value {
    let ctx = unsafe { &mut *ctx };
    native::handle_to_value(&mut *ctx.runtime, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FIXNUM_MAX;
    use crate::sandbox::{ClassLayout, Sandbox};

    #[test]
    fn fast_paths_through_the_abi() {
        let mut sb = Sandbox::default();
        let mut ctx = KernelContext::new(&mut sb);
        let mut cache = SendCache::new();
        let sum = unsafe {
            fp_fast_plus(&mut ctx, &mut cache, Value::from_i64(2), Value::from_i64(3), 0)
        };
        assert_eq!(sum, Value::from_i64(5));
        let big = unsafe {
            fp_fast_plus(&mut ctx, &mut cache, Value::from_i64(FIXNUM_MAX), Value::from_i64(1), 0)
        };
        assert!(big.is_ref());
        assert!(!ctx.has_error());
    }

    #[test]
    fn failures_are_recorded() {
        let mut sb = Sandbox::default();
        let mut ctx = KernelContext::new(&mut sb);
        let mut cache = SendCache::new();
        let q = unsafe {
            fp_fast_div(&mut ctx, &mut cache, Value::from_i64(1), Value::from_i64(0), 0)
        };
        assert_eq!(q, Value::UNDEF);
        assert_eq!(unsafe { fp_has_error(&ctx) }, 1);
        assert_eq!(ctx.take_error(), Some(RuntimeError::ZeroDivision));
        assert!(!ctx.has_error());

        let mut out = 7_i32;
        unsafe { fp_value_to_i32(&mut ctx, Value::NIL, &mut out) };
        assert_eq!(out, 0);
        assert!(matches!(ctx.take_error(), Some(RuntimeError::TypeError { .. })));
    }

    #[test]
    fn frozen_ivar_store_reports() {
        let mut sb = Sandbox::default();
        let point = sb.define_class("Point", None, ClassLayout::Slots);
        let obj = sb.new_object(point);
        let x = sb.intern("@x");
        sb.freeze(obj);

        let mut ctx = KernelContext::new(&mut sb);
        let mut cache = IvarCache::default();
        let result = unsafe { fp_ivar_set(&mut ctx, obj, x.id(), Value::TRUE, &mut cache) };
        assert_eq!(result, Value::UNDEF);
        assert_eq!(ctx.take_error(), Some(RuntimeError::Frozen { what: "object" }));
        let read = unsafe { fp_ivar_get(&mut ctx, obj, x.id(), &mut cache) };
        assert_eq!(read, Value::NIL);
    }

    #[test]
    fn native_round_trips() {
        let mut sb = Sandbox::default();
        let mut ctx = KernelContext::new(&mut sb);
        let mut byte = 0_u8;
        unsafe { fp_value_to_u8(&mut ctx, Value::from_i64(300), &mut byte) };
        assert_eq!(byte, 44);
        assert_eq!(fp_u8_to_value(byte), Value::from_i64(44));

        let mut flag = 9_u8;
        unsafe { fp_value_to_bool(Value::from_i64(0), &mut flag) };
        assert_eq!(flag, 1);

        let value = unsafe { fp_cstr_to_value(&mut ctx, c"hi".as_ptr()) };
        let mut text = core::ptr::null();
        unsafe { fp_value_to_cstr(&mut ctx, value, &mut text) };
        assert_eq!(unsafe { CStr::from_ptr(text) }.to_str(), Ok("hi"));

        let mut address = core::ptr::null_mut();
        let ret = unsafe { fp_value_to_cptr(&mut ctx, Value::NIL, c"^i".as_ptr(), &mut address) };
        assert!(ret.is_null() && address.is_null());
        assert!(!ctx.has_error());
    }

    #[test]
    fn masgn_through_the_abi() {
        let mut sb = Sandbox::default();
        let mut ctx = KernelContext::new(&mut sb);
        let ary = unsafe { fp_rary_new(&mut ctx, 3) };
        for i in 0..3 {
            unsafe { fp_rary_aset(&mut ctx, ary, i, Value::from_i64(i as i64 + 1)) };
        }
        assert_eq!(unsafe { fp_masgn_before_splat(&mut ctx, ary, 0) }, Value::from_i64(1));
        assert_eq!(unsafe { fp_masgn_after_splat(&mut ctx, ary, 1, 1, 0) }, Value::from_i64(3));
        let rest = unsafe { fp_masgn_splat(&mut ctx, ary, 1, 1) };
        let mut cache = SendCache::new();
        let two = unsafe { fp_fast_aref(&mut ctx, &mut cache, rest, Value::from_i64(0), 0) };
        assert_eq!(two, Value::from_i64(2));
    }

    #[test]
    fn unknown_scope_is_an_error() {
        let mut sb = Sandbox::default();
        let object = sb.classes().object;
        let mut ctx = KernelContext::new(&mut sb);
        unsafe { fp_set_current_scope(&mut ctx, object.value(), 42) };
        assert!(matches!(ctx.take_error(), Some(RuntimeError::ArgumentError { .. })));
    }
}
