//! Marshalling between [`Value`] and native scalars at the foreign-call
//! boundary.
//!
//! Integer conversions narrow with `as`: out-of-range values truncate to the
//! low bits of the target width instead of raising.

use std::ffi::{CStr, c_char, c_void};
use std::ptr::NonNull;

use crate::{
    BuiltinType, Coercion, ContainerStore, NativeBridge, NativeSelector, ObjectModel,
    RuntimeError, Value,
};

// ── Value → native ─────────────────────────────────────────────────

#[inline(always)]
fn bool_to_fixnum(value: Value) -> Value {
    match value {
        Value::TRUE => Value::from_i64(1),
        Value::FALSE => Value::from_i64(0),
        other => other,
    }
}

/// Booleans as 0/1, then the integer conversion protocol.
pub fn coerce_integer<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<i64, RuntimeError> {
    let value = bool_to_fixnum(value);
    match value.as_fixnum() {
        Some(n) => Ok(n),
        None => rt.convert_to_integer(value),
    }
}

/// Booleans as 0/1, then the float conversion protocol.
pub fn coerce_real<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<f64, RuntimeError> {
    let value = bool_to_fixnum(value);
    if value.is_immediate() {
        // SAFETY: checked
        return Ok(unsafe { value.immediate_to_f64() });
    }
    rt.convert_to_float(value)
}

/// A one-byte string converts to its byte.
fn single_byte<R: ObjectModel + ContainerStore + ?Sized>(rt: &R, value: Value) -> Option<u8> {
    if rt.builtin_type(value) == BuiltinType::String && rt.string_len(value) == 1 {
        Some(rt.string_byte_at(value, 0))
    } else {
        None
    }
}

pub fn value_to_i8<R: ObjectModel + ContainerStore + Coercion + ?Sized>(
    rt: &mut R,
    value: Value,
) -> Result<i8, RuntimeError> {
    match single_byte(rt, value) {
        Some(byte) => Ok(byte as i8),
        None => Ok(coerce_integer(rt, value)? as i8),
    }
}

pub fn value_to_u8<R: ObjectModel + ContainerStore + Coercion + ?Sized>(
    rt: &mut R,
    value: Value,
) -> Result<u8, RuntimeError> {
    match single_byte(rt, value) {
        Some(byte) => Ok(byte),
        None => Ok(coerce_integer(rt, value)? as u8),
    }
}

pub fn value_to_i16<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<i16, RuntimeError> {
    Ok(coerce_integer(rt, value)? as i16)
}

pub fn value_to_u16<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<u16, RuntimeError> {
    Ok(coerce_integer(rt, value)? as u16)
}

pub fn value_to_i32<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<i32, RuntimeError> {
    Ok(coerce_integer(rt, value)? as i32)
}

pub fn value_to_u32<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<u32, RuntimeError> {
    Ok(coerce_integer(rt, value)? as u32)
}

pub fn value_to_i64<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<i64, RuntimeError> {
    coerce_integer(rt, value)
}

pub fn value_to_u64<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<u64, RuntimeError> {
    Ok(coerce_integer(rt, value)? as u64)
}

pub fn value_to_f32<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<f32, RuntimeError> {
    Ok(coerce_real(rt, value)? as f32)
}

pub fn value_to_f64<R: Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<f64, RuntimeError> {
    coerce_real(rt, value)
}

/// Only `false` and `nil` are native false; `0` is true.
#[inline(always)]
pub fn value_to_bool(value: Value) -> bool {
    value.is_truthy()
}

pub fn value_to_handle<R: NativeBridge + ?Sized>(rt: &mut R, value: Value) -> Result<*mut c_void, RuntimeError> {
    if value.is_nil() {
        return Ok(core::ptr::null_mut());
    }
    rt.handle_from_value(value)
}

/// NUL-terminated text of a value, or null for nil.
///
/// The buffer belongs to the value (or the interner, for symbols); nothing
/// is copied.
pub fn value_to_cstr<R: ObjectModel + Coercion + NativeBridge + ?Sized>(
    rt: &mut R,
    value: Value,
) -> Result<*const c_char, RuntimeError> {
    if value.is_nil() {
        return Ok(core::ptr::null());
    }
    if let Some(symbol) = rt.symbol_id(value) {
        if let Some(name) = rt.interner().c_name(symbol) {
            return Ok(name);
        }
    }
    let pointer = rt.builtins().pointer;
    if rt.is_kind_of(value, pointer) {
        return Ok(rt.pointer_data(value, "^c")? as *const c_char);
    }
    rt.string_cstr(value)
}

pub fn value_to_selector<R: ObjectModel + Coercion + NativeBridge + ?Sized>(
    rt: &mut R,
    value: Value,
) -> Result<NativeSelector, RuntimeError> {
    let text = value_to_cstr(rt, value)?;
    if text.is_null() {
        return Ok(NativeSelector::NULL);
    }
    // SAFETY: value_to_cstr hands out NUL-terminated buffers
    let name = unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned();
    Ok(rt.interner().selector(&name))
}

/// Address for a `^T` argument.
///
/// Arrays and boxed structs of type `T` are wrapped in a pointer adapter
/// first, so callers may pass them where a pointer is expected.
pub fn value_to_cptr<R: ObjectModel + NativeBridge + ?Sized>(
    rt: &mut R,
    value: Value,
    type_sig: &str,
) -> Result<*mut c_void, RuntimeError> {
    if value.is_nil() {
        return Ok(core::ptr::null_mut());
    }
    let pointee = type_sig.strip_prefix('^').unwrap_or(type_sig);
    let class = rt.class_of(value);
    let value = if rt.builtin_type(value) == BuiltinType::Array || rt.boxed_is_type(class, pointee) {
        rt.pointer_new(pointee, value)?
    } else {
        value
    };
    rt.pointer_data(value, type_sig)
}

// ── native → Value ─────────────────────────────────────────────────

#[inline(always)]
pub fn i8_to_value(n: i8) -> Value {
    Value::from_i64(n as i64)
}

#[inline(always)]
pub fn u8_to_value(n: u8) -> Value {
    Value::from_i64(n as i64)
}

#[inline(always)]
pub fn i16_to_value(n: i16) -> Value {
    Value::from_i64(n as i64)
}

#[inline(always)]
pub fn u16_to_value(n: u16) -> Value {
    Value::from_i64(n as i64)
}

#[inline(always)]
pub fn i32_to_value(n: i32) -> Value {
    Value::from_i64(n as i64)
}

#[inline(always)]
pub fn u32_to_value(n: u32) -> Value {
    Value::from_i64(n as i64)
}

/// Boxes into a bignum outside the immediate range.
pub fn i64_to_value<R: Coercion + ?Sized>(rt: &mut R, n: i64) -> Value {
    match Value::try_from_i64(n) {
        Some(value) => value,
        None => rt.bignum_from_i128(n as i128),
    }
}

/// Boxes into a bignum outside the immediate range.
pub fn u64_to_value<R: Coercion + ?Sized>(rt: &mut R, n: u64) -> Value {
    match i64::try_from(n).ok().and_then(Value::try_from_i64) {
        Some(value) => value,
        None => rt.bignum_from_i128(n as i128),
    }
}

#[inline(always)]
pub fn f32_to_value(f: f32) -> Value {
    Value::from_f64(f as f64)
}

#[inline(always)]
pub fn f64_to_value(f: f64) -> Value {
    Value::from_f64(f)
}

#[inline(always)]
pub fn bool_to_value(b: u8) -> Value {
    Value::from_bool(b != 0)
}

/// Copies the bytes into a new string; null is nil.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer.
pub unsafe fn cstr_to_value<R: ContainerStore + ?Sized>(rt: &mut R, ptr: *const c_char) -> Value {
    if ptr.is_null() {
        return Value::NIL;
    }
    let bytes = unsafe { CStr::from_ptr(ptr) }.to_bytes();
    rt.string_new(bytes)
}

/// Symbol named by `selector`; null is nil.
pub fn selector_to_value<R: ObjectModel + ?Sized>(rt: &mut R, selector: NativeSelector) -> Value {
    if selector.is_null() {
        return Value::NIL;
    }
    let interner = rt.interner();
    let symbol = match interner.selector_symbol(selector) {
        Some(symbol) => symbol,
        None => {
            // SAFETY: non-null selectors point at NUL-terminated names
            let name = unsafe { CStr::from_ptr(selector.as_ptr()) }.to_string_lossy();
            interner.intern(&name)
        }
    };
    rt.symbol_value(symbol)
}

pub fn handle_to_value<R: NativeBridge + ?Sized>(rt: &mut R, handle: *mut c_void) -> Value {
    match NonNull::new(handle) {
        Some(handle) => rt.value_from_handle(handle),
        None => Value::NIL,
    }
}
