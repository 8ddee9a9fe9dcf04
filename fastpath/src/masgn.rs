//! Multiple assignment and the sequence helpers generated code builds
//! literals and splats with.
//!
//! `a, b, *rest, z = seq` reads `a` and `b` with [`before_splat`], `z`
//! with [`after_splat`] and `rest` with [`splat`].

use crate::numeric::fast_eqq;
use crate::{
    Coercion, ContainerStore, ConversionMethod, Dispatcher, RuntimeError, SendCache, Value,
};

pub fn before_splat<R: ContainerStore + ?Sized>(rt: &R, ary: Value, offset: usize) -> Value {
    if offset < rt.array_len(ary) {
        rt.array_entry(ary, offset as i64)
    } else {
        Value::NIL
    }
}

/// Element `offset` of the names after the splat. A sequence too short to
/// fill both sides fills the names from the left.
pub fn after_splat<R: ContainerStore + ?Sized>(
    rt: &R,
    ary: Value,
    before: usize,
    after: usize,
    offset: usize,
) -> Value {
    let len = rt.array_len(ary);
    let index = if len < before + after {
        offset + before
    } else {
        offset + len - after
    };
    if index < len {
        rt.array_entry(ary, index as i64)
    } else {
        Value::NIL
    }
}

/// The elements between both named regions, empty if there are none.
pub fn splat<R: ContainerStore + ?Sized>(rt: &mut R, ary: Value, before: usize, after: usize) -> Value {
    let len = rt.array_len(ary);
    if len > before + after {
        rt.array_subseq(ary, before, len - before - after)
    } else {
        rt.array_new(&[])
    }
}

fn convert_or_wrap<R: ContainerStore + Coercion + ?Sized>(
    rt: &mut R,
    value: Value,
    method: ConversionMethod,
) -> Result<Value, RuntimeError> {
    match rt.check_convert_array(value, method)? {
        Some(ary) => Ok(ary),
        None => Ok(rt.array_new(&[value])),
    }
}

/// `to_a`, or a one-element sequence.
pub fn to_a<R: ContainerStore + Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<Value, RuntimeError> {
    convert_or_wrap(rt, value, ConversionMethod::ToA)
}

/// `to_ary`, or a one-element sequence.
pub fn to_ary<R: ContainerStore + Coercion + ?Sized>(rt: &mut R, value: Value) -> Result<Value, RuntimeError> {
    convert_or_wrap(rt, value, ConversionMethod::ToAry)
}

/// Append `value`'s `to_a` elements to `ary`, or `value` itself. Returns
/// `ary`.
pub fn ary_cat<R: ContainerStore + Coercion + ?Sized>(
    rt: &mut R,
    ary: Value,
    value: Value,
) -> Result<Value, RuntimeError> {
    match rt.check_convert_array(value, ConversionMethod::ToA)? {
        Some(other) => rt.array_concat(ary, other)?,
        None => rt.array_push(ary, value),
    }
    Ok(ary)
}

pub fn ary_dup<R: ContainerStore + ?Sized>(rt: &mut R, ary: Value) -> Value {
    rt.array_dup(ary)
}

/// A sequence of `len` nils, filled in with [`rary_aset`].
pub fn rary_new<R: ContainerStore + ?Sized>(rt: &mut R, len: usize) -> Value {
    rt.array_new(&vec![Value::NIL; len])
}

pub fn rary_aset<R: ContainerStore + ?Sized>(
    rt: &mut R,
    ary: Value,
    index: usize,
    value: Value,
) -> Result<(), RuntimeError> {
    rt.array_store(ary, index as i64, value)
}

pub fn rhash_new<R: ContainerStore + ?Sized>(rt: &mut R) -> Value {
    rt.hash_new()
}

pub fn rhash_store<R: ContainerStore + ?Sized>(
    rt: &mut R,
    hash: Value,
    key: Value,
    value: Value,
) -> Result<(), RuntimeError> {
    rt.hash_store(hash, key, value)
}

/// `when *splat`: whether any element `e` of `splat.to_a` has
/// `e === compared_to`.
pub fn when_splat<R: ContainerStore + Coercion + Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    overridden: bool,
    compared_to: Value,
    splat: Value,
) -> Result<Value, RuntimeError> {
    let ary = to_a(rt, splat)?;
    // the length is re-read since `===` may mutate the sequence
    let mut i = 0;
    while i < rt.array_len(ary) {
        let element = rt.array_entry(ary, i as i64);
        if fast_eqq(rt, cache, element, compared_to, overridden)?.is_truthy() {
            return Ok(Value::TRUE);
        }
        i += 1;
    }
    Ok(Value::FALSE)
}
