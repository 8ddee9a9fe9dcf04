//! `[]`, `[]=` and `<<` on the builtin containers.
//!
//! Receivers must be instances of exactly the builtin class: a subclass may
//! redefine any of these operators without touching the redefinition table.

use crate::header::class_of_ref;
use crate::runtime::send_operator;
use crate::selector::CALL;
use crate::{
    ContainerStore, Dispatcher, HashDefault, ObjectModel, Operator, RuntimeError, SendCache,
    Value,
};

/// Builtin container a receiver is an exact instance of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exact {
    Array,
    Hash,
    String,
}

/// # Safety
///
/// `receiver` must be a special constant or a live heap object.
#[inline(always)]
unsafe fn exact_builtin<R: ObjectModel + ?Sized>(rt: &R, receiver: Value) -> Option<Exact> {
    let class = unsafe { class_of_ref(receiver) }?;
    let builtins = rt.builtins();
    if class == builtins.array {
        Some(Exact::Array)
    } else if class == builtins.hash {
        Some(Exact::Hash)
    } else if class == builtins.string {
        Some(Exact::String)
    } else {
        None
    }
}

/// Lookup with the map's default for a missing key.
pub fn hash_fetch<R: ContainerStore + Dispatcher + ?Sized>(
    rt: &mut R,
    hash: Value,
    key: Value,
) -> Result<Value, RuntimeError> {
    if let Some(value) = rt.hash_lookup(hash, key)? {
        return Ok(value);
    }
    match rt.hash_default(hash) {
        HashDefault::None => Ok(Value::NIL),
        HashDefault::Value(value) => Ok(value),
        HashDefault::Callable(callable) => {
            let mut cache = SendCache::new();
            rt.dispatch(&mut cache, callable, CALL, None, &[hash, key])
        }
    }
}

/// # Safety
///
/// `receiver` must be a special constant or a live heap object of `rt`.
pub unsafe fn fast_aref<R: ObjectModel + ContainerStore + Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    receiver: Value,
    index: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    if !overridden {
        match unsafe { exact_builtin(rt, receiver) } {
            Some(Exact::Array) => {
                if let Some(i) = index.as_fixnum() {
                    return Ok(rt.array_entry(receiver, i));
                }
            }
            Some(Exact::Hash) => return hash_fetch(rt, receiver, index),
            _ => {}
        }
    }
    send_operator(rt, cache, Operator::Aref, receiver, &[index])
}

/// Returns the stored value.
///
/// # Safety
///
/// `receiver` must be a special constant or a live heap object of `rt`.
pub unsafe fn fast_aset<R: ObjectModel + ContainerStore + Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    receiver: Value,
    index: Value,
    value: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    if !overridden {
        match unsafe { exact_builtin(rt, receiver) } {
            Some(Exact::Array) => {
                if let Some(i) = index.as_fixnum() {
                    rt.array_store(receiver, i, value)?;
                    return Ok(value);
                }
            }
            Some(Exact::Hash) => {
                rt.hash_store(receiver, index, value)?;
                return Ok(value);
            }
            _ => {}
        }
    }
    send_operator(rt, cache, Operator::Aset, receiver, &[index, value])
}

/// Returns the receiver.
///
/// # Safety
///
/// `receiver` must be a special constant or a live heap object of `rt`.
pub unsafe fn fast_shift<R: ObjectModel + ContainerStore + Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    receiver: Value,
    value: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    if !overridden {
        match unsafe { exact_builtin(rt, receiver) } {
            Some(Exact::Array) => {
                rt.array_modify(receiver)?;
                rt.array_push(receiver, value);
                return Ok(receiver);
            }
            Some(Exact::String) => {
                rt.string_concat(receiver, value)?;
                return Ok(receiver);
            }
            _ => {}
        }
    }
    send_operator(rt, cache, Operator::LtLt, receiver, &[value])
}
