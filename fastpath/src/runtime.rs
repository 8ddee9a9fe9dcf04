//! Contracts the kernel consumes from the rest of the VM.
//!
//! Each subsystem the fast paths lean on is one trait. Kernel functions are
//! generic over the smallest set they need, and [`Runtime`] bundles all of
//! them so the ABI layer can hold a single `&mut dyn Runtime`.

use std::ffi::{c_char, c_void};
use std::ptr::NonNull;

use log::trace;

use crate::{ClassRef, Interner, Operator, RuntimeError, SendCache, Symbol, Value};

/// Classes the container fast paths compare receivers against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinClasses {
    pub array: ClassRef,
    pub hash: ClassRef,
    pub string: ClassRef,
    pub pointer: ClassRef,
}

/// Storage kind of a value, independent of its exact class. A subclass of
/// the builtin array still reports [`BuiltinType::Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    Special,
    Object,
    Array,
    Hash,
    String,
    Symbol,
    Other,
}

/// Method visibility handed to [`ScopeResolver::set_current_scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Visibility {
    Public = 0,
    Private = 1,
    Protected = 2,
    ModuleFunction = 3,
}

impl Visibility {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Public),
            1 => Some(Self::Private),
            2 => Some(Self::Protected),
            3 => Some(Self::ModuleFunction),
            _ => None,
        }
    }
}

/// What a map answers for a missing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashDefault {
    None,
    Value(Value),
    /// Invoked with `(map, key)`.
    Callable(Value),
}

/// Which conversion protocol a sequence coercion uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMethod {
    /// Explicit conversion (`to_a`), used by splats and concatenation.
    ToA,
    /// Implicit conversion (`to_ary`), used by multiple assignment.
    ToAry,
}

impl ConversionMethod {
    pub fn selector(self) -> Symbol {
        match self {
            Self::ToA => crate::selector::TO_A,
            Self::ToAry => crate::selector::TO_ARY,
        }
    }
}

/// Part of the last regex match a special variable reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchComponent {
    Whole,
    Pre,
    Post,
    LastGroup,
    Group(i32),
}

impl MatchComponent {
    /// `code` is a signed C `char`: bytes above 127 name negative groups.
    pub fn from_code(code: i8) -> Self {
        match code as u8 {
            b'&' => Self::Whole,
            b'`' => Self::Pre,
            b'\'' => Self::Post,
            b'+' => Self::LastGroup,
            _ => Self::Group(i32::from(code)),
        }
    }
}

// ── Collaborators ──────────────────────────────────────────────────

pub trait ObjectModel {
    fn builtins(&self) -> &BuiltinClasses;
    fn interner(&self) -> &Interner;
    /// Runtime class of any value, special constants included.
    fn class_of(&self, value: Value) -> ClassRef;
    fn is_kind_of(&self, value: Value, class: ClassRef) -> bool;
    fn builtin_type(&self, value: Value) -> BuiltinType;
    /// The interned name behind a symbol value.
    fn symbol_id(&self, value: Value) -> Option<Symbol>;
    fn symbol_value(&mut self, symbol: Symbol) -> Value;
}

/// Class-layout subsystem.
///
/// When `resolve_slot` returns a slot for an object, every instance of that
/// object's class must be laid out as an [`crate::RObject`].
pub trait SlotLayout {
    fn resolve_slot(&mut self, object: Value, name: Symbol, create: bool) -> Option<u32>;
    fn generic_ivar_get(&mut self, object: Value, name: Symbol) -> Value;
    fn generic_ivar_set(
        &mut self,
        object: Value,
        name: Symbol,
        value: Value,
    ) -> Result<(), RuntimeError>;
}

pub trait WriteBarrier {
    /// Store `value` into the heap word `slot`.
    fn record_reference(&mut self, slot: &mut Value, value: Value);
}

pub trait ScopeResolver {
    /// Innermost class body currently being executed.
    fn current_lexical_class(&self) -> Option<ClassRef>;
    fn set_current_scope(&mut self, module: ClassRef, visibility: Visibility);
}

pub trait VariableStore {
    fn class_var_get(
        &mut self,
        class: ClassRef,
        id: Symbol,
        check: bool,
    ) -> Result<Value, RuntimeError>;
    fn class_var_set(
        &mut self,
        class: ClassRef,
        id: Symbol,
        value: Value,
    ) -> Result<(), RuntimeError>;
    fn lookup_constant(
        &mut self,
        outer: ClassRef,
        path: Symbol,
        lexical: bool,
    ) -> Result<Value, RuntimeError>;
    fn set_constant(
        &mut self,
        outer: ClassRef,
        id: Symbol,
        value: Value,
    ) -> Result<(), RuntimeError>;
}

pub trait ContainerStore {
    fn array_new(&mut self, items: &[Value]) -> Value;
    fn array_len(&self, array: Value) -> usize;
    /// Negative indices count from the end; out of range yields nil.
    fn array_entry(&self, array: Value, index: i64) -> Value;
    /// Stores past the end grow the array with nils.
    fn array_store(&mut self, array: Value, index: i64, value: Value) -> Result<(), RuntimeError>;
    /// Fails if the array may not be mutated.
    fn array_modify(&mut self, array: Value) -> Result<(), RuntimeError>;
    fn array_push(&mut self, array: Value, value: Value);
    fn array_concat(&mut self, array: Value, other: Value) -> Result<(), RuntimeError>;
    fn array_subseq(&mut self, array: Value, start: usize, len: usize) -> Value;
    fn array_dup(&mut self, array: Value) -> Value;

    fn hash_new(&mut self) -> Value;
    fn hash_lookup(&mut self, hash: Value, key: Value) -> Result<Option<Value>, RuntimeError>;
    fn hash_default(&self, hash: Value) -> HashDefault;
    fn hash_store(&mut self, hash: Value, key: Value, value: Value) -> Result<(), RuntimeError>;

    fn string_new(&mut self, bytes: &[u8]) -> Value;
    fn string_len(&self, string: Value) -> usize;
    fn string_byte_at(&self, string: Value, index: usize) -> u8;
    fn string_concat(&mut self, string: Value, other: Value) -> Result<(), RuntimeError>;
}

/// The standard conversion protocols.
pub trait Coercion {
    fn convert_to_integer(&mut self, value: Value) -> Result<i64, RuntimeError>;
    fn convert_to_float(&mut self, value: Value) -> Result<f64, RuntimeError>;
    /// `Ok(None)` when the value does not respond to `method`.
    fn check_convert_array(
        &mut self,
        value: Value,
        method: ConversionMethod,
    ) -> Result<Option<Value>, RuntimeError>;
    /// Buffer of the value's string form, NUL-terminated and not copied.
    fn string_cstr(&mut self, value: Value) -> Result<*const c_char, RuntimeError>;
    fn bignum_from_i128(&mut self, n: i128) -> Value;
}

/// Foreign object bridge.
pub trait NativeBridge {
    fn value_from_handle(&mut self, handle: NonNull<c_void>) -> Value;
    fn handle_from_value(&mut self, value: Value) -> Result<*mut c_void, RuntimeError>;
    /// Wrap `value` in a pointer adapter for `pointee`.
    fn pointer_new(&mut self, pointee: &str, value: Value) -> Result<Value, RuntimeError>;
    /// Address behind a pointer value, checked against `type_sig`.
    fn pointer_data(&mut self, pointer: Value, type_sig: &str) -> Result<*mut c_void, RuntimeError>;
    fn boxed_is_type(&self, class: ClassRef, pointee: &str) -> bool;
}

pub trait MatchState {
    /// Last match of the current frame, nil if none.
    fn last_match(&self) -> Value;
    fn match_component(&mut self, backref: Value, component: MatchComponent) -> Value;
}

/// Generic message send.
pub trait Dispatcher {
    fn dispatch(
        &mut self,
        cache: &mut SendCache,
        receiver: Value,
        selector: Symbol,
        block: Option<Value>,
        args: &[Value],
    ) -> Result<Value, RuntimeError>;
}

/// Everything the kernel needs from its host.
pub trait Runtime:
    ObjectModel
    + SlotLayout
    + WriteBarrier
    + ScopeResolver
    + VariableStore
    + ContainerStore
    + Coercion
    + NativeBridge
    + MatchState
    + Dispatcher
{
}

impl<T> Runtime for T where
    T: ObjectModel
        + SlotLayout
        + WriteBarrier
        + ScopeResolver
        + VariableStore
        + ContainerStore
        + Coercion
        + NativeBridge
        + MatchState
        + Dispatcher
        + ?Sized
{
}

/// The single fallback every operator fast path ends in.
#[inline]
pub(crate) fn send_operator<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    op: Operator,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    debug_assert_eq!(args.len(), op.arity());
    trace!("dispatching `{}` to {receiver:?}", op.name());
    rt.dispatch(cache, receiver, op.symbol(), None, args)
}
