//! Fast paths a compiled dynamic-language VM calls from generated code.
//!
//! The kernel owns the hot half of every operation (tag checks, inline
//! caches, immediate arithmetic, exact-class container access) and hands
//! everything else to the host through the traits in [`runtime`].

mod cache;
mod error;
mod handle;
mod header;
mod interning;
mod object;
mod redefinition;
mod runtime;
mod selector;
mod value;

pub mod abi;
pub mod container;
pub mod glue;
pub mod ivar;
pub mod masgn;
pub mod native;
pub mod numeric;
pub mod sandbox;
pub mod scope;

pub use cache::{ConstCache, IvarCache, SendCache};
pub use error::RuntimeError;
pub use handle::{Class, ClassRef, Tagged};
pub use header::{Header, HeaderFlags, class_of_ref, header_of};
pub use interning::{Interner, NativeSelector, Symbol};
pub use object::{Field, IvarSlot, RObject};
pub use redefinition::RedefinitionTable;
pub use runtime::{
    BuiltinClasses, BuiltinType, Coercion, ContainerStore, ConversionMethod, Dispatcher,
    HashDefault, MatchComponent, MatchState, NativeBridge, ObjectModel, Runtime, ScopeResolver,
    SlotLayout, VariableStore, Visibility, WriteBarrier,
};
pub use selector::{CALL, Operator, TO_A, TO_ARY};
pub use value::{FIXNUM_MAX, FIXNUM_MIN, Value, ValueKind};
