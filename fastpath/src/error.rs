use core::fmt;

use crate::{Symbol, Value};

/// Errors surfaced by the kernel.
///
/// Only [`RuntimeError::Frozen`] is produced locally (by the cached
/// instance-variable store). Every other variant comes from a collaborator
/// and is passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Mutation of a frozen value.
    Frozen { what: &'static str },
    /// No method for `selector` on `receiver`.
    MessageNotUnderstood { receiver: Value, selector: Symbol },
    /// A value could not be converted to the requested type.
    TypeError { expected: &'static str, got: Value },
    /// A numeric value does not fit the requested range.
    RangeError { message: String },
    /// An index outside what the container accepts.
    IndexError { index: i64, length: usize },
    /// Malformed argument, such as an unparsable numeric string.
    ArgumentError { message: String },
    /// Missing constant or class variable.
    NameError { name: String },
    ZeroDivision,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frozen { what } => write!(f, "can't modify frozen {what}"),
            Self::MessageNotUnderstood { receiver, selector } => write!(
                f,
                "undefined method (symbol #{}) for {receiver:?}",
                selector.id()
            ),
            Self::TypeError { expected, got } => {
                write!(f, "can't convert {got:?} into {expected}")
            }
            Self::RangeError { message } => f.write_str(message),
            Self::IndexError { index, length } => {
                write!(f, "index {index} out of range (length {length})")
            }
            Self::ArgumentError { message } => f.write_str(message),
            Self::NameError { name } => write!(f, "uninitialized {name}"),
            Self::ZeroDivision => f.write_str("divided by 0"),
        }
    }
}

impl std::error::Error for RuntimeError {}
