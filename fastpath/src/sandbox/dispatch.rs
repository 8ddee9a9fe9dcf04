use core::cmp::Ordering;

use log::trace;

use super::Sandbox;
use super::heap::Cell;
use crate::container::hash_fetch;
use crate::selector::{CALL, TO_A};
use crate::{
    Coercion, ContainerStore, ConversionMethod, Dispatcher, ObjectModel, Operator, RuntimeError,
    SendCache, Symbol, Value,
};

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn to_f64(self) -> f64 {
        match self {
            Self::Int(n) => n as f64,
            Self::Float(f) => f,
        }
    }
}

fn overflow(op: Operator) -> RuntimeError {
    RuntimeError::RangeError {
        message: format!("integer overflow in `{}`", op.name()),
    }
}

fn floor_div(x: i128, y: i128) -> Option<i128> {
    let q = x.checked_div(y)?;
    if (x < 0) != (y < 0) && x % y != 0 { Some(q - 1) } else { Some(q) }
}

fn index_of(value: Value) -> Result<i64, RuntimeError> {
    value.as_fixnum().ok_or(RuntimeError::TypeError {
        expected: "Integer",
        got: value,
    })
}

impl Dispatcher for Sandbox {
    fn dispatch(
        &mut self,
        cache: &mut SendCache,
        receiver: Value,
        selector: Symbol,
        _block: Option<Value>,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        self.stats.dispatches += 1;
        cache.words[0] = cache.words[0].wrapping_add(1);

        let class = self.class_of(receiver);
        if let Some(method) = self.find_method(class, selector) {
            trace!("user method #{} on {class:?}", selector.id());
            return method(self, receiver, args);
        }
        self.builtin_send(receiver, selector, args)
    }
}

impl Sandbox {
    fn number(&self, value: Value) -> Option<Number> {
        if let Some(n) = value.as_fixnum() {
            return Some(Number::Int(n as i128));
        }
        if let Some(f) = value.as_float() {
            return Some(Number::Float(f));
        }
        self.heap.bignum(value).map(|body| Number::Int(body.value))
    }

    /// Structural equality of the builtin types, identity otherwise.
    pub(crate) fn values_equal(&self, a: Value, b: Value) -> bool {
        match (self.number(a), self.number(b)) {
            (Some(Number::Int(x)), Some(Number::Int(y))) => return x == y,
            (Some(x), Some(y)) => return x.to_f64() == y.to_f64(),
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }
        if a == b {
            return true;
        }
        if let (Some(x), Some(y)) = (self.heap.string(a), self.heap.string(b)) {
            return x.text() == y.text();
        }
        if let (Some(x), Some(y)) = (self.heap.array(a), self.heap.array(b)) {
            return x.items.len() == y.items.len()
                && x.items
                    .iter()
                    .zip(&y.items)
                    .all(|(&p, &q)| self.values_equal(p, q));
        }
        false
    }

    fn builtin_send(&mut self, receiver: Value, selector: Symbol, args: &[Value]) -> Result<Value, RuntimeError> {
        let not_understood = RuntimeError::MessageNotUnderstood { receiver, selector };
        if selector == CALL {
            let body = match self.heap.get(receiver) {
                Some(Cell::Proc(body)) => body.body,
                _ => return Err(not_understood),
            };
            return body(self, args);
        }
        if selector == TO_A {
            return self
                .check_convert_array(receiver, ConversionMethod::ToA)?
                .ok_or(not_understood);
        }

        let Some(op) = Operator::from_symbol(selector) else {
            return Err(not_understood);
        };
        if args.len() != op.arity() {
            return Err(RuntimeError::ArgumentError {
                message: format!(
                    "wrong number of arguments (given {}, expected {})",
                    args.len(),
                    op.arity()
                ),
            });
        }
        let arg = args[0];
        match op {
            Operator::Eq => Ok(Value::from_bool(self.values_equal(receiver, arg))),
            Operator::Neq => Ok(Value::from_bool(!self.values_equal(receiver, arg))),
            Operator::Eqq => {
                if self.heap.class_body(receiver).is_some() {
                    let class = crate::Tagged::from_value(receiver);
                    Ok(Value::from_bool(self.is_kind_of(arg, class)))
                } else {
                    Ok(Value::from_bool(self.values_equal(receiver, arg)))
                }
            }
            Operator::Plus if self.heap.string(receiver).is_some() => {
                let mut text = self.string_text_bytes(receiver);
                match self.heap.string(arg) {
                    Some(more) => text.extend_from_slice(more.text()),
                    None => {
                        return Err(RuntimeError::TypeError {
                            expected: "String",
                            got: arg,
                        });
                    }
                }
                Ok(self.new_string_from_bytes(&text))
            }
            Operator::Plus
            | Operator::Minus
            | Operator::Mult
            | Operator::Div
            | Operator::Lt
            | Operator::Le
            | Operator::Gt
            | Operator::Ge => match self.number(receiver) {
                Some(left) => self.numeric_send(op, left, arg),
                None => Err(not_understood),
            },
            Operator::Aref => self.builtin_aref(receiver, arg).map(|value| value.unwrap_or(Value::NIL)),
            Operator::Aset => {
                let value = args[1];
                if self.heap.array(receiver).is_some() {
                    self.array_store(receiver, index_of(arg)?, value)?;
                } else if self.heap.hash(receiver).is_some() {
                    self.hash_store(receiver, arg, value)?;
                } else {
                    return Err(not_understood);
                }
                Ok(value)
            }
            Operator::LtLt => {
                if self.heap.array(receiver).is_some() {
                    self.array_modify(receiver)?;
                    self.array_push(receiver, arg);
                    Ok(receiver)
                } else if self.heap.string(receiver).is_some() {
                    self.string_concat(receiver, arg)?;
                    Ok(receiver)
                } else if let Some(Number::Int(n)) = self.number(receiver) {
                    self.shift_left(n, arg)
                } else {
                    Err(not_understood)
                }
            }
        }
    }

    fn string_text_bytes(&self, value: Value) -> Vec<u8> {
        self.heap
            .string(value)
            .map(|body| body.text().to_vec())
            .unwrap_or_default()
    }

    fn numeric_send(&mut self, op: Operator, left: Number, arg: Value) -> Result<Value, RuntimeError> {
        let right = self.number(arg).ok_or(RuntimeError::TypeError {
            expected: "Numeric",
            got: arg,
        })?;

        let ordering = match (left, right) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            (x, y) => x.to_f64().partial_cmp(&y.to_f64()),
        };
        let compare = |accept: fn(Ordering) -> bool| Ok(Value::from_bool(ordering.is_some_and(accept)));
        match op {
            Operator::Lt => return compare(Ordering::is_lt),
            Operator::Le => return compare(Ordering::is_le),
            Operator::Gt => return compare(Ordering::is_gt),
            Operator::Ge => return compare(Ordering::is_ge),
            _ => {}
        }

        match (left, right) {
            (Number::Int(x), Number::Int(y)) => {
                let result = match op {
                    Operator::Plus => x.checked_add(y),
                    Operator::Minus => x.checked_sub(y),
                    Operator::Mult => x.checked_mul(y),
                    Operator::Div if y == 0 => return Err(RuntimeError::ZeroDivision),
                    Operator::Div => floor_div(x, y),
                    _ => None,
                };
                let n = result.ok_or_else(|| overflow(op))?;
                Ok(self.integer(n))
            }
            (x, y) => {
                let (x, y) = (x.to_f64(), y.to_f64());
                let result = match op {
                    Operator::Plus => x + y,
                    Operator::Minus => x - y,
                    Operator::Mult => x * y,
                    _ => x / y,
                };
                Ok(Value::from_f64(result))
            }
        }
    }

    /// `None` for a missing element.
    fn builtin_aref(&mut self, receiver: Value, arg: Value) -> Result<Option<Value>, RuntimeError> {
        if self.heap.array(receiver).is_some() {
            return Ok(Some(self.array_entry(receiver, index_of(arg)?)));
        }
        if self.heap.hash(receiver).is_some() {
            return hash_fetch(self, receiver, arg).map(Some);
        }
        if self.heap.string(receiver).is_some() {
            let index = index_of(arg)?;
            let text = self.string_text_bytes(receiver);
            let len = text.len() as i64;
            let index = if index < 0 { index + len } else { index };
            if !(0..len).contains(&index) {
                return Ok(None);
            }
            let byte = text[index as usize];
            return Ok(Some(self.new_string_from_bytes(&[byte])));
        }
        Err(RuntimeError::MessageNotUnderstood {
            receiver,
            selector: Operator::Aref.symbol(),
        })
    }

    fn shift_left(&mut self, n: i128, arg: Value) -> Result<Value, RuntimeError> {
        let shift = index_of(arg)?;
        let result = if shift >= 0 {
            u32::try_from(shift)
                .ok()
                .and_then(|s| n.checked_shl(s))
                .filter(|&r| r >> shift == n)
        } else {
            Some(n >> shift.unsigned_abs().min(127))
        };
        let result = result.ok_or_else(|| overflow(Operator::LtLt))?;
        Ok(self.integer(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ClassLayout;

    fn send(sb: &mut Sandbox, receiver: Value, op: Operator, args: &[Value]) -> Result<Value, RuntimeError> {
        let mut cache = SendCache::new();
        sb.dispatch(&mut cache, receiver, op.symbol(), None, args)
    }

    #[test]
    fn user_methods_win_and_inherit() {
        let mut sb = Sandbox::default();
        let base = sb.define_class("Base", None, ClassLayout::Slots);
        let derived = sb.define_class("Derived", Some(base), ClassLayout::Slots);
        sb.define_method(base, "[]", |_, _, args| Ok(args[0]));

        let obj = sb.new_object(derived);
        assert_eq!(send(&mut sb, obj, Operator::Aref, &[Value::TRUE]), Ok(Value::TRUE));
        assert!(matches!(
            send(&mut sb, obj, Operator::Plus, &[Value::TRUE]),
            Err(RuntimeError::MessageNotUnderstood { .. })
        ));
    }

    #[test]
    fn integers_promote_and_floor() {
        let mut sb = Sandbox::default();
        let big = send(&mut sb, Value::from_i64(1 << 60), Operator::Mult, &[Value::from_i64(16)]).unwrap();
        assert_eq!(sb.integer_value(big), Some(1 << 64));
        let back = send(&mut sb, big, Operator::Div, &[Value::from_i64(-16)]).unwrap();
        assert_eq!(back, Value::from_i64(-(1 << 60)));

        let shifted = send(&mut sb, Value::from_i64(1), Operator::LtLt, &[Value::from_i64(70)]).unwrap();
        assert_eq!(sb.integer_value(shifted), Some(1 << 70));
    }

    #[test]
    fn numeric_errors() {
        let mut sb = Sandbox::default();
        let huge = sb.integer(i128::MAX);
        assert!(matches!(
            send(&mut sb, huge, Operator::Plus, &[Value::from_i64(1)]),
            Err(RuntimeError::RangeError { .. })
        ));
        assert!(matches!(
            send(&mut sb, Value::from_i64(1), Operator::Plus, &[Value::NIL]),
            Err(RuntimeError::TypeError { .. })
        ));
    }

    #[test]
    fn case_equality_on_classes() {
        let mut sb = Sandbox::default();
        let integer = sb.classes().integer.value();
        assert_eq!(send(&mut sb, integer, Operator::Eqq, &[Value::from_i64(3)]), Ok(Value::TRUE));
        assert_eq!(send(&mut sb, integer, Operator::Eqq, &[Value::NIL]), Ok(Value::FALSE));
    }

    #[test]
    fn structural_equality() {
        let mut sb = Sandbox::default();
        let a = sb.new_string("x");
        let b = sb.new_string("x");
        let left = sb.new_array(&[a, Value::from_i64(1)]);
        let right = sb.new_array(&[b, Value::from_f64(1.0)]);
        assert!(sb.values_equal(left, right));
        assert!(!sb.values_equal(Value::from_i64(1), Value::TRUE));
    }

    #[test]
    fn strings_index_and_join() {
        let mut sb = Sandbox::default();
        let s = sb.new_string("abc");
        let t = sb.new_string("de");
        let joined = send(&mut sb, s, Operator::Plus, &[t]).unwrap();
        assert_eq!(sb.string_text(joined).as_deref(), Some("abcde"));
        let last = send(&mut sb, s, Operator::Aref, &[Value::from_i64(-1)]).unwrap();
        assert_eq!(sb.string_text(last).as_deref(), Some("c"));
        assert_eq!(send(&mut sb, s, Operator::Aref, &[Value::from_i64(5)]), Ok(Value::NIL));
    }

    #[test]
    fn procs_answer_call() {
        let mut sb = Sandbox::default();
        let double = sb.new_proc(|sb, args| {
            let n = sb.integer_value(args[0]).unwrap_or_default();
            Ok(sb.integer(n * 2))
        });
        let mut cache = SendCache::new();
        let result = sb.dispatch(&mut cache, double, CALL, None, &[Value::from_i64(21)]);
        assert_eq!(result, Ok(Value::from_i64(42)));
    }
}
