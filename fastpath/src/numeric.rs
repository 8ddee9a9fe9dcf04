//! Arithmetic and comparison on numeric immediates.
//!
//! Every operator takes the fast path only when `overridden` is false and
//! both operands are immediates. Integer results that leave the immediate
//! range, division by integer zero and any other operand shapes go to
//! generic dispatch with the operands unchanged.

use crate::runtime::send_operator;
use crate::{Dispatcher, Operator, RuntimeError, SendCache, Value};

#[inline(always)]
fn both_immediate(left: Value, right: Value) -> bool {
    left.raw() & right.raw() & 1 == 1
}

#[inline(always)]
fn fixnums(left: Value, right: Value) -> Option<(i64, i64)> {
    Some((left.as_fixnum()?, right.as_fixnum()?))
}

/// # Safety
///
/// Both operands must be numeric immediates.
#[inline(always)]
unsafe fn floats(left: Value, right: Value) -> (f64, f64) {
    unsafe { (left.immediate_to_f64(), right.immediate_to_f64()) }
}

#[inline(always)]
fn fixable(n: Option<i64>) -> Option<Value> {
    n.and_then(Value::try_from_i64)
}

/// Floored integer division, `None` for a zero divisor.
#[inline(always)]
pub fn floor_div(x: i64, y: i64) -> Option<i64> {
    if y == 0 {
        return None;
    }
    let q = x.checked_div(y)?;
    if (x < 0) != (y < 0) && x % y != 0 { Some(q - 1) } else { Some(q) }
}

#[inline(always)]
fn arithmetic<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    op: Operator,
    left: Value,
    right: Value,
    overridden: bool,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    if !overridden && both_immediate(left, right) {
        match fixnums(left, right) {
            Some((x, y)) => {
                if let Some(result) = fixable(int(x, y)) {
                    return Ok(result);
                }
            }
            None => {
                // SAFETY: both immediate
                let (x, y) = unsafe { floats(left, right) };
                return Ok(Value::from_f64(float(x, y)));
            }
        }
    }
    send_operator(rt, cache, op, left, &[right])
}

#[inline(always)]
fn comparison<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    op: Operator,
    left: Value,
    right: Value,
    overridden: bool,
    int: fn(&i64, &i64) -> bool,
    float: fn(&f64, &f64) -> bool,
) -> Result<Value, RuntimeError> {
    if !overridden && both_immediate(left, right) {
        let result = match fixnums(left, right) {
            Some((x, y)) => int(&x, &y),
            None => {
                // SAFETY: both immediate
                let (x, y) = unsafe { floats(left, right) };
                float(&x, &y)
            }
        };
        return Ok(Value::from_bool(result));
    }
    send_operator(rt, cache, op, left, &[right])
}

/// `==`, `===` and `!=`. Besides numbers, a boolean on either side
/// compares by identity.
#[inline(always)]
fn equality<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    op: Operator,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    let negate = op == Operator::Neq;
    if !overridden {
        if both_immediate(left, right) {
            let equal = match fixnums(left, right) {
                Some((x, y)) => x == y,
                None => {
                    // SAFETY: both immediate
                    let (x, y) = unsafe { floats(left, right) };
                    x == y
                }
            };
            return Ok(Value::from_bool(equal != negate));
        }
        if left.is_bool() || right.is_bool() {
            return Ok(Value::from_bool((left == right) != negate));
        }
    }
    send_operator(rt, cache, op, left, &[right])
}

pub fn fast_plus<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    arithmetic(rt, cache, Operator::Plus, left, right, overridden, i64::checked_add, |x, y| x + y)
}

pub fn fast_minus<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    arithmetic(rt, cache, Operator::Minus, left, right, overridden, i64::checked_sub, |x, y| x - y)
}

pub fn fast_mult<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    arithmetic(rt, cache, Operator::Mult, left, right, overridden, i64::checked_mul, |x, y| x * y)
}

/// Floored division. Float division by zero yields an infinity or NaN.
pub fn fast_div<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    arithmetic(rt, cache, Operator::Div, left, right, overridden, floor_div, |x, y| x / y)
}

pub fn fast_lt<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    comparison(rt, cache, Operator::Lt, left, right, overridden, i64::lt, f64::lt)
}

pub fn fast_le<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    comparison(rt, cache, Operator::Le, left, right, overridden, i64::le, f64::le)
}

pub fn fast_gt<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    comparison(rt, cache, Operator::Gt, left, right, overridden, i64::gt, f64::gt)
}

pub fn fast_ge<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    comparison(rt, cache, Operator::Ge, left, right, overridden, i64::ge, f64::ge)
}

pub fn fast_eq<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    equality(rt, cache, Operator::Eq, left, right, overridden)
}

pub fn fast_eqq<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    equality(rt, cache, Operator::Eqq, left, right, overridden)
}

pub fn fast_neq<R: Dispatcher + ?Sized>(
    rt: &mut R,
    cache: &mut SendCache,
    left: Value,
    right: Value,
    overridden: bool,
) -> Result<Value, RuntimeError> {
    equality(rt, cache, Operator::Neq, left, right, overridden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::Sandbox;
    use crate::{FIXNUM_MAX, FIXNUM_MIN};

    fn int(n: i64) -> Value {
        Value::from_i64(n)
    }

    // ── arithmetic ─────────────────────────────────────────────────

    #[test]
    fn plus_matches_dispatch_inside_range() {
        let mut sb = Sandbox::default();
        let mut cache = SendCache::new();
        let samples = [0, 1, -1, 7, -300, 1 << 40, FIXNUM_MAX / 2, FIXNUM_MIN / 2];
        for a in samples {
            for b in samples {
                let fast = fast_plus(&mut sb, &mut cache, int(a), int(b), false).unwrap();
                let slow = fast_plus(&mut sb, &mut cache, int(a), int(b), true).unwrap();
                assert_eq!(fast, slow, "{a} + {b}");
            }
        }
        // only the forced calls dispatched
        assert_eq!(sb.stats().dispatches, (samples.len() * samples.len()) as u64);
    }

    #[test]
    fn plus_overflow_falls_through() {
        let mut sb = Sandbox::default();
        let mut cache = SendCache::new();
        let sum = fast_plus(&mut sb, &mut cache, int(FIXNUM_MAX), int(1), false).unwrap();
        assert_eq!(sb.stats().dispatches, 1);
        assert!(!sum.is_fixnum());
        assert_eq!(sb.integer_value(sum), Some(FIXNUM_MAX as i128 + 1));

        let diff = fast_minus(&mut sb, &mut cache, int(FIXNUM_MIN), int(1), false).unwrap();
        assert_eq!(sb.integer_value(diff), Some(FIXNUM_MIN as i128 - 1));
        assert_eq!(sb.stats().dispatches, 2);
    }

    #[test]
    fn mult_overflow_never_wraps() {
        let mut sb = Sandbox::default();
        let mut cache = SendCache::new();
        let big = 1_i64 << 40;
        let product = fast_mult(&mut sb, &mut cache, int(big), int(big), false).unwrap();
        assert_eq!(sb.integer_value(product), Some((big as i128) * (big as i128)));
        assert_eq!(sb.stats().dispatches, 1);

        assert_eq!(fast_mult(&mut sb, &mut cache, int(-6), int(7), false), Ok(int(-42)));
        assert_eq!(sb.stats().dispatches, 1);
    }

    #[test]
    fn div_floors() {
        let mut sb = Sandbox::default();
        let mut cache = SendCache::new();
        for (a, b, q) in [(7, 2, 3), (-7, 2, -4), (7, -2, -4), (-7, -2, 3), (6, -3, -2)] {
            assert_eq!(fast_div(&mut sb, &mut cache, int(a), int(b), false), Ok(int(q)), "{a} / {b}");
        }
        assert_eq!(sb.stats().dispatches, 0);
    }

    #[test]
    fn div_by_zero_dispatches() {
        let mut sb = Sandbox::default();
        let mut cache = SendCache::new();
        assert_eq!(
            fast_div(&mut sb, &mut cache, int(1), int(0), false),
            Err(RuntimeError::ZeroDivision)
        );
        assert_eq!(sb.stats().dispatches, 1);
    }

    #[test]
    fn div_min_by_minus_one_promotes() {
        let mut sb = Sandbox::default();
        let mut cache = SendCache::new();
        let q = fast_div(&mut sb, &mut cache, int(FIXNUM_MIN), int(-1), false).unwrap();
        assert_eq!(sb.integer_value(q), Some(-(FIXNUM_MIN as i128)));
        assert_eq!(sb.stats().dispatches, 1);
    }

    #[test]
    fn mixed_operands_compute_in_float() {
        let mut sb = Sandbox::default();
        let mut cache = SendCache::new();
        let sum = fast_plus(&mut sb, &mut cache, int(1), Value::from_f64(0.5), false).unwrap();
        assert_eq!(sum.as_float(), Some(1.5));
        let q = fast_div(&mut sb, &mut cache, Value::from_f64(1.0), int(0), false).unwrap();
        assert_eq!(q.as_float(), Some(f64::INFINITY));
        assert_eq!(sb.stats().dispatches, 0);
    }

    // ── comparisons ────────────────────────────────────────────────

    #[test]
    fn comparisons() {
        let mut sb = Sandbox::default();
        let mut c = SendCache::new();
        assert_eq!(fast_lt(&mut sb, &mut c, int(1), int(2), false), Ok(Value::TRUE));
        assert_eq!(fast_le(&mut sb, &mut c, int(2), int(2), false), Ok(Value::TRUE));
        assert_eq!(fast_gt(&mut sb, &mut c, int(1), Value::from_f64(0.5), false), Ok(Value::TRUE));
        assert_eq!(fast_ge(&mut sb, &mut c, Value::from_f64(-1.0), int(0), false), Ok(Value::FALSE));
        assert_eq!(sb.stats().dispatches, 0);
    }

    #[test]
    fn equality_on_booleans() {
        let mut sb = Sandbox::default();
        let mut c = SendCache::new();
        assert_eq!(fast_eq(&mut sb, &mut c, Value::TRUE, Value::TRUE, false), Ok(Value::TRUE));
        assert_eq!(fast_eq(&mut sb, &mut c, Value::TRUE, Value::FALSE, false), Ok(Value::FALSE));
        assert_eq!(fast_neq(&mut sb, &mut c, Value::FALSE, Value::NIL, false), Ok(Value::TRUE));
        assert_eq!(fast_eqq(&mut sb, &mut c, int(1), Value::TRUE, false), Ok(Value::FALSE));
        assert_eq!(fast_eq(&mut sb, &mut c, int(3), Value::from_f64(3.0), false), Ok(Value::TRUE));
        assert_eq!(sb.stats().dispatches, 0);
    }

    #[test]
    fn references_dispatch() {
        let mut sb = Sandbox::default();
        let mut c = SendCache::new();
        let a = sb.new_string("a");
        let b = sb.new_string("a");
        assert_eq!(fast_eq(&mut sb, &mut c, a, b, false), Ok(Value::TRUE));
        assert_eq!(fast_neq(&mut sb, &mut c, a, b, false), Ok(Value::FALSE));
        assert!(matches!(
            fast_lt(&mut sb, &mut c, a, int(1), false),
            Err(RuntimeError::MessageNotUnderstood { .. })
        ));
        assert_eq!(sb.stats().dispatches, 3);
    }

    #[test]
    fn overridden_operator_always_dispatches() {
        let mut sb = Sandbox::default();
        let mut c = SendCache::new();
        fast_lt(&mut sb, &mut c, int(1), int(2), true).unwrap();
        fast_eq(&mut sb, &mut c, Value::TRUE, Value::TRUE, true).unwrap();
        assert_eq!(sb.stats().dispatches, 2);
        assert_eq!(c.words[0], 2);
    }
}
