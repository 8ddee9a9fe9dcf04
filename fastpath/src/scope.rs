//! Class variables and constants.
//!
//! Both resolve their owning scope the same way: with `dynamic_class` set,
//! the innermost open class body replaces the statically known one.

use log::trace;

use crate::{ClassRef, ConstCache, RuntimeError, ScopeResolver, Symbol, Value, VariableStore};

/// Flags of a constant reference site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct ConstLookup(pub u32);

impl ConstLookup {
    /// Search the lexical scope chain, not only `outer`'s ancestors.
    pub const LEXICAL: Self = Self(1 << 0);
    /// The innermost open class may replace `outer`.
    pub const DYNAMIC_CLASS: Self = Self(1 << 1);

    #[inline(always)]
    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }

    #[inline(always)]
    pub const fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }
}

#[inline(always)]
fn effective_scope<R: ScopeResolver + ?Sized>(rt: &R, class: ClassRef, dynamic_class: bool) -> ClassRef {
    if dynamic_class {
        if let Some(current) = rt.current_lexical_class() {
            return current;
        }
    }
    class
}

pub fn cvar_get<R: ScopeResolver + VariableStore + ?Sized>(
    rt: &mut R,
    class: ClassRef,
    id: Symbol,
    check: bool,
    dynamic_class: bool,
) -> Result<Value, RuntimeError> {
    let class = effective_scope(rt, class, dynamic_class);
    rt.class_var_get(class, id, check)
}

/// Returns `value`.
pub fn cvar_set<R: ScopeResolver + VariableStore + ?Sized>(
    rt: &mut R,
    class: ClassRef,
    id: Symbol,
    value: Value,
    dynamic_class: bool,
) -> Result<Value, RuntimeError> {
    let class = effective_scope(rt, class, dynamic_class);
    rt.class_var_set(class, id, value)?;
    Ok(value)
}

/// Resolve constant `path` seen from `outer`, memoized in `cache`.
///
/// The open class only overrides `outer` for lexical lookups. A cached
/// value is reused as long as the resolved scope is unchanged.
pub fn get_const<R: ScopeResolver + VariableStore + ?Sized>(
    rt: &mut R,
    outer: ClassRef,
    cache: &mut ConstCache,
    path: Symbol,
    flags: ConstLookup,
) -> Result<Value, RuntimeError> {
    let lexical = flags.contains(ConstLookup::LEXICAL);
    let outer = if flags.contains(ConstLookup::DYNAMIC_CLASS) && lexical {
        effective_scope(rt, outer, true)
    } else {
        outer
    };

    if let Some(value) = cache.lookup(outer) {
        return Ok(value);
    }
    let value = rt.lookup_constant(outer, path, lexical)?;
    trace!("constant cache filled for {outer:?}");
    cache.fill(outer, value);
    Ok(value)
}

pub fn set_const<R: ScopeResolver + VariableStore + ?Sized>(
    rt: &mut R,
    outer: ClassRef,
    id: Symbol,
    value: Value,
    dynamic_class: bool,
) -> Result<(), RuntimeError> {
    let outer = effective_scope(rt, outer, dynamic_class);
    rt.set_constant(outer, id, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ClassLayout, Sandbox};

    #[test]
    fn constant_cache_skips_second_lookup() {
        let mut sb = Sandbox::default();
        let object = sb.classes().object;
        let limit = sb.intern("LIMIT");
        let text = sb.new_string("ten");
        set_const(&mut sb, object, limit, text, false).unwrap();

        let mut cache = ConstCache::new();
        let first = get_const(&mut sb, object, &mut cache, limit, ConstLookup::LEXICAL).unwrap();
        let second = get_const(&mut sb, object, &mut cache, limit, ConstLookup::LEXICAL).unwrap();
        assert_eq!(first, text);
        assert_eq!(second, first);
        assert_eq!(sb.stats().constant_lookups, 1);
    }

    #[test]
    fn same_scope_redefinition_stays_cached() {
        let mut sb = Sandbox::default();
        let object = sb.classes().object;
        let answer = sb.intern("ANSWER");
        set_const(&mut sb, object, answer, Value::from_i64(41), false).unwrap();

        let mut cache = ConstCache::new();
        let flags = ConstLookup::LEXICAL;
        assert_eq!(get_const(&mut sb, object, &mut cache, answer, flags), Ok(Value::from_i64(41)));
        set_const(&mut sb, object, answer, Value::from_i64(42), false).unwrap();
        assert_eq!(get_const(&mut sb, object, &mut cache, answer, flags), Ok(Value::from_i64(41)));
    }

    #[test]
    fn scope_change_refills() {
        let mut sb = Sandbox::default();
        let object = sb.classes().object;
        let outer = sb.define_class("Outer", None, ClassLayout::Slots);
        let name = sb.intern("NAME");
        set_const(&mut sb, object, name, Value::from_i64(1), false).unwrap();
        set_const(&mut sb, outer, name, Value::from_i64(2), false).unwrap();

        let mut cache = ConstCache::new();
        let flags = ConstLookup::LEXICAL.with(ConstLookup::DYNAMIC_CLASS);
        assert_eq!(get_const(&mut sb, object, &mut cache, name, flags), Ok(Value::from_i64(1)));

        sb.open_class(outer);
        assert_eq!(get_const(&mut sb, object, &mut cache, name, flags), Ok(Value::from_i64(2)));
        sb.close_class();
        assert_eq!(get_const(&mut sb, object, &mut cache, name, flags), Ok(Value::from_i64(1)));
        assert_eq!(sb.stats().constant_lookups, 3);
    }

    #[test]
    fn open_class_ignored_without_lexical_flag() {
        let mut sb = Sandbox::default();
        let object = sb.classes().object;
        let outer = sb.define_class("Outer", None, ClassLayout::Slots);
        let name = sb.intern("NAME");
        set_const(&mut sb, object, name, Value::from_i64(1), false).unwrap();
        set_const(&mut sb, outer, name, Value::from_i64(2), false).unwrap();

        sb.open_class(outer);
        let mut cache = ConstCache::new();
        let value = get_const(&mut sb, object, &mut cache, name, ConstLookup::DYNAMIC_CLASS);
        assert_eq!(value, Ok(Value::from_i64(1)));
    }

    #[test]
    fn missing_constant_is_not_cached() {
        let mut sb = Sandbox::default();
        let object = sb.classes().object;
        let name = sb.intern("MISSING");
        let mut cache = ConstCache::new();
        assert!(matches!(
            get_const(&mut sb, object, &mut cache, name, ConstLookup::LEXICAL),
            Err(RuntimeError::NameError { .. })
        ));
        assert_eq!(cache, ConstCache::new());
    }

    #[test]
    fn class_variables_follow_open_class() {
        let mut sb = Sandbox::default();
        let object = sb.classes().object;
        let counter = sb.define_class("Counter", None, ClassLayout::Slots);
        let count = sb.intern("@@count");

        sb.open_class(counter);
        let stored = cvar_set(&mut sb, object, count, Value::from_i64(5), true).unwrap();
        assert_eq!(stored, Value::from_i64(5));
        sb.close_class();

        assert_eq!(cvar_get(&mut sb, counter, count, true, false), Ok(Value::from_i64(5)));
        assert_eq!(cvar_get(&mut sb, object, count, false, false), Ok(Value::NIL));
        assert!(matches!(
            cvar_get(&mut sb, object, count, true, false),
            Err(RuntimeError::NameError { .. })
        ));
    }
}
