//! Instance-variable access through a per-site [`IvarCache`].

use log::trace;

use crate::header::{class_of_ref, header_of};
use crate::{IvarCache, IvarSlot, RObject, RuntimeError, SlotLayout, Symbol, Value, WriteBarrier};

/// The slot `cache` designates on `object`, if the class, slot bound and
/// slot name all still agree.
///
/// # Safety
///
/// `object` must be a special constant or a live heap object, and a
/// resolved cache must only name classes whose instances are [`RObject`]s.
#[inline(always)]
unsafe fn cached_slot<'a>(object: Value, name: Symbol, cache: &IvarCache) -> Option<&'a mut IvarSlot> {
    let IvarCache::Resolved { class, slot } = *cache else {
        return None;
    };
    if unsafe { class_of_ref(object) } != Some(class) {
        return None;
    }
    let robject = unsafe { &mut *object.as_ptr::<RObject>() };
    if slot >= robject.slot_count() {
        return None;
    }
    let entry = unsafe { robject.slot_mut(slot) };
    if entry.name == name { Some(entry) } else { None }
}

/// Resolve a virgin cache. Returns whether the cache is now resolved.
///
/// # Safety
///
/// `object` must be a special constant or a live heap object.
unsafe fn resolve<R: SlotLayout + ?Sized>(rt: &mut R, object: Value, name: Symbol, cache: &mut IvarCache) -> bool {
    if *cache != IvarCache::Virgin {
        return false;
    }
    let resolved = rt
        .resolve_slot(object, name, true)
        // SAFETY: `object` is live
        .and_then(|slot| unsafe { class_of_ref(object) }.map(|class| (class, slot)));
    match resolved {
        Some((class, slot)) => {
            trace!("ivar cache resolved: slot {slot} of {class:?}");
            *cache = IvarCache::Resolved { class, slot };
            true
        }
        None => {
            trace!("ivar cache uncacheable for {object:?}");
            *cache = IvarCache::Uncacheable;
            false
        }
    }
}

/// Read `name` from `object`. Unassigned variables read as nil.
///
/// # Safety
///
/// `object` must be a special constant or a live heap object of `rt`.
pub unsafe fn ivar_get<R: SlotLayout + ?Sized>(
    rt: &mut R,
    object: Value,
    name: Symbol,
    cache: &mut IvarCache,
) -> Value {
    // SAFETY: `object` is live and resolved caches only name slot layouts
    if let Some(slot) = unsafe { cached_slot(object, name, cache) } {
        return slot.value.get().undef_to_nil();
    }
    if unsafe { resolve(rt, object, name, cache) } {
        if let Some(slot) = unsafe { cached_slot(object, name, cache) } {
            return slot.value.get().undef_to_nil();
        }
    }
    rt.generic_ivar_get(object, name)
}

/// Write `name` on `object`.
///
/// A frozen object fails before the cache or the layout are touched.
///
/// # Safety
///
/// As for [`ivar_get`].
pub unsafe fn ivar_set<R: SlotLayout + WriteBarrier + ?Sized>(
    rt: &mut R,
    object: Value,
    name: Symbol,
    value: Value,
    cache: &mut IvarCache,
) -> Result<(), RuntimeError> {
    // SAFETY: `object` is live
    if unsafe { header_of(object) }.is_some_and(|header| header.is_frozen()) {
        return Err(RuntimeError::Frozen { what: "object" });
    }

    // SAFETY: as in `ivar_get`; the slot is re-read after resolution since
    // resolving may grow the table
    let slot = match unsafe { cached_slot(object, name, cache) } {
        Some(slot) => Some(slot),
        None if unsafe { resolve(rt, object, name, cache) } => unsafe { cached_slot(object, name, cache) },
        None => None,
    };

    match slot {
        Some(slot) => {
            slot.value.store(rt, value);
            Ok(())
        }
        None => rt.generic_ivar_set(object, name, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ClassLayout, Sandbox};

    fn get(sb: &mut Sandbox, object: Value, name: Symbol, cache: &mut IvarCache) -> Value {
        // SAFETY: sandbox values are live
        unsafe { ivar_get(sb, object, name, cache) }
    }

    fn set(
        sb: &mut Sandbox,
        object: Value,
        name: Symbol,
        value: Value,
        cache: &mut IvarCache,
    ) -> Result<(), RuntimeError> {
        // SAFETY: as above
        unsafe { ivar_set(sb, object, name, value, cache) }
    }

    #[test]
    fn first_access_resolves_then_hits() {
        let mut sb = Sandbox::default();
        let point = sb.define_class("Point", None, ClassLayout::Slots);
        let obj = sb.new_object(point);
        let x = sb.intern("@x");
        let mut cache = IvarCache::default();

        assert_eq!(get(&mut sb, obj, x, &mut cache), Value::NIL);
        assert!(matches!(cache, IvarCache::Resolved { slot: 0, .. }));

        set(&mut sb, obj, x, Value::from_i64(3), &mut cache).unwrap();
        let before = sb.stats();
        assert_eq!(get(&mut sb, obj, x, &mut cache), Value::from_i64(3));
        assert_eq!(sb.stats().slot_resolutions, before.slot_resolutions);
        assert_eq!(sb.stats().generic_ivar_gets, before.generic_ivar_gets);
    }

    #[test]
    fn stores_go_through_the_barrier() {
        let mut sb = Sandbox::default();
        let point = sb.define_class("Point", None, ClassLayout::Slots);
        let obj = sb.new_object(point);
        let x = sb.intern("@x");
        let mut cache = IvarCache::default();

        set(&mut sb, obj, x, Value::from_i64(1), &mut cache).unwrap();
        set(&mut sb, obj, x, Value::from_i64(2), &mut cache).unwrap();
        assert_eq!(sb.stats().barrier_stores, 2);
    }

    #[test]
    fn other_class_at_warm_site_is_not_stale() {
        let mut sb = Sandbox::default();
        let a = sb.define_class("A", None, ClassLayout::Slots);
        let b = sb.define_class("B", None, ClassLayout::Slots);
        let y = sb.intern("@y");
        let x = sb.intern("@x");

        // B stores @x in slot 1, A in slot 0
        let b_obj = sb.new_object(b);
        let mut setup = IvarCache::default();
        set(&mut sb, b_obj, y, Value::from_i64(-1), &mut setup).unwrap();
        let mut setup = IvarCache::default();
        set(&mut sb, b_obj, x, Value::from_i64(20), &mut setup).unwrap();

        let a_obj = sb.new_object(a);
        let mut setup = IvarCache::default();
        set(&mut sb, a_obj, x, Value::from_i64(10), &mut setup).unwrap();

        let mut site = IvarCache::default();
        assert_eq!(get(&mut sb, a_obj, x, &mut site), Value::from_i64(10));
        assert_eq!(get(&mut sb, b_obj, x, &mut site), Value::from_i64(20));
        assert_eq!(get(&mut sb, a_obj, x, &mut site), Value::from_i64(10));
    }

    #[test]
    fn older_instance_with_fewer_slots_at_warm_site() {
        let mut sb = Sandbox::default();
        let a = sb.define_class("A", None, ClassLayout::Slots);
        let x = sb.intern("@x");
        let y = sb.intern("@y");

        let first = sb.new_object(a);
        let mut setup = IvarCache::default();
        set(&mut sb, first, x, Value::from_i64(1), &mut setup).unwrap();
        // allocated while the layout only knows @x
        let second = sb.new_object(a);
        let mut site = IvarCache::default();
        set(&mut sb, first, y, Value::from_i64(2), &mut site).unwrap();
        assert!(matches!(site, IvarCache::Resolved { slot: 1, .. }));

        set(&mut sb, second, y, Value::from_i64(42), &mut site).unwrap();
        assert_eq!(get(&mut sb, second, y, &mut site), Value::from_i64(42));
        let mut fresh = IvarCache::default();
        assert_eq!(get(&mut sb, second, y, &mut fresh), Value::from_i64(42));
        assert_eq!(sb.generic_ivar_get(second, y), Value::from_i64(42));
        assert_eq!(get(&mut sb, first, y, &mut site), Value::from_i64(2));
    }

    #[test]
    fn slot_classes_only_hold_slot_objects() {
        let mut sb = Sandbox::default();
        let array = sb.classes().array;
        let list = sb.define_class("List", Some(array), ClassLayout::Slots);
        let x = sb.intern("@x");
        let words = [Value::from_raw(x.id() as u64), Value::from_i64(99)];

        assert!(matches!(
            sb.new_array_of_class(list, &words),
            Err(RuntimeError::TypeError { .. })
        ));
        let ary = sb.new_array(&words);
        assert!(matches!(sb.set_class(ary, list), Err(RuntimeError::TypeError { .. })));

        let obj = sb.new_object(list);
        let mut site = IvarCache::default();
        set(&mut sb, obj, x, Value::from_i64(1), &mut site).unwrap();
        assert_eq!(get(&mut sb, ary, x, &mut site), Value::NIL);
        assert_eq!(get(&mut sb, obj, x, &mut site), Value::from_i64(1));

        let bag = sb.define_class("Bag", Some(array), ClassLayout::Dynamic);
        assert!(sb.set_class(ary, bag).is_ok());
        assert_eq!(get(&mut sb, ary, x, &mut site), Value::NIL);
    }

    #[test]
    fn reclassified_object_misses() {
        let mut sb = Sandbox::default();
        let a = sb.define_class("A", None, ClassLayout::Slots);
        let b = sb.define_class("B", None, ClassLayout::Slots);
        let x = sb.intern("@x");
        let obj = sb.new_object(a);
        let mut site = IvarCache::default();
        set(&mut sb, obj, x, Value::from_i64(7), &mut site).unwrap();

        sb.set_class(obj, b).unwrap();
        let gets = sb.stats().generic_ivar_gets;
        assert_eq!(get(&mut sb, obj, x, &mut site), Value::from_i64(7));
        assert_eq!(sb.stats().generic_ivar_gets, gets + 1);
    }

    #[test]
    fn dynamic_objects_are_uncacheable() {
        let mut sb = Sandbox::default();
        let bag = sb.define_class("Bag", None, ClassLayout::Dynamic);
        let obj = sb.new_object(bag);
        let name = sb.intern("@name");
        let mut cache = IvarCache::default();

        set(&mut sb, obj, name, Value::TRUE, &mut cache).unwrap();
        assert_eq!(cache, IvarCache::Uncacheable);
        assert_eq!(get(&mut sb, obj, name, &mut cache), Value::TRUE);
        assert_eq!(sb.stats().slot_resolutions, 1);
    }

    #[test]
    fn frozen_object_rejects_writes_untouched() {
        let mut sb = Sandbox::default();
        let point = sb.define_class("Point", None, ClassLayout::Slots);
        let obj = sb.new_object(point);
        let x = sb.intern("@x");
        let mut warm = IvarCache::default();
        set(&mut sb, obj, x, Value::from_i64(1), &mut warm).unwrap();
        sb.freeze(obj);

        let mut virgin = IvarCache::default();
        for cache in [&mut warm, &mut virgin] {
            let before = *cache;
            let err = set(&mut sb, obj, x, Value::from_i64(2), cache).unwrap_err();
            assert_eq!(err, RuntimeError::Frozen { what: "object" });
            assert_eq!(*cache, before);
        }
        let mut read = IvarCache::default();
        assert_eq!(get(&mut sb, obj, x, &mut read), Value::from_i64(1));
        assert_eq!(sb.stats().barrier_stores, 1);
    }

    #[test]
    fn immediates_fall_back() {
        let mut sb = Sandbox::default();
        let x = sb.intern("@x");
        let mut cache = IvarCache::default();
        assert_eq!(get(&mut sb, Value::from_i64(5), x, &mut cache), Value::NIL);
        assert_eq!(cache, IvarCache::Uncacheable);
    }
}
