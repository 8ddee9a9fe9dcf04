use std::ffi::{c_char, c_void};
use std::ptr::NonNull;

use log::trace;

use super::heap::{Cell, ForeignBody, PointerBody, SymbolBody};
use super::{Sandbox, SandboxStats};
use crate::{
    BuiltinClasses, BuiltinType, ClassRef, Coercion, ContainerStore, ConversionMethod,
    HashDefault, Header, Interner, MatchComponent, MatchState, NativeBridge, ObjectModel,
    RuntimeError, ScopeResolver, SlotLayout, Symbol, Value, VariableStore, Visibility,
    WriteBarrier,
};

/// Barrier over the counters alone, for stores made while the heap is
/// borrowed.
struct StoreBarrier<'a>(&'a mut SandboxStats);

impl WriteBarrier for StoreBarrier<'_> {
    fn record_reference(&mut self, slot: &mut Value, value: Value) {
        self.0.barrier_stores += 1;
        *slot = value;
    }
}

impl Sandbox {
    fn name_of(&self, symbol: Symbol) -> String {
        self.interner
            .name(symbol)
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("#{}", symbol.id()))
    }

    /// Key equality of the sandbox maps.
    pub(crate) fn same_key(&self, a: Value, b: Value) -> bool {
        if a == b {
            return true;
        }
        if let (Some(a), Some(b)) = (self.heap.string(a), self.heap.string(b)) {
            return a.text() == b.text();
        }
        if let (Some(a), Some(b)) = (self.heap.bignum(a), self.heap.bignum(b)) {
            return a.value == b.value;
        }
        false
    }

    /// Slot of `name` in the class layout of a slot object.
    fn slot_index(&mut self, object: Value, name: Symbol, create: bool) -> Option<u32> {
        let class = self.heap.object(object)?.object.header.class();
        let layout = self.heap.class_mut(class)?.layout.as_mut()?;
        let index = match layout.iter().position(|&slot| slot == name) {
            Some(index) => index,
            None if create => {
                layout.push(name);
                layout.len() - 1
            }
            None => return None,
        };
        let names = layout.clone();
        let body = self.heap.object_mut(object)?;
        body.ensure_slots(&names);
        Some(index as u32)
    }

    fn text_of(&self, value: Value) -> Option<&[u8]> {
        self.heap.string(value).map(|body| body.text())
    }

    /// Array a user conversion method returned, nil as `None`.
    fn converted_array(&self, result: Value) -> Result<Option<Value>, RuntimeError> {
        if result.is_nil() {
            Ok(None)
        } else if self.heap.array(result).is_some() {
            Ok(Some(result))
        } else {
            Err(RuntimeError::TypeError {
                expected: "Array",
                got: result,
            })
        }
    }
}

impl ObjectModel for Sandbox {
    fn builtins(&self) -> &BuiltinClasses {
        &self.builtins
    }

    fn interner(&self) -> &Interner {
        &self.interner
    }

    fn class_of(&self, value: Value) -> ClassRef {
        let classes = &self.classes;
        match value {
            Value::TRUE => classes.true_class,
            Value::FALSE => classes.false_class,
            Value::NIL | Value::UNDEF => classes.nil,
            v if v.is_fixnum() => classes.integer,
            v if v.is_float() => classes.float,
            v => self
                .heap
                .header(v)
                .map_or(classes.object, Header::class),
        }
    }

    fn is_kind_of(&self, value: Value, class: ClassRef) -> bool {
        self.ancestors(self.class_of(value))
            .any(|ancestor| ancestor == class)
    }

    fn builtin_type(&self, value: Value) -> BuiltinType {
        if !value.is_ref() {
            return BuiltinType::Special;
        }
        match self.heap.get(value) {
            Some(Cell::Object(_) | Cell::Dynamic(_)) => BuiltinType::Object,
            Some(Cell::Array(_)) => BuiltinType::Array,
            Some(Cell::Hash(_)) => BuiltinType::Hash,
            Some(Cell::Str(_)) => BuiltinType::String,
            Some(Cell::Symbol(_)) => BuiltinType::Symbol,
            _ => BuiltinType::Other,
        }
    }

    fn symbol_id(&self, value: Value) -> Option<Symbol> {
        match self.heap.get(value) {
            Some(Cell::Symbol(body)) => Some(body.symbol),
            _ => None,
        }
    }

    fn symbol_value(&mut self, symbol: Symbol) -> Value {
        if let Some(&value) = self.symbols.get(&symbol) {
            return value;
        }
        let value = self.heap.insert(Cell::Symbol(Box::new(SymbolBody {
            header: Header::new(self.classes.symbol),
            symbol,
        })));
        self.symbols.insert(symbol, value);
        value
    }
}

impl SlotLayout for Sandbox {
    fn resolve_slot(&mut self, object: Value, name: Symbol, create: bool) -> Option<u32> {
        self.stats.slot_resolutions += 1;
        self.slot_index(object, name, create)
    }

    fn generic_ivar_get(&mut self, object: Value, name: Symbol) -> Value {
        self.stats.generic_ivar_gets += 1;
        let found = match self.heap.get(object) {
            Some(Cell::Object(body)) => body
                .slots
                .iter()
                .find(|slot| slot.name == name)
                .map(|slot| slot.value.get()),
            Some(Cell::Dynamic(body)) => body.ivars.get(&name).copied(),
            _ => self.generic_ivars.get(&(object, name)).copied(),
        };
        found.map_or(Value::NIL, Value::undef_to_nil)
    }

    fn generic_ivar_set(&mut self, object: Value, name: Symbol, value: Value) -> Result<(), RuntimeError> {
        if object.is_special_const() {
            return Err(RuntimeError::Frozen { what: "immediate" });
        }
        self.check_frozen(object, "object")?;
        if self.heap.object(object).is_some() {
            // Grow the class layout too, so later sites resolve the slot.
            self.slot_index(object, name, true);
            if let Some(body) = self.heap.object_mut(object) {
                body.slot_named(name)
                    .value
                    .store(&mut StoreBarrier(&mut self.stats), value);
            }
            return Ok(());
        }
        match self.heap.get_mut(object) {
            Some(Cell::Dynamic(body)) => {
                body.ivars.insert(name, value);
            }
            _ => {
                self.generic_ivars.insert((object, name), value);
            }
        }
        Ok(())
    }
}

impl WriteBarrier for Sandbox {
    fn record_reference(&mut self, slot: &mut Value, value: Value) {
        StoreBarrier(&mut self.stats).record_reference(slot, value);
    }
}

impl ScopeResolver for Sandbox {
    fn current_lexical_class(&self) -> Option<ClassRef> {
        self.open_classes.last().copied()
    }

    fn set_current_scope(&mut self, module: ClassRef, visibility: Visibility) {
        trace!("scope {module:?} now {visibility:?}");
        self.visibility.insert(module, visibility);
    }
}

impl VariableStore for Sandbox {
    fn class_var_get(&mut self, class: ClassRef, id: Symbol, check: bool) -> Result<Value, RuntimeError> {
        let found = self.ancestors(class).find_map(|ancestor| {
            self.heap
                .class(ancestor)
                .and_then(|body| body.class_vars.get(&id).copied())
        });
        match found {
            Some(value) => Ok(value),
            None if check => Err(RuntimeError::NameError {
                name: self.name_of(id),
            }),
            None => Ok(Value::NIL),
        }
    }

    fn class_var_set(&mut self, class: ClassRef, id: Symbol, value: Value) -> Result<(), RuntimeError> {
        let owner = self
            .ancestors(class)
            .find(|&ancestor| {
                self.heap
                    .class(ancestor)
                    .is_some_and(|body| body.class_vars.contains_key(&id))
            })
            .unwrap_or(class);
        self.check_frozen(owner.value(), "class")?;
        let body = self.heap.class_mut(owner).ok_or(RuntimeError::TypeError {
            expected: "Class",
            got: owner.value(),
        })?;
        body.class_vars.insert(id, value);
        Ok(())
    }

    fn lookup_constant(&mut self, outer: ClassRef, path: Symbol, lexical: bool) -> Result<Value, RuntimeError> {
        self.stats.constant_lookups += 1;
        let constant = |class: ClassRef| {
            self.heap
                .class(class)
                .and_then(|body| body.constants.get(&path).copied())
        };
        let mut found = self.ancestors(outer).find_map(constant);
        if found.is_none() && lexical {
            found = self.open_classes.iter().rev().find_map(|&class| constant(class));
        }
        found.ok_or_else(|| RuntimeError::NameError {
            name: self.name_of(path),
        })
    }

    fn set_constant(&mut self, outer: ClassRef, id: Symbol, value: Value) -> Result<(), RuntimeError> {
        let body = self.heap.class_mut(outer).ok_or(RuntimeError::TypeError {
            expected: "Class",
            got: outer.value(),
        })?;
        body.constants.insert(id, value);
        Ok(())
    }
}

impl ContainerStore for Sandbox {
    fn array_new(&mut self, items: &[Value]) -> Value {
        self.new_array(items)
    }

    fn array_len(&self, array: Value) -> usize {
        self.heap.array(array).map_or(0, |body| body.items.len())
    }

    fn array_entry(&self, array: Value, index: i64) -> Value {
        let Some(body) = self.heap.array(array) else {
            return Value::NIL;
        };
        let len = body.items.len() as i64;
        let index = if index < 0 { index + len } else { index };
        if (0..len).contains(&index) {
            body.items[index as usize]
        } else {
            Value::NIL
        }
    }

    fn array_store(&mut self, array: Value, index: i64, value: Value) -> Result<(), RuntimeError> {
        self.array_modify(array)?;
        let Some(body) = self.heap.array_mut(array) else {
            return Err(RuntimeError::TypeError {
                expected: "Array",
                got: array,
            });
        };
        let length = body.items.len();
        let resolved = if index < 0 { index + length as i64 } else { index };
        if resolved < 0 {
            return Err(RuntimeError::IndexError { index, length });
        }
        let resolved = resolved as usize;
        if resolved >= length {
            body.items.resize(resolved + 1, Value::NIL);
        }
        body.items[resolved] = value;
        Ok(())
    }

    fn array_modify(&mut self, array: Value) -> Result<(), RuntimeError> {
        self.check_frozen(array, "array")
    }

    fn array_push(&mut self, array: Value, value: Value) {
        if let Some(body) = self.heap.array_mut(array) {
            body.items.push(value);
        }
    }

    fn array_concat(&mut self, array: Value, other: Value) -> Result<(), RuntimeError> {
        self.array_modify(array)?;
        let more = self.array_items(other);
        match self.heap.array_mut(array) {
            Some(body) => {
                body.items.extend(more);
                Ok(())
            }
            None => Err(RuntimeError::TypeError {
                expected: "Array",
                got: array,
            }),
        }
    }

    fn array_subseq(&mut self, array: Value, start: usize, len: usize) -> Value {
        let items = self.array_items(array);
        let start = start.min(items.len());
        let end = start.saturating_add(len).min(items.len());
        self.new_array(&items[start..end])
    }

    fn array_dup(&mut self, array: Value) -> Value {
        let items = self.array_items(array);
        self.new_array(&items)
    }

    fn hash_new(&mut self) -> Value {
        self.new_hash()
    }

    fn hash_lookup(&mut self, hash: Value, key: Value) -> Result<Option<Value>, RuntimeError> {
        let body = self.heap.hash(hash).ok_or(RuntimeError::TypeError {
            expected: "Hash",
            got: hash,
        })?;
        Ok(body
            .entries
            .iter()
            .find(|&&(k, _)| self.same_key(k, key))
            .map(|&(_, v)| v))
    }

    fn hash_default(&self, hash: Value) -> HashDefault {
        self.heap
            .hash(hash)
            .map_or(HashDefault::None, |body| body.default)
    }

    fn hash_store(&mut self, hash: Value, key: Value, value: Value) -> Result<(), RuntimeError> {
        self.check_frozen(hash, "hash")?;
        let position = self.heap.hash(hash).and_then(|body| {
            body.entries
                .iter()
                .position(|&(k, _)| self.same_key(k, key))
        });
        let body = self.heap.hash_mut(hash).ok_or(RuntimeError::TypeError {
            expected: "Hash",
            got: hash,
        })?;
        match position {
            Some(i) => body.entries[i].1 = value,
            None => body.entries.push((key, value)),
        }
        Ok(())
    }

    fn string_new(&mut self, bytes: &[u8]) -> Value {
        self.new_string_from_bytes(bytes)
    }

    fn string_len(&self, string: Value) -> usize {
        self.text_of(string).map_or(0, <[u8]>::len)
    }

    fn string_byte_at(&self, string: Value, index: usize) -> u8 {
        self.text_of(string)
            .and_then(|text| text.get(index).copied())
            .unwrap_or(0)
    }

    fn string_concat(&mut self, string: Value, other: Value) -> Result<(), RuntimeError> {
        self.check_frozen(string, "string")?;
        let more = match (self.text_of(other), other.as_fixnum()) {
            (Some(text), _) => text.to_vec(),
            (None, Some(code)) => match u32::try_from(code).ok().and_then(char::from_u32) {
                Some(c) => c.to_string().into_bytes(),
                None => {
                    return Err(RuntimeError::RangeError {
                        message: format!("{code} out of char range"),
                    });
                }
            },
            (None, None) => {
                return Err(RuntimeError::TypeError {
                    expected: "String",
                    got: other,
                });
            }
        };
        match self.heap.string_mut(string) {
            Some(body) => {
                body.append(&more);
                Ok(())
            }
            None => Err(RuntimeError::TypeError {
                expected: "String",
                got: string,
            }),
        }
    }
}

fn out_of_range(what: impl core::fmt::Display) -> RuntimeError {
    RuntimeError::RangeError {
        message: format!("{what} out of range of integer"),
    }
}

impl Coercion for Sandbox {
    fn convert_to_integer(&mut self, value: Value) -> Result<i64, RuntimeError> {
        if let Some(n) = value.as_fixnum() {
            return Ok(n);
        }
        if let Some(f) = value.as_float() {
            let truncated = f.trunc();
            if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(out_of_range(f));
            }
            return Ok(truncated as i64);
        }
        if let Some(body) = self.heap.bignum(value) {
            return i64::try_from(body.value).map_err(|_| out_of_range(body.value));
        }
        if let Some(text) = self.text_of(value) {
            let text = String::from_utf8_lossy(text);
            return text.trim().parse().map_err(|_| RuntimeError::ArgumentError {
                message: format!("invalid value for Integer(): {text:?}"),
            });
        }
        Err(RuntimeError::TypeError {
            expected: "Integer",
            got: value,
        })
    }

    fn convert_to_float(&mut self, value: Value) -> Result<f64, RuntimeError> {
        if value.is_immediate() {
            // SAFETY: checked
            return Ok(unsafe { value.immediate_to_f64() });
        }
        if let Some(body) = self.heap.bignum(value) {
            return Ok(body.value as f64);
        }
        if let Some(text) = self.text_of(value) {
            let text = String::from_utf8_lossy(text);
            return text.trim().parse().map_err(|_| RuntimeError::ArgumentError {
                message: format!("invalid value for Float(): {text:?}"),
            });
        }
        Err(RuntimeError::TypeError {
            expected: "Float",
            got: value,
        })
    }

    fn check_convert_array(&mut self, value: Value, method: ConversionMethod) -> Result<Option<Value>, RuntimeError> {
        if self.heap.array(value).is_some() {
            return Ok(Some(value));
        }
        let class = self.class_of(value);
        if let Some(convert) = self.find_method(class, method.selector()) {
            let result = convert(self, value, &[])?;
            return self.converted_array(result);
        }
        if method != ConversionMethod::ToA {
            return Ok(None);
        }
        if value.is_nil() {
            return Ok(Some(self.new_array(&[])));
        }
        let pairs = match self.heap.hash(value) {
            Some(body) => body.entries.clone(),
            None => return Ok(None),
        };
        let pairs: Vec<Value> = pairs
            .into_iter()
            .map(|(k, v)| self.new_array(&[k, v]))
            .collect();
        Ok(Some(self.new_array(&pairs)))
    }

    fn string_cstr(&mut self, value: Value) -> Result<*const c_char, RuntimeError> {
        let Some(body) = self.heap.string(value) else {
            return Err(RuntimeError::TypeError {
                expected: "String",
                got: value,
            });
        };
        if body.text().contains(&0) {
            return Err(RuntimeError::ArgumentError {
                message: "string contains null byte".to_owned(),
            });
        }
        Ok(body.bytes.as_ptr().cast())
    }

    fn bignum_from_i128(&mut self, n: i128) -> Value {
        self.integer(n)
    }
}

impl Sandbox {
    fn pointer_cell(&mut self, pointee: &str, address: *mut c_void, target: Value, words: Vec<u64>) -> Value {
        self.heap.insert(Cell::Pointer(Box::new(PointerBody {
            header: Header::new(self.classes.pointer),
            pointee: pointee.to_owned(),
            address,
            _target: target,
            _words: words,
        })))
    }
}

impl NativeBridge for Sandbox {
    fn value_from_handle(&mut self, handle: NonNull<c_void>) -> Value {
        let address = handle.as_ptr() as usize;
        if let Some(&value) = self.handles.get(&address) {
            return value;
        }
        let candidate = Value::from_raw(address as u64);
        if candidate.is_ref() && self.heap.contains(candidate) {
            return candidate;
        }
        let value = self.heap.insert(Cell::Foreign(Box::new(ForeignBody {
            header: Header::new(self.classes.foreign),
            handle: address,
        })));
        self.handles.insert(address, value);
        value
    }

    fn handle_from_value(&mut self, value: Value) -> Result<*mut c_void, RuntimeError> {
        match self.heap.get(value) {
            Some(Cell::Foreign(body)) => Ok(body.handle as *mut c_void),
            Some(Cell::Pointer(body)) => Ok(body.address),
            Some(_) => Ok(value.as_ptr()),
            None => Err(RuntimeError::TypeError {
                expected: "object",
                got: value,
            }),
        }
    }

    fn pointer_new(&mut self, pointee: &str, value: Value) -> Result<Value, RuntimeError> {
        let mut words = Vec::new();
        let address: *mut c_void = match self.heap.get_mut(value) {
            Some(Cell::Boxed(body)) => body.words.as_mut_ptr().cast(),
            Some(Cell::Str(body)) => body.bytes.as_mut_ptr().cast(),
            Some(Cell::Array(body)) => {
                words = body
                    .items
                    .iter()
                    .map(|item| match item.as_fixnum() {
                        Some(n) => n as u64,
                        None => item.raw(),
                    })
                    .collect();
                // the buffer stays put when `words` moves into the cell
                words.as_mut_ptr().cast()
            }
            _ => {
                return Err(RuntimeError::TypeError {
                    expected: "pointer target",
                    got: value,
                });
            }
        };
        trace!("pointer to {pointee} over {value:?}");
        Ok(self.pointer_cell(pointee, address, value, words))
    }

    fn pointer_data(&mut self, pointer: Value, type_sig: &str) -> Result<*mut c_void, RuntimeError> {
        let Some(Cell::Pointer(body)) = self.heap.get(pointer) else {
            return Err(RuntimeError::TypeError {
                expected: "Pointer",
                got: pointer,
            });
        };
        let compatible = type_sig == "^v"
            || body.pointee == "v"
            || type_sig.strip_prefix('^') == Some(body.pointee.as_str());
        if compatible {
            Ok(body.address)
        } else {
            Err(RuntimeError::TypeError {
                expected: "pointer of matching type",
                got: pointer,
            })
        }
    }

    fn boxed_is_type(&self, class: ClassRef, pointee: &str) -> bool {
        self.heap
            .class(class)
            .and_then(|body| body.boxed.as_ref())
            .is_some_and(|boxed| boxed.signature == pointee)
    }
}

impl MatchState for Sandbox {
    fn last_match(&self) -> Value {
        self.last_match
    }

    fn match_component(&mut self, backref: Value, component: MatchComponent) -> Value {
        let Some(Cell::Match(body)) = self.heap.get(backref) else {
            return Value::NIL;
        };
        let count = body.groups.len() as i32;
        let span = match component {
            MatchComponent::Whole => body.groups.first().copied().flatten(),
            MatchComponent::Pre => body
                .groups
                .first()
                .copied()
                .flatten()
                .map(|(start, _)| (0, start)),
            MatchComponent::Post => body
                .groups
                .first()
                .copied()
                .flatten()
                .map(|(_, end)| (end, body.text.len())),
            MatchComponent::LastGroup => body.groups.iter().skip(1).rev().find_map(|group| *group),
            MatchComponent::Group(n) => {
                let index = if n < 0 { n + count } else { n };
                if (0..count).contains(&index) {
                    body.groups[index as usize]
                } else {
                    None
                }
            }
        };
        let Some((start, end)) = span else {
            return Value::NIL;
        };
        let Some(text) = body.text.get(start..end).map(<[u8]>::to_vec) else {
            return Value::NIL;
        };
        self.new_string_from_bytes(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ClassLayout;
    use crate::{Dispatcher, SendCache};

    #[test]
    fn string_keys_compare_by_content() {
        let mut sb = Sandbox::default();
        let hash = sb.new_hash();
        let a = sb.new_string("key");
        let b = sb.new_string("key");
        sb.hash_store(hash, a, Value::from_i64(1)).unwrap();
        sb.hash_store(hash, b, Value::from_i64(2)).unwrap();
        assert_eq!(sb.hash_lookup(hash, a), Ok(Some(Value::from_i64(2))));
        assert_eq!(sb.heap.hash(hash).map(|body| body.entries.len()), Some(1));
    }

    #[test]
    fn negative_store_before_start_fails() {
        let mut sb = Sandbox::default();
        let ary = sb.new_array(&[Value::NIL]);
        assert_eq!(
            sb.array_store(ary, -3, Value::TRUE),
            Err(RuntimeError::IndexError { index: -3, length: 1 })
        );
        sb.array_store(ary, -1, Value::TRUE).unwrap();
        assert_eq!(sb.array_items(ary), vec![Value::TRUE]);
    }

    #[test]
    fn user_conversions_must_return_arrays() {
        let mut sb = Sandbox::default();
        let range = sb.define_class("Range", None, ClassLayout::Slots);
        sb.define_method(range, "to_a", |sb, _, _| Ok(sb.new_array(&[Value::TRUE])));
        let bogus = sb.define_class("Bogus", None, ClassLayout::Slots);
        sb.define_method(bogus, "to_ary", |_, _, _| Ok(Value::from_i64(1)));

        let r = sb.new_object(range);
        let converted = sb.check_convert_array(r, ConversionMethod::ToA).unwrap();
        assert_eq!(converted.map(|ary| sb.array_items(ary)), Some(vec![Value::TRUE]));
        assert_eq!(sb.check_convert_array(r, ConversionMethod::ToAry), Ok(None));

        let b = sb.new_object(bogus);
        assert!(matches!(
            sb.check_convert_array(b, ConversionMethod::ToAry),
            Err(RuntimeError::TypeError { .. })
        ));
    }

    #[test]
    fn interior_nul_has_no_cstr() {
        let mut sb = Sandbox::default();
        let s = sb.new_string("a\0b");
        assert!(matches!(
            sb.string_cstr(s),
            Err(RuntimeError::ArgumentError { .. })
        ));
    }

    #[test]
    fn generic_ivars_on_other_cells() {
        let mut sb = Sandbox::default();
        let ary = sb.new_array(&[]);
        let tag = sb.intern("@tag");
        sb.generic_ivar_set(ary, tag, Value::TRUE).unwrap();
        assert_eq!(sb.generic_ivar_get(ary, tag), Value::TRUE);
        assert_eq!(
            sb.generic_ivar_set(Value::from_i64(1), tag, Value::TRUE),
            Err(RuntimeError::Frozen { what: "immediate" })
        );
    }

    #[test]
    fn generic_store_on_slot_object_grows_layout() {
        let mut sb = Sandbox::default();
        let point = sb.define_class("Point", None, ClassLayout::Slots);
        let obj = sb.new_object(point);
        let z = sb.intern("@z");
        sb.generic_ivar_set(obj, z, Value::from_i64(3)).unwrap();

        assert_eq!(sb.resolve_slot(obj, z, false), Some(0));
        assert_eq!(sb.generic_ivar_get(obj, z), Value::from_i64(3));
        assert_eq!(sb.stats().barrier_stores, 1);

        // a fresh instance is allocated with the grown layout
        let other = sb.new_object(point);
        assert_eq!(sb.generic_ivar_get(other, z), Value::NIL);
        assert_eq!(sb.resolve_slot(other, z, false), Some(0));
    }

    #[test]
    fn dispatcher_counts_into_cache() {
        let mut sb = Sandbox::default();
        let mut cache = SendCache::new();
        let plus = crate::Operator::Plus.symbol();
        let sum = sb.dispatch(&mut cache, Value::from_i64(1), plus, None, &[Value::from_i64(2)]);
        assert_eq!(sum, Ok(Value::from_i64(3)));
        assert_eq!(cache.words[0], 1);
        assert_eq!(sb.stats().dispatches, 1);
    }
}
