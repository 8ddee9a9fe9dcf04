//! A self-contained host for the kernel.
//!
//! `Sandbox` implements every collaborator trait over a small boxed heap:
//! classes with slot layouts or dynamic ivars, arrays, maps, strings,
//! symbols, bignums, pointers, boxed structs, procs and regex matches. It
//! counts the calls the kernel makes into it so tests and benchmarks can
//! tell a fast path from a fallback.

mod dispatch;
mod heap;
mod host;

use std::collections::HashMap;

use log::debug;

use crate::{
    BuiltinClasses, ClassRef, HashDefault, Header, HeaderFlags, Interner, Operator,
    RedefinitionTable, RuntimeError, Symbol, Tagged, Value, Visibility,
};

pub use heap::{MethodFn, ProcFn};
use heap::{
    ArrayBody, BoxedBody, BoxedType, Cell, DynamicBody, HashBody, Heap, MatchBody, ObjectBody,
    ProcBody, StringBody,
};

const DEFAULT_ARENA_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
pub struct SandboxCreateInfo {
    /// Objects preallocated for, default 1024.
    pub arena_capacity: Option<usize>,
    /// Operators treated as redefined from the start.
    pub redefinitions: Vec<Operator>,
}

/// How instances of a class store their instance variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassLayout {
    Slots,
    Dynamic,
}

/// Calls the kernel made into the sandbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxStats {
    pub dispatches: u64,
    pub constant_lookups: u64,
    pub slot_resolutions: u64,
    pub barrier_stores: u64,
    pub generic_ivar_gets: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct SandboxClasses {
    pub class: ClassRef,
    pub object: ClassRef,
    pub integer: ClassRef,
    pub bignum: ClassRef,
    pub float: ClassRef,
    pub nil: ClassRef,
    pub true_class: ClassRef,
    pub false_class: ClassRef,
    pub array: ClassRef,
    pub hash: ClassRef,
    pub string: ClassRef,
    pub symbol: ClassRef,
    pub pointer: ClassRef,
    pub proc_class: ClassRef,
    pub match_data: ClassRef,
    pub foreign: ClassRef,
}

impl SandboxClasses {
    fn builtins(&self) -> BuiltinClasses {
        BuiltinClasses {
            array: self.array,
            hash: self.hash,
            string: self.string,
            pointer: self.pointer,
        }
    }

    /// Classes whose operators the fast paths stand in for.
    fn is_fast_pathed(&self, class: ClassRef) -> bool {
        [
            self.integer,
            self.bignum,
            self.float,
            self.true_class,
            self.false_class,
            self.array,
            self.hash,
            self.string,
        ]
        .contains(&class)
    }
}

pub struct Sandbox {
    heap: Heap,
    interner: Interner,
    classes: SandboxClasses,
    builtins: BuiltinClasses,
    methods: HashMap<(ClassRef, Symbol), MethodFn>,
    redefinitions: RedefinitionTable,
    symbols: HashMap<Symbol, Value>,
    handles: HashMap<usize, Value>,
    generic_ivars: HashMap<(Value, Symbol), Value>,
    open_classes: Vec<ClassRef>,
    visibility: HashMap<ClassRef, Visibility>,
    last_match: Value,
    stats: SandboxStats,
}

impl Sandbox {
    pub fn new(info: SandboxCreateInfo) -> Self {
        let mut heap = Heap::with_capacity(info.arena_capacity.unwrap_or(DEFAULT_ARENA_CAPACITY));

        // Class is its own class; everything else hangs off Object
        let placeholder: ClassRef = Tagged::from_value(Value::NIL);
        let class = heap.new_class(placeholder, "Class", None, Some(Vec::new()));
        if let Some(header) = heap.header_mut(class.value()) {
            header.set_class(class);
        }
        let object = heap.new_class(class, "Object", None, Some(Vec::new()));
        if let Some(body) = heap.class_mut(class) {
            body.superclass = Some(object);
        }
        let mut builtin = |name: &str, superclass: ClassRef| {
            heap.new_class(class, name, Some(superclass), None)
        };
        let integer = builtin("Integer", object);
        let bignum = builtin("Bignum", integer);
        let classes = SandboxClasses {
            class,
            object,
            integer,
            bignum,
            float: builtin("Float", object),
            nil: builtin("NilClass", object),
            true_class: builtin("TrueClass", object),
            false_class: builtin("FalseClass", object),
            array: builtin("Array", object),
            hash: builtin("Hash", object),
            string: builtin("String", object),
            symbol: builtin("Symbol", object),
            pointer: builtin("Pointer", object),
            proc_class: builtin("Proc", object),
            match_data: builtin("MatchData", object),
            foreign: builtin("ForeignObject", object),
        };

        let mut new = Self {
            heap,
            interner: Interner::new(),
            builtins: classes.builtins(),
            classes,
            methods: HashMap::new(),
            redefinitions: RedefinitionTable::new(),
            symbols: HashMap::new(),
            handles: HashMap::new(),
            generic_ivars: HashMap::new(),
            open_classes: Vec::new(),
            visibility: HashMap::new(),
            last_match: Value::NIL,
            stats: SandboxStats::default(),
        };

        let all = [
            classes.class,
            classes.object,
            classes.integer,
            classes.bignum,
            classes.float,
            classes.nil,
            classes.true_class,
            classes.false_class,
            classes.array,
            classes.hash,
            classes.string,
            classes.symbol,
            classes.pointer,
            classes.proc_class,
            classes.match_data,
            classes.foreign,
        ];
        for class in all {
            new.register_constant(class);
        }
        for op in info.redefinitions {
            new.redefinitions.mark(op);
        }
        new
    }

    fn register_constant(&mut self, class: ClassRef) {
        let Some(name) = self.heap.class(class).map(|body| body.name.clone()) else {
            return;
        };
        let id = self.interner.intern(&name);
        let object = self.classes.object;
        if let Some(body) = self.heap.class_mut(object) {
            body.constants.insert(id, class.value());
        }
    }

    pub fn classes(&self) -> &SandboxClasses {
        &self.classes
    }

    pub fn stats(&self) -> SandboxStats {
        self.stats
    }

    pub fn redefinitions(&self) -> &RedefinitionTable {
        &self.redefinitions
    }

    pub fn intern(&self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    /// The symbol value for `name`.
    pub fn symbol(&mut self, name: &str) -> Value {
        let id = self.interner.intern(name);
        crate::ObjectModel::symbol_value(self, id)
    }

    // ── Classes ────────────────────────────────────────────────────

    /// Define a class under Object (or `superclass`) and bind its name.
    pub fn define_class(&mut self, name: &str, superclass: Option<ClassRef>, layout: ClassLayout) -> ClassRef {
        let superclass = superclass.unwrap_or(self.classes.object);
        let layout = match layout {
            ClassLayout::Slots => Some(Vec::new()),
            ClassLayout::Dynamic => None,
        };
        let class = self
            .heap
            .new_class(self.classes.class, name, Some(superclass), layout);
        self.register_constant(class);
        debug!("defined class {name}");
        class
    }

    /// A class whose instances are `size`-byte native structs of type
    /// `signature`.
    pub fn define_boxed(&mut self, name: &str, signature: &str, size: usize) -> ClassRef {
        let class = self.define_class(name, None, ClassLayout::Dynamic);
        if let Some(body) = self.heap.class_mut(class) {
            body.boxed = Some(BoxedType {
                signature: signature.to_owned(),
                size,
            });
        }
        class
    }

    /// Define `name` on `class`. Defining a fast-pathed operator on a
    /// builtin class marks it redefined.
    pub fn define_method(&mut self, class: ClassRef, name: &str, method: MethodFn) {
        let selector = self.interner.intern(name);
        self.methods.insert((class, selector), method);
        if self.classes.is_fast_pathed(class) {
            if let Some(op) = Operator::from_name(name) {
                self.redefinitions.mark(op);
            }
        }
    }

    pub fn overridden(&self, op: Operator) -> bool {
        self.redefinitions.is_overridden(op)
    }

    pub(crate) fn find_method(&self, class: ClassRef, selector: Symbol) -> Option<MethodFn> {
        self.ancestors(class)
            .find_map(|class| self.methods.get(&(class, selector)).copied())
    }

    pub(crate) fn ancestors(&self, class: ClassRef) -> impl Iterator<Item = ClassRef> + '_ {
        std::iter::successors(Some(class), |&class| {
            self.heap.class(class).and_then(|body| body.superclass)
        })
    }

    pub fn open_class(&mut self, class: ClassRef) {
        self.open_classes.push(class);
    }

    pub fn close_class(&mut self) {
        self.open_classes.pop();
    }

    pub fn visibility_of(&self, class: ClassRef) -> Option<Visibility> {
        self.visibility.get(&class).copied()
    }

    // ── Objects ────────────────────────────────────────────────────

    pub fn new_object(&mut self, class: ClassRef) -> Value {
        let layout = self.heap.class(class).and_then(|body| body.layout.clone());
        match layout {
            Some(names) => {
                let mut body = Box::new(ObjectBody {
                    object: crate::RObject::new(class),
                    slots: Vec::new(),
                });
                body.ensure_slots(&names);
                self.heap.insert(Cell::Object(body))
            }
            None => {
                let header = Header::new(class);
                header.add_flag(HeaderFlags::DYNAMIC_IVARS);
                self.heap.insert(Cell::Dynamic(Box::new(DynamicBody {
                    header,
                    ivars: HashMap::new(),
                })))
            }
        }
    }

    pub fn new_boxed(&mut self, class: ClassRef) -> Value {
        let size = self
            .heap
            .class(class)
            .and_then(|body| body.boxed.as_ref())
            .map_or(0, |boxed| boxed.size);
        self.heap.insert(Cell::Boxed(Box::new(BoxedBody {
            header: Header::new(class),
            words: vec![0; size.div_ceil(8)],
        })))
    }

    pub fn boxed_data(&mut self, value: Value) -> Option<*mut std::ffi::c_void> {
        self.heap
            .boxed_mut(value)
            .map(|body| body.words.as_mut_ptr().cast())
    }

    pub fn new_array(&mut self, items: &[Value]) -> Value {
        self.alloc_array(self.classes.array, items)
    }

    /// An array whose class is `class`, which must not lay out slots.
    pub fn new_array_of_class(&mut self, class: ClassRef, items: &[Value]) -> Result<Value, RuntimeError> {
        self.check_not_slotted(class)?;
        Ok(self.alloc_array(class, items))
    }

    fn alloc_array(&mut self, class: ClassRef, items: &[Value]) -> Value {
        self.heap.insert(Cell::Array(Box::new(ArrayBody {
            header: Header::new(class),
            items: items.to_vec(),
        })))
    }

    /// Instances of a class with a slot layout must be slot objects.
    fn check_not_slotted(&self, class: ClassRef) -> Result<(), RuntimeError> {
        match self.heap.class(class) {
            Some(body) if body.layout.is_some() => Err(RuntimeError::TypeError {
                expected: "class without a slot layout",
                got: class.value(),
            }),
            _ => Ok(()),
        }
    }

    /// Elements of an array, empty for anything else.
    pub fn array_items(&self, value: Value) -> Vec<Value> {
        self.heap
            .array(value)
            .map(|body| body.items.clone())
            .unwrap_or_default()
    }

    pub fn new_string(&mut self, text: &str) -> Value {
        self.new_string_from_bytes(text.as_bytes())
    }

    pub(crate) fn new_string_from_bytes(&mut self, text: &[u8]) -> Value {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text);
        bytes.push(0);
        self.heap.insert(Cell::Str(Box::new(StringBody {
            header: Header::new(self.classes.string),
            bytes,
        })))
    }

    pub fn string_text(&self, value: Value) -> Option<String> {
        self.heap
            .string(value)
            .map(|body| String::from_utf8_lossy(body.text()).into_owned())
    }

    pub fn new_hash(&mut self) -> Value {
        self.heap.insert(Cell::Hash(Box::new(HashBody {
            header: Header::new(self.classes.hash),
            entries: Vec::new(),
            default: HashDefault::None,
        })))
    }

    pub fn set_hash_default(&mut self, hash: Value, default: HashDefault) {
        if let Some(body) = self.heap.hash_mut(hash) {
            body.default = default;
        }
    }

    pub fn new_proc(&mut self, body: ProcFn) -> Value {
        self.heap.insert(Cell::Proc(Box::new(ProcBody {
            header: Header::new(self.classes.proc_class),
            body,
        })))
    }

    /// Integer behind a fixnum or bignum.
    pub fn integer_value(&self, value: Value) -> Option<i128> {
        match value.as_fixnum() {
            Some(n) => Some(n as i128),
            None => self.heap.bignum(value).map(|body| body.value),
        }
    }

    pub(crate) fn integer(&mut self, n: i128) -> Value {
        match i64::try_from(n).ok().and_then(Value::try_from_i64) {
            Some(value) => value,
            None => self.heap.insert(Cell::Bignum(Box::new(heap::BignumBody {
                header: Header::new(self.classes.bignum),
                value: n,
            }))),
        }
    }

    pub fn freeze(&mut self, value: Value) {
        if let Some(header) = self.heap.header(value) {
            header.freeze();
        }
    }

    pub(crate) fn is_frozen(&self, value: Value) -> bool {
        self.heap.header(value).is_some_and(Header::is_frozen)
    }

    pub(crate) fn check_frozen(&self, value: Value, what: &'static str) -> Result<(), RuntimeError> {
        if self.is_frozen(value) {
            Err(RuntimeError::Frozen { what })
        } else {
            Ok(())
        }
    }

    /// Reclassify a heap object. Only slot objects may move into a class
    /// with a slot layout.
    pub fn set_class(&mut self, value: Value, class: ClassRef) -> Result<(), RuntimeError> {
        if self.heap.object(value).is_none() {
            self.check_not_slotted(class)?;
        }
        if let Some(header) = self.heap.header_mut(value) {
            header.set_class(class);
        }
        Ok(())
    }

    /// Record `text` =~ a regex with the given group spans (group 0 is the
    /// whole match).
    pub fn set_last_match(&mut self, text: &str, groups: &[Option<(usize, usize)>]) {
        self.last_match = self.heap.insert(Cell::Match(Box::new(MatchBody {
            header: Header::new(self.classes.match_data),
            text: text.as_bytes().to_vec(),
            groups: groups.to_vec(),
        })));
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(SandboxCreateInfo::default())
    }
}

impl core::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sandbox")
            .field("objects", &self.heap.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectModel;

    #[test]
    fn bootstrap() {
        let sb = Sandbox::default();
        let classes = *sb.classes();
        assert_eq!(sb.class_of(classes.class.value()), classes.class);
        assert_eq!(sb.class_of(Value::from_i64(1)), classes.integer);
        assert_eq!(sb.class_of(Value::NIL), classes.nil);
        assert!(sb.is_kind_of(Value::from_f64(1.0), classes.object));
        assert!(!sb.is_kind_of(Value::TRUE, classes.integer));
    }

    #[test]
    fn builtin_redefinition_marks_operator() {
        let mut sb = Sandbox::default();
        let integer = sb.classes().integer;
        let widget = sb.define_class("Widget", None, ClassLayout::Slots);

        sb.define_method(widget, "+", |_, receiver, _| Ok(receiver));
        assert!(!sb.overridden(Operator::Plus));

        sb.define_method(integer, "+", |_, _, _| Ok(Value::from_i64(0)));
        assert!(sb.overridden(Operator::Plus));
        assert!(!sb.overridden(Operator::Minus));
    }

    #[test]
    fn create_info_marks_operators() {
        let sb = Sandbox::new(SandboxCreateInfo {
            arena_capacity: Some(16),
            redefinitions: vec![Operator::Aref],
        });
        assert!(sb.overridden(Operator::Aref));
        assert_eq!(sb.redefinitions().generation(), 1);
    }

    #[test]
    fn values_point_at_headers() {
        let mut sb = Sandbox::default();
        let ary = sb.new_array(&[]);
        let class = unsafe { crate::header::class_of_ref(ary) };
        assert_eq!(class, Some(sb.classes().array));

        let point = sb.define_class("Point", None, ClassLayout::Slots);
        let obj = sb.new_object(point);
        assert_eq!(unsafe { crate::header::class_of_ref(obj) }, Some(point));
    }
}
