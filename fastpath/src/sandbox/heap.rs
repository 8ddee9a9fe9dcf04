use std::collections::HashMap;
use std::ffi::c_void;

use crate::{ClassRef, HashDefault, Header, IvarSlot, RObject, RuntimeError, Symbol, Tagged, Value};

use super::Sandbox;

/// A user-defined method: receiver and arguments.
pub type MethodFn = fn(&mut Sandbox, Value, &[Value]) -> Result<Value, RuntimeError>;
/// Body of a callable: its arguments.
pub type ProcFn = fn(&mut Sandbox, &[Value]) -> Result<Value, RuntimeError>;

// ── Bodies ─────────────────────────────────────────────────────────
//
// Every body starts with its header so a `Value` pointing at the body
// reads as a heap object.

#[derive(Debug)]
pub(crate) struct BoxedType {
    pub signature: String,
    pub size: usize,
}

#[repr(C)]
pub(crate) struct ClassBody {
    pub header: Header,
    pub name: String,
    pub superclass: Option<ClassRef>,
    /// Slot names of instances, `None` for dynamic-ivar classes.
    pub layout: Option<Vec<Symbol>>,
    pub class_vars: HashMap<Symbol, Value>,
    pub constants: HashMap<Symbol, Value>,
    pub boxed: Option<BoxedType>,
}

#[repr(C)]
pub(crate) struct ObjectBody {
    pub object: RObject,
    pub slots: Vec<IvarSlot>,
}

impl ObjectBody {
    /// Grow the slot table to cover `names`, keeping existing slots.
    pub fn ensure_slots(&mut self, names: &[Symbol]) {
        if self.slots.len() >= names.len() {
            return;
        }
        for &name in &names[self.slots.len()..] {
            self.slots.push(IvarSlot::new(name));
        }
        self.reattach();
    }

    /// The slot holding `name`, appended when the table has none. A
    /// reclassified object may hold names its class layout does not.
    pub fn slot_named(&mut self, name: Symbol) -> &mut IvarSlot {
        let index = match self.slots.iter().position(|slot| slot.name == name) {
            Some(index) => index,
            None => {
                self.slots.push(IvarSlot::new(name));
                self.reattach();
                self.slots.len() - 1
            }
        };
        &mut self.slots[index]
    }

    fn reattach(&mut self) {
        // SAFETY: the table lives in this body and is re-attached on growth
        unsafe {
            self.object
                .attach_slots(self.slots.as_mut_ptr(), self.slots.len() as u32)
        };
    }
}

#[repr(C)]
pub(crate) struct DynamicBody {
    pub header: Header,
    pub ivars: HashMap<Symbol, Value>,
}

#[repr(C)]
pub(crate) struct ArrayBody {
    pub header: Header,
    pub items: Vec<Value>,
}

#[repr(C)]
pub(crate) struct HashBody {
    pub header: Header,
    pub entries: Vec<(Value, Value)>,
    pub default: HashDefault,
}

#[repr(C)]
pub(crate) struct StringBody {
    pub header: Header,
    /// Always NUL-terminated.
    pub bytes: Vec<u8>,
}

impl StringBody {
    pub fn text(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    pub fn append(&mut self, more: &[u8]) {
        self.bytes.pop();
        self.bytes.extend_from_slice(more);
        self.bytes.push(0);
    }
}

#[repr(C)]
pub(crate) struct SymbolBody {
    pub header: Header,
    pub symbol: Symbol,
}

#[repr(C)]
pub(crate) struct PointerBody {
    pub header: Header,
    pub pointee: String,
    pub address: *mut c_void,
    /// Keeps the wrapped value reachable.
    pub _target: Value,
    /// Backing store for pointers made from sequences.
    pub _words: Vec<u64>,
}

#[repr(C)]
pub(crate) struct BoxedBody {
    pub header: Header,
    pub words: Vec<u64>,
}

#[repr(C)]
pub(crate) struct BignumBody {
    pub header: Header,
    pub value: i128,
}

#[repr(C)]
pub(crate) struct MatchBody {
    pub header: Header,
    pub text: Vec<u8>,
    /// Group 0 is the whole match.
    pub groups: Vec<Option<(usize, usize)>>,
}

#[repr(C)]
pub(crate) struct ProcBody {
    pub header: Header,
    pub body: ProcFn,
}

#[repr(C)]
pub(crate) struct ForeignBody {
    pub header: Header,
    pub handle: usize,
}

// ── Cells ──────────────────────────────────────────────────────────

pub(crate) enum Cell {
    Class(Box<ClassBody>),
    Object(Box<ObjectBody>),
    Dynamic(Box<DynamicBody>),
    Array(Box<ArrayBody>),
    Hash(Box<HashBody>),
    Str(Box<StringBody>),
    Symbol(Box<SymbolBody>),
    Pointer(Box<PointerBody>),
    Boxed(Box<BoxedBody>),
    Bignum(Box<BignumBody>),
    Match(Box<MatchBody>),
    Proc(Box<ProcBody>),
    Foreign(Box<ForeignBody>),
}

macro_rules! cell_header {
    ($cell:expr, $($borrow:tt)+) => {
        match $cell {
            Cell::Class(body) => $($borrow)+ body.header,
            Cell::Object(body) => $($borrow)+ body.object.header,
            Cell::Dynamic(body) => $($borrow)+ body.header,
            Cell::Array(body) => $($borrow)+ body.header,
            Cell::Hash(body) => $($borrow)+ body.header,
            Cell::Str(body) => $($borrow)+ body.header,
            Cell::Symbol(body) => $($borrow)+ body.header,
            Cell::Pointer(body) => $($borrow)+ body.header,
            Cell::Boxed(body) => $($borrow)+ body.header,
            Cell::Bignum(body) => $($borrow)+ body.header,
            Cell::Match(body) => $($borrow)+ body.header,
            Cell::Proc(body) => $($borrow)+ body.header,
            Cell::Foreign(body) => $($borrow)+ body.header,
        }
    };
}

impl Cell {
    pub fn header(&self) -> &Header {
        cell_header!(self, &)
    }

    pub fn header_mut(&mut self) -> &mut Header {
        cell_header!(self, &mut)
    }

    /// Address of the body, which is also its value.
    fn address(&self) -> Value {
        Value::from_ptr(self.header() as *const Header)
    }
}

/// Owns every sandbox object. Objects live until the sandbox is dropped.
pub(crate) struct Heap {
    cells: HashMap<Value, Cell>,
}

macro_rules! accessors {
    ($($kind:ident $name:ident => $variant:ident: $body:ty),* $(,)?) => {$(
        accessors!(@$kind $name, $variant, $body);
    )*};
    (@get $name:ident, $variant:ident, $body:ty) => {
        pub fn $name(&self, value: Value) -> Option<&$body> {
            match self.cells.get(&value) {
                Some(Cell::$variant(body)) => Some(&**body),
                _ => None,
            }
        }
    };
    (@get_mut $name:ident, $variant:ident, $body:ty) => {
        pub fn $name(&mut self, value: Value) -> Option<&mut $body> {
            match self.cells.get_mut(&value) {
                Some(Cell::$variant(body)) => Some(&mut **body),
                _ => None,
            }
        }
    };
}

impl Heap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, cell: Cell) -> Value {
        let value = cell.address();
        self.cells.insert(value, cell);
        value
    }

    pub fn get(&self, value: Value) -> Option<&Cell> {
        self.cells.get(&value)
    }

    pub fn get_mut(&mut self, value: Value) -> Option<&mut Cell> {
        self.cells.get_mut(&value)
    }

    pub fn contains(&self, value: Value) -> bool {
        self.cells.contains_key(&value)
    }

    pub fn header(&self, value: Value) -> Option<&Header> {
        self.cells.get(&value).map(Cell::header)
    }

    pub fn header_mut(&mut self, value: Value) -> Option<&mut Header> {
        self.cells.get_mut(&value).map(Cell::header_mut)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn class(&self, class: ClassRef) -> Option<&ClassBody> {
        self.class_body(class.value())
    }

    pub fn class_mut(&mut self, class: ClassRef) -> Option<&mut ClassBody> {
        self.class_body_mut(class.value())
    }

    accessors! {
        get class_body => Class: ClassBody,
        get_mut class_body_mut => Class: ClassBody,
        get object => Object: ObjectBody,
        get_mut object_mut => Object: ObjectBody,
        get array => Array: ArrayBody,
        get_mut array_mut => Array: ArrayBody,
        get hash => Hash: HashBody,
        get_mut hash_mut => Hash: HashBody,
        get string => Str: StringBody,
        get_mut string_mut => Str: StringBody,
        get_mut boxed_mut => Boxed: BoxedBody,
        get bignum => Bignum: BignumBody,
    }

    /// Allocate a class whose metaclass is `meta`.
    pub fn new_class(
        &mut self,
        meta: ClassRef,
        name: &str,
        superclass: Option<ClassRef>,
        layout: Option<Vec<Symbol>>,
    ) -> ClassRef {
        let body = ClassBody {
            header: Header::new(meta),
            name: name.to_owned(),
            superclass,
            layout,
            class_vars: HashMap::new(),
            constants: HashMap::new(),
            boxed: None,
        };
        Tagged::from_value(self.insert(Cell::Class(Box::new(body))))
    }
}
