use crate::Symbol;

/// Operators that have a fast path. Their selectors are interned first, in
/// declaration order, so `Operator::symbol` is a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operator {
    Plus,
    Minus,
    Mult,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Eqq,
    Neq,
    Aref,
    Aset,
    LtLt,
}

impl Operator {
    pub const COUNT: usize = Self::LtLt as usize + 1;

    pub const ALL: [Operator; Self::COUNT] = [
        Self::Plus,
        Self::Minus,
        Self::Mult,
        Self::Div,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::Eq,
        Self::Eqq,
        Self::Neq,
        Self::Aref,
        Self::Aset,
        Self::LtLt,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Mult => "*",
            Self::Div => "/",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Eqq => "===",
            Self::Neq => "!=",
            Self::Aref => "[]",
            Self::Aset => "[]=",
            Self::LtLt => "<<",
        }
    }

    /// Arguments besides the receiver.
    pub const fn arity(self) -> usize {
        match self {
            Self::Aset => 2,
            _ => 1,
        }
    }

    #[inline(always)]
    pub const fn symbol(self) -> Symbol {
        Symbol::seeded(self as u32)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn from_symbol(symbol: Symbol) -> Option<Self> {
        Self::ALL.get(symbol.id() as usize - 1).copied()
    }
}

/// `call`, used to invoke callable map defaults.
pub const CALL: Symbol = Symbol::seeded(Operator::COUNT as u32);
/// `to_a`, the explicit sequence conversion.
pub const TO_A: Symbol = Symbol::seeded(Operator::COUNT as u32 + 1);
/// `to_ary`, the implicit sequence conversion.
pub const TO_ARY: Symbol = Symbol::seeded(Operator::COUNT as u32 + 2);

/// Names every interner starts with, operators first.
pub(crate) const SEEDED_NAMES: [&str; Operator::COUNT + 3] = [
    "+", "-", "*", "/", "<", "<=", ">", ">=", "==", "===", "!=", "[]", "[]=",
    "<<", "call", "to_a", "to_ary",
];
