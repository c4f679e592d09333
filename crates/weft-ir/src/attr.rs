//! Attribute values carried by operations.

use crate::arena::Handle;
use crate::types::Type;

/// Bit width of an integer attribute.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }
}

/// Bit width of a float attribute.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum FloatWidth {
    W32,
    W64,
}

impl FloatWidth {
    /// Width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }
}

/// Element type of a dense literal.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum DenseElem {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl DenseElem {
    /// Natural alignment (and size) of one element in bytes.
    pub fn alignment(self) -> usize {
        match self {
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }
}

/// An attribute value.
///
/// The set is closed; the BEF attribute encoder matches exhaustively on it.
/// Floats are stored as raw bits so attributes can be hashed and uniqued.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Attr {
    /// Presence-only marker (`weft.native` and friends). Not encodable.
    Unit,
    Bool(bool),
    Int { value: i64, width: IntWidth },
    Float { bits: u64, width: FloatWidth },
    Str(String),
    /// Reference to a value type.
    Type(Handle<Type>),
    /// A tensor shape: one entry per dimension, `-1` for dynamic.
    Shape(Vec<i64>),
    /// A dense tensor literal with raw little-endian element storage.
    Dense {
        elem: DenseElem,
        dims: Vec<i64>,
        data: Vec<u8>,
    },
    /// An ordered list of nested attributes.
    Array(Vec<Attr>),
    /// A reference to a symbol, optionally into a nested module.
    SymbolRef {
        root: String,
        nested: Vec<String>,
    },
}

impl Attr {
    /// 32-bit integer attribute.
    pub fn i32(value: i32) -> Self {
        Self::Int {
            value: value as i64,
            width: IntWidth::W32,
        }
    }

    /// 64-bit integer attribute.
    pub fn i64(value: i64) -> Self {
        Self::Int {
            value,
            width: IntWidth::W64,
        }
    }

    /// 32-bit float attribute.
    pub fn f32(value: f32) -> Self {
        Self::Float {
            bits: value.to_bits() as u64,
            width: FloatWidth::W32,
        }
    }

    /// 64-bit float attribute.
    pub fn f64(value: f64) -> Self {
        Self::Float {
            bits: value.to_bits(),
            width: FloatWidth::W64,
        }
    }

    /// String attribute.
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Flat symbol reference (`@f`).
    pub fn symbol(root: impl Into<String>) -> Self {
        Self::SymbolRef {
            root: root.into(),
            nested: Vec::new(),
        }
    }

    /// Nested symbol reference (`@unit::@f`).
    pub fn nested_symbol(root: impl Into<String>, nested: Vec<String>) -> Self {
        Self::SymbolRef {
            root: root.into(),
            nested,
        }
    }

    /// Returns the flat symbol name, if this is a flat symbol reference.
    pub fn flat_symbol(&self) -> Option<&str> {
        match self {
            Self::SymbolRef { root, nested } if nested.is_empty() => Some(root),
            _ => None,
        }
    }
}
