//! Operations, regions, blocks, and values.

use indexmap::IndexMap;

use crate::arena::Handle;
use crate::attr::Attr;
use crate::location::Location;
use crate::types::{FunctionSig, Type};
use crate::{COMPILED_ATTR, FUNC_OP, MODULE_OP, NATIVE_ATTR, RETURN_OP, SYM_NAME_ATTR, SYNC_ATTR};

/// An SSA value: a block argument or an operation result.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub enum Value {
    Arg { block: Handle<Block>, index: u32 },
    Result { op: Handle<Op>, index: u32 },
}

impl Value {
    /// The `index`-th result of `op`.
    pub fn result(op: Handle<Op>, index: usize) -> Self {
        Self::Result {
            op,
            index: index as u32,
        }
    }
}

/// A generic named operation.
///
/// Operations with the reserved opcodes [`FUNC_OP`], [`RETURN_OP`], and
/// [`MODULE_OP`] get special treatment in the converter; everything else is
/// a kernel. Attribute order is insertion order and is observable in the
/// emitted artifact, so it must not depend on hashing.
#[derive(Clone, Debug)]
pub struct Op {
    pub name: String,
    pub operands: Vec<Value>,
    pub result_types: Vec<Handle<Type>>,
    pub attrs: IndexMap<String, Attr>,
    pub regions: Vec<Handle<Region>>,
    pub loc: Location,
    /// Signature of a function declaration; `None` for every other op.
    pub sig: Option<FunctionSig>,
    /// Block this op has been appended to.
    pub parent: Option<Handle<Block>>,
}

impl Op {
    /// Creates a detached op with the given opcode and location.
    pub fn new(name: impl Into<String>, loc: Location) -> Self {
        Self {
            name: name.into(),
            operands: Vec::new(),
            result_types: Vec::new(),
            attrs: IndexMap::new(),
            regions: Vec::new(),
            loc,
            sig: None,
            parent: None,
        }
    }

    /// Looks up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.get(name)
    }

    /// Returns `true` if the attribute is present, whatever its value.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// The `sym_name` attribute, for symbol-visible ops.
    pub fn symbol_name(&self) -> Option<&str> {
        match self.attr(SYM_NAME_ATTR) {
            Some(Attr::Str(name)) => Some(name),
            _ => None,
        }
    }

    pub fn is_return(&self) -> bool {
        self.name == RETURN_OP
    }

    pub fn is_func(&self) -> bool {
        self.name == FUNC_OP
    }

    pub fn is_native_func(&self) -> bool {
        self.is_func() && self.has_attr(NATIVE_ATTR)
    }

    pub fn is_sync_func(&self) -> bool {
        self.is_func() && self.has_attr(SYNC_ATTR)
    }

    /// A nested module whose contents are serialised opaquely rather than
    /// walked.
    pub fn is_compiled_module(&self) -> bool {
        self.name == MODULE_OP && self.has_attr(COMPILED_ATTR)
    }
}

/// A region: an ordered list of blocks attached to an operation.
///
/// Well-formed input for the BEF converter has exactly one block per region;
/// the converter diagnoses anything else.
#[derive(Clone, Debug)]
pub struct Region {
    /// The op this region is attached to; `None` for the module body.
    pub parent: Option<Handle<Op>>,
    pub blocks: Vec<Handle<Block>>,
}

/// A basic block: typed arguments plus an ordered list of operations.
#[derive(Clone, Debug)]
pub struct Block {
    pub parent: Handle<Region>,
    pub args: Vec<Handle<Type>>,
    pub ops: Vec<Handle<Op>>,
}

impl Block {
    /// Values for this block's arguments, in order.
    pub fn arg_values(handle: Handle<Block>, count: usize) -> Vec<Value> {
        (0..count as u32)
            .map(|index| Value::Arg {
                block: handle,
                index,
            })
            .collect()
    }
}
