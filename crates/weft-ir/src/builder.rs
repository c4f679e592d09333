//! Programmatic module construction.

use crate::arena::Handle;
use crate::attr::Attr;
use crate::location::Location;
use crate::module::Module;
use crate::op::{Block, Op, Region, Value};
use crate::types::{FunctionSig, Type};
use crate::{COMPILED_ATTR, FUNC_OP, MODULE_OP, NATIVE_ATTR, RETURN_OP, SYM_NAME_ATTR, SYNC_ATTR};

/// Builds a [`Module`] op by op.
///
/// Upstream producers and tests use this instead of mutating the arenas by
/// hand; it keeps parent links consistent.
#[derive(Default)]
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self {
            module: Module::new(),
        }
    }

    /// Finishes construction.
    pub fn module(self) -> Module {
        self.module
    }

    /// Interns a type.
    pub fn type_of(&mut self, ty: Type) -> Handle<Type> {
        self.module.types.insert(ty)
    }

    /// Interns `i<bits>`.
    pub fn int_type(&mut self, bits: u16) -> Handle<Type> {
        self.type_of(Type::Int(bits))
    }

    /// Interns `f<bits>`.
    pub fn float_type(&mut self, bits: u16) -> Handle<Type> {
        self.type_of(Type::Float(bits))
    }

    /// Interns the chain type.
    pub fn chain_type(&mut self) -> Handle<Type> {
        self.type_of(Type::Chain)
    }

    /// Declares an asynchronous (or, with `sync`, synchronous) function with
    /// a body. Returns the function op, its entry block, and the argument
    /// values.
    pub fn func(
        &mut self,
        name: &str,
        inputs: &[Handle<Type>],
        results: &[Handle<Type>],
        sync: bool,
    ) -> (Handle<Op>, Handle<Block>, Vec<Value>) {
        let mut op = Op::new(FUNC_OP, Location::Unknown);
        op.attrs.insert(SYM_NAME_ATTR.into(), Attr::str(name));
        if sync {
            op.attrs.insert(SYNC_ATTR.into(), Attr::Unit);
        }
        op.sig = Some(FunctionSig::new(inputs.to_vec(), results.to_vec()));
        let func = self.append_op(op, self.module.body_block());
        let (_, block, args) = self.region_on(func, inputs);
        (func, block, args)
    }

    /// Declares a native function (no body).
    pub fn native_func(
        &mut self,
        name: &str,
        inputs: &[Handle<Type>],
        results: &[Handle<Type>],
    ) -> Handle<Op> {
        let mut op = Op::new(FUNC_OP, Location::Unknown);
        op.attrs.insert(SYM_NAME_ATTR.into(), Attr::str(name));
        op.attrs.insert(NATIVE_ATTR.into(), Attr::Unit);
        op.sig = Some(FunctionSig::new(inputs.to_vec(), results.to_vec()));
        self.append_op(op, self.module.body_block())
    }

    /// Declares a nested module. With `compiled`, the converter treats its
    /// contents as an opaque compilation unit.
    pub fn nested_module(&mut self, name: &str, compiled: bool) -> (Handle<Op>, Handle<Block>) {
        let mut op = Op::new(MODULE_OP, Location::Unknown);
        op.attrs.insert(SYM_NAME_ATTR.into(), Attr::str(name));
        if compiled {
            op.attrs.insert(COMPILED_ATTR.into(), Attr::Unit);
        }
        let module_op = self.append_op(op, self.module.body_block());
        let (_, block, _) = self.region_on(module_op, &[]);
        (module_op, block)
    }

    /// Appends a kernel op to a block.
    pub fn op_in(
        &mut self,
        block: Handle<Block>,
        name: &str,
        operands: Vec<Value>,
        result_types: Vec<Handle<Type>>,
        loc: Location,
    ) -> Handle<Op> {
        let mut op = Op::new(name, loc);
        op.operands = operands;
        op.result_types = result_types;
        self.append_op(op, block)
    }

    /// Appends a kernel op with attributes. Attribute order is preserved.
    pub fn op_with_attrs_in(
        &mut self,
        block: Handle<Block>,
        name: &str,
        operands: Vec<Value>,
        result_types: Vec<Handle<Type>>,
        attrs: Vec<(&str, Attr)>,
        loc: Location,
    ) -> Handle<Op> {
        let mut op = Op::new(name, loc);
        op.operands = operands;
        op.result_types = result_types;
        for (key, value) in attrs {
            op.attrs.insert(key.into(), value);
        }
        self.append_op(op, block)
    }

    /// Appends the function terminator.
    pub fn ret_in(&mut self, block: Handle<Block>, operands: Vec<Value>) -> Handle<Op> {
        let mut op = Op::new(RETURN_OP, Location::Unknown);
        op.operands = operands;
        self.append_op(op, block)
    }

    /// Attaches a fresh single-block region to an op. Returns the region,
    /// its block, and the block argument values.
    pub fn region_on(
        &mut self,
        op: Handle<Op>,
        arg_types: &[Handle<Type>],
    ) -> (Handle<Region>, Handle<Block>, Vec<Value>) {
        let region = self.module.regions.append(Region {
            parent: Some(op),
            blocks: Vec::new(),
        });
        let block = self.module.blocks.append(Block {
            parent: region,
            args: arg_types.to_vec(),
            ops: Vec::new(),
        });
        self.module.regions.get_mut(region).blocks.push(block);
        self.module.ops.get_mut(op).regions.push(region);
        let args = Block::arg_values(block, arg_types.len());
        (region, block, args)
    }

    /// Appends an extra (empty) block to a region. Only malformed-input
    /// tests want this.
    pub fn extra_block_on(&mut self, region: Handle<Region>) -> Handle<Block> {
        let block = self.module.blocks.append(Block {
            parent: region,
            args: Vec::new(),
            ops: Vec::new(),
        });
        self.module.regions.get_mut(region).blocks.push(block);
        block
    }

    /// Sets an attribute on an existing op.
    pub fn set_attr(&mut self, op: Handle<Op>, name: &str, attr: Attr) {
        self.module.ops.get_mut(op).attrs.insert(name.into(), attr);
    }

    /// Sets the location of an existing op.
    pub fn set_loc(&mut self, op: Handle<Op>, loc: Location) {
        self.module.ops.get_mut(op).loc = loc;
    }

    fn append_op(&mut self, mut op: Op, block: Handle<Block>) -> Handle<Op> {
        op.parent = Some(block);
        let handle = self.module.ops.append(op);
        self.module.blocks.get_mut(block).ops.push(handle);
        handle
    }
}
