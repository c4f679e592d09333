//! The IR module: arenas plus the top-level region.

use crate::arena::{Arena, Handle, UniqueArena};
use crate::op::{Block, Op, Region, Value};
use crate::types::Type;

/// A weft IR module.
///
/// All operations, regions, and blocks live in the module's arenas and refer
/// to each other by handle. The `body` region holds the top-level ops
/// (function declarations and nested modules) in a single block with no
/// arguments.
#[derive(Clone, Debug)]
pub struct Module {
    pub types: UniqueArena<Type>,
    pub ops: Arena<Op>,
    pub regions: Arena<Region>,
    pub blocks: Arena<Block>,
    pub body: Handle<Region>,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    /// Creates an empty module with its body region and block.
    pub fn new() -> Self {
        let mut regions = Arena::new();
        let mut blocks = Arena::new();
        let body = regions.append(Region {
            parent: None,
            blocks: Vec::new(),
        });
        let block = blocks.append(Block {
            parent: body,
            args: Vec::new(),
            ops: Vec::new(),
        });
        regions.get_mut(body).blocks.push(block);
        Self {
            types: UniqueArena::new(),
            ops: Arena::new(),
            regions,
            blocks,
            body,
        }
    }

    /// The single block of the module body.
    pub fn body_block(&self) -> Handle<Block> {
        self.regions[self.body].blocks[0]
    }

    /// Top-level operations in program order.
    pub fn top_level_ops(&self) -> &[Handle<Op>] {
        &self.blocks[self.body_block()].ops
    }

    /// The type of a value.
    pub fn value_type(&self, value: Value) -> Handle<Type> {
        match value {
            Value::Arg { block, index } => self.blocks[block].args[index as usize],
            Value::Result { op, index } => self.ops[op].result_types[index as usize],
        }
    }

    /// The region a value is defined in.
    pub fn defining_region(&self, value: Value) -> Handle<Region> {
        match value {
            Value::Arg { block, .. } => self.blocks[block].parent,
            Value::Result { op, .. } => {
                let block = self.ops[op]
                    .parent
                    .expect("op result of a detached op has no defining region");
                self.blocks[block].parent
            }
        }
    }

    /// The region containing an op.
    pub fn region_of(&self, op: Handle<Op>) -> Handle<Region> {
        let block = self.ops[op].parent.expect("op is not attached to a block");
        self.blocks[block].parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;
    use crate::location::Location;

    #[test]
    fn new_module_has_empty_body() {
        let module = Module::new();
        assert!(module.top_level_ops().is_empty());
    }

    #[test]
    fn value_types_resolve() {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.int_type(32);
        let (_, block, args) = b.func("id", &[i32_ty], &[i32_ty], false);
        let op = b.op_in(block, "demo.copy", vec![args[0]], vec![i32_ty], Location::Unknown);
        let module = b.module();
        assert_eq!(module.value_type(args[0]), i32_ty);
        assert_eq!(module.value_type(Value::result(op, 0)), i32_ty);
    }

    #[test]
    fn defining_regions_match() {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.int_type(32);
        let (func, block, args) = b.func("f", &[i32_ty], &[], false);
        let module = b.module();
        let region = module.ops[func].regions[0];
        assert_eq!(module.defining_region(args[0]), region);
        assert_eq!(module.blocks[block].parent, region);
    }
}
