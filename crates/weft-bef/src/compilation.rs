//! Compilation-unit registry.
//!
//! A nested `weft.module` carrying the `weft.compiled` marker is a
//! *compilation unit*: the converter never walks its interior. Symbol
//! references that resolve into one are serialised opaquely (as the unit's
//! textual form) instead of being resolved against the function table.

use std::collections::HashMap;

use weft_ir::{dump_op, Handle, Module, Op};

/// Index of the compiled sub-modules of a module, keyed by symbol name.
pub struct CompilationUnits {
    units: HashMap<String, Handle<Op>>,
}

impl CompilationUnits {
    /// Scans `module` for compiled sub-modules.
    pub fn new(module: &Module) -> Self {
        let mut units = HashMap::new();
        for (handle, op) in module.ops.iter() {
            if op.is_compiled_module() {
                if let Some(name) = op.symbol_name() {
                    units.insert(name.to_string(), handle);
                }
            }
        }
        Self { units }
    }

    /// Does `root` name a compiled sub-module?
    pub fn is_compiled_ref(&self, root: &str) -> bool {
        self.units.contains_key(root)
    }

    /// Serialises the unit named `root` to its textual form.
    ///
    /// Panics if `root` is not a registered unit; callers check
    /// [`is_compiled_ref`](Self::is_compiled_ref) during collection.
    pub fn serialize(&self, module: &Module, root: &str) -> Vec<u8> {
        let &unit = self
            .units
            .get(root)
            .unwrap_or_else(|| panic!("@{root} is not a compilation unit"));
        dump_op(module, unit).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::ModuleBuilder;

    #[test]
    fn registers_compiled_modules_only() {
        let mut b = ModuleBuilder::new();
        b.nested_module("jit", true);
        b.nested_module("plain", false);
        let module = b.module();

        let units = CompilationUnits::new(&module);
        assert!(units.is_compiled_ref("jit"));
        assert!(!units.is_compiled_ref("plain"));
        assert!(!units.is_compiled_ref("missing"));
    }

    #[test]
    fn serialization_is_textual_and_stable() {
        let mut b = ModuleBuilder::new();
        let (_, inner) = b.nested_module("jit", true);
        b.op_in(inner, "demo.marker", vec![], vec![], weft_ir::Location::Unknown);
        let module = b.module();

        let units = CompilationUnits::new(&module);
        let blob = units.serialize(&module, "jit");
        let text = String::from_utf8(blob.clone()).unwrap();
        assert!(text.contains("weft.module @jit"));
        assert!(text.contains("demo.marker"));
        assert_eq!(blob, units.serialize(&module, "jit"));
    }
}
