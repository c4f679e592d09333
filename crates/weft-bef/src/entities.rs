//! First pass: entity collection.
//!
//! A pre-order walk over the module records every string, type, kernel
//! opcode, attribute, function, location, and debug name the later emission
//! passes will reference. All containers iterate deterministically: strings
//! sort alphabetically, everything else keeps first-seen or walk order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::IndexSet;
use weft_ir::{
    Attr, Block, DiagSink, Diagnostic, FunctionSig, Handle, IntWidth, Location, Module, Op,
    Region, Type, COST_ATTR,
};

use crate::attrs;
use crate::compilation::CompilationUnits;
use crate::encoding::FunctionKind;
use crate::error::{ConversionFailed, ConvertError};

/// One function of the output's function table.
#[derive(Clone, Debug)]
pub struct FunctionEntry {
    /// Empty for anonymous region functions.
    pub name: String,
    pub sig: FunctionSig,
    pub kind: FunctionKind,
    /// `None` exactly for native functions.
    pub region: Option<Handle<Region>>,
}

impl FunctionEntry {
    pub fn is_native(&self) -> bool {
        self.kind == FunctionKind::Native
    }
}

/// Everything the module references, uniqued and ordered.
#[derive(Default)]
pub struct EntityTable {
    /// Pooled attribute values, first-seen order.
    pub attributes: IndexSet<Attr>,
    /// Kernel opcodes, first-seen order; the index is the kernel id.
    pub kernels: IndexSet<String>,
    /// Function entries in walk order.
    pub functions: Vec<FunctionEntry>,
    region_function_ids: HashMap<Handle<Region>, usize>,
    named_function_ids: HashMap<String, usize>,
    /// Types in first-seen order; the index is the type id.
    pub types: IndexSet<Type>,
    /// Every string any section will reference. Sorted, so offsets are
    /// stable across runs.
    pub strings: BTreeSet<String>,
    /// Filenames referenced by locations, pooled separately.
    pub location_filenames: IndexSet<String>,
    /// Per-op `(filename index, line, column)`, in op order.
    pub location_positions: BTreeMap<Handle<Op>, (usize, u32, u32)>,
    /// Per-op debug names, in op order.
    pub debug_info: BTreeMap<Handle<Op>, String>,
}

impl EntityTable {
    /// Runs the collection walk. On any error the walk still finishes (so
    /// every problem is reported) and `Err` is returned.
    pub fn collect(
        module: &Module,
        units: &CompilationUnits,
        collect_attribute_types_and_names: bool,
        diags: &mut dyn DiagSink,
    ) -> Result<EntityTable, ConversionFailed> {
        let mut collector = Collector {
            module,
            units,
            collect_meta: collect_attribute_types_and_names,
            table: EntityTable::default(),
            deferred_symbols: Vec::new(),
            failed: false,
        };
        collector.visit_block(module.body_block(), diags);
        collector.resolve_deferred(diags);
        if collector.failed {
            Err(ConversionFailed)
        } else {
            Ok(collector.table)
        }
    }

    pub fn add_string(&mut self, s: &str) {
        if !self.strings.contains(s) {
            self.strings.insert(s.to_string());
        }
    }

    /// Records a type (and its printed name) if unseen.
    pub fn add_type(&mut self, ty: Type) {
        let name = ty.to_string();
        if self.types.insert(ty) {
            self.add_string(&name);
        }
    }

    /// Index of a type in the type table.
    pub fn type_index(&self, ty: &Type) -> usize {
        self.types
            .get_index_of(ty)
            .unwrap_or_else(|| panic!("type {ty} was not collected"))
    }

    /// Kernel id of an opcode.
    pub fn kernel_id(&self, name: &str) -> usize {
        self.kernels
            .get_index_of(name)
            .unwrap_or_else(|| panic!("kernel '{name}' was not collected"))
    }

    /// Function-table index of a named function, if defined.
    pub fn function_named(&self, name: &str) -> Option<usize> {
        self.named_function_ids.get(name).copied()
    }

    /// Function-table index of a region function.
    pub fn function_id(&self, region: Handle<Region>) -> usize {
        *self
            .region_function_ids
            .get(&region)
            .expect("region was not added to the function table")
    }
}

struct Collector<'a> {
    module: &'a Module,
    units: &'a CompilationUnits,
    collect_meta: bool,
    table: EntityTable,
    /// Symbol references awaiting post-walk resolution, with the location
    /// of the op that made them.
    deferred_symbols: Vec<(String, Location)>,
    failed: bool,
}

impl Collector<'_> {
    fn report(&mut self, diags: &mut dyn DiagSink, loc: &Location, err: ConvertError) {
        self.failed = true;
        diags.report(Diagnostic::new(loc.clone(), err.to_string()));
    }

    fn visit_block(&mut self, block: Handle<Block>, diags: &mut dyn DiagSink) {
        let module = self.module;
        for &op in &module.blocks[block].ops {
            self.visit_op(op, diags);
        }
    }

    fn visit_op(&mut self, handle: Handle<Op>, diags: &mut dyn DiagSink) {
        let module = self.module;
        let op = &module.ops[handle];

        // Compilation units are serialised opaquely; nothing inside them is
        // an entity of this module.
        if op.is_compiled_module() {
            return;
        }

        if op.is_return() {
            let block = op.parent.expect("return op outside a block");
            if module.blocks[block].ops.last() != Some(&handle) {
                self.report(diags, &op.loc, ConvertError::MisplacedReturn);
            }
            // The return itself gets special handling at emission.
            return;
        }

        self.add_location(handle);
        self.add_debug_info(handle);

        let current_region = module.region_of(handle);
        for &ty in &op.result_types {
            self.table.add_type(module.types[ty].clone());
        }
        for &operand in &op.operands {
            if module.defining_region(operand) != current_region {
                self.report(diags, &op.loc, ConvertError::CrossRegionOperand);
                return;
            }
        }

        if op.is_func() {
            self.visit_func(handle, diags);
        } else {
            self.visit_kernel(handle, diags);
        }

        for &region in &op.regions {
            for &block in &module.regions[region].blocks {
                self.visit_block(block, diags);
            }
        }
    }

    fn visit_func(&mut self, handle: Handle<Op>, diags: &mut dyn DiagSink) {
        let module = self.module;
        let op = &module.ops[handle];
        let name = op.symbol_name().unwrap_or_default().to_string();

        if op.is_native_func() {
            let sig = op
                .sig
                .clone()
                .expect("native function declared without a signature");
            for &ty in sig.inputs.iter().chain(&sig.results) {
                self.table.add_type(module.types[ty].clone());
            }
            self.table.add_string(&name);
            self.table
                .named_function_ids
                .insert(name.clone(), self.table.functions.len());
            self.table.functions.push(FunctionEntry {
                name,
                sig,
                kind: FunctionKind::Native,
                region: None,
            });
            return;
        }

        let Some(&region) = op.regions.first() else {
            self.report(diags, &op.loc, ConvertError::ExternalFunction);
            return;
        };
        if module.regions[region].blocks.is_empty() {
            self.report(diags, &op.loc, ConvertError::ExternalFunction);
            return;
        }

        let block = module.regions[region].blocks[0];
        let Some(&last) = module.blocks[block].ops.last() else {
            self.report(diags, &op.loc, ConvertError::MissingReturn);
            return;
        };
        let last_op = &module.ops[last];
        if !last_op.is_return() {
            self.report(diags, &last_op.loc, ConvertError::MissingReturn);
            return;
        }

        if op.is_sync_func() {
            let mut seen = IndexSet::new();
            for (index, &operand) in last_op.operands.iter().enumerate() {
                if matches!(operand, weft_ir::Value::Arg { .. }) {
                    self.report(
                        diags,
                        &last_op.loc,
                        ConvertError::SyncReturnsArgument { index },
                    );
                    return;
                }
                if !seen.insert(operand) {
                    self.report(
                        diags,
                        &last_op.loc,
                        ConvertError::SyncReturnDuplicated { index },
                    );
                    return;
                }
            }
        }

        let kind = if op.is_sync_func() {
            FunctionKind::SyncBef
        } else {
            FunctionKind::AsyncBef
        };
        self.add_function(region, &name, kind, &op.loc, diags);
    }

    /// Adds a region-backed function entry. Shared by named functions and
    /// the anonymous functions created for kernel-attached regions.
    fn add_function(
        &mut self,
        region: Handle<Region>,
        name: &str,
        kind: FunctionKind,
        loc: &Location,
        diags: &mut dyn DiagSink,
    ) {
        let module = self.module;
        if module.regions[region].blocks.len() != 1 {
            self.report(diags, loc, ConvertError::MultiBlockRegion);
            return;
        }
        let block = module.regions[region].blocks[0];
        let args = module.blocks[block].args.clone();
        for &ty in &args {
            self.table.add_type(module.types[ty].clone());
        }

        // Regions have no explicit result list; the terminator's operands
        // are the results.
        let Some(&last) = module.blocks[block].ops.last() else {
            self.report(diags, loc, ConvertError::MissingReturn);
            return;
        };
        if !module.ops[last].is_return() {
            self.report(diags, loc, ConvertError::MissingReturn);
            return;
        }
        let results = module.ops[last]
            .operands
            .iter()
            .map(|&v| module.value_type(v))
            .collect();

        self.table.add_string(name);
        self.table
            .region_function_ids
            .insert(region, self.table.functions.len());
        if !name.is_empty() {
            self.table
                .named_function_ids
                .insert(name.to_string(), self.table.functions.len());
        }
        self.table.functions.push(FunctionEntry {
            name: name.to_string(),
            sig: FunctionSig::new(args, results),
            kind,
            region: Some(region),
        });
    }

    fn visit_kernel(&mut self, handle: Handle<Op>, diags: &mut dyn DiagSink) {
        let module = self.module;
        let op = &module.ops[handle];
        if self.table.kernels.insert(op.name.clone()) {
            self.table.add_string(&op.name);
        }

        for (attr_name, attr) in &op.attrs {
            if attr_name.as_str() == COST_ATTR || attrs::classify_special(attr_name).is_some() {
                continue;
            }
            if !attrs::is_supported(module, attr) {
                self.report(
                    diags,
                    &op.loc,
                    ConvertError::UnsupportedAttribute {
                        name: attr_name.clone(),
                    },
                );
                continue;
            }

            // Executable symbol references become kernel function ids, not
            // pooled attributes; compilation-unit references stay pooled.
            if let Attr::SymbolRef { root, nested } = attr {
                if !self.units.is_compiled_ref(root) {
                    if nested.is_empty() {
                        self.deferred_symbols.push((root.clone(), op.loc.clone()));
                    } else {
                        self.report(
                            diags,
                            &op.loc,
                            ConvertError::NotACompilationUnit {
                                symbol: root.clone(),
                            },
                        );
                    }
                    continue;
                }
            }

            if self.collect_meta {
                self.table.add_string(attr_name);
                self.add_attribute_type(attr);
            }

            // A non-empty array of symbol references is a function-reference
            // list, wired directly into kernel entries.
            if let Attr::Array(items) = attr {
                if items
                    .first()
                    .is_some_and(|first| matches!(first, Attr::SymbolRef { .. }))
                {
                    if !items.iter().all(|item| item.flat_symbol().is_some()) {
                        self.report(
                            diags,
                            &op.loc,
                            ConvertError::UnsupportedAttribute {
                                name: attr_name.clone(),
                            },
                        );
                        continue;
                    }
                    for symbol in items.iter().filter_map(Attr::flat_symbol) {
                        self.deferred_symbols
                            .push((symbol.to_string(), op.loc.clone()));
                    }
                    continue;
                }
            }

            self.table.attributes.insert(attr.clone());
        }

        for &region in &op.regions {
            self.add_function(region, "", FunctionKind::AsyncBef, &op.loc, diags);
        }
    }

    /// Registers the type of an attribute for the optional AttributeTypes
    /// section. Arrays contribute their element types.
    fn add_attribute_type(&mut self, attr: &Attr) {
        match attr {
            Attr::Bool(_) => self.table.add_type(Type::Int(1)),
            Attr::Int { width, .. } => {
                let bits = match width {
                    IntWidth::W8 => 8,
                    IntWidth::W16 => 16,
                    IntWidth::W32 => 32,
                    IntWidth::W64 => 64,
                };
                self.table.add_type(Type::Int(bits));
            }
            Attr::Float { width, .. } => {
                let bits = match width {
                    weft_ir::FloatWidth::W32 => 32,
                    weft_ir::FloatWidth::W64 => 64,
                };
                self.table.add_type(Type::Float(bits));
            }
            Attr::Array(items) => {
                for item in items {
                    self.add_attribute_type(item);
                }
            }
            _ => {}
        }
    }

    fn add_location(&mut self, handle: Handle<Op>) {
        let (filename, line, col) = self.module.ops[handle].loc.file_line_col();
        let (index, _) = self.table.location_filenames.insert_full(filename.to_string());
        self.table
            .location_positions
            .insert(handle, (index, line, col));
    }

    fn add_debug_info(&mut self, handle: Handle<Op>) {
        if let Some(name) = self.module.ops[handle].loc.debug_name() {
            self.table.debug_info.insert(handle, name.to_string());
        }
    }

    fn resolve_deferred(&mut self, diags: &mut dyn DiagSink) {
        for (symbol, loc) in std::mem::take(&mut self.deferred_symbols) {
            if self.table.function_named(&symbol).is_none() {
                self.report(diags, &loc, ConvertError::UndefinedSymbol { symbol });
            }
        }
    }
}
