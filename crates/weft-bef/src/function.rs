//! Third pass, per function: register table and kernel list.
//!
//! Each BEF function body is: location offset, register table, kernel
//! count, per-kernel headers (offset into the kernel list, operands needed
//! before firing, stream id), the result registers, then the 4-aligned
//! kernel list itself.
//!
//! Kernel entries split their data in two: fixed counts (and per-result
//! user counts) live in the header area, while register numbers, attribute
//! offsets, function ids, and user kernel indices follow in the body area.

use std::collections::HashMap;

use weft_analysis::StreamAnalysis;
use weft_ir::{Attr, Block, Handle, Module, Op, Region, Value};

use crate::attrs;
use crate::compilation::CompilationUnits;
use crate::emitter::Emitter;
use crate::encoding::{
    special_metadata, KERNEL_ENTRY_ALIGNMENT, PSEUDO_KERNEL_CODE, PSEUDO_KERNEL_LOCATION,
};
use crate::entities::EntityTable;
use crate::index::EntityIndex;

/// Emits the Functions section payload, one region at a time.
pub struct FunctionEmitter<'a> {
    module: &'a Module,
    entities: &'a EntityTable,
    index: &'a EntityIndex,
    units: &'a CompilationUnits,
    register_numbers: HashMap<Value, u32>,
    kernel_index: HashMap<Handle<Op>, u32>,
    /// The accumulated section payload.
    pub emitter: Emitter,
}

impl<'a> FunctionEmitter<'a> {
    pub fn new(
        module: &'a Module,
        entities: &'a EntityTable,
        index: &'a EntityIndex,
        units: &'a CompilationUnits,
    ) -> Self {
        Self {
            module,
            entities,
            index,
            units,
            register_numbers: HashMap::new(),
            kernel_index: HashMap::new(),
            emitter: Emitter::new(),
        }
    }

    /// Emits one function body.
    pub fn emit_function(
        &mut self,
        region: Handle<Region>,
        mut attribute_names: Option<&mut Emitter>,
        register_types: Option<&mut Emitter>,
    ) {
        self.register_numbers.clear();
        self.kernel_index.clear();

        let module = self.module;
        let block = module.regions[region].blocks[0];
        let parent = module.regions[region]
            .parent
            .expect("function region is not attached to an op");

        self.emitter
            .emit_vbr(self.index.location_position_offset(parent));

        self.emit_register_table(block, register_types);

        // Dense kernel numbering; slot 0 is the pseudo kernel.
        let mut num_kernels = 1usize;
        for &op in &module.blocks[block].ops {
            if !module.ops[op].is_return() {
                self.kernel_index.insert(op, num_kernels as u32);
                num_kernels += 1;
            }
        }
        self.emitter.emit_vbr(num_kernels);
        if let Some(names) = attribute_names.as_deref_mut() {
            names.emit_vbr(num_kernels);
        }

        let streams = StreamAnalysis::new(module, block);
        let mut kernel_list = Emitter::new();

        // The pseudo kernel needs nothing before it fires and runs on the
        // root stream.
        self.emitter.emit_vbr(kernel_list.len());
        self.emitter.emit_vbr(0);
        self.emitter.emit_vbr(streams.root_stream().id() as usize);
        self.emit_pseudo_kernel(block, &mut kernel_list);

        let mut return_op = None;
        for &op in &module.blocks[block].ops {
            if module.ops[op].is_return() {
                return_op = Some(op);
                continue;
            }

            let non_strict = module.ops[op]
                .attrs
                .keys()
                .any(|name| attrs::classify_special(name) == Some(special_metadata::NON_STRICT));

            self.emitter.emit_vbr(kernel_list.len());

            // Non-strict kernels fire on their first available operand.
            let mut operands_needed = module.ops[op].operands.len();
            if non_strict && operands_needed > 0 {
                operands_needed = 1;
            }
            self.emitter.emit_vbr(operands_needed);
            self.emitter.emit_vbr(streams.stream(op).id() as usize);

            self.emit_kernel(op, &mut kernel_list, attribute_names.as_deref_mut());
        }

        // Result registers, straight from the terminator's operands.
        if let Some(ret) = return_op {
            for &operand in &module.ops[ret].operands {
                self.emitter.emit_vbr(self.register_number(operand) as usize);
            }
        }

        self.emitter.emit_align(KERNEL_ENTRY_ALIGNMENT);
        self.emitter.emit_emitter(&kernel_list);
    }

    fn register_number(&self, value: Value) -> u32 {
        *self
            .register_numbers
            .get(&value)
            .expect("value has no register")
    }

    /// Register number of the synthetic trigger result, one past the table.
    fn trigger_register(&self) -> u32 {
        self.register_numbers.len() as u32
    }

    fn emit_register_table(&mut self, block: Handle<Block>, register_types: Option<&mut Emitter>) {
        let module = self.module;

        // Dense numbering: block arguments first, then every result in
        // program order.
        let mut values: Vec<Value> = Vec::new();
        for index in 0..module.blocks[block].args.len() as u32 {
            values.push(Value::Arg { block, index });
        }
        for &op in &module.blocks[block].ops {
            for index in 0..module.ops[op].result_types.len() {
                values.push(Value::result(op, index));
            }
        }

        let mut use_counts = Emitter::new();
        let mut type_table = Emitter::new();
        for (number, &value) in values.iter().enumerate() {
            use_counts.emit_vbr(count_uses(module, block, value));
            let ty = &module.types[module.value_type(value)];
            type_table.emit_vbr(self.entities.type_index(ty));
            self.register_numbers.insert(value, number as u32);
        }

        self.emitter.emit_vbr(values.len());
        self.emitter.emit_emitter(&use_counts);

        if let Some(types) = register_types {
            types.emit_vbr(values.len());
            types.emit_emitter(&type_table);
        }
    }

    /// Writes each user's kernel index into the body and the user count
    /// into the header area. The terminator is not a user.
    fn emit_result_users(
        &self,
        users: &[Handle<Op>],
        kernel_list: &mut Emitter,
        kernel_body: &mut Emitter,
    ) {
        for &user in users {
            let index = *self.kernel_index.get(&user).expect("user is not a kernel");
            kernel_body.emit_int4(index);
        }
        kernel_list.emit_int4(users.len() as u32);
    }

    /// The synthetic first kernel of every function. Its results are the
    /// no-operand trigger register plus every block argument; its users are
    /// the kernels those registers unblock.
    fn emit_pseudo_kernel(&self, block: Handle<Block>, kernel_list: &mut Emitter) {
        let module = self.module;
        let num_args = module.blocks[block].args.len();

        kernel_list.emit_int4(PSEUDO_KERNEL_CODE);
        kernel_list.emit_int4(PSEUDO_KERNEL_LOCATION);
        kernel_list.emit_int4(0); // operands
        kernel_list.emit_int4(0); // attributes
        kernel_list.emit_int4(0); // functions
        kernel_list.emit_int4(num_args as u32 + 1); // results
        kernel_list.emit_int4(0); // special_metadata

        let mut body = Emitter::new();
        body.emit_int4(self.trigger_register());
        for index in 0..num_args as u32 {
            body.emit_int4(self.register_number(Value::Arg { block, index }));
        }

        // Kernels with no operands hang off the trigger result.
        let ready: Vec<Handle<Op>> = module.blocks[block]
            .ops
            .iter()
            .copied()
            .filter(|&op| {
                !module.ops[op].is_return() && module.ops[op].operands.is_empty()
            })
            .collect();
        self.emit_result_users(&ready, kernel_list, &mut body);

        for index in 0..num_args as u32 {
            let users = users_of(module, block, Value::Arg { block, index });
            self.emit_result_users(&users, kernel_list, &mut body);
        }

        debug_assert_eq!(kernel_list.len() % KERNEL_ENTRY_ALIGNMENT, 0);
        kernel_list.emit_emitter(&body);
    }

    fn emit_kernel(
        &self,
        op: Handle<Op>,
        kernel_list: &mut Emitter,
        mut attribute_names: Option<&mut Emitter>,
    ) {
        let module = self.module;
        let data = &module.ops[op];
        let block = data.parent.expect("kernel outside a block");

        kernel_list.emit_int4(self.entities.kernel_id(&data.name) as u32);
        kernel_list.emit_int4(self.index.location_position_offset(op) as u32);

        // Counts go into the header now; payloads collect in the body and
        // follow after the last header field.
        let mut body = Emitter::new();

        kernel_list.emit_int4(data.operands.len() as u32);
        for &operand in &data.operands {
            body.emit_int4(self.register_number(operand));
        }

        let mut num_functions = 0u32;
        let mut num_attributes = 0u32;
        let mut function_ids = Emitter::new();
        let mut attribute_offsets = Emitter::new();
        let mut special = 0u32;

        for (name, attr) in &data.attrs {
            if name.as_str() == weft_ir::COST_ATTR {
                continue;
            }
            if let Some(flag) = attrs::classify_special(name) {
                special |= flag;
                continue;
            }

            // Function-reference lists: one function id per element.
            if let Attr::Array(items) = attr {
                if items
                    .first()
                    .is_some_and(|first| matches!(first, Attr::SymbolRef { .. }))
                {
                    for item in items {
                        let symbol = item.flat_symbol().expect("mixed function-reference list");
                        let id = self
                            .entities
                            .function_named(symbol)
                            .expect("unresolved function reference");
                        num_functions += 1;
                        function_ids.emit_int4(id as u32);
                    }
                    continue;
                }
            }

            match attr.flat_symbol() {
                Some(symbol) if !self.units.is_compiled_ref(symbol) => {
                    let id = self
                        .entities
                        .function_named(symbol)
                        .expect("unresolved function reference");
                    num_functions += 1;
                    function_ids.emit_int4(id as u32);
                }
                _ => {
                    if let Some(names) = attribute_names.as_deref_mut() {
                        names.emit_vbr(self.index.string_offset(name));
                    }
                    num_attributes += 1;
                    attribute_offsets.emit_int4(self.index.attribute_offset(attr) as u32);
                }
            }
        }

        kernel_list.emit_int4(num_attributes);
        body.emit_emitter(&attribute_offsets);

        // Attached regions follow the function-reference attributes.
        num_functions += data.regions.len() as u32;
        for &region in &data.regions {
            function_ids.emit_int4(self.entities.function_id(region) as u32);
        }
        kernel_list.emit_int4(num_functions);
        body.emit_emitter(&function_ids);

        kernel_list.emit_int4(data.result_types.len() as u32);
        for index in 0..data.result_types.len() {
            body.emit_int4(self.register_number(Value::result(op, index)));
        }

        let debug_info_offset = self.index.debug_info_offset(op);
        if debug_info_offset.is_some() {
            special |= special_metadata::HAS_DEBUG_INFO;
        }
        kernel_list.emit_int4(special);

        for index in 0..data.result_types.len() {
            let users = users_of(module, block, Value::result(op, index));
            self.emit_result_users(&users, kernel_list, &mut body);
        }

        if let Some(offset) = debug_info_offset {
            body.emit_int4(offset as u32);
        }

        debug_assert_eq!(kernel_list.len() % KERNEL_ENTRY_ALIGNMENT, 0);
        kernel_list.emit_align(KERNEL_ENTRY_ALIGNMENT);
        kernel_list.emit_emitter(&body);
    }
}

/// Operand slots of non-terminator kernels in `block` that read `value`,
/// one entry per slot.
fn users_of(module: &Module, block: Handle<Block>, value: Value) -> Vec<Handle<Op>> {
    let mut users = Vec::new();
    for &op in &module.blocks[block].ops {
        if module.ops[op].is_return() {
            continue;
        }
        for &operand in &module.ops[op].operands {
            if operand == value {
                users.push(op);
            }
        }
    }
    users
}

/// Number of operand slots reading `value`, excluding the terminator's.
fn count_uses(module: &Module, block: Handle<Block>, value: Value) -> usize {
    users_of(module, block, value).len()
}
