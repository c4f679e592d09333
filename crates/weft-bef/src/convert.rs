//! Module emission and the `convert` entry point.

use weft_ir::{DiagSink, FunctionSig, Module};

use crate::attrs;
use crate::compilation::CompilationUnits;
use crate::emitter::Emitter;
use crate::encoding::{
    FunctionKind, SectionId, BEF_MAGIC_1, BEF_MAGIC_2, BEF_VERSION_0,
};
use crate::entities::EntityTable;
use crate::function::FunctionEmitter;
use crate::index::EntityIndex;

/// Conversion options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConvertOptions {
    /// Skip the AttributeTypes, AttributeNames, and RegisterTypes sections.
    /// The executor ignores them; tooling reads them.
    pub disable_optional_sections: bool,
}

/// Converts a module to BEF bytes.
///
/// On any collection failure the result is empty and at least one
/// diagnostic has been reported to `diags`.
pub fn convert(module: &Module, options: &ConvertOptions, diags: &mut dyn DiagSink) -> Vec<u8> {
    let units = CompilationUnits::new(module);
    let entities = match EntityTable::collect(
        module,
        &units,
        !options.disable_optional_sections,
        diags,
    ) {
        Ok(entities) => entities,
        Err(_) => return Vec::new(),
    };

    let mut emitter = ModuleEmitter {
        module,
        units,
        entities,
        index: EntityIndex::default(),
        out: Emitter::new(),
    };

    emitter
        .out
        .emit_bytes(&[BEF_MAGIC_1, BEF_MAGIC_2, BEF_VERSION_0]);

    let mut attribute_types = Emitter::new();
    let mut attribute_names = Emitter::new();
    let mut register_types = Emitter::new();
    let optional = !options.disable_optional_sections;

    emitter.emit_location_info();
    emitter.emit_debug_info();
    emitter.emit_strings();
    emitter.emit_attributes(optional.then_some(&mut attribute_types));
    emitter.emit_kernels();
    emitter.emit_types();
    emitter.emit_functions(
        optional.then_some(&mut attribute_names),
        optional.then_some(&mut register_types),
    );

    if optional {
        emitter
            .out
            .emit_section(SectionId::AttributeTypes, &attribute_types);
        emitter
            .out
            .emit_section(SectionId::AttributeNames, &attribute_names);
        emitter
            .out
            .emit_section(SectionId::RegisterTypes, &register_types);
    }

    emitter.out.emit_align(8);
    emitter.out.take_bytes()
}

struct ModuleEmitter<'a> {
    module: &'a Module,
    units: CompilationUnits,
    entities: EntityTable,
    index: EntityIndex,
    out: Emitter,
}

impl ModuleEmitter<'_> {
    fn emit_location_info(&mut self) {
        let mut filenames = Emitter::new();
        for name in &self.entities.location_filenames {
            filenames.emit_bytes(name.as_bytes());
            filenames.emit_byte(0);
        }
        self.out
            .emit_section(SectionId::LocationFilenames, &filenames);

        let mut positions = Emitter::new();
        for (&op, &(filename, line, col)) in &self.entities.location_positions {
            self.index.add_location_position(op, positions.len());
            positions.emit_vbr(filename);
            positions.emit_vbr(line as usize);
            positions.emit_vbr(col as usize);
        }
        self.out
            .emit_section(SectionId::LocationPositions, &positions);
    }

    fn emit_debug_info(&mut self) {
        let mut section = Emitter::new();
        for (&op, name) in &self.entities.debug_info {
            self.index.add_debug_info(op, section.len());
            section.emit_bytes(name.as_bytes());
            section.emit_byte(0);
        }
        self.out.emit_section(SectionId::DebugInfo, &section);
    }

    fn emit_strings(&mut self) {
        // The collection set is sorted, so offsets are stable.
        let mut section = Emitter::new();
        for s in &self.entities.strings {
            self.index.add_string(s, section.len());
            section.emit_bytes(s.as_bytes());
            section.emit_byte(0);
        }
        self.out.emit_section(SectionId::Strings, &section);
    }

    fn emit_attributes(&mut self, attribute_types: Option<&mut Emitter>) {
        let mut pool = Emitter::new();
        let mut type_entries = Emitter::new();
        for attr in &self.entities.attributes {
            let offset =
                attrs::encode_attribute(&mut pool, self.module, &self.entities, &self.units, attr);
            self.index.add_attribute(attr, offset);
            type_entries.emit_vbr(offset);
            type_entries.emit_vbr(attrs::encoded_tag(&self.units, attr) as usize);
        }
        if let Some(types) = attribute_types {
            types.emit_vbr(self.entities.attributes.len());
            types.emit_emitter(&type_entries);
        }
        self.out.emit_section(SectionId::Attributes, &pool);
    }

    fn emit_kernels(&mut self) {
        let mut section = Emitter::new();
        section.emit_vbr(self.entities.kernels.len());
        for name in &self.entities.kernels {
            section.emit_vbr(self.index.string_offset(name));
        }
        self.out.emit_section(SectionId::Kernels, &section);
    }

    fn emit_types(&mut self) {
        let mut section = Emitter::new();
        section.emit_vbr(self.entities.types.len());
        for ty in &self.entities.types {
            section.emit_vbr(self.index.string_offset(&ty.to_string()));
        }
        self.out.emit_section(SectionId::Types, &section);
    }

    fn emit_functions(
        &mut self,
        mut attribute_names: Option<&mut Emitter>,
        mut register_types: Option<&mut Emitter>,
    ) {
        let ModuleEmitter {
            module,
            units,
            entities,
            index,
            out,
        } = self;
        let module = *module;

        if let Some(names) = attribute_names.as_deref_mut() {
            names.emit_vbr(entities.functions.len());
        }
        if let Some(types) = register_types.as_deref_mut() {
            types.emit_vbr(entities.functions.len());
        }

        let mut function_emitter = FunctionEmitter::new(module, entities, index, units);
        let mut index_entries: Vec<(FunctionKind, usize, usize, &FunctionSig)> = Vec::new();
        for entry in &entities.functions {
            index_entries.push((
                entry.kind,
                function_emitter.emitter.len(),
                index.string_offset(&entry.name),
                &entry.sig,
            ));
            if !entry.is_native() {
                let region = entry.region.expect("non-native function without a region");
                function_emitter.emit_function(
                    region,
                    attribute_names.as_deref_mut(),
                    register_types.as_deref_mut(),
                );
            }
        }

        // The index is written before the bodies; both reference the same
        // function offsets.
        let mut index_section = Emitter::new();
        index_section.emit_vbr(index_entries.len());
        for (kind, offset, name_offset, sig) in index_entries {
            index_section.emit_byte(kind as u8);
            index_section.emit_vbr(offset);
            index_section.emit_vbr(name_offset);
            index_section.emit_vbr(sig.inputs.len());
            for &ty in &sig.inputs {
                index_section.emit_vbr(entities.type_index(&module.types[ty]));
            }
            index_section.emit_vbr(sig.results.len());
            for &ty in &sig.results {
                index_section.emit_vbr(entities.type_index(&module.types[ty]));
            }
        }

        out.emit_section(SectionId::FunctionIndex, &index_section);
        out.emit_section(SectionId::Functions, &function_emitter.emitter);
    }
}
