//! Attribute classification and encoding.
//!
//! Pooled attributes are encoded as a tag byte, a kind-specific header, and
//! an aligned payload; the recorded offset is the tag byte's position.
//! Scalar payloads sit at their natural alignment, so the pool's required
//! alignment ends up being the widest scalar it contains.

use weft_ir::{Attr, DenseElem, FloatWidth, IntWidth, Module, Type, NONSTRICT_ATTR};

use crate::compilation::CompilationUnits;
use crate::emitter::Emitter;
use crate::encoding::{dtype, special_metadata, AttrTag};
use crate::entities::EntityTable;

/// Maps an attribute name to the special-metadata flag it represents, if
/// any. Special attributes are never pooled.
pub fn classify_special(name: &str) -> Option<u32> {
    (name == NONSTRICT_ATTR).then_some(special_metadata::NON_STRICT)
}

/// The data-type tag for a type, when it has one. Types without a tag
/// cannot appear in type attributes or dense literals.
pub fn scalar_dtype(ty: &Type) -> Option<u8> {
    match ty {
        Type::Int(1) => Some(dtype::I1),
        Type::Int(8) => Some(dtype::I8),
        Type::Int(16) => Some(dtype::I16),
        Type::Int(32) => Some(dtype::I32),
        Type::Int(64) => Some(dtype::I64),
        Type::Float(32) => Some(dtype::F32),
        Type::Float(64) => Some(dtype::F64),
        _ => None,
    }
}

/// Can the encoder represent this attribute at all?
pub fn is_supported(module: &Module, attr: &Attr) -> bool {
    match attr {
        Attr::Unit => false,
        Attr::Type(handle) => scalar_dtype(&module.types[*handle]).is_some(),
        Attr::Array(items) => items.iter().all(|item| is_supported(module, item)),
        _ => true,
    }
}

/// Element tag and byte width when every array element is the same scalar
/// kind; such arrays get the packed encoding instead of the aggregate one.
fn uniform_scalar(items: &[Attr]) -> Option<(AttrTag, usize)> {
    let first = scalar_tag(items.first()?)?;
    items[1..]
        .iter()
        .all(|item| scalar_tag(item) == Some(first))
        .then_some(first)
}

fn scalar_tag(attr: &Attr) -> Option<(AttrTag, usize)> {
    match attr {
        Attr::Bool(_) => Some((AttrTag::Bool, 1)),
        Attr::Int { width, .. } => Some((
            match width {
                IntWidth::W8 => AttrTag::I8,
                IntWidth::W16 => AttrTag::I16,
                IntWidth::W32 => AttrTag::I32,
                IntWidth::W64 => AttrTag::I64,
            },
            width.bytes(),
        )),
        Attr::Float { width, .. } => Some((
            match width {
                FloatWidth::W32 => AttrTag::F32,
                FloatWidth::W64 => AttrTag::F64,
            },
            width.bytes(),
        )),
        Attr::Type(_) => Some((AttrTag::Type, 1)),
        _ => None,
    }
}

/// The tag this attribute encodes under, for the AttributeTypes section.
pub fn encoded_tag(units: &CompilationUnits, attr: &Attr) -> AttrTag {
    match attr {
        Attr::Bool(_) => AttrTag::Bool,
        Attr::Int { .. } | Attr::Float { .. } => scalar_tag(attr).expect("scalar").0,
        Attr::Str(_) => AttrTag::Str,
        Attr::Type(_) => AttrTag::Type,
        Attr::Shape(_) => AttrTag::Shape,
        Attr::Dense { .. } => AttrTag::Dense,
        Attr::Array(items) => {
            if items.is_empty() || uniform_scalar(items).is_some() {
                AttrTag::Array
            } else {
                AttrTag::Aggregate
            }
        }
        Attr::SymbolRef { root, .. } => {
            if units.is_compiled_ref(root) {
                AttrTag::CompilationUnit
            } else {
                AttrTag::SymbolRef
            }
        }
        Attr::Unit => unreachable!("unit attributes are rejected during collection"),
    }
}

fn dense_elem_dtype(elem: DenseElem) -> u8 {
    match elem {
        DenseElem::I8 => dtype::I8,
        DenseElem::I16 => dtype::I16,
        DenseElem::I32 => dtype::I32,
        DenseElem::I64 => dtype::I64,
        DenseElem::F32 => dtype::F32,
        DenseElem::F64 => dtype::F64,
    }
}

fn emit_scalar_payload(pool: &mut Emitter, attr: &Attr, module: &Module) {
    match attr {
        Attr::Bool(v) => pool.emit_byte(*v as u8),
        Attr::Int { value, width } => {
            let bytes = &value.to_le_bytes()[..width.bytes()];
            pool.emit_align(width.bytes());
            pool.emit_bytes(bytes);
        }
        Attr::Float { bits, width } => {
            let bytes = &bits.to_le_bytes()[..width.bytes()];
            pool.emit_align(width.bytes());
            pool.emit_bytes(bytes);
        }
        Attr::Type(handle) => {
            let tag = scalar_dtype(&module.types[*handle])
                .expect("type attribute survived collection without a data-type tag");
            pool.emit_byte(tag);
        }
        _ => unreachable!("not a scalar attribute"),
    }
}

/// Encodes one attribute into the pool, returning its offset.
///
/// Aggregate children are encoded first, depth-first; the parent record
/// then carries their offsets.
pub fn encode_attribute(
    pool: &mut Emitter,
    module: &Module,
    entities: &EntityTable,
    units: &CompilationUnits,
    attr: &Attr,
) -> usize {
    match attr {
        Attr::Bool(_) | Attr::Int { .. } | Attr::Float { .. } | Attr::Type(_) => {
            let (tag, _) = scalar_tag(attr).expect("scalar");
            let offset = pool.len();
            pool.emit_byte(tag as u8);
            emit_scalar_payload(pool, attr, module);
            offset
        }
        Attr::Str(s) => {
            let offset = pool.len();
            pool.emit_byte(AttrTag::Str as u8);
            pool.emit_vbr(s.len());
            pool.emit_bytes(s.as_bytes());
            offset
        }
        Attr::Shape(dims) => {
            let offset = pool.len();
            pool.emit_byte(AttrTag::Shape as u8);
            pool.emit_vbr(dims.len());
            pool.emit_align(8);
            for &d in dims {
                pool.emit_bytes(&d.to_le_bytes());
            }
            offset
        }
        Attr::Dense { elem, dims, data } => {
            let offset = pool.len();
            pool.emit_byte(AttrTag::Dense as u8);
            pool.emit_byte(dense_elem_dtype(*elem));
            pool.emit_vbr(dims.len());
            pool.emit_align(8);
            for &d in dims {
                pool.emit_bytes(&d.to_le_bytes());
            }
            pool.emit_align(elem.alignment());
            pool.emit_bytes(data);
            offset
        }
        Attr::Array(items) => {
            if items.is_empty() {
                let offset = pool.len();
                pool.emit_byte(AttrTag::Array as u8);
                pool.emit_byte(AttrTag::Empty as u8);
                pool.emit_vbr(0);
                return offset;
            }
            if let Some((elem_tag, width)) = uniform_scalar(items) {
                let offset = pool.len();
                pool.emit_byte(AttrTag::Array as u8);
                pool.emit_byte(elem_tag as u8);
                pool.emit_vbr(items.len());
                pool.emit_align(width);
                for item in items {
                    emit_scalar_payload(pool, item, module);
                }
                return offset;
            }
            // Mixed arrays fall back to the aggregate encoding: children
            // first, then the offset record.
            let child_offsets: Vec<usize> = items
                .iter()
                .map(|item| encode_attribute(pool, module, entities, units, item))
                .collect();
            let offset = pool.len();
            pool.emit_byte(AttrTag::Aggregate as u8);
            pool.emit_vbr(child_offsets.len());
            pool.emit_align(4);
            for child in child_offsets {
                pool.emit_bytes(&(child as u32).to_le_bytes());
            }
            offset
        }
        Attr::SymbolRef { root, nested } => {
            if units.is_compiled_ref(root) {
                let blob = units.serialize(module, root);
                let offset = pool.len();
                pool.emit_byte(AttrTag::CompilationUnit as u8);
                pool.emit_vbr(root.len());
                pool.emit_bytes(root.as_bytes());
                pool.emit_vbr(nested.len());
                for name in nested {
                    pool.emit_vbr(name.len());
                    pool.emit_bytes(name.as_bytes());
                }
                pool.emit_vbr(blob.len());
                pool.emit_bytes(&blob);
                offset
            } else {
                let index = entities
                    .function_named(root)
                    .expect("symbol reference survived collection unresolved");
                let offset = pool.len();
                pool.emit_byte(AttrTag::SymbolRef as u8);
                pool.emit_align(4);
                pool.emit_bytes(&(index as u32).to_le_bytes());
                offset
            }
        }
        Attr::Unit => unreachable!("unit attributes are rejected during collection"),
    }
}
