//! Display implementations and the textual module dump.
//!
//! The dump is deterministic for a given module, which matters: compiled
//! sub-modules are serialised into BEF attributes through it.

use std::collections::HashMap;
use std::fmt;

use crate::arena::Handle;
use crate::attr::{Attr, DenseElem, FloatWidth, IntWidth};
use crate::module::Module;
use crate::op::{Op, Value};
use crate::types::Type;

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Float(bits) => write!(f, "f{bits}"),
            Self::Chain => write!(f, "!weft.chain"),
            Self::Str => write!(f, "!weft.string"),
            Self::TensorHandle => write!(f, "!weft.tensor"),
            Self::Opaque(spelling) => f.write_str(spelling),
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int { value, width } => {
                let bits = match width {
                    IntWidth::W8 => 8,
                    IntWidth::W16 => 16,
                    IntWidth::W32 => 32,
                    IntWidth::W64 => 64,
                };
                write!(f, "{value} : i{bits}")
            }
            Self::Float { bits, width } => match width {
                FloatWidth::W32 => write!(f, "{:?} : f32", f32::from_bits(*bits as u32)),
                FloatWidth::W64 => write!(f, "{:?} : f64", f64::from_bits(*bits)),
            },
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Type(handle) => write!(f, "type(#{})", handle.index()),
            Self::Shape(dims) => {
                write!(f, "shape<")?;
                for (i, d) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, "x")?;
                    }
                    write!(f, "{d}")?;
                }
                write!(f, ">")
            }
            Self::Dense { elem, dims, data } => {
                let elem = match elem {
                    DenseElem::I8 => "i8",
                    DenseElem::I16 => "i16",
                    DenseElem::I32 => "i32",
                    DenseElem::I64 => "i64",
                    DenseElem::F32 => "f32",
                    DenseElem::F64 => "f64",
                };
                write!(f, "dense<{elem}, {dims:?}, {} bytes>", data.len())
            }
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::SymbolRef { root, nested } => {
                write!(f, "@{root}")?;
                for n in nested {
                    write!(f, "::@{n}")?;
                }
                Ok(())
            }
        }
    }
}

/// Renders a whole module as text.
pub fn dump_module(module: &Module) -> String {
    let mut printer = Printer::new(module);
    for &op in module.top_level_ops() {
        printer.print_op(op, 0);
    }
    printer.out
}

/// Renders one op (with its nested regions) as text.
pub fn dump_op(module: &Module, op: Handle<Op>) -> String {
    let mut printer = Printer::new(module);
    printer.print_op(op, 0);
    printer.out
}

struct Printer<'a> {
    module: &'a Module,
    out: String,
    names: HashMap<Value, String>,
    next_result: usize,
}

impl<'a> Printer<'a> {
    fn new(module: &'a Module) -> Self {
        Self {
            module,
            out: String::new(),
            names: HashMap::new(),
            next_result: 0,
        }
    }

    fn value_name(&self, value: Value) -> String {
        self.names
            .get(&value)
            .cloned()
            .unwrap_or_else(|| "%?".to_string())
    }

    fn print_op(&mut self, handle: Handle<Op>, indent: usize) {
        use fmt::Write as _;

        let module = self.module;
        let op = &module.ops[handle];
        let pad = "  ".repeat(indent);
        let mut line = String::new();

        let mut result_names = Vec::new();
        for i in 0..op.result_types.len() {
            let name = format!("%{}", self.next_result);
            self.next_result += 1;
            self.names.insert(Value::result(handle, i), name.clone());
            result_names.push(name);
        }
        if !result_names.is_empty() {
            let _ = write!(line, "{} = ", result_names.join(", "));
        }

        let _ = write!(line, "{}", op.name);
        if let Some(sym) = op.symbol_name() {
            let _ = write!(line, " @{sym}");
        }
        if !op.operands.is_empty() {
            let operands: Vec<_> = op.operands.iter().map(|&v| self.value_name(v)).collect();
            let _ = write!(line, "({})", operands.join(", "));
        }

        let visible_attrs: Vec<_> = op
            .attrs
            .iter()
            .filter(|(k, _)| k.as_str() != crate::SYM_NAME_ATTR)
            .map(|(k, v)| format!("{k} = {v}"))
            .collect();
        if !visible_attrs.is_empty() {
            let _ = write!(line, " {{{}}}", visible_attrs.join(", "));
        }

        if !op.result_types.is_empty() {
            let types: Vec<_> = op
                .result_types
                .iter()
                .map(|&t| module.types[t].to_string())
                .collect();
            let _ = write!(line, " : {}", types.join(", "));
        }

        self.out.push_str(&pad);
        self.out.push_str(&line);
        if op.regions.is_empty() {
            self.out.push('\n');
            return;
        }

        self.out.push_str(" {\n");
        for &region in &op.regions {
            for &block in &module.regions[region].blocks {
                let block_data = &module.blocks[block];
                if !block_data.args.is_empty() {
                    let mut header = Vec::new();
                    for (i, &ty) in block_data.args.iter().enumerate() {
                        let name = format!("%arg{i}");
                        self.names.insert(
                            Value::Arg {
                                block,
                                index: i as u32,
                            },
                            name.clone(),
                        );
                        header.push(format!("{name}: {}", module.types[ty]));
                    }
                    let _ = writeln!(self.out, "{pad}  ^bb({}):", header.join(", "));
                }
                for &inner in &block_data.ops {
                    self.print_op(inner, indent + 1);
                }
            }
        }
        self.out.push_str(&pad);
        self.out.push_str("}\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModuleBuilder;
    use crate::location::Location;

    #[test]
    fn type_names() {
        assert_eq!(Type::Int(32).to_string(), "i32");
        assert_eq!(Type::Float(64).to_string(), "f64");
        assert_eq!(Type::Chain.to_string(), "!weft.chain");
        assert_eq!(Type::Opaque("!demo.buf".into()).to_string(), "!demo.buf");
    }

    #[test]
    fn attr_rendering() {
        assert_eq!(Attr::i32(7).to_string(), "7 : i32");
        assert_eq!(Attr::str("hi").to_string(), "\"hi\"");
        assert_eq!(Attr::symbol("f").to_string(), "@f");
        assert_eq!(
            Attr::nested_symbol("unit", vec!["f".into()]).to_string(),
            "@unit::@f"
        );
        assert_eq!(Attr::Shape(vec![2, -1]).to_string(), "shape<2x-1>");
    }

    #[test]
    fn dump_is_deterministic() {
        let build = || {
            let mut b = ModuleBuilder::new();
            let i32_ty = b.int_type(32);
            let (_, block, args) = b.func("add", &[i32_ty, i32_ty], &[i32_ty], false);
            let sum = b.op_in(
                block,
                "demo.add",
                vec![args[0], args[1]],
                vec![i32_ty],
                Location::Unknown,
            );
            b.ret_in(block, vec![Value::result(sum, 0)]);
            dump_module(&b.module())
        };
        let first = build();
        assert_eq!(first, build());
        assert!(first.contains("weft.func @add"));
        assert!(first.contains("demo.add(%arg0, %arg1)"));
    }
}
