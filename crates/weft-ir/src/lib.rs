//! Weft intermediate representation.
//!
//! An arena-based IR for host dataflow programs. A [`Module`] owns every
//! operation, region, and block through typed arenas; operations are generic
//! named records (opcode string, operands, result types, attributes, nested
//! regions) in the style of an extensible op set rather than a closed
//! instruction enum. The BEF backend walks this representation directly.

pub mod arena;
mod attr;
mod builder;
mod diag;
mod display;
mod location;
mod module;
mod op;
mod types;

pub use arena::{Arena, Handle, UniqueArena};
pub use attr::{Attr, DenseElem, FloatWidth, IntWidth};
pub use builder::ModuleBuilder;
pub use diag::{DiagSink, Diagnostic};
pub use display::{dump_module, dump_op};
pub use location::Location;
pub use module::Module;
pub use op::{Block, Op, Region, Value};
pub use types::{FunctionSig, Type};

/// Opcode of the dedicated function terminator.
pub const RETURN_OP: &str = "weft.return";
/// Opcode of a function declaration.
pub const FUNC_OP: &str = "weft.func";
/// Opcode of a nested module.
pub const MODULE_OP: &str = "weft.module";

/// Attribute naming a symbol-visible operation.
pub const SYM_NAME_ATTR: &str = "sym_name";
/// Marks a function as implemented natively by the host.
pub const NATIVE_ATTR: &str = "weft.native";
/// Marks a function for synchronous execution.
pub const SYNC_ATTR: &str = "weft.sync";
/// Marks a nested module as an opaquely-serialised compilation unit.
pub const COMPILED_ATTR: &str = "weft.compiled";
/// Marks a kernel as non-strict (fireable once any operand is ready).
pub const NONSTRICT_ATTR: &str = "weft.nonstrict";
/// Scheduling-cost annotation, ignored at run time.
pub const COST_ATTR: &str = "weft.cost";
