//! BEF backend for weft IR.
//!
//! Converts a [`weft_ir::Module`] into BEF, the compact, self-describing
//! binary format the asynchronous executor consumes. The converter runs in
//! three passes: collect every referenced entity ([`EntityTable`]), lay out
//! the pooled sections while recording offsets ([`EntityIndex`]), then emit
//! one kernel table per function body.

mod attrs;
mod compilation;
mod convert;
mod emitter;
pub mod encoding;
mod entities;
mod error;
mod function;
mod index;

pub use compilation::CompilationUnits;
pub use convert::{convert, ConvertOptions};
pub use emitter::{vbr_size, Emitter};
pub use encoding::{FunctionKind, SectionId};
pub use entities::{EntityTable, FunctionEntry};
pub use error::{ConversionFailed, ConvertError};
pub use index::EntityIndex;
