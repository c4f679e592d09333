//! Stream analysis for weft IR.
//!
//! Partitions the operations of a block into *streams*: chains of kernels
//! the executor may run on one concurrency lane without handoff. The BEF
//! emitter records a stream id with every kernel header.

mod stream;

pub use stream::{Stream, StreamAnalysis};
