//! Stream assignment over a single block.

use std::collections::{HashMap, HashSet};

use weft_ir::{Block, Handle, Module, Op, Value};

/// A concurrency-partition identifier.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Stream(u32);

impl Stream {
    /// Numeric id recorded in kernel headers.
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Assigns a stream to every non-terminator op of a block.
///
/// The policy keeps a kernel on its producer's stream when it is the first
/// consumer of that producer (the executor can then run the pair back to
/// back); every other kernel opens a new stream. Stream 0 is the root
/// stream, reserved for the argument-dispatch pseudo kernel.
///
/// Assignment only depends on block order, so repeated analysis of the same
/// block yields identical ids.
pub struct StreamAnalysis {
    streams: HashMap<Handle<Op>, Stream>,
    root: Stream,
}

impl StreamAnalysis {
    pub fn new(module: &Module, block: Handle<Block>) -> Self {
        let root = Stream(0);
        let mut next = 1u32;
        let mut streams = HashMap::new();
        let mut claimed_producers: HashSet<Handle<Op>> = HashSet::new();

        for &op in &module.blocks[block].ops {
            let data = &module.ops[op];
            if data.is_return() {
                continue;
            }

            let inherited = data.operands.first().and_then(|&operand| {
                let Value::Result { op: producer, .. } = operand else {
                    return None;
                };
                let producer_stream = *streams.get(&producer)?;
                claimed_producers
                    .insert(producer)
                    .then_some(producer_stream)
            });

            let stream = inherited.unwrap_or_else(|| {
                let fresh = Stream(next);
                next += 1;
                fresh
            });
            streams.insert(op, stream);
        }

        Self { streams, root }
    }

    /// The stream the pseudo kernel runs on.
    pub fn root_stream(&self) -> Stream {
        self.root
    }

    /// The stream assigned to a kernel op.
    pub fn stream(&self, op: Handle<Op>) -> Stream {
        *self
            .streams
            .get(&op)
            .expect("op was not part of the analysed block")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Location, ModuleBuilder};

    #[test]
    fn chain_stays_on_one_stream() {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.int_type(32);
        let (_, block, args) = b.func("f", &[i32_ty], &[i32_ty], false);
        let first = b.op_in(
            block,
            "demo.inc",
            vec![args[0]],
            vec![i32_ty],
            Location::Unknown,
        );
        let second = b.op_in(
            block,
            "demo.inc",
            vec![Value::result(first, 0)],
            vec![i32_ty],
            Location::Unknown,
        );
        b.ret_in(block, vec![Value::result(second, 0)]);
        let module = b.module();

        let analysis = StreamAnalysis::new(&module, block);
        assert_eq!(analysis.stream(first), analysis.stream(second));
        assert_ne!(analysis.stream(first), analysis.root_stream());
    }

    #[test]
    fn second_consumer_forks_a_stream() {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.int_type(32);
        let (_, block, args) = b.func("f", &[i32_ty], &[i32_ty], false);
        let source = b.op_in(
            block,
            "demo.inc",
            vec![args[0]],
            vec![i32_ty],
            Location::Unknown,
        );
        let left = b.op_in(
            block,
            "demo.inc",
            vec![Value::result(source, 0)],
            vec![i32_ty],
            Location::Unknown,
        );
        let right = b.op_in(
            block,
            "demo.inc",
            vec![Value::result(source, 0)],
            vec![i32_ty],
            Location::Unknown,
        );
        b.ret_in(block, vec![Value::result(right, 0)]);
        let module = b.module();

        let analysis = StreamAnalysis::new(&module, block);
        assert_eq!(analysis.stream(source), analysis.stream(left));
        assert_ne!(analysis.stream(source), analysis.stream(right));
    }

    #[test]
    fn root_stream_is_not_assigned_to_kernels() {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.int_type(32);
        let (_, block, _) = b.func("f", &[], &[], false);
        let konst = b.op_in(block, "demo.constant", vec![], vec![i32_ty], Location::Unknown);
        b.ret_in(block, vec![]);
        let module = b.module();

        let analysis = StreamAnalysis::new(&module, block);
        assert_eq!(analysis.root_stream().id(), 0);
        assert_ne!(analysis.stream(konst).id(), 0);
    }

    #[test]
    fn deterministic_across_runs() {
        let build = || {
            let mut b = ModuleBuilder::new();
            let i32_ty = b.int_type(32);
            let (_, block, args) = b.func("f", &[i32_ty, i32_ty], &[i32_ty], false);
            let x = b.op_in(
                block,
                "demo.add",
                vec![args[0], args[1]],
                vec![i32_ty],
                Location::Unknown,
            );
            let y = b.op_in(
                block,
                "demo.mul",
                vec![Value::result(x, 0), args[1]],
                vec![i32_ty],
                Location::Unknown,
            );
            b.ret_in(block, vec![Value::result(y, 0)]);
            let module = b.module();
            let analysis = StreamAnalysis::new(&module, block);
            (analysis.stream(x).id(), analysis.stream(y).id())
        };
        assert_eq!(build(), build());
    }
}
