//! A minimal BEF reader, just enough to check emitted artifacts.

use std::collections::HashMap;

/// Sequential reader over a byte slice.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pub pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    pub fn u8(&mut self) -> u8 {
        let byte = self.bytes[self.pos];
        self.pos += 1;
        byte
    }

    pub fn u32(&mut self) -> u32 {
        let value = u32::from_le_bytes(self.bytes[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        value
    }

    pub fn vbr(&mut self) -> usize {
        let mut value = 0usize;
        loop {
            let byte = self.u8();
            value = (value << 7) | (byte & 0x7F) as usize;
            if byte & 0x80 == 0 {
                return value;
            }
        }
    }

    pub fn align(&mut self, alignment: usize) {
        self.pos = self.pos.next_multiple_of(alignment);
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

/// A parsed BEF file: section id to payload.
pub struct Bef {
    pub sections: HashMap<u8, Vec<u8>>,
}

pub fn parse_bef(bytes: &[u8]) -> Bef {
    assert_eq!(&bytes[..3], &[0x0B, 0xEF, 0x00], "bad magic");
    let mut sections = HashMap::new();
    let mut r = Reader::at(bytes, 3);
    while r.remaining() > 0 {
        // Trailing zero padding up to the 8-byte buffer alignment.
        if bytes[r.pos..].iter().all(|&b| b == 0) {
            break;
        }
        let id = r.u8();
        let header = r.vbr();
        let length = header >> 1;
        if header & 1 != 0 {
            let alignment = r.u8() as usize;
            r.align(alignment);
        }
        let payload = bytes[r.pos..r.pos + length].to_vec();
        r.pos += length;
        let previous = sections.insert(id, payload);
        assert!(previous.is_none(), "section {id} appears twice");
    }
    Bef { sections }
}

impl Bef {
    pub fn section(&self, id: u8) -> &[u8] {
        self.sections
            .get(&id)
            .unwrap_or_else(|| panic!("missing section {id}"))
    }
}

/// NUL-terminated string at `offset` in a pooled section.
pub fn string_at(payload: &[u8], offset: usize) -> String {
    let end = payload[offset..]
        .iter()
        .position(|&b| b == 0)
        .expect("unterminated string")
        + offset;
    String::from_utf8(payload[offset..end].to_vec()).unwrap()
}

pub struct FunctionIndexEntry {
    pub kind: u8,
    pub offset: usize,
    pub name_offset: usize,
    pub inputs: Vec<usize>,
    pub results: Vec<usize>,
}

pub fn parse_function_index(payload: &[u8]) -> Vec<FunctionIndexEntry> {
    let mut r = Reader::new(payload);
    let count = r.vbr();
    (0..count)
        .map(|_| {
            let kind = r.u8();
            let offset = r.vbr();
            let name_offset = r.vbr();
            let num_inputs = r.vbr();
            let inputs = (0..num_inputs).map(|_| r.vbr()).collect();
            let num_results = r.vbr();
            let results = (0..num_results).map(|_| r.vbr()).collect();
            FunctionIndexEntry {
                kind,
                offset,
                name_offset,
                inputs,
                results,
            }
        })
        .collect()
}

pub struct ParsedKernel {
    pub code: u32,
    pub location: u32,
    pub num_operands: u32,
    pub num_attributes: u32,
    pub num_functions: u32,
    pub num_results: u32,
    pub special: u32,
    pub operands: Vec<u32>,
    pub attribute_offsets: Vec<u32>,
    pub function_ids: Vec<u32>,
    pub results: Vec<u32>,
    /// Per result, the kernel indices of its users.
    pub users: Vec<Vec<u32>>,
    pub debug_offset: Option<u32>,
}

pub struct ParsedFunction {
    pub location_offset: usize,
    pub use_counts: Vec<usize>,
    /// `(kernel list offset, operands before fireable, stream id)`.
    pub headers: Vec<(usize, usize, usize)>,
    pub result_registers: Vec<usize>,
    pub kernels: Vec<ParsedKernel>,
}

pub fn parse_function(payload: &[u8], entry: &FunctionIndexEntry) -> ParsedFunction {
    let mut r = Reader::at(payload, entry.offset);
    let location_offset = r.vbr();
    let num_registers = r.vbr();
    let use_counts = (0..num_registers).map(|_| r.vbr()).collect();
    let num_kernels = r.vbr();
    let headers: Vec<(usize, usize, usize)> = (0..num_kernels)
        .map(|_| (r.vbr(), r.vbr(), r.vbr()))
        .collect();
    let result_registers = (0..entry.results.len()).map(|_| r.vbr()).collect();
    r.align(4);
    let list_base = r.pos;

    let kernels = headers
        .iter()
        .map(|&(offset, _, _)| {
            assert_eq!(offset % 4, 0, "kernel entry is misaligned");
            parse_kernel(payload, list_base + offset)
        })
        .collect();

    ParsedFunction {
        location_offset,
        use_counts,
        headers,
        result_registers,
        kernels,
    }
}

fn parse_kernel(payload: &[u8], pos: usize) -> ParsedKernel {
    let mut r = Reader::at(payload, pos);
    let code = r.u32();
    let location = r.u32();
    let num_operands = r.u32();
    let num_attributes = r.u32();
    let num_functions = r.u32();
    let num_results = r.u32();
    let special = r.u32();
    let user_counts: Vec<u32> = (0..num_results).map(|_| r.u32()).collect();

    let operands = (0..num_operands).map(|_| r.u32()).collect();
    let attribute_offsets = (0..num_attributes).map(|_| r.u32()).collect();
    let function_ids = (0..num_functions).map(|_| r.u32()).collect();
    let results = (0..num_results).map(|_| r.u32()).collect();
    let users = user_counts
        .iter()
        .map(|&count| (0..count).map(|_| r.u32()).collect())
        .collect();
    let debug_offset = (special & 2 != 0).then(|| r.u32());

    ParsedKernel {
        code,
        location,
        num_operands,
        num_attributes,
        num_functions,
        num_results,
        special,
        operands,
        attribute_offsets,
        function_ids,
        results,
        users,
        debug_offset,
    }
}
