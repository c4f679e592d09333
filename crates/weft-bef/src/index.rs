//! Second pass: byte offsets for collected entities.
//!
//! Filled in while the pooled sections are emitted, then read by the
//! function emitter for every cross-reference. A lookup miss here is a bug
//! in collection, not bad input, so lookups panic.

use std::collections::HashMap;

use weft_ir::{Attr, Handle, Op};

/// Offsets of pooled entities within their sections.
#[derive(Default)]
pub struct EntityIndex {
    strings: HashMap<String, usize>,
    attribute_offsets: HashMap<Attr, usize>,
    location_positions: HashMap<Handle<Op>, usize>,
    debug_info: HashMap<Handle<Op>, usize>,
}

impl EntityIndex {
    /// Records a string's offset in the Strings section.
    pub fn add_string(&mut self, s: &str, offset: usize) {
        let previous = self.strings.insert(s.to_string(), offset);
        assert!(previous.is_none(), "string {s:?} indexed twice");
    }

    pub fn string_offset(&self, s: &str) -> usize {
        *self
            .strings
            .get(s)
            .unwrap_or_else(|| panic!("string {s:?} was not added to the string pool"))
    }

    /// Records a pooled attribute's offset in the Attributes section.
    pub fn add_attribute(&mut self, attr: &Attr, offset: usize) {
        let previous = self.attribute_offsets.insert(attr.clone(), offset);
        assert!(previous.is_none(), "attribute indexed twice");
    }

    pub fn attribute_offset(&self, attr: &Attr) -> usize {
        *self
            .attribute_offsets
            .get(attr)
            .expect("attribute was not added to the attribute pool")
    }

    /// Records where an op's position tuple was written.
    pub fn add_location_position(&mut self, op: Handle<Op>, offset: usize) {
        self.location_positions.insert(op, offset);
    }

    pub fn location_position_offset(&self, op: Handle<Op>) -> usize {
        *self
            .location_positions
            .get(&op)
            .expect("op has no collected location")
    }

    /// Records where an op's debug string was written.
    pub fn add_debug_info(&mut self, op: Handle<Op>, offset: usize) {
        self.debug_info.insert(op, offset);
    }

    pub fn debug_info_offset(&self, op: Handle<Op>) -> Option<usize> {
        self.debug_info.get(&op).copied()
    }
}
