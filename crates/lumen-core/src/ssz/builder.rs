//! `SszBuilder`: incremental encoder for containers, lists, and unions.
//!
//! Fixed-size fields are written in place; variable-size fields are written
//! to a side buffer and patched in as a 4-byte little-endian offset once the
//! fixed region's total size is known, mirroring how `types::is_valid`
//! expects to decode them back.

pub struct SszBuilder {
    fixed: Vec<u8>,
    // (offset position within `fixed` to patch, bytes to append)
    dynamic: Vec<(usize, Vec<u8>)>,
}

impl SszBuilder {
    pub fn new() -> Self {
        SszBuilder {
            fixed: Vec::new(),
            dynamic: Vec::new(),
        }
    }

    /// Append a fixed-size field's raw encoding.
    pub fn push_fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.fixed.extend_from_slice(bytes);
        self
    }

    /// Reserve a 4-byte offset slot for a variable-size field, to be filled
    /// in with `bytes`'s eventual position once `finish` lays out the
    /// dynamic region.
    pub fn push_dynamic(&mut self, bytes: Vec<u8>) -> &mut Self {
        let slot = self.fixed.len();
        self.fixed.extend_from_slice(&[0u8; 4]);
        self.dynamic.push((slot, bytes));
        self
    }

    /// Encode a list of fixed-size elements by concatenation (no offsets).
    pub fn encode_fixed_list(elements: &[Vec<u8>]) -> Vec<u8> {
        elements.concat()
    }

    /// Encode a list of variable-size elements: offset table followed by
    /// concatenated element bytes, offsets relative to the start of the list.
    pub fn encode_variable_list(elements: &[Vec<u8>]) -> Vec<u8> {
        let table_len = elements.len() * 4;
        let mut out = vec![0u8; table_len];
        let mut cursor = table_len;
        for (i, elem) in elements.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&(cursor as u32).to_le_bytes());
            out.extend_from_slice(elem);
            cursor += elem.len();
        }
        out
    }

    /// Encode a union: selector byte followed by the variant's encoding.
    pub fn encode_union(selector: u8, variant_bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + variant_bytes.len());
        out.push(selector);
        out.extend_from_slice(variant_bytes);
        out
    }

    /// Lay out the dynamic region after the fixed region and patch every
    /// reserved offset slot, returning the completed container encoding.
    pub fn finish(mut self) -> Vec<u8> {
        let fixed_len = self.fixed.len();
        let mut dynamic_bytes = Vec::new();
        let mut cursor = fixed_len;
        for (slot, bytes) in &self.dynamic {
            let offset = cursor as u32;
            self.fixed[*slot..*slot + 4].copy_from_slice(&offset.to_le_bytes());
            dynamic_bytes.extend_from_slice(bytes);
            cursor += bytes.len();
        }
        self.fixed.extend_from_slice(&dynamic_bytes);
        self.fixed
    }
}

impl Default for SszBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssz::types::{is_valid, Def, UintSize};

    #[test]
    fn container_with_trailing_dynamic_field_round_trips() {
        let mut b = SszBuilder::new();
        b.push_fixed(&7u64.to_le_bytes());
        b.push_dynamic(vec![1, 2, 3, 4, 5]);
        let encoded = b.finish();

        let def = Def::Container(vec![
            ("a", Def::Uint(UintSize::U64)),
            ("b", Def::List(Box::new(Def::Uint(UintSize::U8)), 10)),
        ]);
        assert!(is_valid(&def, &encoded, true).is_ok());
        assert_eq!(&encoded[12..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn variable_list_offsets_are_self_consistent() {
        let elements = vec![vec![1, 2], vec![3, 4, 5], vec![]];
        let encoded = SszBuilder::encode_variable_list(&elements);
        let def = Def::List(Box::new(Def::List(Box::new(Def::Uint(UintSize::U8)), 10)), 10);
        assert!(is_valid(&def, &encoded, true).is_ok());
    }
}
