//! The SSZ type model and structural validation.
//!
//! Eight kinds, per spec.md §4.3: `uint`, `boolean`, `bit-vector`,
//! `bit-list`, `vector(T, N)`, `list(T, N_max)`, `container{f_i: T_i}`,
//! `union{variants}`. An SSZ *object* is the pair `(Def, bytes)` - `Def` is
//! never itself derived from untrusted input (it is the compile-time schema
//! for a given fork), so recursive validation terminates on the schema's own
//! depth, not on anything attacker-controlled.

use thiserror::Error;

/// One GiB - the absolute object size bound spec.md §4.3 requires.
pub const MAX_SSZ_OBJECT_BYTES: usize = 1 << 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SszError {
    #[error("object exceeds 1 GiB bound: {0} bytes")]
    ObjectTooLarge(usize),
    #[error("boolean byte must be 0 or 1, got {0}")]
    InvalidBoolean(u8),
    #[error("vector length mismatch: expected {expected}, got {got}")]
    VectorLengthMismatch { expected: usize, got: usize },
    #[error("buffer too short: wanted {wanted}, have {have}")]
    BufferTooShort { wanted: usize, have: usize },
    #[error("list offsets not strictly monotonic")]
    OffsetsNotMonotonic,
    #[error("first offset {first} must equal fixed region size {fixed}")]
    FirstOffsetMismatch { first: u32, fixed: usize },
    #[error("offset {0} out of bounds")]
    OffsetOutOfBounds(u32),
    #[error("union selector {selector} out of range ({variants} variants)")]
    InvalidUnionSelector { selector: u8, variants: usize },
    #[error("bit-list is missing its sentinel bit")]
    MissingBitListSentinel,
    #[error("bit-vector length mismatch: expected {expected} bits, got {got} bits")]
    BitVectorLengthMismatch { expected: usize, got: usize },
    #[error("list exceeds maximum length: {len} > {max}")]
    ListTooLong { len: usize, max: usize },
}

/// The SSZ type model. `Container` and `Union` own their child `Def`s so
/// schemas compose into full fork-parameterized beacon types.
#[derive(Debug, Clone)]
pub enum Def {
    Uint(UintSize),
    Boolean,
    BitVector(usize),
    BitList(usize),
    Vector(Box<Def>, usize),
    List(Box<Def>, usize),
    Container(Vec<(&'static str, Def)>),
    Union(Vec<Def>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UintSize {
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
}

impl UintSize {
    pub fn bytes(self) -> usize {
        match self {
            UintSize::U8 => 1,
            UintSize::U16 => 2,
            UintSize::U32 => 4,
            UintSize::U64 => 8,
            UintSize::U128 => 16,
            UintSize::U256 => 32,
        }
    }
}

impl Def {
    /// `is_variable_size`: true for lists, bit-lists, unions, and any
    /// container/vector that transitively contains one.
    pub fn is_variable_size(&self) -> bool {
        match self {
            Def::Uint(_) | Def::Boolean | Def::BitVector(_) => false,
            Def::BitList(_) | Def::List(_, _) | Def::Union(_) => true,
            Def::Vector(inner, _) => inner.is_variable_size(),
            Def::Container(fields) => fields.iter().any(|(_, d)| d.is_variable_size()),
        }
    }

    /// `fixed_length`: the concrete byte size for fixed types, or the
    /// 4-byte offset size for dynamic types (spec.md §4.3).
    pub fn fixed_length(&self) -> usize {
        match self {
            Def::Uint(u) => u.bytes(),
            Def::Boolean => 1,
            Def::BitVector(bits) => (bits + 7) / 8,
            Def::BitList(_) | Def::List(_, _) | Def::Union(_) => 4,
            Def::Vector(inner, n) => {
                if inner.is_variable_size() {
                    4
                } else {
                    inner.fixed_length() * n
                }
            }
            Def::Container(fields) => fields
                .iter()
                .map(|(_, d)| {
                    if d.is_variable_size() {
                        4
                    } else {
                        d.fixed_length()
                    }
                })
                .sum(),
        }
    }
}

/// Validate `bytes` against `def`. MUST be called on every object derived
/// from untrusted bytes before any other read (spec.md §4.3).
///
/// `recursive` controls whether nested containers/vectors/lists are
/// descended into; top-level callers should always pass `true` - `false` is
/// exposed for verifiers that have already validated a parent and only need
/// to re-check a freshly-sliced-out child once more defensively.
pub fn is_valid(def: &Def, bytes: &[u8], recursive: bool) -> Result<(), SszError> {
    if bytes.len() > MAX_SSZ_OBJECT_BYTES {
        return Err(SszError::ObjectTooLarge(bytes.len()));
    }
    match def {
        Def::Uint(u) => {
            if bytes.len() != u.bytes() {
                return Err(SszError::BufferTooShort {
                    wanted: u.bytes(),
                    have: bytes.len(),
                });
            }
            Ok(())
        }
        Def::Boolean => {
            if bytes.len() != 1 {
                return Err(SszError::BufferTooShort { wanted: 1, have: bytes.len() });
            }
            if bytes[0] > 1 {
                return Err(SszError::InvalidBoolean(bytes[0]));
            }
            Ok(())
        }
        Def::BitVector(bits) => {
            let expected_bytes = (bits + 7) / 8;
            if bytes.len() != expected_bytes {
                return Err(SszError::BitVectorLengthMismatch {
                    expected: *bits,
                    got: bytes.len() * 8,
                });
            }
            Ok(())
        }
        Def::BitList(max_bits) => {
            if bytes.is_empty() {
                return Err(SszError::MissingBitListSentinel);
            }
            let last = bytes[bytes.len() - 1];
            if last == 0 {
                return Err(SszError::MissingBitListSentinel);
            }
            let sentinel_bit = 7 - last.leading_zeros() as usize;
            let len = (bytes.len() - 1) * 8 + sentinel_bit;
            if len > *max_bits {
                return Err(SszError::ListTooLong { len, max: *max_bits });
            }
            Ok(())
        }
        Def::Vector(inner, n) => {
            if inner.is_variable_size() {
                let offsets = read_offsets(bytes, *n)?;
                if recursive {
                    validate_dynamic_section(inner, bytes, &offsets)?;
                }
            } else {
                let expected = inner.fixed_length() * n;
                if bytes.len() != expected {
                    return Err(SszError::VectorLengthMismatch {
                        expected,
                        got: bytes.len(),
                    });
                }
                if recursive {
                    for i in 0..*n {
                        let chunk = &bytes[i * inner.fixed_length()..(i + 1) * inner.fixed_length()];
                        is_valid(inner, chunk, true)?;
                    }
                }
            }
            Ok(())
        }
        Def::List(inner, max) => {
            if inner.is_variable_size() {
                if bytes.is_empty() {
                    return Ok(());
                }
                let first_offset = read_u32_le(bytes, 0)?;
                let n = (first_offset as usize) / 4;
                if n > *max {
                    return Err(SszError::ListTooLong { len: n, max: *max });
                }
                let offsets = read_offsets(bytes, n)?;
                if recursive {
                    validate_dynamic_section(inner, bytes, &offsets)?;
                }
            } else {
                let elem_len = inner.fixed_length();
                if elem_len == 0 {
                    return Ok(());
                }
                if bytes.len() % elem_len != 0 {
                    return Err(SszError::BufferTooShort {
                        wanted: elem_len,
                        have: bytes.len() % elem_len,
                    });
                }
                let n = bytes.len() / elem_len;
                if n > *max {
                    return Err(SszError::ListTooLong { len: n, max: *max });
                }
                if recursive {
                    for i in 0..n {
                        is_valid(inner, &bytes[i * elem_len..(i + 1) * elem_len], true)?;
                    }
                }
            }
            Ok(())
        }
        Def::Container(fields) => {
            let fixed_len = def.fixed_length();
            if bytes.len() < fixed_len {
                return Err(SszError::BufferTooShort {
                    wanted: fixed_len,
                    have: bytes.len(),
                });
            }
            let mut cursor = 0usize;
            let mut offsets: Vec<(usize, &Def)> = Vec::new();
            for (_, field_def) in fields {
                if field_def.is_variable_size() {
                    let off = read_u32_le(bytes, cursor)?;
                    if (off as usize) < fixed_len {
                        return Err(SszError::OffsetOutOfBounds(off));
                    }
                    offsets.push((off as usize, field_def));
                    cursor += 4;
                } else {
                    let len = field_def.fixed_length();
                    if recursive {
                        is_valid(field_def, &bytes[cursor..cursor + len], true)?;
                    }
                    cursor += len;
                }
            }
            if let Some((first, _)) = offsets.first() {
                if *first != fixed_len {
                    return Err(SszError::FirstOffsetMismatch {
                        first: *first as u32,
                        fixed: fixed_len,
                    });
                }
            }
            for w in offsets.windows(2) {
                if w[1].0 <= w[0].0 {
                    return Err(SszError::OffsetsNotMonotonic);
                }
            }
            if let Some((last_off, _)) = offsets.last() {
                if *last_off > bytes.len() {
                    return Err(SszError::OffsetOutOfBounds(*last_off as u32));
                }
            }
            if recursive {
                for (i, (off, field_def)) in offsets.iter().enumerate() {
                    let end = offsets.get(i + 1).map(|(o, _)| *o).unwrap_or(bytes.len());
                    is_valid(field_def, &bytes[*off..end], true)?;
                }
            }
            Ok(())
        }
        Def::Union(variants) => {
            if bytes.is_empty() {
                return Err(SszError::BufferTooShort { wanted: 1, have: 0 });
            }
            let selector = bytes[0];
            if selector as usize >= variants.len() {
                return Err(SszError::InvalidUnionSelector {
                    selector,
                    variants: variants.len(),
                });
            }
            if recursive {
                is_valid(&variants[selector as usize], &bytes[1..], true)?;
            }
            Ok(())
        }
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32, SszError> {
    if offset + 4 > bytes.len() {
        return Err(SszError::BufferTooShort {
            wanted: offset + 4,
            have: bytes.len(),
        });
    }
    Ok(u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()))
}

fn read_offsets(bytes: &[u8], n: usize) -> Result<Vec<usize>, SszError> {
    let fixed_region = n * 4;
    if bytes.len() < fixed_region {
        return Err(SszError::BufferTooShort {
            wanted: fixed_region,
            have: bytes.len(),
        });
    }
    let mut offsets = Vec::with_capacity(n);
    for i in 0..n {
        offsets.push(read_u32_le(bytes, i * 4)? as usize);
    }
    if let Some(&first) = offsets.first() {
        if first != fixed_region {
            return Err(SszError::FirstOffsetMismatch {
                first: first as u32,
                fixed: fixed_region,
            });
        }
    }
    for w in offsets.windows(2) {
        if w[1] <= w[0] {
            return Err(SszError::OffsetsNotMonotonic);
        }
    }
    if let Some(&last) = offsets.last() {
        if last > bytes.len() {
            return Err(SszError::OffsetOutOfBounds(last as u32));
        }
    }
    Ok(offsets)
}

fn validate_dynamic_section(inner: &Def, bytes: &[u8], offsets: &[usize]) -> Result<(), SszError> {
    for (i, &off) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(bytes.len());
        is_valid(inner, &bytes[off..end], true)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_length_sums_container_fields() {
        let def = Def::Container(vec![
            ("slot", Def::Uint(UintSize::U64)),
            ("proposer_index", Def::Uint(UintSize::U64)),
            ("parent_root", Def::Vector(Box::new(Def::Uint(UintSize::U8)), 32)),
        ]);
        assert_eq!(def.fixed_length(), 8 + 8 + 32);
    }

    #[test]
    fn rejects_object_over_1gib() {
        let def = Def::List(Box::new(Def::Uint(UintSize::U8)), MAX_SSZ_OBJECT_BYTES + 10);
        let bytes = vec![0u8; MAX_SSZ_OBJECT_BYTES + 1];
        assert!(matches!(
            is_valid(&def, &bytes, false),
            Err(SszError::ObjectTooLarge(_))
        ));
    }

    #[test]
    fn rejects_boolean_out_of_range() {
        let def = Def::Boolean;
        assert!(is_valid(&def, &[1], true).is_ok());
        assert!(is_valid(&def, &[0], true).is_ok());
        assert!(matches!(
            is_valid(&def, &[2], true),
            Err(SszError::InvalidBoolean(2))
        ));
    }

    #[test]
    fn rejects_non_monotonic_list_offsets() {
        // A List<List<u8>> with two elements whose offsets go backwards.
        let def = Def::List(Box::new(Def::List(Box::new(Def::Uint(UintSize::U8)), 10)), 10);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes()); // goes backwards
        assert!(matches!(
            is_valid(&def, &bytes, true),
            Err(SszError::OffsetsNotMonotonic)
        ));
    }

    #[test]
    fn bit_list_requires_sentinel() {
        let def = Def::BitList(256);
        assert!(matches!(
            is_valid(&def, &[], true),
            Err(SszError::MissingBitListSentinel)
        ));
        assert!(matches!(
            is_valid(&def, &[0x00], true),
            Err(SszError::MissingBitListSentinel)
        ));
        assert!(is_valid(&def, &[0x01], true).is_ok());
    }

    #[test]
    fn union_selector_bound() {
        let def = Def::Union(vec![Def::Uint(UintSize::U8), Def::Uint(UintSize::U8)]);
        assert!(matches!(
            is_valid(&def, &[2, 0], true),
            Err(SszError::InvalidUnionSelector { selector: 2, variants: 2 })
        ));
        assert!(is_valid(&def, &[0, 5], true).is_ok());
    }
}
