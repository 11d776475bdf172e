//! Hash-tree-root, generalized indices, and Merkle proof verification.
//!
//! Chunking follows spec.md §4.3: bytes are split into 32-byte chunks,
//! padded to a power-of-two chunk count with zero chunks, and combined
//! bottom-up with SHA-256. The recursion through `hash_tree_root` is bounded
//! by the schema's own nesting depth (never by attacker-controlled data),
//! so an explicit stack/iterative rewrite is unnecessary for correctness -
//! the container/vector/list cases below are already `O(log2(chunks))`
//! deep per spec.md's bound.

use std::collections::HashMap;

use super::types::{Def, SszError, UintSize};
use crate::crypto::sha256_pair;

fn is_basic(def: &Def) -> bool {
    matches!(def, Def::Uint(_) | Def::Boolean)
}

pub(crate) fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

/// Split `data` into 32-byte chunks, zero-padding the final chunk, then pad
/// the chunk list itself with zero chunks up to `limit_chunks` (already a
/// power of two). `limit_chunks` must be >= the number of data chunks.
pub(crate) fn merkleize(leaves: &[[u8; 32]], limit_chunks: usize) -> [u8; 32] {
    let width = next_pow2(limit_chunks.max(leaves.len()).max(1));
    let mut layer: Vec<[u8; 32]> = Vec::with_capacity(width);
    layer.extend_from_slice(leaves);
    layer.resize(width, [0u8; 32]);

    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len() / 2);
        for pair in layer.chunks(2) {
            next.push(sha256_pair(&pair[0], &pair[1]));
        }
        layer = next;
    }
    layer[0]
}

pub(crate) fn pack_bytes(data: &[u8]) -> Vec<[u8; 32]> {
    let mut chunks = Vec::with_capacity((data.len() + 31) / 32);
    for chunk in data.chunks(32) {
        let mut c = [0u8; 32];
        c[..chunk.len()].copy_from_slice(chunk);
        chunks.push(c);
    }
    if chunks.is_empty() {
        chunks.push([0u8; 32]);
    }
    chunks
}

pub(crate) fn mix_in_length(root: [u8; 32], length: usize) -> [u8; 32] {
    let mut len_chunk = [0u8; 32];
    len_chunk[..8].copy_from_slice(&(length as u64).to_le_bytes());
    sha256_pair(&root, &len_chunk)
}

fn mix_in_selector(value_root: [u8; 32], selector: u8) -> [u8; 32] {
    let mut sel_chunk = [0u8; 32];
    sel_chunk[0] = selector;
    sha256_pair(&value_root, &sel_chunk)
}

/// Compute `hash_tree_root(def, bytes)`. Caller MUST have validated `bytes`
/// against `def` with `types::is_valid` first.
pub fn hash_tree_root(def: &Def, bytes: &[u8]) -> [u8; 32] {
    match def {
        Def::Uint(_) | Def::Boolean => pack_bytes(bytes)[0],
        Def::BitVector(_) => merkleize(&pack_bytes(bytes), (bytes.len() + 31) / 32),
        Def::BitList(max_bits) => {
            let (data, bit_len) = strip_bitlist_sentinel(bytes);
            let limit_chunks = next_pow2((max_bits + 255) / 256);
            let root = merkleize(&pack_bytes(&data), limit_chunks);
            mix_in_length(root, bit_len)
        }
        Def::Vector(inner, n) => {
            if is_basic(inner.as_ref()) {
                let limit_chunks = (inner.fixed_length() * n + 31) / 32;
                merkleize(&pack_bytes(bytes), limit_chunks.max(1))
            } else {
                let leaves = element_roots(inner, bytes, *n);
                merkleize(&leaves, next_pow2(*n))
            }
        }
        Def::List(inner, max) => {
            if is_basic(inner.as_ref()) {
                let elem_len = inner.fixed_length().max(1);
                let count = bytes.len() / elem_len;
                let limit_chunks = next_pow2(((elem_len * max) + 31) / 32);
                let root = merkleize(&pack_bytes(bytes), limit_chunks);
                mix_in_length(root, count)
            } else {
                let count = list_element_count(inner, bytes);
                let leaves = element_roots(inner, bytes, count);
                let root = merkleize(&leaves, next_pow2(*max));
                mix_in_length(root, count)
            }
        }
        Def::Container(fields) => {
            let leaves = container_field_roots(fields, bytes);
            merkleize(&leaves, next_pow2(fields.len()))
        }
        Def::Union(variants) => {
            let selector = bytes[0];
            let variant_def = &variants[selector as usize];
            let value_root = hash_tree_root(variant_def, &bytes[1..]);
            mix_in_selector(value_root, selector)
        }
    }
}

fn strip_bitlist_sentinel(bytes: &[u8]) -> (Vec<u8>, usize) {
    let last = bytes[bytes.len() - 1];
    let sentinel_bit = 7 - last.leading_zeros() as usize;
    let bit_len = (bytes.len() - 1) * 8 + sentinel_bit;
    let mut data = bytes.to_vec();
    let cleared = last & !(1 << sentinel_bit);
    *data.last_mut().unwrap() = cleared;
    (data, bit_len)
}

fn list_element_count(inner: &Def, bytes: &[u8]) -> usize {
    if bytes.is_empty() {
        return 0;
    }
    let first_offset = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let _ = inner;
    (first_offset as usize) / 4
}

/// hash_tree_root of each element of a vector/list of composite type,
/// slicing fixed- or offset-addressed elements out of `bytes` the same way
/// `types::is_valid` does.
fn element_roots(inner: &Def, bytes: &[u8], n: usize) -> Vec<[u8; 32]> {
    if inner.is_variable_size() {
        let mut offsets = Vec::with_capacity(n);
        for i in 0..n {
            offsets.push(u32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap()) as usize);
        }
        (0..n)
            .map(|i| {
                let start = offsets[i];
                let end = offsets.get(i + 1).copied().unwrap_or(bytes.len());
                hash_tree_root(inner, &bytes[start..end])
            })
            .collect()
    } else {
        let elem_len = inner.fixed_length();
        (0..n)
            .map(|i| hash_tree_root(inner, &bytes[i * elem_len..(i + 1) * elem_len]))
            .collect()
    }
}

fn container_field_roots(fields: &[(&'static str, Def)], bytes: &[u8]) -> Vec<[u8; 32]> {
    let fixed_len: usize = fields
        .iter()
        .map(|(_, d)| if d.is_variable_size() { 4 } else { d.fixed_length() })
        .sum();
    let mut cursor = 0usize;
    let mut offsets: Vec<usize> = Vec::new();
    let mut fixed_roots: Vec<Option<[u8; 32]>> = Vec::with_capacity(fields.len());
    for (_, field_def) in fields {
        if field_def.is_variable_size() {
            let off = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
            offsets.push(off);
            fixed_roots.push(None);
            cursor += 4;
        } else {
            let len = field_def.fixed_length();
            fixed_roots.push(Some(hash_tree_root(field_def, &bytes[cursor..cursor + len])));
            cursor += len;
        }
    }
    let mut offset_iter = offsets.into_iter().peekable();
    let mut out = Vec::with_capacity(fields.len());
    let mut next_offsets: Vec<usize> = Vec::new();
    // Collect the dynamic offsets again in field order for slicing ranges.
    {
        let mut c = 0usize;
        for (_, field_def) in fields {
            if field_def.is_variable_size() {
                let off = u32::from_le_bytes(bytes[c..c + 4].try_into().unwrap()) as usize;
                next_offsets.push(off);
                c += 4;
            } else {
                c += field_def.fixed_length();
            }
        }
    }
    let mut dyn_idx = 0usize;
    for (i, (_, field_def)) in fields.iter().enumerate() {
        match fixed_roots[i] {
            Some(root) => out.push(root),
            None => {
                let start = next_offsets[dyn_idx];
                let end = next_offsets.get(dyn_idx + 1).copied().unwrap_or(bytes.len());
                out.push(hash_tree_root(field_def, &bytes[start..end]));
                dyn_idx += 1;
                let _ = &mut offset_iter;
            }
        }
    }
    let _ = fixed_len;
    out
}

// --- Generalized indices ---

fn depth_of(gindex: u64) -> u32 {
    63 - gindex.leading_zeros()
}

/// `add_gindex(g1, g2)`: shift `g1` left by `depth(g2)` and OR in `g2`'s
/// payload bits (its leading `1` stripped).
pub fn add_gindex(g1: u64, g2: u64) -> u64 {
    let d2 = depth_of(g2);
    let payload = g2 & ((1u64 << d2) - 1);
    (g1 << d2) | payload
}

/// Field gindex within a container of `num_fields` fields.
pub fn container_field_gindex(num_fields: usize, field_index: usize) -> u64 {
    next_pow2(num_fields) as u64 + field_index as u64
}

/// Element gindex within a vector/list whose Merkle subtree has
/// `capacity_pow2` leaf slots (a power of two >= the type's capacity).
pub fn list_element_gindex(capacity_pow2: u64, k: u64) -> u64 {
    capacity_pow2 + k
}

#[derive(Debug, Clone)]
pub enum GindexPathStep {
    Field(&'static str),
    Index(u64, u64), // (index, capacity_pow2)
}

/// Compose a path of container-field / vector-index steps into a single
/// gindex relative to the root `def`.
pub fn gindex_for_path(def: &Def, path: &[GindexPathStep]) -> Result<u64, SszError> {
    let mut gindex = 1u64;
    let mut current = def;
    for step in path {
        match (step, current) {
            (GindexPathStep::Field(name), Def::Container(fields)) => {
                let idx = fields
                    .iter()
                    .position(|(n, _)| n == name)
                    .ok_or(SszError::BufferTooShort { wanted: 0, have: 0 })?;
                let g = container_field_gindex(fields.len(), idx);
                gindex = add_gindex(gindex, g);
                current = &fields[idx].1;
            }
            (GindexPathStep::Index(k, cap), Def::Vector(inner, _) | Def::List(inner, _)) => {
                let g = list_element_gindex(*cap, *k);
                gindex = add_gindex(gindex, g);
                current = inner.as_ref();
            }
            _ => return Err(SszError::BufferTooShort { wanted: 0, have: 0 }),
        }
    }
    Ok(gindex)
}

/// Verify a single-leaf Merkle proof and return the recomputed root.
/// `proof` is the concatenated 32-byte siblings from leaf up to root.
pub fn verify_single_merkle_proof(proof: &[[u8; 32]], leaf: [u8; 32], gindex: u64) -> [u8; 32] {
    let mut current = leaf;
    let mut g = gindex;
    for sibling in proof {
        if g & 1 == 1 {
            current = sha256_pair(sibling, &current);
        } else {
            current = sha256_pair(&current, sibling);
        }
        g >>= 1;
    }
    current
}

/// Verify a multi-leaf Merkle proof. `leaves` pairs each known leaf with its
/// gindex; `witness` supplies sibling values for every position not already
/// known. Every witness entry MUST be consumed exactly once.
pub fn verify_multi_merkle_proof(
    leaves: &[(u64, [u8; 32])],
    witness: &[[u8; 32]],
) -> Result<[u8; 32], SszError> {
    let mut known: HashMap<u64, [u8; 32]> = leaves.iter().cloned().collect();
    if known.is_empty() {
        return Err(SszError::BufferTooShort { wanted: 1, have: 0 });
    }
    let max_depth = known.keys().map(|g| depth_of(*g)).max().unwrap();
    let mut witness_idx = 0usize;

    for d in (1..=max_depth).rev() {
        let mut parents: Vec<u64> = known
            .keys()
            .filter(|g| depth_of(**g) == d)
            .map(|g| g >> 1)
            .collect();
        parents.sort_unstable();
        parents.dedup();
        for parent in parents {
            if known.contains_key(&parent) {
                continue;
            }
            let left_g = parent * 2;
            let right_g = parent * 2 + 1;
            let left = match known.get(&left_g) {
                Some(v) => *v,
                None => {
                    let w = *witness
                        .get(witness_idx)
                        .ok_or(SszError::BufferTooShort { wanted: 1, have: 0 })?;
                    witness_idx += 1;
                    w
                }
            };
            let right = match known.get(&right_g) {
                Some(v) => *v,
                None => {
                    let w = *witness
                        .get(witness_idx)
                        .ok_or(SszError::BufferTooShort { wanted: 1, have: 0 })?;
                    witness_idx += 1;
                    w
                }
            };
            known.insert(parent, sha256_pair(&left, &right));
        }
    }

    if witness_idx != witness.len() {
        return Err(SszError::BufferTooShort {
            wanted: witness.len(),
            have: witness_idx,
        });
    }

    known
        .get(&1)
        .copied()
        .ok_or(SszError::BufferTooShort { wanted: 1, have: 0 })
}

pub fn uint64_leaf(value: u64) -> [u8; 32] {
    let mut leaf = [0u8; 32];
    leaf[..8].copy_from_slice(&value.to_le_bytes());
    leaf
}

impl From<UintSize> for usize {
    fn from(u: UintSize) -> usize {
        u.bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssz::types::Def;

    #[test]
    fn single_proof_round_trips_with_create_side() {
        // 4-leaf tree: gindex 4,5,6,7 at depth 2, root gindex 1.
        let leaves = [[1u8; 32], [2u8; 32], [3u8; 32], [4u8; 32]];
        let h01 = sha256_pair(&leaves[0], &leaves[1]);
        let h23 = sha256_pair(&leaves[2], &leaves[3]);
        let root = sha256_pair(&h01, &h23);

        // Proof for leaf index 2 (gindex 6): siblings are leaf3 then h01.
        let proof = [leaves[3], h01];
        let computed = verify_single_merkle_proof(&proof, leaves[2], 6);
        assert_eq!(computed, root);
    }

    #[test]
    fn multi_proof_consumes_every_witness_exactly_once() {
        let leaves = [[1u8; 32], [2u8; 32], [3u8; 32], [4u8; 32]];
        let h01 = sha256_pair(&leaves[0], &leaves[1]);
        let h23 = sha256_pair(&leaves[2], &leaves[3]);
        let root = sha256_pair(&h01, &h23);

        // Prove leaves 0 and 2 (gindex 4 and 6); need leaf1 (sibling of 4)
        // and leaf3 (sibling of 6) as witnesses - h01/h23 both get computed
        // from known+witness pairs, so the root needs no further witness.
        let known = vec![(4u64, leaves[0]), (6u64, leaves[2])];
        let witness = vec![leaves[1], leaves[3]];
        let computed = verify_multi_merkle_proof(&known, &witness).unwrap();
        assert_eq!(computed, root);
    }

    #[test]
    fn multi_proof_rejects_leftover_witness() {
        let leaves = [[1u8; 32], [2u8; 32]];
        let known = vec![(2u64, leaves[0])];
        let witness = vec![leaves[1], [9u8; 32]];
        assert!(verify_multi_merkle_proof(&known, &witness).is_err());
    }

    #[test]
    fn add_gindex_composes_paths() {
        // Field 1 of a 2-field container (gindex 3), nested field 0 of a
        // 4-field container (gindex 4): combined should walk g1 then g2.
        let g1 = container_field_gindex(2, 1);
        let g2 = container_field_gindex(4, 0);
        let combined = add_gindex(g1, g2);
        // depth(g2) = 2, g1 = 3 -> (3 << 2) | (4 & 0b11) = 12 | 0 = 12
        assert_eq!(combined, 12);
    }

    #[test]
    fn uint_hash_tree_root_is_padded_chunk() {
        let def = Def::Uint(UintSize::U64);
        let bytes = 42u64.to_le_bytes();
        let root = hash_tree_root(&def, &bytes);
        assert_eq!(&root[..8], &bytes[..]);
        assert_eq!(&root[8..], &[0u8; 24][..]);
    }
}
