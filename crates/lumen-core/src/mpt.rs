//! Merkle-Patricia Trie (Ethereum variant) over Keccak-256.
//!
//! Generalizes the node-walk that `execution::proof` and `execution::receipt`
//! used to hand-roll separately (both walked branch/extension/leaf nodes
//! keyed by different things - `keccak(address|slot)` vs `rlp(tx_index)` -
//! with near-identical logic). This module owns the walk once; callers
//! supply whatever key bytes their trie is keyed by.
//!
//! Also provides a writable trie + proof builder (spec.md §4.4's "Writer"),
//! used by the block verifier to assemble the transactions trie from raw
//! tx bytes and recompute its root.

use thiserror::Error;

use crate::crypto::keccak256;
use crate::rlp::{self, Decoded, RlpItem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrieError {
    #[error("empty proof: no trie nodes provided")]
    EmptyProof,
    #[error("invalid RLP encoding in proof node {index}: {reason}")]
    InvalidRlp { index: usize, reason: String },
    #[error("computed root does not match expected root")]
    RootMismatch,
    #[error("invalid trie node type at depth {depth}: expected 2 or 17 items, got {count}")]
    InvalidNodeType { depth: usize, count: usize },
    #[error("proof ended at depth {depth} without reaching a terminal node")]
    IncompleteProof { depth: usize },
    #[error("trie depth exceeds the 64-nibble bound")]
    DepthExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    Found(Vec<u8>),
    NotExisting,
}

const MAX_DEPTH: usize = 64;

fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for b in bytes {
        nibbles.push(b >> 4);
        nibbles.push(b & 0x0F);
    }
    nibbles
}

/// Decode hex-prefix (compact) path encoding: returns (nibbles, is_leaf).
fn decode_compact_path(encoded: &[u8]) -> Result<(Vec<u8>, bool), TrieError> {
    if encoded.is_empty() {
        return Ok((vec![], false));
    }
    let first = encoded[0] >> 4;
    let is_leaf = first >= 2;
    let is_odd = first % 2 == 1;
    let mut nibbles = Vec::with_capacity(encoded.len() * 2);
    if is_odd {
        nibbles.push(encoded[0] & 0x0F);
    }
    for &byte in &encoded[1..] {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    Ok((nibbles, is_leaf))
}

/// Encode a nibble path with the hex-prefix flag byte per the Yellow Paper:
/// high nibble of byte 0 = `2*is_leaf + odd_flag`.
fn encode_compact_path(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd = nibbles.len() % 2 == 1;
    let flag = (2 * is_leaf as u8) + odd as u8;
    let mut out = Vec::with_capacity(nibbles.len() / 2 + 1);
    if odd {
        out.push((flag << 4) | nibbles[0]);
        let mut chunks = nibbles[1..].chunks_exact(2);
        for pair in &mut chunks {
            out.push((pair[0] << 4) | pair[1]);
        }
    } else {
        out.push(flag << 4);
        let mut chunks = nibbles.chunks_exact(2);
        for pair in &mut chunks {
            out.push((pair[0] << 4) | pair[1]);
        }
    }
    out
}

/// Verify a Merkle-Patricia proof for `key` against `expected_root`.
/// `proof` is the ordered list of node RLP encodings from root to leaf.
pub fn verify(expected_root: [u8; 32], key: &[u8], proof: &[Vec<u8>]) -> Result<ProofOutcome, TrieError> {
    if proof.is_empty() {
        return Err(TrieError::EmptyProof);
    }
    let nibbles = bytes_to_nibbles(key);
    let mut nibble_index = 0usize;

    let first_hash = keccak256(&proof[0]);
    if proof[0].len() >= 32 && first_hash != expected_root {
        return Err(TrieError::RootMismatch);
    }

    for (depth, node_rlp) in proof.iter().enumerate() {
        if nibble_index > MAX_DEPTH {
            return Err(TrieError::DepthExceeded);
        }
        let items = rlp::decode_list(node_rlp).map_err(|e| TrieError::InvalidRlp {
            index: depth,
            reason: e.to_string(),
        })?;

        match items.len() {
            17 => {
                if nibble_index >= nibbles.len() {
                    return match items[16].as_bytes() {
                        [] => Ok(ProofOutcome::NotExisting),
                        value => Ok(ProofOutcome::Found(value.to_vec())),
                    };
                }
                let child_index = nibbles[nibble_index] as usize;
                nibble_index += 1;

                let child_ref = items[child_index].as_bytes();
                if depth + 1 < proof.len() {
                    if child_ref.len() == 32 && proof[depth + 1].len() >= 32 {
                        let next_hash = keccak256(&proof[depth + 1]);
                        if next_hash.as_slice() != child_ref {
                            return Err(TrieError::RootMismatch);
                        }
                    }
                } else {
                    if child_ref.is_empty() {
                        return Ok(ProofOutcome::NotExisting);
                    }
                    return Ok(ProofOutcome::Found(child_ref.to_vec()));
                }
            }
            2 => {
                let (prefix_nibbles, is_leaf) = decode_compact_path(items[0].as_bytes())?;
                let remaining = &nibbles[nibble_index..];
                if is_leaf {
                    return if remaining == prefix_nibbles.as_slice() {
                        match items[1].as_bytes() {
                            [] => Ok(ProofOutcome::NotExisting),
                            value => Ok(ProofOutcome::Found(value.to_vec())),
                        }
                    } else {
                        Ok(ProofOutcome::NotExisting)
                    };
                } else {
                    if !remaining.starts_with(prefix_nibbles.as_slice()) {
                        return Ok(ProofOutcome::NotExisting);
                    }
                    nibble_index += prefix_nibbles.len();
                    if depth + 1 < proof.len() {
                        let child_ref = items[1].as_bytes();
                        if child_ref.len() == 32 && proof[depth + 1].len() >= 32 {
                            let next_hash = keccak256(&proof[depth + 1]);
                            if next_hash.as_slice() != child_ref {
                                return Err(TrieError::RootMismatch);
                            }
                        }
                    }
                }
            }
            count => {
                return Err(TrieError::InvalidNodeType { depth, count });
            }
        }
    }

    Err(TrieError::IncompleteProof { depth: proof.len() })
}

// --- Writable trie ---

#[derive(Debug, Clone)]
enum Node {
    Empty,
    Leaf { path: Vec<u8>, value: Vec<u8> },
    Extension { path: Vec<u8>, child: Box<Node> },
    Branch { children: [Box<Node>; 16], value: Option<Vec<u8>> },
}

fn empty_children() -> [Box<Node>; 16] {
    std::array::from_fn(|_| Box::new(Node::Empty))
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

fn encode_child_ref(child: &Node) -> Vec<u8> {
    let encoded = encode_node(child);
    if encoded.len() < 32 {
        encoded
    } else {
        rlp::encode_bytes(&keccak256(&encoded))
    }
}

fn encode_node(node: &Node) -> Vec<u8> {
    match node {
        Node::Empty => rlp::encode_bytes(&[]),
        Node::Leaf { path, value } => rlp::encode_list(&[
            rlp::encode_bytes(&encode_compact_path(path, true)),
            rlp::encode_bytes(value),
        ]),
        Node::Extension { path, child } => rlp::encode_list(&[
            rlp::encode_bytes(&encode_compact_path(path, false)),
            encode_child_ref(child),
        ]),
        Node::Branch { children, value } => {
            let mut items: Vec<Vec<u8>> = children.iter().map(|c| encode_child_ref(c)).collect();
            items.push(rlp::encode_bytes(value.as_deref().unwrap_or(&[])));
            rlp::encode_list(&items)
        }
    }
}

fn insert_node(node: Node, path: &[u8], value: Vec<u8>) -> Node {
    match node {
        Node::Empty => Node::Leaf { path: path.to_vec(), value },
        Node::Leaf { path: leaf_path, value: leaf_value } => {
            let common = common_prefix_len(&leaf_path, path);
            if common == leaf_path.len() && common == path.len() {
                return Node::Leaf { path: leaf_path, value };
            }
            let mut children = empty_children();
            let mut branch_value = None;
            if common == leaf_path.len() {
                branch_value = Some(leaf_value);
            } else {
                let idx = leaf_path[common] as usize;
                children[idx] = Box::new(Node::Leaf {
                    path: leaf_path[common + 1..].to_vec(),
                    value: leaf_value,
                });
            }
            if common == path.len() {
                branch_value = Some(value);
            } else {
                let idx = path[common] as usize;
                children[idx] = Box::new(Node::Leaf {
                    path: path[common + 1..].to_vec(),
                    value,
                });
            }
            let branch = Node::Branch { children, value: branch_value };
            if common > 0 {
                Node::Extension { path: path[..common].to_vec(), child: Box::new(branch) }
            } else {
                branch
            }
        }
        Node::Extension { path: ext_path, child } => {
            let common = common_prefix_len(&ext_path, path);
            if common == ext_path.len() {
                let new_child = insert_node(*child, &path[common..], value);
                return Node::Extension { path: ext_path, child: Box::new(new_child) };
            }
            let mut children = empty_children();
            let remaining_ext = &ext_path[common + 1..];
            let ext_idx = ext_path[common] as usize;
            let sub_child = if remaining_ext.is_empty() {
                *child
            } else {
                Node::Extension { path: remaining_ext.to_vec(), child }
            };
            children[ext_idx] = Box::new(sub_child);
            let mut branch_value = None;
            if common == path.len() {
                branch_value = Some(value);
            } else {
                let idx = path[common] as usize;
                children[idx] = Box::new(Node::Leaf {
                    path: path[common + 1..].to_vec(),
                    value,
                });
            }
            let branch = Node::Branch { children, value: branch_value };
            if common > 0 {
                Node::Extension { path: path[..common].to_vec(), child: Box::new(branch) }
            } else {
                branch
            }
        }
        Node::Branch { mut children, value: branch_value } => {
            if path.is_empty() {
                Node::Branch { children, value: Some(value) }
            } else {
                let idx = path[0] as usize;
                let existing = std::mem::replace(&mut children[idx], Box::new(Node::Empty));
                children[idx] = Box::new(insert_node(*existing, &path[1..], value));
                Node::Branch { children, value: branch_value }
            }
        }
    }
}

fn collect_proof(node: &Node, path: &[u8], out: &mut Vec<Vec<u8>>) {
    out.push(encode_node(node));
    match node {
        Node::Leaf { .. } | Node::Empty => {}
        Node::Extension { path: ext_path, child } => {
            if path.starts_with(ext_path.as_slice()) {
                collect_proof(child, &path[ext_path.len()..], out);
            }
        }
        Node::Branch { children, .. } => {
            if !path.is_empty() {
                collect_proof(&children[path[0] as usize], &path[1..], out);
            }
        }
    }
}

/// A mutable in-memory Patricia trie, used to assemble the transactions and
/// receipts tries during block verification (spec.md §4.4's "Writer").
pub struct Trie {
    root: Node,
}

impl Trie {
    pub fn new() -> Self {
        Trie { root: Node::Empty }
    }

    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) {
        let nibbles = bytes_to_nibbles(key);
        let root = std::mem::replace(&mut self.root, Node::Empty);
        self.root = insert_node(root, &nibbles, value);
    }

    pub fn root_hash(&self) -> [u8; 32] {
        keccak256(&encode_node(&self.root))
    }

    /// Build an ordered list of node encodings from root to `key`, suitable
    /// for feeding back into `verify`.
    pub fn create_merkle_proof(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let nibbles = bytes_to_nibbles(key);
        let mut out = Vec::new();
        collect_proof(&self.root, &nibbles, &mut out);
        out
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_trie_root_matches_known_constant() {
        let trie = Trie::new();
        let expected = hex::decode("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b42").unwrap();
        assert_eq!(&trie.root_hash()[..], &expected[..]);
    }

    #[test]
    fn insert_then_verify_round_trips() {
        let mut trie = Trie::new();
        trie.insert(b"key1", b"value1".to_vec());
        trie.insert(b"key2", b"value2".to_vec());
        trie.insert(b"key3", b"a-longer-value-to-force-hashing-of-child-nodes".to_vec());

        let root = trie.root_hash();
        let proof = trie.create_merkle_proof(b"key2");
        let outcome = verify(root, b"key2", &proof).unwrap();
        assert_eq!(outcome, ProofOutcome::Found(b"value2".to_vec()));
    }

    #[test]
    fn missing_key_proves_not_existing() {
        let mut trie = Trie::new();
        trie.insert(b"key1", b"value1".to_vec());
        let root = trie.root_hash();
        let proof = trie.create_merkle_proof(b"keyX");
        let outcome = verify(root, b"keyX", &proof).unwrap();
        assert_eq!(outcome, ProofOutcome::NotExisting);
    }

    #[test]
    fn compact_path_round_trips_leaf_and_extension() {
        let nibbles = vec![0xA, 0xB, 0xC];
        let encoded_leaf = encode_compact_path(&nibbles, true);
        let (decoded, is_leaf) = decode_compact_path(&encoded_leaf).unwrap();
        assert!(is_leaf);
        assert_eq!(decoded, nibbles);

        let encoded_ext = encode_compact_path(&nibbles, false);
        let (decoded, is_leaf) = decode_compact_path(&encoded_ext).unwrap();
        assert!(!is_leaf);
        assert_eq!(decoded, nibbles);
    }
}
