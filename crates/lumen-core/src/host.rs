//! The EVM host interface (spec.md §4.12, §9 "Cyclic and pointer
//! structures"). Not an EVM interpreter - this is the account/storage
//! overlay an embedded EVM calls into, and the frame push/commit/discard
//! merge semantics around it.
//!
//! The original is a linked list of accounts, each with a linked list of
//! storage entries, threaded through parent frames. Per spec.md §9's own
//! recommendation we replace that with an arena: each frame owns a `Vec` of
//! changed accounts (by index, via a small `HashMap` for address lookup)
//! and each account's storage is a `HashMap<[u8;32],[u8;32]>`. No pointers,
//! no cycles - a frame is popped by index, not freed through a free-list.

use std::collections::HashMap;

/// EVMC-numbered storage status codes (spec.md §6 "Host <-> EVM
/// interface").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StorageStatus {
    Unchanged = 0,
    Modified = 1,
    ModifiedAgain = 2,
    Added = 3,
    Deleted = 4,
}

/// A read-only account as supplied by the proof - the frame's source layer.
#[derive(Debug, Clone, Default)]
pub struct SourceAccount {
    pub balance: [u8; 32],
    pub nonce: u64,
    pub code_hash: [u8; 32],
    pub code: Vec<u8>,
    pub storage: HashMap<[u8; 32], [u8; 32]>,
}

/// A writable account overlay entry within a single frame.
#[derive(Debug, Clone, Default)]
pub struct ChangedAccount {
    pub balance: Option<[u8; 32]>,
    pub code: Option<Vec<u8>>,
    pub storage: HashMap<[u8; 32], [u8; 32]>,
    pub deleted: bool,
}

/// One call frame's overlay: proof-sourced accounts are shared read-only
/// across every frame (via the root); each frame additionally has its own
/// `changed_accounts` writable layer and an index into its parent frame.
pub struct Frame {
    parent: Option<usize>,
    changed: HashMap<[u8; 20], ChangedAccount>,
}

impl Frame {
    fn new(parent: Option<usize>) -> Self {
        Frame { parent, changed: HashMap::new() }
    }
}

/// The EVM host overlay: a stack of frames over a shared, read-only set of
/// proof-sourced accounts (spec.md §3 "EVM host overlay").
pub struct HostState {
    sources: HashMap<[u8; 20], SourceAccount>,
    frames: Vec<Frame>,
}

impl HostState {
    pub fn new(sources: HashMap<[u8; 20], SourceAccount>) -> Self {
        HostState { sources, frames: vec![Frame::new(None)] }
    }

    fn root_frame(&self) -> usize {
        0
    }

    /// Push a new child frame under `parent`, returning its index.
    pub fn push_frame(&mut self, parent: usize) -> usize {
        self.frames.push(Frame::new(Some(parent)));
        self.frames.len() - 1
    }

    /// Walk `frame` then its ancestors for a changed-account entry.
    fn find_changed(&self, frame: usize, address: &[u8; 20]) -> Option<&ChangedAccount> {
        let mut current = Some(frame);
        while let Some(idx) = current {
            if let Some(acc) = self.frames[idx].changed.get(address) {
                return Some(acc);
            }
            current = self.frames[idx].parent;
        }
        None
    }

    pub fn account_exists(&self, frame: usize, address: &[u8; 20]) -> bool {
        match self.find_changed(frame, address) {
            Some(acc) if acc.deleted => false,
            Some(_) => true,
            None => self.sources.contains_key(address),
        }
    }

    pub fn get_balance(&self, frame: usize, address: &[u8; 20]) -> [u8; 32] {
        if let Some(acc) = self.find_changed(frame, address) {
            if let Some(balance) = acc.balance {
                return balance;
            }
        }
        self.sources.get(address).map(|a| a.balance).unwrap_or_default()
    }

    pub fn get_code_hash(&self, frame: usize, address: &[u8; 20]) -> [u8; 32] {
        if let Some(acc) = self.find_changed(frame, address) {
            if let Some(code) = &acc.code {
                return crate::crypto::keccak256(code);
            }
        }
        self.sources.get(address).map(|a| a.code_hash).unwrap_or_default()
    }

    pub fn get_code_size(&self, frame: usize, address: &[u8; 20]) -> usize {
        self.copy_code(frame, address).len()
    }

    pub fn copy_code(&self, frame: usize, address: &[u8; 20]) -> Vec<u8> {
        if let Some(acc) = self.find_changed(frame, address) {
            if let Some(code) = &acc.code {
                return code.clone();
            }
        }
        self.sources.get(address).map(|a| a.code.clone()).unwrap_or_default()
    }

    pub fn get_storage(&self, frame: usize, address: &[u8; 20], key: &[u8; 32]) -> [u8; 32] {
        let mut current = Some(frame);
        while let Some(idx) = current {
            if let Some(acc) = self.frames[idx].changed.get(address) {
                if let Some(value) = acc.storage.get(key) {
                    return *value;
                }
                if acc.deleted {
                    return [0u8; 32];
                }
            }
            current = self.frames[idx].parent;
        }
        self.sources
            .get(address)
            .and_then(|a| a.storage.get(key))
            .copied()
            .unwrap_or_default()
    }

    /// Write `value` into `frame`'s overlay and classify the transition,
    /// per the classical gas-refund state machine (spec.md §4.12). `original`
    /// is the transaction-start value (the proof-sourced layer, untouched by
    /// any frame's overlay); `current` is what `get_storage` resolves right
    /// now, i.e. after whatever this call chain already wrote this slot to.
    pub fn set_storage(&mut self, frame: usize, address: [u8; 20], key: [u8; 32], value: [u8; 32]) -> StorageStatus {
        let original = self
            .sources
            .get(&address)
            .and_then(|a| a.storage.get(&key))
            .copied()
            .unwrap_or_default();
        let current = self.get_storage(frame, &address, &key);

        let status = if current == value {
            StorageStatus::Unchanged
        } else if value == [0u8; 32] {
            StorageStatus::Deleted
        } else if original == [0u8; 32] && current == [0u8; 32] {
            StorageStatus::Added
        } else if current == original {
            StorageStatus::Modified
        } else {
            StorageStatus::ModifiedAgain
        };

        let entry = self.frames[frame].changed.entry(address).or_default();
        entry.storage.insert(key, value);
        status
    }

    /// Mark `address` deleted in `frame` and drop its local storage
    /// overlay (spec.md §4.12 `selfdestruct`).
    pub fn selfdestruct(&mut self, frame: usize, address: [u8; 20]) {
        let entry = self.frames[frame].changed.entry(address).or_default();
        entry.deleted = true;
        entry.storage.clear();
        entry.balance = Some([0u8; 32]);
    }

    pub fn set_balance(&mut self, frame: usize, address: [u8; 20], balance: [u8; 32]) {
        let entry = self.frames[frame].changed.entry(address).or_default();
        entry.balance = Some(balance);
    }

    pub fn set_code(&mut self, frame: usize, address: [u8; 20], code: Vec<u8>) {
        let entry = self.frames[frame].changed.entry(address).or_default();
        entry.code = Some(code);
    }

    /// Merge `child`'s changed accounts into its parent frame
    /// (spec.md §4.12.1). Called on a successful (non-reverted) return.
    pub fn commit(&mut self, child: usize) {
        let parent = self.frames[child].parent.expect("committing the root frame is a no-op");
        let changed = std::mem::take(&mut self.frames[child].changed);
        for (address, child_acc) in changed {
            let parent_entry = self.frames[parent].changed.entry(address).or_default();
            if let Some(balance) = child_acc.balance {
                parent_entry.balance = Some(balance);
            }
            if let Some(code) = child_acc.code {
                parent_entry.code = Some(code);
            }
            for (key, value) in child_acc.storage {
                parent_entry.storage.insert(key, value);
            }
            if child_acc.deleted {
                parent_entry.deleted = true;
            }
        }
    }

    /// Discard a reverted child frame without merging (spec.md §4.12.1).
    pub fn discard(&mut self, child: usize) {
        self.frames[child].changed.clear();
    }

    /// The root frame's post-state, authoritative for the final return-data
    /// comparison. Never persisted between requests (spec.md §4.12.1).
    pub fn root(&self) -> usize {
        self.root_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_one_account() -> (HostState, [u8; 20]) {
        let addr = [0x11u8; 20];
        let mut sources = HashMap::new();
        sources.insert(
            addr,
            SourceAccount { balance: [0u8; 32], nonce: 0, code_hash: [0u8; 32], code: vec![], storage: HashMap::new() },
        );
        (HostState::new(sources), addr)
    }

    #[test]
    fn set_storage_classifies_added_then_modified() {
        let (mut state, addr) = state_with_one_account();
        let root = state.root();
        let status = state.set_storage(root, addr, [1u8; 32], [2u8; 32]);
        assert_eq!(status, StorageStatus::Added);
        let status = state.set_storage(root, addr, [1u8; 32], [3u8; 32]);
        assert_eq!(status, StorageStatus::ModifiedAgain);
    }

    #[test]
    fn child_frame_commit_merges_into_parent() {
        let (mut state, addr) = state_with_one_account();
        let root = state.root();
        let child = state.push_frame(root);
        state.set_storage(child, addr, [9u8; 32], [7u8; 32]);
        state.commit(child);
        assert_eq!(state.get_storage(root, &addr, &[9u8; 32]), [7u8; 32]);
    }

    #[test]
    fn discarded_child_frame_does_not_affect_parent() {
        let (mut state, addr) = state_with_one_account();
        let root = state.root();
        let child = state.push_frame(root);
        state.set_storage(child, addr, [9u8; 32], [7u8; 32]);
        state.discard(child);
        assert_eq!(state.get_storage(root, &addr, &[9u8; 32]), [0u8; 32]);
    }

    #[test]
    fn selfdestruct_hides_account_in_current_frame() {
        let (mut state, addr) = state_with_one_account();
        let root = state.root();
        assert!(state.account_exists(root, &addr));
        state.selfdestruct(root, addr);
        assert!(!state.account_exists(root, &addr));
    }
}
