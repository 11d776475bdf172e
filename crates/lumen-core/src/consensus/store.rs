//! The sync-committee period store (spec.md §3 "Sync-committee period",
//! §4.6 "State"). The only process-wide mutable state the core touches -
//! ported per spec.md §9 as an explicit handle threaded through the verify
//! context rather than a singleton, so tests instantiate per-test stores.

use std::collections::BTreeMap;

use crate::types::beacon::SyncCommittee;

#[derive(Clone, Debug)]
pub struct PeriodEntry {
    pub last_slot: u64,
    pub trusted_blockhash: [u8; 32],
    pub committee: SyncCommittee,
}

/// Per-chain, append-only (except for configured pruning) ordered sequence
/// of periods. Invariant: for any stored period P, its pubkeys are those
/// that sign slots in period P.
#[derive(Default)]
pub struct SyncCommitteeStore {
    chains: BTreeMap<u64, BTreeMap<u64, PeriodEntry>>,
}

impl SyncCommitteeStore {
    pub fn new() -> Self {
        SyncCommitteeStore { chains: BTreeMap::new() }
    }

    pub fn get_validators(&self, chain_id: u64, period: u64) -> Option<&SyncCommittee> {
        self.chains
            .get(&chain_id)
            .and_then(|periods| periods.get(&period))
            .map(|e| &e.committee)
    }

    pub fn get_entry(&self, chain_id: u64, period: u64) -> Option<&PeriodEntry> {
        self.chains.get(&chain_id).and_then(|periods| periods.get(&period))
    }

    /// Append or update a period. Never removes a later period that is
    /// already newer than `period` (spec.md §8 property 8: sync monotonicity
    /// only requires the *last accepted* period to never decrease, which
    /// `BTreeMap` insertion alone satisfies - we simply never delete here).
    pub fn set_sync_period(
        &mut self,
        chain_id: u64,
        period: u64,
        last_slot: u64,
        trusted_blockhash: [u8; 32],
        committee: SyncCommittee,
    ) {
        self.chains.entry(chain_id).or_default().insert(
            period,
            PeriodEntry { last_slot, trusted_blockhash, committee },
        );
    }

    pub fn latest_period(&self, chain_id: u64) -> Option<u64> {
        self.chains.get(&chain_id).and_then(|periods| periods.keys().next_back().copied())
    }

    /// Prune periods strictly older than `keep_from`, per chain.
    pub fn prune_before(&mut self, chain_id: u64, keep_from: u64) {
        if let Some(periods) = self.chains.get_mut(&chain_id) {
            periods.retain(|p, _| *p >= keep_from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::beacon::BlsPublicKey;

    fn dummy_committee() -> SyncCommittee {
        SyncCommittee {
            pubkeys: vec![BlsPublicKey([0u8; 48]); 512],
            aggregate_pubkey: BlsPublicKey([0u8; 48]),
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut store = SyncCommitteeStore::new();
        store.set_sync_period(1, 100, 8192 * 100, [1u8; 32], dummy_committee());
        assert!(store.get_validators(1, 100).is_some());
        assert_eq!(store.latest_period(1), Some(100));
    }

    #[test]
    fn latest_period_tracks_append_only_insertions() {
        let mut store = SyncCommitteeStore::new();
        store.set_sync_period(1, 5, 0, [0u8; 32], dummy_committee());
        store.set_sync_period(1, 7, 0, [0u8; 32], dummy_committee());
        assert_eq!(store.latest_period(1), Some(7));
        store.set_sync_period(1, 6, 0, [0u8; 32], dummy_committee());
        assert_eq!(store.latest_period(1), Some(7));
    }
}
