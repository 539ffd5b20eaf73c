//! Plain-map [`Store`] used by tests and by nodes that do not persist state
//! across restarts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use hgc_consensus_core::block::{Block, BlockIndex};
use hgc_consensus_core::event::{Event, EventExt as _, EventHash, EventIndex, Root, RoundNum};
use hgc_consensus_core::frame::Frame;
use hgc_consensus_core::peer::{Peer, PeerId, PeerPubkey};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_consensus_core::round_info::{Fame, RoundInfo};
use parking_lot::RwLock;

use crate::{ForkDetectedSnafu, Store, StoreResult};

#[derive(Default)]
struct State {
    events: BTreeMap<EventHash, Event>,
    participant_events: BTreeMap<PeerPubkey, BTreeMap<EventIndex, EventHash>>,
    known_events: BTreeMap<PeerId, EventIndex>,
    first_round: BTreeMap<PeerPubkey, RoundNum>,
    peer_sets: BTreeMap<RoundNum, PeerSet>,
    repertoire: BTreeMap<PeerPubkey, Peer>,
    rounds: BTreeMap<RoundNum, RoundInfo>,
    consensus_log: Vec<EventHash>,
    blocks: BTreeMap<BlockIndex, Block>,
    frames: BTreeMap<RoundNum, Frame>,
    roots: BTreeMap<PeerPubkey, Root>,
}

pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_event(&self, hash: EventHash) -> StoreResult<Option<Event>> {
        Ok(self.state.read().events.get(&hash).cloned())
    }

    async fn set_event(&self, event: Event) -> StoreResult<()> {
        let mut state = self.state.write();
        let creator = event.inner.creator;
        let index = event.inner.index;
        let hash = event.event_hash();

        if let Some(existing) = state
            .participant_events
            .get(&creator)
            .and_then(|chain| chain.get(&index))
        {
            if *existing != hash {
                return ForkDetectedSnafu {
                    participant: creator.id(),
                    index,
                }
                .fail();
            }
            return Ok(());
        }

        state
            .participant_events
            .entry(creator)
            .or_default()
            .insert(index, hash);
        let entry = state.known_events.entry(creator.id()).or_insert(index);
        if *entry < index {
            *entry = index;
        }
        state.events.insert(hash, event);
        Ok(())
    }

    async fn participant_events(
        &self,
        creator: PeerPubkey,
        after: EventIndex,
    ) -> StoreResult<Vec<EventHash>> {
        Ok(self
            .state
            .read()
            .participant_events
            .get(&creator)
            .map(|chain| {
                chain
                    .range((std::ops::Bound::Excluded(after), std::ops::Bound::Unbounded))
                    .map(|(_, hash)| *hash)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn participant_event(
        &self,
        creator: PeerPubkey,
        index: EventIndex,
    ) -> StoreResult<Option<EventHash>> {
        Ok(self
            .state
            .read()
            .participant_events
            .get(&creator)
            .and_then(|chain| chain.get(&index))
            .copied())
    }

    async fn known_events(&self) -> StoreResult<BTreeMap<PeerId, EventIndex>> {
        Ok(self.state.read().known_events.clone())
    }

    async fn first_round(&self, participant: PeerPubkey) -> StoreResult<Option<RoundNum>> {
        Ok(self.state.read().first_round.get(&participant).copied())
    }

    async fn set_first_round(&self, participant: PeerPubkey, round: RoundNum) -> StoreResult<()> {
        self.state.write().first_round.entry(participant).or_insert(round);
        Ok(())
    }

    async fn get_peer_set(&self, round: RoundNum) -> StoreResult<Option<PeerSet>> {
        Ok(self.state.read().peer_sets.get(&round).cloned())
    }

    async fn set_peer_set(&self, round: RoundNum, peer_set: PeerSet) -> StoreResult<()> {
        self.state.write().peer_sets.insert(round, peer_set);
        Ok(())
    }

    async fn all_peer_sets(&self) -> StoreResult<BTreeMap<RoundNum, PeerSet>> {
        Ok(self.state.read().peer_sets.clone())
    }

    async fn repertoire_by_pubkey(&self) -> StoreResult<BTreeMap<PeerPubkey, Peer>> {
        Ok(self.state.read().repertoire.clone())
    }

    async fn repertoire_by_id(&self) -> StoreResult<BTreeMap<PeerId, Peer>> {
        Ok(self
            .state
            .read()
            .repertoire
            .values()
            .map(|p| (p.id(), p.clone()))
            .collect())
    }

    async fn add_to_repertoire(&self, peer: Peer) -> StoreResult<()> {
        self.state.write().repertoire.insert(peer.pubkey, peer);
        Ok(())
    }

    async fn get_round(&self, round: RoundNum) -> StoreResult<Option<RoundInfo>> {
        Ok(self.state.read().rounds.get(&round).cloned())
    }

    async fn set_round(&self, round: RoundNum, info: RoundInfo) -> StoreResult<()> {
        self.state.write().rounds.insert(round, info);
        Ok(())
    }

    async fn last_round(&self) -> StoreResult<Option<RoundNum>> {
        Ok(self.state.read().rounds.keys().next_back().copied())
    }

    async fn round_witnesses(&self, round: RoundNum) -> StoreResult<Vec<EventHash>> {
        Ok(self
            .state
            .read()
            .rounds
            .get(&round)
            .map(|info| info.witnesses.iter().map(|w| w.hash).collect())
            .unwrap_or_default())
    }

    async fn round_events(&self, round: RoundNum) -> StoreResult<Vec<EventHash>> {
        Ok(self
            .state
            .read()
            .rounds
            .get(&round)
            .map(|info| info.created_events.clone())
            .unwrap_or_default())
    }

    async fn add_consensus_event(&self, hash: EventHash) -> StoreResult<()> {
        self.state.write().consensus_log.push(hash);
        Ok(())
    }

    async fn consensus_events(&self) -> StoreResult<Vec<EventHash>> {
        Ok(self.state.read().consensus_log.clone())
    }

    async fn get_block(&self, index: BlockIndex) -> StoreResult<Option<Block>> {
        Ok(self.state.read().blocks.get(&index).cloned())
    }

    async fn set_block(&self, block: Block) -> StoreResult<()> {
        self.state.write().blocks.insert(block.header.index, block);
        Ok(())
    }

    async fn last_block_index(&self) -> StoreResult<Option<BlockIndex>> {
        Ok(self.state.read().blocks.keys().next_back().copied())
    }

    async fn get_frame(&self, round: RoundNum) -> StoreResult<Option<Frame>> {
        Ok(self.state.read().frames.get(&round).cloned())
    }

    async fn set_frame(&self, frame: Frame) -> StoreResult<()> {
        self.state.write().frames.insert(frame.round, frame);
        Ok(())
    }

    async fn get_root(&self, participant: PeerPubkey) -> StoreResult<Option<Root>> {
        Ok(self.state.read().roots.get(&participant).cloned())
    }

    async fn set_root(&self, participant: PeerPubkey, root: Root) -> StoreResult<()> {
        self.state.write().roots.insert(participant, root);
        Ok(())
    }

    async fn reset(&self, frame: Frame) -> StoreResult<()> {
        let mut state = State::default();
        for (round, peer_set) in &frame.peer_sets {
            state.peer_sets.insert(*round, peer_set.clone());
        }
        for event in &frame.events {
            let creator = event.inner.creator;
            let index = event.inner.index;
            let hash = event.event_hash();
            state
                .participant_events
                .entry(creator)
                .or_default()
                .insert(index, hash);
            let entry = state.known_events.entry(creator.id()).or_insert(index);
            if *entry < index {
                *entry = index;
            }
            state.events.insert(hash, event.clone());
        }
        for (pubkey, root) in &frame.roots {
            state.roots.insert(*pubkey, root.clone());
        }

        // The frame's round was already closed into a block before this
        // fast-forward bundle was built; preserve that (spec §4.1 "rounds
        // <= frame round are preserved") instead of leaving `rounds` empty,
        // or `last_round`/`divide_rounds` would treat this node as having
        // no history at all. Witnesses are reconstructed from whichever
        // roots' self-parent actually lands in this round.
        let mut round_info = RoundInfo {
            decided: true,
            queued: true,
            ..RoundInfo::default()
        };
        for (_, root) in &frame.roots {
            if root.self_parent.round == frame.round {
                round_info.created_events.push(root.self_parent.hash);
                round_info.set_witness_fame(root.self_parent.hash, Fame::Yes);
            }
        }
        state.rounds.insert(frame.round, round_info);

        state.frames.insert(frame.round, frame);
        *self.state.write() = state;
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }

    fn store_path(&self) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use hgc_consensus_core::event::{EventBody, EventIndex as Idx};
    use hgc_consensus_core::hash::Hash32;
    use hgc_consensus_core::peer::PeerSeckey;
    use hgc_consensus_core::timestamp::Timestamp;

    use super::*;

    fn event(seckey: PeerSeckey, index: u64, salt: u8) -> Event {
        let body = EventBody {
            creator: seckey.pubkey(),
            index: Idx::from(index),
            self_parent: Hash32::from(blake3::hash(&[salt])),
            other_parent: None,
            transactions: vec![],
            internal_transactions: vec![],
            block_signatures: vec![],
            timestamp: Timestamp::from_micros(0),
        };
        Event::new_sign(body, seckey)
    }

    #[tokio::test]
    async fn insert_and_lookup_roundtrip() {
        let store = InMemoryStore::new();
        let seckey = PeerSeckey::generate();
        let ev = event(seckey, 0, 1);
        let hash = ev.event_hash();
        store.set_event(ev.clone()).await.unwrap();

        assert_eq!(store.get_event(hash).await.unwrap().unwrap().event_hash(), hash);
        assert_eq!(
            store
                .participant_event(seckey.pubkey(), Idx::from(0u64))
                .await
                .unwrap(),
            Some(hash)
        );
        assert_eq!(
            store.known_events().await.unwrap().get(&seckey.pubkey().id()),
            Some(&Idx::from(0u64))
        );
    }

    #[tokio::test]
    async fn conflicting_event_at_same_index_is_a_fork() {
        let store = InMemoryStore::new();
        let seckey = PeerSeckey::generate();
        let first = event(seckey, 0, 1);
        let second = event(seckey, 0, 2);

        store.set_event(first).await.unwrap();
        let err = store.set_event(second).await.unwrap_err();
        assert!(matches!(err, crate::StoreError::ForkDetected { .. }));
    }

    #[tokio::test]
    async fn reinserting_identical_event_is_idempotent() {
        let store = InMemoryStore::new();
        let seckey = PeerSeckey::generate();
        let ev = event(seckey, 0, 1);
        store.set_event(ev.clone()).await.unwrap();
        store.set_event(ev).await.unwrap();
    }
}
