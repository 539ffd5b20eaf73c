//! Round assignment and witness detection (spec §4.3 "Round assignment").

use hgc_consensus_core::event::{Event, EventExt as _, EventHash, RoundNum};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_store::Store;
use tracing::instrument;

use crate::ancestry::strongly_sees;
use crate::errors::ConsensusResult;
use crate::Hashgraph;

impl<S: Store> Hashgraph<S> {
    /// The round an already-processed event was assigned, consulting the
    /// in-memory cache first and falling back to a store scan on a miss.
    pub async fn round_of(&self, hash: EventHash) -> ConsensusResult<Option<RoundNum>> {
        if let Some(r) = self.round_cache.read().get(&hash).copied() {
            return Ok(Some(r));
        }
        let Some(last) = self.store.last_round().await? else {
            return Ok(None);
        };
        let mut r = last;
        loop {
            if self.store.round_events(r).await?.contains(&hash) {
                self.round_cache.write().insert(hash, r);
                return Ok(Some(r));
            }
            let Some(prev) = r.prev() else {
                return Ok(None);
            };
            r = prev;
        }
    }

    fn cache_round(&self, hash: EventHash, round: RoundNum) {
        self.round_cache.write().insert(hash, round);
    }

    /// Assigns `event` a round and, if it is the first event by its creator
    /// in that round, records it as that round's witness (spec §4.3).
    ///
    /// The event must already be present in the store (i.e. inserted via
    /// [`crate::insert`]); this only performs the round-assignment
    /// bookkeeping and is idempotent if called again for an already-placed
    /// event.
    #[instrument(target = "hgc::hashgraph", skip(self, event))]
    pub async fn divide_rounds(&self, event: &Event) -> ConsensusResult<RoundNum> {
        let hash = event.event_hash();
        if let Some(r) = self.round_cache.read().get(&hash).copied() {
            return Ok(r);
        }

        let round = if event.inner.is_genesis() {
            RoundNum::from(0u64)
        } else {
            let self_parent_round = self
                .round_of(event.inner.self_parent)
                .await?
                .unwrap_or(RoundNum::from(0u64));
            let other_parent_round = match event.inner.other_parent {
                Some(op) => self.round_of(op).await?.unwrap_or(self_parent_round),
                None => self_parent_round,
            };
            let r = self_parent_round.max(other_parent_round);

            let peer_set = self.peer_set_at(r).await?;
            let witnesses_r = self.store.round_witnesses(r).await?;
            let mut strongly_seen = std::collections::HashSet::new();
            for w in witnesses_r {
                if strongly_sees(self.store.as_ref(), hash, w, &peer_set).await? {
                    if let Some(we) = self.store.get_event(w).await? {
                        strongly_seen.insert(we.inner.creator);
                    }
                }
            }
            if peer_set.is_super_majority(strongly_seen.len()) {
                r.next_expect()
            } else {
                r
            }
        };

        self.cache_round(hash, round);

        let is_witness = event.inner.is_genesis() || {
            let self_parent_round = self.round_of(event.inner.self_parent).await?;
            self_parent_round.map(|r| r < round).unwrap_or(true)
        };

        let mut info = self.store.get_round(round).await?.unwrap_or_default();
        if !info.created_events.contains(&hash) {
            info.created_events.push(hash);
        }
        if is_witness && !info.witnesses.iter().any(|w| w.hash == hash) {
            info.witnesses.push(hgc_consensus_core::round_info::WitnessFame {
                hash,
                fame: hgc_consensus_core::round_info::Fame::Undecided,
            });
        }
        self.store.set_round(round, info).await?;

        if event.inner.is_genesis() {
            self.store
                .set_first_round(event.inner.creator, round)
                .await?;
        }

        Ok(round)
    }

    /// The peer-set effective at `round`: the one from the closest
    /// `<= round` entry in the store's peer-set schedule, falling back to
    /// round zero's if `round` predates any recorded schedule entry.
    pub async fn peer_set_at(&self, round: RoundNum) -> ConsensusResult<PeerSet> {
        let mut r = round;
        loop {
            if let Some(set) = self.store.get_peer_set(r).await? {
                return Ok(set);
            }
            match r.prev() {
                Some(prev) => r = prev,
                None => {
                    // No schedule entry at or below `round`; the caller
                    // registered nothing yet, which can only happen before
                    // genesis bootstrap.
                    return Ok(PeerSet::new(vec![])
                        .expect("empty peer set has no duplicate ids"));
                }
            }
        }
    }
}
