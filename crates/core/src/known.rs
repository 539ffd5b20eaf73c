//! `knownEvents` and `eventDiff` (spec §4.4).

use std::collections::{BTreeMap, VecDeque};

use hgc_consensus_core::event::EventIndex;
use hgc_consensus_core::peer::PeerId;
use hgc_store::Store;
use tracing::instrument;

use crate::errors::CoreResult;
use crate::sync::WireEvent;
use crate::Core;

impl<S: Store> Core<S> {
    /// Highest known event index per creator, merged with this node's own
    /// in-flight head so a just-created self-event is reported even if the
    /// caller races ahead of whatever the store has durably committed
    /// (spec §4.4).
    #[instrument(target = "hgc::core", skip(self))]
    pub async fn known_events(&self) -> CoreResult<BTreeMap<PeerId, EventIndex>> {
        let mut known = self.hashgraph.store().known_events().await?;
        if let Some((_, seq)) = self.head() {
            known
                .entry(self.validator.id())
                .and_modify(|idx| *idx = (*idx).max(seq))
                .or_insert(seq);
        }
        Ok(known)
    }

    /// Every event we have that `known` does not, as a topological walk:
    /// events are grouped by their creator's first round, then ordered by
    /// index within a creator, so every parent precedes its child (spec
    /// §4.4).
    #[instrument(target = "hgc::core", skip(self, known))]
    pub async fn event_diff(&self, known: &BTreeMap<PeerId, EventIndex>) -> CoreResult<Vec<WireEvent>> {
        let repertoire = self.hashgraph.store().repertoire_by_id().await?;
        let ours = self.known_events().await?;

        let mut rows = Vec::new();
        for peer_id in ours.keys() {
            let Some(peer) = repertoire.get(peer_id) else {
                continue;
            };
            // `participant_events` is exclusive of `after`, so a peer with
            // no knowledge of this creator (`after == None`) still needs
            // its genesis event (index 0) fetched separately.
            let after = known.get(peer_id).copied();
            let mut missing = Vec::new();
            if after.is_none() {
                if let Some(genesis) = self
                    .hashgraph
                    .store()
                    .participant_event(peer.pubkey, EventIndex::from(0u64))
                    .await?
                {
                    missing.push(genesis);
                }
            }
            missing.extend(
                self.hashgraph
                    .store()
                    .participant_events(peer.pubkey, after.unwrap_or(EventIndex::from(0u64)))
                    .await?,
            );

            let first_round = self
                .hashgraph
                .store()
                .first_round(peer.pubkey)
                .await?
                .unwrap_or_default();
            for hash in missing {
                let Some(event) = self.hashgraph.store().get_event(hash).await? else {
                    continue;
                };
                let index = event.inner.index;
                let wire = self.to_wire_event(&event).await?;
                rows.push((first_round, index, wire));
            }
        }
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        Ok(topological_order(rows.into_iter().map(|(_, _, w)| w).collect()))
    }
}

/// `(first_round, index)` alone only orders each creator's own chain
/// correctly; two different creators' events can land at the same key while
/// one cites the other as other-parent. Re-sorts into a batch where every
/// event's self-parent and other-parent, when also part of the batch,
/// precede it, preserving the incoming order wherever that's already true.
fn topological_order(events: Vec<WireEvent>) -> Vec<WireEvent> {
    let position_of: BTreeMap<(PeerId, EventIndex), usize> = events
        .iter()
        .enumerate()
        .map(|(i, w)| ((w.creator.id(), w.index), i))
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); events.len()];
    let mut in_degree = vec![0usize; events.len()];
    for (i, w) in events.iter().enumerate() {
        if let Some(prev) = w.index.prev() {
            if let Some(&p) = position_of.get(&(w.creator.id(), prev)) {
                dependents[p].push(i);
                in_degree[i] += 1;
            }
        }
        if let Some(other) = w.other_parent {
            if let Some(&p) = position_of.get(&other) {
                dependents[p].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..events.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(events.len());
    let mut placed = vec![false; events.len()];
    while let Some(i) = ready.pop_front() {
        placed[i] = true;
        order.push(i);
        for &next in &dependents[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push_back(next);
            }
        }
    }
    // A leftover index means an in-batch cycle, which a valid hashgraph
    // never produces; append it as-is rather than dropping the event.
    for i in 0..events.len() {
        if !placed[i] {
            order.push(i);
        }
    }

    let mut slots: Vec<Option<WireEvent>> = events.into_iter().map(Some).collect();
    order.into_iter().map(|i| slots[i].take().expect("each index placed once")).collect()
}
