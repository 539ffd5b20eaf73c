//! Block and frame production at a closed round-received boundary (spec
//! §4.3 "Block production", "Internal transactions").

use hgc_consensus_core::block::{Block, BlockBody, BlockHash, BlockHeader, BlockIndex, StateHash};
use hgc_consensus_core::citem::{Ballot, BalletedInternalTransaction, InternalTransactionKind};
use hgc_consensus_core::event::RoundNum;
use hgc_consensus_core::frame::Frame;
use hgc_consensus_core::hash::xor_hashes;
use hgc_consensus_core::peer_set::PeerSet;
use hgc_consensus_core::signed::Hashable as _;
use hgc_consensus_core::timestamp::Timestamp;
use hgc_store::Store;
use tracing::instrument;

use crate::errors::ConsensusResult;
use crate::Hashgraph;

impl<S: Store> Hashgraph<S> {
    /// Closes the earliest round whose fame is fully decided but whose
    /// received events have not yet been turned into a block, producing
    /// at most one [`Block`] and [`Frame`] (spec §4.3).
    ///
    /// Returns as soon as a round actually produces a block (rounds with no
    /// received events are marked queued and skipped without stopping the
    /// scan). This one-round-at-a-time contract matters: `close_round`
    /// chains `parent_hash` from whatever is currently stored at
    /// `last_block_index`, so the caller must patch, sign and persist the
    /// real state hash of a produced block *before* calling this again —
    /// otherwise the next block's `parent_hash` gets fixed to a
    /// placeholder hash that changes the moment this one is patched,
    /// corrupting the chain (spec §8 "deterministic, prefix-stable
    /// history"). The returned block itself still carries a placeholder,
    /// all-zero `state_hash` and no signatures: the caller (the per-node
    /// façade, not this crate) is responsible for invoking the
    /// application's commit hook, re-hashing and signing the header, and
    /// feeding the result into the block-signature pool.
    #[instrument(target = "hgc::hashgraph", skip(self))]
    pub async fn close_next_decided_round(&self) -> ConsensusResult<Option<Block>> {
        let Some(last_round) = self.store.last_round().await? else {
            return Ok(None);
        };

        let mut r = RoundNum::from(0u64);
        loop {
            let mut info = self.store.get_round(r).await?.unwrap_or_default();
            if info.decided && !info.queued {
                let block = self.close_round(r, &info).await?;
                info.queued = true;
                self.store.set_round(r, info).await?;
                if block.is_some() {
                    return Ok(block);
                }
            }
            if r >= last_round {
                return Ok(None);
            }
            r = r.next_expect();
        }
    }

    async fn close_round(
        &self,
        round_received: RoundNum,
        info: &hgc_consensus_core::round_info::RoundInfo,
    ) -> ConsensusResult<Option<Block>> {
        if info.received_events.is_empty() {
            return Ok(None);
        }

        let famous: Vec<_> = info.famous_witnesses().collect();
        let seed = xor_hashes(famous.iter().copied());

        let mut ordered = Vec::with_capacity(info.received_events.len());
        for hash in &info.received_events {
            let timestamp = self.consensus_timestamp(&famous, *hash).await?;
            let whitened = xor_hashes([*hash, seed]);
            ordered.push((timestamp, whitened, *hash));
        }
        ordered.sort_unstable_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let current_peer_set = self.peer_set_at(round_received).await?;
        let mut next_peer_set = current_peer_set.clone();
        let mut transactions = Vec::new();
        let mut internal_transactions = Vec::new();

        for (_, _, hash) in &ordered {
            self.store.add_consensus_event(*hash).await?;
            let Some(event) = self.store.get_event(*hash).await? else {
                continue;
            };
            transactions.extend(event.inner.transactions.iter().cloned());
            for itx in &event.inner.internal_transactions {
                let ballot = self.ballot_internal_transaction(&itx.kind, &next_peer_set);
                if ballot == Ballot::Accepted {
                    next_peer_set = match &itx.kind {
                        InternalTransactionKind::PeerAdd(peer) => {
                            // Every node that reaches this round of consensus
                            // learns the new peer's address here, not only
                            // the peer itself via its own fast-forward bundle
                            // (spec §4.5 "Join protocol"): otherwise the rest
                            // of the peer-set would have no way to resolve
                            // who to dial once gossip picks the newcomer as a
                            // partner.
                            self.store.add_to_repertoire(peer.clone()).await?;
                            next_peer_set.with_added(peer.clone()).unwrap_or(next_peer_set)
                        }
                        InternalTransactionKind::PeerRemove(peer) => {
                            next_peer_set.with_removed(peer.pubkey)
                        }
                    };
                }
                internal_transactions.push(BalletedInternalTransaction {
                    txn: itx.clone(),
                    ballot,
                });
            }
        }

        let next_round = round_received.next_expect();
        if next_peer_set.n() != current_peer_set.n()
            || next_peer_set.peers().iter().any(|p| !current_peer_set.contains_pubkey(p.pubkey))
        {
            self.store.set_peer_set(next_round, next_peer_set.clone()).await?;
        }

        let index = match self.store.last_block_index().await? {
            Some(i) => i.next_expect(),
            None => BlockIndex::from(0u64),
        };
        let parent_hash = match self.store.last_block_index().await? {
            Some(i) => self
                .store
                .get_block(i)
                .await?
                .map(|b| b.hash())
                .unwrap_or(BlockHash::ZERO),
            None => BlockHash::ZERO,
        };

        let frame = self.build_frame(round_received, &next_peer_set).await?;
        let peer_set_hash = current_peer_set.hash().into();

        let header = BlockHeader {
            index,
            round_received,
            parent_hash,
            state_hash: StateHash::ZERO,
            peer_set_hash,
            timestamp: Timestamp::now(),
        };
        let body = BlockBody {
            transactions,
            internal_transactions,
            frame_hash: frame.hash().into(),
        };
        let block = Block {
            header,
            body,
            signatures: Default::default(),
        };

        self.store.set_block(block.clone()).await?;
        self.store.set_frame(frame).await?;

        Ok(Some(block))
    }

    /// Structural acceptance check for an internal transaction (spec §9,
    /// Open Question ii): a peer-set change is accepted here iff it is not
    /// a no-op against the working peer set being built up for the next
    /// round. Whether the resulting peer set actually takes effect still
    /// depends on the block reaching a super-majority of signatures, which
    /// is the per-node façade's responsibility, not this crate's.
    fn ballot_internal_transaction(
        &self,
        kind: &InternalTransactionKind,
        working_set: &PeerSet,
    ) -> Ballot {
        match kind {
            InternalTransactionKind::PeerAdd(peer) => {
                if working_set.contains_pubkey(peer.pubkey) {
                    Ballot::Rejected
                } else {
                    Ballot::Accepted
                }
            }
            InternalTransactionKind::PeerRemove(peer) => {
                if working_set.contains_pubkey(peer.pubkey) && working_set.n() > 1 {
                    Ballot::Accepted
                } else {
                    Ballot::Rejected
                }
            }
        }
    }

    async fn build_frame(&self, round: RoundNum, next_peer_set: &PeerSet) -> ConsensusResult<Frame> {
        let all_peer_sets = self.store.all_peer_sets().await?;
        let mut peer_sets: Vec<_> = all_peer_sets
            .into_iter()
            .filter(|(r, _)| *r <= round)
            .collect();
        peer_sets.push((round.next_expect(), next_peer_set.clone()));

        let known = self.store.known_events().await?;
        let repertoire = self.store.repertoire_by_id().await?;
        let mut summaries = Vec::new();
        let mut events = Vec::new();
        for (peer_id, index) in known {
            let Some(peer) = repertoire.get(&peer_id) else {
                continue;
            };
            let Some(hash) = self.store.participant_event(peer.pubkey, index).await? else {
                continue;
            };
            let Some(event) = self.store.get_event(hash).await? else {
                continue;
            };
            let event_round = self.round_of(hash).await?.unwrap_or(round);
            summaries.push((
                peer.pubkey,
                hgc_consensus_core::event::RootEventSummary {
                    hash,
                    creator: peer.pubkey,
                    index,
                    round: event_round,
                },
            ));
            events.push(event);
        }

        // Every participant's root carries not just its own boundary event
        // but what it provably knew of every other known participant's at
        // the same boundary (spec §3 "Root"): the per-participant map
        // `insertEvent`'s `knownViaRoot` check consults when an event's
        // other-parent predates the bundled `events`.
        let roots = summaries
            .iter()
            .map(|(pubkey, self_parent)| {
                let others = summaries
                    .iter()
                    .filter(|(other_pubkey, _)| other_pubkey != pubkey)
                    .map(|(other_pubkey, summary)| (*other_pubkey, summary.clone()))
                    .collect();
                (
                    *pubkey,
                    hgc_consensus_core::event::Root {
                        self_parent: self_parent.clone(),
                        others,
                    },
                )
            })
            .collect();

        Ok(Frame {
            round,
            peer_sets,
            roots,
            events,
        })
    }

    /// The most recent block together with the frame it produced, for
    /// bootstrapping a fast-forwarding peer (spec §4.4 `fastForward`).
    pub async fn get_anchor_block_with_frame(&self) -> ConsensusResult<Option<(Block, Frame)>> {
        let Some(index) = self.store.last_block_index().await? else {
            return Ok(None);
        };
        let Some(block) = self.store.get_block(index).await? else {
            return Ok(None);
        };
        let Some(frame) = self.store.get_frame(block.header.round_received).await? else {
            return Ok(None);
        };
        Ok(Some((block, frame)))
    }

    /// Wipes local hashgraph state and bootstraps from `block`/`frame`
    /// (spec §4.4 `fastForward`). The caller is expected to have already
    /// verified `block`'s signatures against `frame`'s peer set.
    pub async fn reset(&self, block: Block, frame: Frame) -> ConsensusResult<()> {
        self.round_cache.write().clear();
        self.store.reset(frame).await?;
        self.store.set_block(block).await?;
        Ok(())
    }
}
