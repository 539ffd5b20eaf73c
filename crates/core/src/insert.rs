//! `signAndInsertSelfEvent` and `insertEventAndRunConsensus` (spec §4.4),
//! both funneled through the single writer lock (spec §5).

use hgc_consensus_core::block::BlockIndex;
use hgc_consensus_core::event::{CarriedBlockSignature, Event, EventBody, EventExt as _, EventHash, EventIndex};
use hgc_consensus_core::hash::Hash32;
use hgc_consensus_core::signed::Signable as _;
use hgc_consensus_core::timestamp::Timestamp;
use hgc_store::Store;
use tracing::instrument;

use crate::errors::CoreResult;
use crate::Core;

impl<S: Store> Core<S> {
    /// Builds, signs, and inserts a new self-event carrying whatever is
    /// currently pending, then runs consensus on it (spec §4.4).
    #[instrument(target = "hgc::core", skip(self))]
    pub async fn sign_and_insert_self_event(
        &self,
        other_parent: Option<EventHash>,
    ) -> CoreResult<Vec<hgc_consensus_core::block::Block>> {
        let _guard = self.write_lock.lock().await;

        let (self_parent, index) = match self.head() {
            Some((hash, seq)) => (hash, seq.next_expect()),
            None => (Hash32::ZERO, EventIndex::from(0u64)),
        };

        let transactions = self.pending_transactions.drain_all();
        let internal_transactions = self.pending_internal_transactions.drain_all();
        let block_signatures = self.carry_block_signatures();

        let body = EventBody {
            creator: self.validator.pubkey(),
            index,
            self_parent,
            other_parent,
            transactions,
            internal_transactions,
            block_signatures,
            timestamp: Timestamp::now(),
        };
        let event = Event::new_sign(body, self.validator.seckey());
        let hash = event.event_hash();

        let blocks = self.insert_and_run_locked(event, true).await?;
        self.set_head(hash, index);
        Ok(blocks)
    }

    /// Inserts a (possibly remote) event and drives the consensus pipeline
    /// one step: `divideRounds → decideFame → decideRoundReceived →
    /// processDecidedRounds`. Blocks produced are committed to the
    /// application, patched with the real state hash, self-signed, and
    /// placed in the signature pool (spec §4.4).
    #[instrument(target = "hgc::core", skip(self, event), fields(from_self))]
    pub async fn insert_event_and_run_consensus(
        &self,
        event: Event,
        from_self: bool,
    ) -> CoreResult<Vec<hgc_consensus_core::block::Block>> {
        let _guard = self.write_lock.lock().await;
        self.insert_and_run_locked(event, from_self).await
    }

    pub(crate) async fn insert_and_run_locked(
        &self,
        event: Event,
        from_self: bool,
    ) -> CoreResult<Vec<hgc_consensus_core::block::Block>> {
        self.hashgraph.insert_event(event.clone(), from_self).await?;

        for carried in &event.inner.block_signatures {
            let index = BlockIndex::from(carried.block_index);
            self.signature_pool.with_mut(index, |block| {
                block.add_signature(carried.signer, carried.signature);
            });
            // A gossiped signature can be the one that pushes a pooled
            // block over its peer-set's super-majority; settle that as
            // soon as it happens so `getAnchorBlockWithFrame` (and thus
            // `fastForward`) sees the fully-signed block, not just the
            // single self-signature it was stored with when first closed.
            self.settle_if_anchor_eligible(index).await?;
        }

        self.hashgraph.divide_rounds(&event).await?;
        self.hashgraph.decide_fame().await?;
        self.hashgraph.decide_round_received().await?;

        // One round at a time: `close_next_decided_round` chains the next
        // block's `parent_hash` off whatever is currently stored, so the
        // just-produced block must be patched with its real state hash,
        // signed, and persisted before we ask for the round after it — or
        // its stored hash (and therefore the next block's `parent_hash`)
        // would go stale the moment we patch it here.
        let mut committed = Vec::new();
        while let Some(mut block) = self.hashgraph.close_next_decided_round().await? {
            let outcome = self.gateway.commit_block(&block).await?;
            block.header.state_hash = outcome.state_hash;
            let my_sig = block.header.sign_with(self.validator.seckey());
            block.add_signature(self.validator.pubkey(), my_sig);
            self.store().set_block(block.clone()).await?;
            self.signature_pool.insert(block.clone());
            committed.push(block);
        }
        Ok(committed)
    }

    /// Self-signs every pooled block we haven't signed yet, recording the
    /// signature locally and returning it for gossip piggyback on the next
    /// self-event (spec §9, Open Question ii).
    fn carry_block_signatures(&self) -> Vec<CarriedBlockSignature> {
        let pubkey = self.validator.pubkey();
        let mut carried = Vec::new();
        for index in self.signature_pool.indices() {
            let already_signed = self
                .signature_pool
                .get(index)
                .map(|b| b.signatures.contains_key(&pubkey))
                .unwrap_or(true);
            if already_signed {
                continue;
            }
            let sig = self.signature_pool.with_mut(index, |block| {
                let sig = block.header.sign_with(self.validator.seckey());
                block.add_signature(pubkey, sig);
                sig
            });
            if let Some(sig) = sig {
                carried.push(CarriedBlockSignature {
                    block_index: u64::from(index),
                    signer: pubkey,
                    signature: sig,
                });
            }
        }
        carried
    }
}
