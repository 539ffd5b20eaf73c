//! `processSigPool` (spec §4.4): attaches valid signatures to pooled
//! partial blocks and reports which have reached anchor-eligibility.

use hgc_consensus_core::block::{Block, BlockIndex};
use hgc_consensus_core::peer::PeerPubkey;
use hgc_consensus_core::signed::{Signable as _, Signature};
use hgc_store::Store;
use tracing::instrument;

use crate::errors::CoreResult;
use crate::Core;

impl<S: Store> Core<S> {
    /// Submits a signature received out-of-band (e.g. a dedicated RPC
    /// rather than piggybacked on an event) into the pool, provided the
    /// signer belongs to the block's peer-set and the signature verifies.
    pub async fn submit_block_signature(
        &self,
        index: BlockIndex,
        signer: PeerPubkey,
        signature: Signature,
    ) -> CoreResult<bool> {
        let Some(block) = self.signature_pool.get(index) else {
            return Ok(false);
        };
        let peer_set = self.hashgraph.peer_set_at(block.header.round_received).await?;
        if !peer_set.contains_pubkey(signer) || block.header.verify_signature(signer, signature).is_err() {
            return Ok(false);
        }
        self.signature_pool.with_mut(index, |b| b.add_signature(signer, signature));
        self.settle_if_anchor_eligible(index).await?;
        Ok(true)
    }

    /// Walks every pooled partial block and settles the ones that have
    /// accumulated a super-majority of signatures under their own
    /// round-received's peer-set (spec §4.4 "anchor-eligible").
    #[instrument(target = "hgc::core", skip(self))]
    pub async fn process_sig_pool(&self) -> CoreResult<Vec<Block>> {
        let mut anchor_eligible = Vec::new();
        for index in self.signature_pool.indices() {
            if let Some(block) = self.settle_if_anchor_eligible(index).await? {
                anchor_eligible.push(block);
            }
        }
        Ok(anchor_eligible)
    }

    /// Persists a pooled block and drops it from the pool as soon as it
    /// reaches super-majority, regardless of which channel (carried on an
    /// event, or submitted directly) pushed it over the threshold; shared
    /// by [`Self::submit_block_signature`], [`Self::process_sig_pool`], and
    /// the carried-signature merge in `insert.rs` so all three channels
    /// settle identically (spec §9, Open Question ii).
    pub(crate) async fn settle_if_anchor_eligible(&self, index: BlockIndex) -> CoreResult<Option<Block>> {
        let Some(block) = self.signature_pool.get(index) else {
            return Ok(None);
        };
        let peer_set = self.hashgraph.peer_set_at(block.header.round_received).await?;
        if !block.has_super_majority(&peer_set) {
            return Ok(None);
        }
        self.store().set_block(block.clone()).await?;
        self.signature_pool.remove(index);
        Ok(Some(block))
    }
}
