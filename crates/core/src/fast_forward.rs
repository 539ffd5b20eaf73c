//! `fastForward` (spec §4.4, §4.5 `CatchingUp`).

use hgc_consensus_core::block::Block;
use hgc_consensus_core::frame::Frame;
use hgc_store::Store;
use tracing::instrument;

use crate::errors::{CoreResult, InsufficientSignaturesSnafu};
use crate::{Core, Head};

impl<S: Store> Core<S> {
    /// Verifies `block`'s signatures reach a super-majority under `frame`'s
    /// peer-set, wipes local hashgraph state, and bootstraps from the pair
    /// (spec §4.4). Any failure partway through is fatal: the caller is
    /// expected to force a `Shutdown` rather than leave the store
    /// half-reset (spec §7).
    #[instrument(target = "hgc::core", skip(self, block, frame))]
    pub async fn fast_forward(&self, block: Block, frame: Frame) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let peer_set = frame
            .peer_set_at(frame.round)
            .cloned()
            .unwrap_or_else(panic_free_empty_peer_set);
        if !block.has_super_majority(&peer_set) {
            return InsufficientSignaturesSnafu { index: block.header.index }.fail();
        }

        self.hashgraph.reset(block.clone(), frame.clone()).await?;

        // `reset` replaces the store's state wholesale, repertoire included;
        // without this a freshly fast-forwarded node has no address book to
        // resolve its new peer-set's members by and can't gossip with anyone
        // beyond whichever single bootstrap contact it started with.
        for (_, peer_set) in &frame.peer_sets {
            for peer in peer_set.iter() {
                self.store().add_to_repertoire(peer.clone()).await?;
            }
        }

        let new_head = frame
            .roots
            .iter()
            .find(|(pubkey, _)| *pubkey == self.validator.pubkey())
            .map(|(_, root)| (root.self_parent.hash, root.self_parent.index));
        *self.head.write() = new_head.map(|(hash, seq)| Head { hash, seq });

        // Signatures accumulated for blocks now superseded by the reset are
        // no longer meaningful.
        self.signature_pool.clear();

        Ok(())
    }
}

fn panic_free_empty_peer_set() -> hgc_consensus_core::peer_set::PeerSet {
    hgc_consensus_core::peer_set::PeerSet::new(vec![]).expect("empty peer set has no duplicate ids")
}
