//! Wire event encoding and `sync` (spec §4.4, §6 `SyncResponse.events`).
//!
//! An event's self-parent is always implied by `(creator, index - 1)`, so
//! the wire form omits it; the other-parent is carried as a
//! `(creator, index)` reference instead of a hash, resolved against the
//! receiver's own store on arrival.

use hgc_consensus_core::citem::InternalTransaction;
use hgc_consensus_core::event::{CarriedBlockSignature, Event, EventBody, EventIndex, TransactionPayload};
use hgc_consensus_core::hash::Hash32;
use hgc_consensus_core::peer::{PeerId, PeerPubkey};
use hgc_consensus_core::signed::Signed;
use hgc_consensus_core::timestamp::Timestamp;
use hgc_store::Store;
use tracing::instrument;

use crate::errors::{CoreResult, UnknownWireParentSnafu};
use crate::Core;

#[derive(Debug, Clone)]
pub struct WireEvent {
    pub creator: PeerPubkey,
    pub index: EventIndex,
    pub other_parent: Option<(PeerId, EventIndex)>,
    pub transactions: Vec<TransactionPayload>,
    pub internal_transactions: Vec<InternalTransaction>,
    pub block_signatures: Vec<CarriedBlockSignature>,
    pub timestamp: Timestamp,
    pub sig: hgc_consensus_core::signed::Signature,
}

impl<S: Store> Core<S> {
    /// Compacts a stored event into its wire form: the self-parent is
    /// dropped (implied by `creator, index - 1`) and the other-parent hash
    /// is resolved to a `(creator, index)` reference the receiver can
    /// re-resolve against its own store (spec §4.4 `eventDiff`).
    pub(crate) async fn to_wire_event(&self, event: &Event) -> CoreResult<WireEvent> {
        let other_parent = match event.inner.other_parent {
            Some(hash) => self
                .hashgraph
                .store()
                .get_event(hash)
                .await?
                .map(|other| (other.inner.creator.id(), other.inner.index)),
            None => None,
        };
        Ok(WireEvent {
            creator: event.inner.creator,
            index: event.inner.index,
            other_parent,
            transactions: event.inner.transactions.clone(),
            internal_transactions: event.inner.internal_transactions.clone(),
            block_signatures: event.inner.block_signatures.clone(),
            timestamp: event.inner.timestamp,
            sig: event.sig,
        })
    }
}

impl<S: Store> Core<S> {
    /// Reconstructs each wire event's full parent hashes from `Store`,
    /// inserts it and drives consensus, then produces and inserts one new
    /// self-event referencing `from`'s last known event as other-parent
    /// (spec §4.4 `sync`).
    #[instrument(target = "hgc::core", skip(self, wire_events))]
    pub async fn sync(
        &self,
        from: PeerId,
        wire_events: Vec<WireEvent>,
    ) -> CoreResult<Vec<hgc_consensus_core::block::Block>> {
        let mut produced = Vec::new();
        for wire in wire_events {
            let event = self.reconstruct(wire).await?;
            produced.extend(self.insert_event_and_run_consensus(event, false).await?);
        }

        let repertoire = self.hashgraph.store().repertoire_by_id().await?;
        let other_parent = match repertoire.get(&from) {
            Some(peer) => {
                let known = self.hashgraph.store().known_events().await?;
                match known.get(&from) {
                    Some(&idx) => self.hashgraph.store().participant_event(peer.pubkey, idx).await?,
                    None => None,
                }
            }
            None => None,
        };

        produced.extend(self.sign_and_insert_self_event(other_parent).await?);
        Ok(produced)
    }

    async fn reconstruct(&self, wire: WireEvent) -> CoreResult<Event> {
        let self_parent = match wire.index.prev() {
            Some(prev) => self
                .hashgraph
                .store()
                .participant_event(wire.creator, prev)
                .await?
                .unwrap_or(Hash32::ZERO),
            None => Hash32::ZERO,
        };

        let other_parent = match wire.other_parent {
            Some((other_creator, other_index)) => {
                let repertoire = self.hashgraph.store().repertoire_by_id().await?;
                let pubkey = repertoire.get(&other_creator).map(|p| p.pubkey);
                let resolved = match pubkey {
                    Some(pk) => match self.hashgraph.store().participant_event(pk, other_index).await? {
                        Some(hash) => Some(hash),
                        // The direct chain doesn't go back that far locally
                        // (e.g. we just fast-forwarded): the sender's root
                        // boundary marker for `pk` still tells us whether
                        // `other_index` is exactly the event our horizon
                        // starts at (spec §3 "Root").
                        None => self.hashgraph.store().get_root(pk).await?.and_then(|root| {
                            (root.self_parent.creator == pk && root.self_parent.index == other_index)
                                .then_some(root.self_parent.hash)
                        }),
                    },
                    None => None,
                };
                if resolved.is_none() {
                    return UnknownWireParentSnafu {
                        creator: wire.creator.id(),
                        index: wire.index,
                        other_creator,
                        other_index,
                    }
                    .fail();
                }
                resolved
            }
            None => None,
        };

        let body = EventBody {
            creator: wire.creator,
            index: wire.index,
            self_parent,
            other_parent,
            transactions: wire.transactions,
            internal_transactions: wire.internal_transactions,
            block_signatures: wire.block_signatures,
            timestamp: wire.timestamp,
        };
        Ok(Signed {
            inner: body,
            sig: wire.sig,
        })
    }
}
