//! Join protocol (spec §4.5 "Join protocol"): a joining node contacts a
//! bootstrap peer, submits (indirectly, via the bootstrap peer) a PEER_ADD,
//! and polls until either acceptance or `JoinTimeout`.

use hgc_consensus_core::block::Block;
use hgc_consensus_core::citem::InternalTransaction;
use hgc_consensus_core::frame::Frame;
use hgc_consensus_core::peer::{Peer, PeerId};
use hgc_core::errors::CoreError;
use hgc_store::Store;
use tracing::{info, instrument};

use crate::errors::{NodeJoinError, NodeJoinResult};
use crate::transport::JoinRequest;
use crate::{Node, LOG_TARGET};

/// Upper bound on how many gossip rounds a bootstrap peer waits for a
/// queued `PEER_ADD` to land in an anchor block before giving up on an
/// incoming join request; there is no dedicated timeout configuration
/// option for the responder side either (spec §4.5).
const MAX_ACCEPT_ROUNDS: usize = 64;

impl<S: Store> Node<S> {
    /// Tries every peer already in our repertoire as a bootstrap contact
    /// (a brand-new node is expected to have been seeded with at least one
    /// such record out of band before `run()` is called), polling each
    /// until `JoinTimeout` elapses.
    #[instrument(target = "hgc::node", skip(self))]
    pub(crate) async fn join_network(&self) -> NodeJoinResult<()> {
        let repertoire = self.core.store().repertoire_by_id().await.map_err(hgc_core::errors::CoreError::from)?;
        let bootstrap = repertoire
            .values()
            .find(|p| p.id() != self.core.validator().id())
            .cloned()
            .ok_or(NodeJoinError::Timeout)?;

        self.join_via(&bootstrap).await
    }

    /// Contacts `bootstrap` directly; exposed for callers (e.g. a CLI
    /// binary) that already know a specific peer to join through.
    pub async fn join_via(&self, bootstrap: &Peer) -> NodeJoinResult<()> {
        let us = Peer::new(self.core.validator().pubkey(), self.config.advertise_addr.clone(), self.config.moniker.clone());
        let deadline = tokio::time::Instant::now() + self.config.join_timeout;

        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(NodeJoinError::Timeout);
            }

            match self.transport.join(bootstrap.id(), JoinRequest { peer: us.clone() }).await {
                Ok(resp) => {
                    info!(target: LOG_TARGET, round = %resp.accepted_round, "Join accepted, bootstrapping from fast-sync bundle");
                    self.core.fast_forward(resp.block, resp.frame).await?;
                    return Ok(());
                }
                Err(_) => {
                    tokio::time::sleep(self.config.tcp_timeout).await;
                }
            }
        }
    }

    /// The responder half of the join protocol: a bootstrap peer receiving
    /// a [`JoinRequest`] queues the newcomer's `PEER_ADD`, gossips it to
    /// commitment, and hands back a fast-sync bundle the newcomer can
    /// `fastForward` from.
    #[instrument(target = "hgc::node", skip(self, peer), fields(peer = %peer.id()))]
    pub async fn accept_join(&self, peer: Peer) -> NodeJoinResult<(Vec<Peer>, Frame, Block)> {
        let peer_id = peer.id();
        self.core.queue_internal_transaction(InternalTransaction::peer_add(peer));

        for _ in 0..MAX_ACCEPT_ROUNDS {
            if self.peer_committed(peer_id).await? {
                let bundle = self
                    .core
                    .hashgraph()
                    .get_anchor_block_with_frame()
                    .await
                    .map_err(CoreError::from)?;
                if let Some((block, frame)) = bundle {
                    let peer_set = self
                        .core
                        .hashgraph()
                        .peer_set_at(frame.round)
                        .await
                        .map_err(CoreError::from)?;
                    let peers = peer_set.iter().cloned().collect();
                    info!(target: LOG_TARGET, round = %frame.round, "Accepted join");
                    return Ok((peers, frame, block));
                }
            }
            let Some(partner) = crate::gossip::pick_partner(self).await else {
                self.core.sign_and_insert_self_event(None).await?;
                continue;
            };
            self.gossip_round(&partner)
                .await
                .map_err(|e| NodeJoinError::Transport { peer: partner.id(), reason: e.to_string() })?;
        }
        Err(NodeJoinError::Timeout)
    }

    async fn peer_committed(&self, peer_id: PeerId) -> NodeJoinResult<bool> {
        let round = self.core.store().last_round().await.map_err(CoreError::from)?;
        let Some(round) = round else { return Ok(false) };
        let peer_set = self.core.hashgraph().peer_set_at(round).await.map_err(CoreError::from)?;
        Ok(peer_set.contains_id(peer_id))
    }
}
