//! Leave protocol (spec §4.5 "Administrative Leave"): submit PEER_REMOVE,
//! flush it to an anchor block via ordinary gossip, then shut down.

use hgc_consensus_core::citem::InternalTransaction;
use hgc_consensus_core::peer::Peer;
use hgc_store::Store;
use tracing::info;

use crate::errors::GossipResult;
use crate::gossip::pick_partner;
use crate::{Node, LOG_TARGET};

/// Upper bound on flush attempts so a leave request can't hang forever if
/// every partner is unreachable; there is no `LeaveTimeout` in the
/// recognized configuration options, so we reuse the join timeout's
/// magnitude in round count rather than wall-clock time.
const MAX_FLUSH_ROUNDS: usize = 64;

impl<S: Store> Node<S> {
    pub(crate) async fn leave_network(&self) -> GossipResult<()> {
        let us = Peer::new(
            self.core.validator().pubkey(),
            self.config.advertise_addr.clone(),
            self.config.moniker.clone(),
        );
        self.core.queue_internal_transaction(InternalTransaction::peer_remove(us));

        for _ in 0..MAX_FLUSH_ROUNDS {
            if self.our_removal_committed().await? {
                info!(target: LOG_TARGET, "PEER_REMOVE committed, leaving");
                return Ok(());
            }
            let Some(partner) = pick_partner(self).await else {
                self.core.sign_and_insert_self_event(None).await?;
                continue;
            };
            self.gossip_round(&partner).await?;
        }
        Ok(())
    }

    async fn our_removal_committed(&self) -> GossipResult<bool> {
        let round = self.core.store().last_round().await.map_err(hgc_core::errors::CoreError::from)?;
        let Some(round) = round else { return Ok(true) };
        let peer_set = self
            .core
            .hashgraph()
            .peer_set_at(round)
            .await
            .map_err(hgc_core::errors::CoreError::from)?;
        Ok(!peer_set.contains_id(self.core.validator().id()))
    }
}
