//! A minimal [`AppGateway`] for the demo fleet: no application state lives
//! above consensus here, so every commit is accepted unconditionally and
//! just logged.

use async_trait::async_trait;
use hgc_consensus_core::block::{Block, BlockIndex, StateHash};
use hgc_core::gateway::{AppGateway, CommitOutcome, GatewayResult, NodeState};
use tracing::info;

use crate::LOG_TARGET;

pub struct LoggingGateway {
    pub moniker: String,
}

#[async_trait]
impl AppGateway for LoggingGateway {
    async fn commit_block(&self, block: &Block) -> GatewayResult<CommitOutcome> {
        info!(
            target: LOG_TARGET,
            moniker = %self.moniker,
            index = %block.header.index,
            round = %block.header.round_received,
            "Committed block"
        );
        Ok(CommitOutcome { state_hash: StateHash::ZERO, accepted_internal_transactions: vec![] })
    }

    async fn get_snapshot(&self, _index: BlockIndex) -> GatewayResult<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn restore(&self, _snapshot: &[u8]) -> GatewayResult<StateHash> {
        Ok(StateHash::ZERO)
    }

    async fn on_state_changed(&self, state: NodeState) {
        info!(target: LOG_TARGET, moniker = %self.moniker, ?state, "State changed");
    }
}
