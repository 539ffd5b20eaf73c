//! Hashgraph Node
//!
//! A node drives one participant's view of consensus: it wraps a
//! [`hgc_core::Core`] with the state machine (spec §4.5), the gossip loop
//! that keeps that core's hashgraph in sync with the rest of the
//! peer-set, and the join/leave protocols that move a validator in and out
//! of the peer-set.
//!
//! This crate drives [`hgc_core`] for the actual consensus bookkeeping,
//! taking care of *when* to call it based on timers, peer responses, and
//! administrative requests. See [`gossip::gossip_round`] for the core loop
//! logic.

pub mod config;
pub mod errors;
pub mod transport;

mod gossip;
mod join;
mod leave;


pub use config::Config;
pub use hgc_core::NodeState;
pub use transport::{Transport, TransportError, TransportResult};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hgc_consensus_core::peer_set::PeerSet;
use hgc_core::errors::CoreError;
use hgc_core::{AppGateway, Core};
use hgc_store::Store;
use hgc_validator::Validator;
use tokio::sync::watch;
use tracing::info;

use crate::errors::NodeInitResult;

pub const LOG_TARGET: &str = "hgc::node";

/// Drives one participant's membership in the consensus network (spec
/// §4.5). Cheap to share: wrap in an `Arc` the way [`Core`] itself is.
pub struct Node<S> {
    core: Arc<Core<S>>,
    gateway: Arc<dyn AppGateway>,
    transport: Arc<dyn Transport>,
    config: Config,
    state_tx: watch::Sender<NodeState>,
    state_rx: watch::Receiver<NodeState>,
    shutdown: AtomicBool,
    leave: AtomicBool,
}

impl<S: Store> Node<S> {
    /// Builds a node around an already-open `Core` and decides the initial
    /// state per the boot-transition table (spec §4.5).
    pub async fn new(
        store: Arc<S>,
        validator: Validator,
        gateway: Arc<dyn AppGateway>,
        transport: Arc<dyn Transport>,
        mut config: Config,
    ) -> NodeInitResult<Arc<Self>> {
        config.validate();
        let core = Arc::new(Core::new(store, validator, gateway.clone()).await?);

        let initial_state = Self::boot_state(&core, &config).await?;
        let (state_tx, state_rx) = watch::channel(initial_state);
        gateway.on_state_changed(initial_state).await;

        Ok(Arc::new(Self {
            core,
            gateway,
            transport,
            config,
            state_tx,
            state_rx,
            shutdown: AtomicBool::new(false),
            leave: AtomicBool::new(false),
        }))
    }

    async fn boot_state(core: &Core<S>, config: &Config) -> NodeInitResult<NodeState> {
        if config.maintenance_mode {
            return Ok(NodeState::Suspended);
        }

        let round = core.store().last_round().await.map_err(CoreError::from)?;
        let peer_set = match round {
            Some(round) => core.hashgraph().peer_set_at(round).await.map_err(CoreError::from)?,
            None => PeerSet::new(vec![]).expect("empty peer set has no duplicate ids"),
        };

        if peer_set.contains_id(core.validator().id()) {
            Ok(NodeState::Babbling)
        } else if round.is_none() && config.bootstrap {
            // A genuinely fresh store with `Bootstrap` set: this node is
            // founding the network, there's no existing round to have been
            // left out of.
            Ok(NodeState::Babbling)
        } else if config.bootstrap {
            // `Bootstrap` on a store that already has rounds, but we're not
            // in the peer-set they recorded: misconfiguration, not something
            // `Joining` can recover from.
            Err(errors::NodeInitError::MissingFromPeerSet)
        } else {
            Ok(NodeState::Joining)
        }
    }

    pub fn core(&self) -> &Arc<Core<S>> {
        &self.core
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> NodeState {
        *self.state_rx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<NodeState> {
        self.state_rx.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Administrative leave (spec §4.5: `Leave` → `Leaving`; submit
    /// PEER_REMOVE; flush to anchor; → `Shutdown`). Only takes effect from
    /// `Babbling`; requesting it while `Joining`/`CatchingUp`/`Suspended`
    /// just waits until the node reaches steady state, and a concurrent
    /// `request_shutdown` always wins over it.
    pub fn request_leave(&self) {
        self.leave.store(true, Ordering::SeqCst);
    }

    fn leave_requested(&self) -> bool {
        self.leave.load(Ordering::SeqCst)
    }

    async fn set_state(&self, state: NodeState) {
        if *self.state_rx.borrow() != state {
            info!(target: LOG_TARGET, ?state, "Node state transition");
            self.state_tx.send_replace(state);
            self.gateway.on_state_changed(state).await;
        }
    }

    /// Drives the state machine until `Shutdown` is reached or an
    /// unrecoverable error forces it there (spec §7: storage errors during
    /// `CatchingUp`/`fastForward` are fatal).
    pub async fn run(self: Arc<Self>) -> errors::GossipResult<()> {
        loop {
            if self.shutdown_requested() {
                self.set_state(NodeState::Shutdown).await;
            } else if self.leave_requested() && self.state() == NodeState::Babbling {
                self.set_state(NodeState::Leaving).await;
            }
            match self.state() {
                NodeState::Babbling => self.run_babbling().await?,
                NodeState::Joining => self.run_joining().await,
                NodeState::CatchingUp => self.run_catching_up().await?,
                NodeState::Leaving => self.run_leaving().await?,
                NodeState::Suspended => self.run_suspended().await,
                NodeState::Shutdown => return Ok(()),
            }
        }
    }

    async fn run_joining(&self) {
        match self.join_network().await {
            Ok(()) => self.set_state(NodeState::Babbling).await,
            Err(_) => self.set_state(NodeState::Shutdown).await,
        }
    }

    async fn run_suspended(&self) {
        tokio::time::sleep(self.config.slow_heartbeat_timeout).await;
    }

    async fn run_catching_up(&self) -> errors::GossipResult<()> {
        let partner = crate::gossip::pick_partner(self)
            .await
            .ok_or(errors::GossipError::NoPartner)?;
        self.fast_sync_from(partner.id()).await?;
        self.set_state(NodeState::Babbling).await;
        Ok(())
    }

    async fn run_leaving(&self) -> errors::GossipResult<()> {
        self.leave_network().await?;
        self.set_state(NodeState::Shutdown).await;
        Ok(())
    }
}
