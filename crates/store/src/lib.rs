//! Durable and in-memory backing storage for hashgraph state (spec §4.1).
//!
//! The hashgraph algorithm in `hgc-hashgraph` is purely synchronous and only
//! ever touches I/O through this trait; both implementations here are
//! thread-safe and may be shared behind an `Arc`.

pub mod durable;
pub mod memory;
pub mod tables;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use hgc_consensus_core::block::{Block, BlockIndex};
use hgc_consensus_core::event::{Event, EventHash, EventIndex, Root, RoundNum};
use hgc_consensus_core::frame::Frame;
use hgc_consensus_core::peer::{Peer, PeerId, PeerPubkey};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_consensus_core::round_info::RoundInfo;
use hgc_db::error::DbError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum StoreError {
    #[snafu(transparent)]
    Db { source: DbError },
    #[snafu(display(
        "fork detected: participant {participant} already has an event at index {index}"
    ))]
    ForkDetected { participant: PeerId, index: EventIndex },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage backing for one node's hashgraph (spec §4.1).
///
/// `set_event` is the only operation that can fail for a reason other than
/// the backend itself: inserting two different events at the same
/// `(participant, index)` is a fork and is rejected rather than silently
/// overwriting the first event.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_event(&self, hash: EventHash) -> StoreResult<Option<Event>>;
    async fn set_event(&self, event: Event) -> StoreResult<()>;

    /// Event hashes created by `creator`, starting strictly after `after`.
    async fn participant_events(
        &self,
        creator: PeerPubkey,
        after: EventIndex,
    ) -> StoreResult<Vec<EventHash>>;
    async fn participant_event(
        &self,
        creator: PeerPubkey,
        index: EventIndex,
    ) -> StoreResult<Option<EventHash>>;

    /// Highest known event index per participant, for sync negotiation.
    async fn known_events(&self) -> StoreResult<BTreeMap<PeerId, EventIndex>>;
    async fn first_round(&self, participant: PeerPubkey) -> StoreResult<Option<RoundNum>>;
    async fn set_first_round(&self, participant: PeerPubkey, round: RoundNum) -> StoreResult<()>;

    async fn get_peer_set(&self, round: RoundNum) -> StoreResult<Option<PeerSet>>;
    async fn set_peer_set(&self, round: RoundNum, peer_set: PeerSet) -> StoreResult<()>;
    async fn all_peer_sets(&self) -> StoreResult<BTreeMap<RoundNum, PeerSet>>;

    async fn repertoire_by_pubkey(&self) -> StoreResult<BTreeMap<PeerPubkey, Peer>>;
    async fn repertoire_by_id(&self) -> StoreResult<BTreeMap<PeerId, Peer>>;
    async fn add_to_repertoire(&self, peer: Peer) -> StoreResult<()>;

    async fn get_round(&self, round: RoundNum) -> StoreResult<Option<RoundInfo>>;
    async fn set_round(&self, round: RoundNum, info: RoundInfo) -> StoreResult<()>;
    async fn last_round(&self) -> StoreResult<Option<RoundNum>>;

    async fn round_witnesses(&self, round: RoundNum) -> StoreResult<Vec<EventHash>>;
    async fn round_events(&self, round: RoundNum) -> StoreResult<Vec<EventHash>>;

    /// Appends to the globally-agreed event order.
    async fn add_consensus_event(&self, hash: EventHash) -> StoreResult<()>;
    async fn consensus_events(&self) -> StoreResult<Vec<EventHash>>;

    async fn get_block(&self, index: BlockIndex) -> StoreResult<Option<Block>>;
    async fn set_block(&self, block: Block) -> StoreResult<()>;
    async fn last_block_index(&self) -> StoreResult<Option<BlockIndex>>;

    async fn get_frame(&self, round: RoundNum) -> StoreResult<Option<Frame>>;
    async fn set_frame(&self, frame: Frame) -> StoreResult<()>;

    /// A participant's root: a synthetic self-parent/other-parent summary
    /// at the local horizon, used to validate events whose parents are
    /// below it without fetching their full ancestor chain.
    async fn get_root(&self, participant: PeerPubkey) -> StoreResult<Option<Root>>;
    async fn set_root(&self, participant: PeerPubkey, root: Root) -> StoreResult<()>;

    /// Wipes all prior state and bootstraps from `frame` (fast-forward).
    async fn reset(&self, frame: Frame) -> StoreResult<()>;
    async fn close(&self) -> StoreResult<()>;
    fn store_path(&self) -> Option<PathBuf>;
}
