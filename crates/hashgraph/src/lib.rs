//! The hashgraph algorithm proper (spec §4.3): round assignment, witness
//! and fame voting, round-received/ordering, and block/frame production.
//!
//! A [`Hashgraph`] is a thin, stateless-beyond-its-cache wrapper around a
//! [`Store`]; all durable state lives there so that the algorithm can be
//! driven incrementally, one inserted event or one decided round at a time,
//! exactly as [`hgc_core`] (not a dependency of this crate) expects.

pub mod ancestry;
pub mod blocks;
pub mod errors;
pub mod fame;
pub mod insert;
pub mod received;
pub mod rounds;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use hgc_consensus_core::event::{EventHash, RoundNum};
use hgc_store::Store;
use parking_lot::RwLock;

pub const LOG_TARGET: &str = "hgc::hashgraph";

/// Coin-round frequency: once every `c` rounds of an undecided fame
/// question, ties are broken by a deterministic coin flip rather than a
/// majority vote (spec §4.3).
pub const DEFAULT_COIN_FREQUENCY: u64 = 10;

/// Drives the consensus algorithm over a [`Store`].
///
/// Cheap to clone-by-reference: wrap in an `Arc` at the call site the way
/// [`hgc_store::durable::DurableStore`] itself is shared.
pub struct Hashgraph<S> {
    store: Arc<S>,
    coin_frequency: u64,
    /// In-memory event-hash -> round index, rebuilt lazily from
    /// [`Store::round_events`] on a cache miss. Not persisted: a restart
    /// just re-derives it the slow way the first time each event is
    /// consulted again.
    round_cache: RwLock<HashMap<EventHash, RoundNum>>,
}

impl<S: Store> Hashgraph<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            coin_frequency: DEFAULT_COIN_FREQUENCY,
            round_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_coin_frequency(mut self, c: u64) -> Self {
        self.coin_frequency = c;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
