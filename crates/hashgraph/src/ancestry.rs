//! Reachability queries over the event DAG: "sees" and "strongly sees"
//! (spec §4.3).
//!
//! Both are plain graph walks through [`hgc_store::Store`]; there is no
//! persistent memoization beyond what a single call needs; repeated calls
//! during `divide_rounds`/`decide_fame` re-walk from scratch. A real
//! deployment would want a bounded per-event ancestor cache, but the DAG
//! segment actually consulted by either query is the handful of rounds
//! around the current frontier, not the whole history.

use std::collections::{HashMap, HashSet};

use hgc_consensus_core::event::{Event, EventHash};
use hgc_consensus_core::peer::PeerPubkey;
use hgc_consensus_core::peer_set::PeerSet;
use hgc_store::Store;

use crate::errors::ConsensusResult;

/// All ancestors of `start`, including `start` itself, keyed by hash.
pub(crate) async fn collect_ancestors(
    store: &impl Store,
    start: EventHash,
) -> ConsensusResult<HashMap<EventHash, Event>> {
    let mut out = HashMap::new();
    let mut stack = vec![start];
    while let Some(hash) = stack.pop() {
        if out.contains_key(&hash) {
            continue;
        }
        let Some(event) = store.get_event(hash).await? else {
            continue;
        };
        if !event.inner.self_parent.is_zero() {
            stack.push(event.inner.self_parent);
        }
        if let Some(other) = event.inner.other_parent {
            stack.push(other);
        }
        out.insert(hash, event);
    }
    Ok(out)
}

/// Whether `ancestor` is `descendant` itself, or a transitive parent of it.
pub(crate) async fn is_ancestor_or_self(
    store: &impl Store,
    descendant: EventHash,
    ancestor: EventHash,
) -> ConsensusResult<bool> {
    if descendant == ancestor {
        return Ok(true);
    }
    let mut visited = HashSet::new();
    let mut stack = vec![descendant];
    while let Some(hash) = stack.pop() {
        if hash == ancestor {
            return Ok(true);
        }
        if !visited.insert(hash) {
            continue;
        }
        let Some(event) = store.get_event(hash).await? else {
            continue;
        };
        if !event.inner.self_parent.is_zero() {
            stack.push(event.inner.self_parent);
        }
        if let Some(other) = event.inner.other_parent {
            stack.push(other);
        }
    }
    Ok(false)
}

/// `x` sees `y`: `y` is an ancestor of (or equal to) `x`.
pub async fn sees(store: &impl Store, x: EventHash, y: EventHash) -> ConsensusResult<bool> {
    is_ancestor_or_self(store, x, y).await
}

/// `x` strongly sees `y`: `x` sees `y`, and the sub-DAG between them (the
/// ancestors of `x` that are themselves descendants-or-equal of `y`) carries
/// events from a super-majority of `peer_set`.
pub async fn strongly_sees(
    store: &impl Store,
    x: EventHash,
    y: EventHash,
    peer_set: &PeerSet,
) -> ConsensusResult<bool> {
    if !sees(store, x, y).await? {
        return Ok(false);
    }
    let ancestors_of_x = collect_ancestors(store, x).await?;
    let mut creators: HashSet<PeerPubkey> = HashSet::new();
    for (hash, event) in &ancestors_of_x {
        if is_ancestor_or_self(store, *hash, y).await? {
            creators.insert(event.inner.creator);
        }
    }
    Ok(peer_set.is_super_majority(creators.len()))
}
