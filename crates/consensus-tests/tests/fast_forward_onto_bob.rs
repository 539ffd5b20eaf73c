//! Fast-forward (spec §8 S4): after enough gossip for round 0 to close and
//! its block to pick up a super-majority of signatures, a brand-new node
//! with no prior history bootstraps entirely from the anchor block+frame,
//! with no hashgraph replay at all.

mod support;

use hgc_consensus_core::peer::PeerSeckey;
use hgc_store::memory::InMemoryStore;
use hgc_store::Store as _;
use hgc_util_error::WhateverResult;
use hgc_validator::Validator;
use snafu::ResultExt as _;
use std::sync::Arc;

use support::{gossip, Cluster, NullGateway};

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn bob_bootstraps_from_the_anchor_block_and_frame() -> WhateverResult<()> {
    let cluster = Cluster::bootstrap(3).await?;
    let (core0, core1, core2) = (&cluster.cores[0], &cluster.cores[1], &cluster.cores[2]);

    core0.sign_and_insert_self_event(None).await.whatever_context("e0")?;
    core1.sign_and_insert_self_event(None).await.whatever_context("e1")?;
    core2.sign_and_insert_self_event(None).await.whatever_context("e2")?;

    for _ in 0..6 {
        gossip(core0, core1).await.whatever_context("sync 0 -> 1")?;
        gossip(core1, core2).await.whatever_context("sync 1 -> 2")?;
        gossip(core2, core0).await.whatever_context("sync 2 -> 0")?;
    }

    let (block, frame) = core2
        .hashgraph()
        .get_anchor_block_with_frame()
        .await
        .whatever_context("core2 anchor")?
        .expect("round 0 should have produced a block by now");

    let bob_store = Arc::new(InMemoryStore::new());
    let bob_seckey = PeerSeckey::generate();
    let bob_validator = Validator::new(bob_seckey, "bob".to_string());
    let bob_core = hgc_core::Core::new(bob_store, bob_validator, Arc::new(NullGateway))
        .await
        .whatever_context("starting bob")?;

    bob_core.fast_forward(block.clone(), frame.clone()).await.whatever_context("fast_forward")?;

    // Bob's knownEvents is exactly the frame's roots: one entry per
    // original peer, at the index the root recorded, nothing more and
    // nothing replayed.
    let bob_known = bob_core.known_events().await.whatever_context("bob known_events")?;
    assert_eq!(bob_known.len(), frame.roots.len());
    for (pubkey, root) in &frame.roots {
        assert_eq!(bob_known.get(&pubkey.id()), Some(&root.self_parent.index));
    }

    assert_eq!(
        bob_core.store().last_block_index().await.whatever_context("bob last_block_index")?,
        Some(block.header.index)
    );

    // Every peer-set the frame carries is reproduced exactly on Bob, since
    // `reset` just replays `frame.peer_sets` verbatim.
    use hgc_consensus_core::signed::Hashable as _;
    for (round, peer_set) in &frame.peer_sets {
        let bob_peer_set = bob_core
            .store()
            .get_peer_set(*round)
            .await
            .whatever_context("bob get_peer_set")?
            .expect("frame round present on bob");
        assert_eq!(bob_peer_set.hash(), peer_set.hash());
    }

    // Bob has no self-chain of his own yet; he wasn't in the peer-set this
    // frame was built from.
    assert!(bob_core.head().is_none());

    Ok(())
}
