//! Three-way sync (spec §8 S2): the same diamond as the hand-built S1
//! scenario, this time assembled purely by chaining real one-hop syncs
//! `1→0`, `0→2`, `2→1`, each of which both pulls the partner's events and
//! mints a new self-event citing the partner's head as other-parent.

mod support;

use hgc_consensus_core::event::EventIndex;
use hgc_util_error::WhateverResult;
use snafu::ResultExt as _;

use support::{gossip, Cluster};

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn three_way_sync_converges_to_the_diamond() -> WhateverResult<()> {
    let cluster = Cluster::bootstrap(3).await?;
    let (core0, core1, core2) = (&cluster.cores[0], &cluster.cores[1], &cluster.cores[2]);

    core0.sign_and_insert_self_event(None).await.whatever_context("e0")?;
    core1.sign_and_insert_self_event(None).await.whatever_context("e1")?;
    core2.sign_and_insert_self_event(None).await.whatever_context("e2")?;

    gossip(core1, core0).await.whatever_context("sync 1 -> 0")?;
    let after0 = core0.known_events().await.whatever_context("core0 known_events")?;
    assert_eq!(after0.get(&cluster.id(0)), Some(&EventIndex::from(1u64)));
    assert_eq!(after0.get(&cluster.id(1)), Some(&EventIndex::from(0u64)));
    assert!(!after0.contains_key(&cluster.id(2)));

    gossip(core0, core2).await.whatever_context("sync 0 -> 2")?;
    let after2 = core2.known_events().await.whatever_context("core2 known_events")?;
    assert_eq!(after2.get(&cluster.id(0)), Some(&EventIndex::from(1u64)));
    assert_eq!(after2.get(&cluster.id(1)), Some(&EventIndex::from(0u64)));
    assert_eq!(after2.get(&cluster.id(2)), Some(&EventIndex::from(1u64)));

    gossip(core2, core1).await.whatever_context("sync 2 -> 1")?;
    let after1 = core1.known_events().await.whatever_context("core1 known_events")?;
    assert_eq!(after1.get(&cluster.id(0)), Some(&EventIndex::from(1u64)));
    assert_eq!(after1.get(&cluster.id(1)), Some(&EventIndex::from(1u64)));
    assert_eq!(after1.get(&cluster.id(2)), Some(&EventIndex::from(1u64)));

    // core1's head is e12 = e1 + e20, exactly the diamond's apex from the
    // hand-built scenario: self-parent is its own prior event, other-parent
    // is core2's just-synced head (e20 = e2 + e01).
    let (head_hash, head_index) = core1.head().expect("just synced");
    assert_eq!(head_index, EventIndex::from(1u64));
    let head = core1
        .store()
        .get_event(head_hash)
        .await
        .whatever_context("fetch core1 head")?
        .expect("present");
    assert_eq!(head.inner.creator.id(), cluster.id(1));
    let (e20_hash, _) = core2.head().expect("core2 has a head");
    assert_eq!(head.inner.other_parent, Some(e20_hash));

    Ok(())
}
