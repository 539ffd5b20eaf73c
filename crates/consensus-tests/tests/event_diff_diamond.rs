//! EventDiff over a hand-built diamond graph (spec §8 S1): three creators,
//! each one's second event reaching across to another creator's latest
//! event as other-parent, so every event but the genesis round has a
//! cross-creator dependency.

mod support;

use hgc_util_error::WhateverResult;
use snafu::ResultExt as _;

use support::Cluster;

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn event_diff_is_restricted_to_creators_known_locally() -> WhateverResult<()> {
    let cluster = Cluster::bootstrap(3).await?;
    let (core0, core1, core2) = (&cluster.cores[0], &cluster.cores[1], &cluster.cores[2]);

    core0.sign_and_insert_self_event(None).await.whatever_context("e0")?;
    let (e0_hash, _) = core0.head().expect("just created");
    let e0 = core0.store().get_event(e0_hash).await.whatever_context("fetch e0")?.expect("present");

    core1.sign_and_insert_self_event(None).await.whatever_context("e1")?;
    let (e1_hash, _) = core1.head().expect("just created");
    let e1 = core1.store().get_event(e1_hash).await.whatever_context("fetch e1")?.expect("present");

    core2.sign_and_insert_self_event(None).await.whatever_context("e2")?;

    // e01 = e0 + e1: core0 needs e1 in its own store before it can cite it
    // as other-parent.
    core0
        .insert_event_and_run_consensus(e1.clone(), false)
        .await
        .whatever_context("relay e1 to core0")?;
    core0
        .sign_and_insert_self_event(Some(e1_hash))
        .await
        .whatever_context("e01")?;
    let (e01_hash, _) = core0.head().expect("just created");
    let e01 = core0.store().get_event(e01_hash).await.whatever_context("fetch e01")?.expect("present");

    // e20 = e2 + e01: core2 needs e0 (to validate e01's self-parent chain)
    // and e01 itself.
    core2
        .insert_event_and_run_consensus(e0.clone(), false)
        .await
        .whatever_context("relay e0 to core2")?;
    core2
        .insert_event_and_run_consensus(e01.clone(), false)
        .await
        .whatever_context("relay e01 to core2")?;
    core2
        .sign_and_insert_self_event(Some(e01_hash))
        .await
        .whatever_context("e20")?;

    // core0 only ever learned about creators 0 and 1: creator 2 never
    // reached it, so a diff against any partner can only ever surface
    // events from those two creators.
    let ours = core0.known_events().await.whatever_context("core0 known_events")?;
    assert_eq!(ours.len(), 2);
    assert!(ours.contains_key(&cluster.id(0)));
    assert!(ours.contains_key(&cluster.id(1)));
    assert!(!ours.contains_key(&cluster.id(2)));

    // A partner reporting it already has e1 (its own genesis) but nothing
    // else gets back exactly core0's creator-0 chain, oldest first.
    let partner_known = core1.known_events().await.whatever_context("core1 known_events")?;
    let diff = core0.event_diff(&partner_known).await.whatever_context("event_diff")?;
    let diff_creators: Vec<_> = diff.iter().map(|w| w.creator.id()).collect();
    assert_eq!(diff_creators, vec![cluster.id(0), cluster.id(0)]);
    assert_eq!(diff[0].index, e0.inner.index);
    assert_eq!(diff[1].index, e01.inner.index);

    // A partner reporting no knowledge at all gets every event core0 has,
    // still oldest-per-creator first, parent before child.
    let nobody_knows = std::collections::BTreeMap::new();
    let full_diff = core0.event_diff(&nobody_knows).await.whatever_context("full event_diff")?;
    assert_eq!(full_diff.len(), 3);
    assert_eq!(full_diff.iter().filter(|w| w.creator.id() == cluster.id(0)).count(), 2);
    assert_eq!(full_diff.iter().filter(|w| w.creator.id() == cluster.id(1)).count(), 1);

    Ok(())
}
