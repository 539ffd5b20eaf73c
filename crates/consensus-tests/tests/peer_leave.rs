//! Administrative leave (spec §4.5 "Leave" -> `Leaving`; submit PEER_REMOVE;
//! flush to anchor; -> `Shutdown`): a running node asks to leave, and the
//! rest of the fleet's peer-set shrinks once its PEER_REMOVE is committed.

mod support;

use std::sync::Arc;
use std::time::Duration;

use hgc_consensus_core::event::RoundNum;
use hgc_consensus_core::peer::{Peer, PeerSeckey};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_node::{Config, Node, NodeState};
use hgc_store::memory::InMemoryStore;
use hgc_store::Store as _;
use hgc_util_error::WhateverResult;
use hgc_validator::Validator;
use snafu::ResultExt as _;

use support::{LoopbackNetwork, NullGateway};

fn fast_config() -> Config {
    Config {
        bootstrap: true,
        heartbeat_timeout: Duration::from_millis(5),
        slow_heartbeat_timeout: Duration::from_millis(5),
        tcp_timeout: Duration::from_millis(5),
        enable_fast_sync: false,
        ..Config::default()
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn a_leaving_peer_is_dropped_from_the_fleet() -> WhateverResult<()> {
    let mut seckeys: Vec<_> = (0..3).map(|_| PeerSeckey::generate()).collect();
    seckeys.sort_unstable_by_key(|s| s.pubkey());
    let founding_peers: Vec<_> = seckeys
        .iter()
        .enumerate()
        .map(|(i, s)| Peer::new(s.pubkey(), format!("mem://{i}"), format!("founder-{i}")))
        .collect();
    let genesis = PeerSet::new(founding_peers.clone()).whatever_context("genesis peer-set")?;

    let network = LoopbackNetwork::new();
    let mut nodes = Vec::new();
    for (i, seckey) in seckeys.into_iter().enumerate() {
        let store = Arc::new(InMemoryStore::new());
        store.set_peer_set(RoundNum::from(0u64), genesis.clone()).await.whatever_context("seed genesis")?;
        for peer in &founding_peers {
            store.add_to_repertoire(peer.clone()).await.whatever_context("seed repertoire")?;
        }
        let validator = Validator::new(seckey, format!("founder-{i}"));
        let node = Node::new(store, validator, Arc::new(NullGateway), network.clone(), fast_config())
            .await
            .whatever_context("starting founding node")?;
        network.register(node.core().validator().id(), node.clone()).await;
        nodes.push(node);
    }

    let mut handles = Vec::new();
    for node in &nodes {
        let node = node.clone();
        handles.push(tokio::spawn(node.run()));
    }

    // The third founder asks to leave; everyone else keeps gossiping.
    let leaver_id = nodes[2].core().validator().id();
    nodes[2].request_leave();

    let mut leaver_states = nodes[2].subscribe_state();
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            if *leaver_states.borrow() == NodeState::Shutdown {
                return;
            }
            if leaver_states.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .whatever_context("leaving peer never reached Shutdown")?;

    // Give the two survivors a few more rounds to gossip the committed
    // PEER_REMOVE between themselves before checking their own view.
    tokio::time::sleep(Duration::from_millis(200)).await;

    for survivor in &nodes[..2] {
        let round = survivor.core().store().last_round().await.whatever_context("survivor last_round")?;
        let round = round.expect("survivor has recorded rounds");
        let peer_set =
            survivor.core().hashgraph().peer_set_at(round).await.whatever_context("survivor peer_set_at")?;
        assert_eq!(peer_set.n(), 2, "the leaving peer must be gone from the survivors' own view too");
        assert!(!peer_set.contains_id(leaver_id));
    }

    for node in &nodes[..2] {
        node.request_shutdown();
    }
    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    Ok(())
}
