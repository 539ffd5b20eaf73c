//! Dynamic peer change (spec §8 S6): a fourth node, absent from the
//! genesis peer-set, joins a running three-node fleet and is accepted into
//! the peer-set through the ordinary join protocol rather than a config
//! restart.

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
use snafu::{whatever, ResultExt as _};

use support::{LoopbackNetwork, NullGateway};

fn fast_config(bootstrap: bool) -> Config {
    Config {
        bootstrap,
        heartbeat_timeout: Duration::from_millis(5),
        slow_heartbeat_timeout: Duration::from_millis(5),
        tcp_timeout: Duration::from_millis(5),
        join_timeout: Duration::from_secs(10),
        enable_fast_sync: false,
        ..Config::default()
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn a_new_peer_joins_a_running_fleet() -> WhateverResult<()> {
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
        let node = Node::new(store, validator, Arc::new(NullGateway), network.clone(), fast_config(true))
            .await
            .whatever_context("starting founding node")?;
        network.register(node.core().validator().id(), node.clone()).await;
        nodes.push(node);
    }
    assert!(nodes.iter().all(|n| n.state() == NodeState::Babbling));

    let mut handles = Vec::new();
    for node in &nodes {
        let node = node.clone();
        handles.push(tokio::spawn(node.run()));
    }

    let dan_store = Arc::new(InMemoryStore::new());
    let dan_seckey = PeerSeckey::generate();
    let dan_validator = Validator::new(dan_seckey, "dan".to_string());
    let dan_id = dan_validator.id();
    dan_store.add_to_repertoire(founding_peers[0].clone()).await.whatever_context("seed dan's repertoire")?;
    let dan = Node::new(dan_store, dan_validator, Arc::new(NullGateway), network.clone(), fast_config(false))
        .await
        .whatever_context("starting dan")?;
    assert_eq!(dan.state(), NodeState::Joining);
    network.register(dan_id, dan.clone()).await;

    let mut dan_states = dan.subscribe_state();
    handles.push(tokio::spawn(dan.clone().run()));

    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            if *dan_states.borrow() == NodeState::Babbling {
                return;
            }
            if dan_states.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .whatever_context("dan never reached Babbling")?;
    assert_eq!(dan.state(), NodeState::Babbling);

    let round = dan.core().store().last_round().await.whatever_context("dan last_round")?;
    let Some(round) = round else {
        whatever!("dan has no recorded round after joining");
    };
    let peer_set = dan.core().hashgraph().peer_set_at(round).await.whatever_context("dan peer_set_at")?;
    assert_eq!(peer_set.n(), 4);
    assert!(peer_set.contains_id(dan_id));
    for founder in &founding_peers {
        assert!(peer_set.contains_id(founder.id()));
    }

    for node in &nodes {
        node.request_shutdown();
    }
    dan.request_shutdown();
    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    Ok(())
}
