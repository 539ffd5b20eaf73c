//! Thin CLI wiring around `hgc-node`: runs a small fleet of validators in
//! one process over an in-process loopback transport, for local testing
//! (spec §6; the only place the "no CLI" non-goal is bent).

mod cli;
mod gateway;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser as _;
use hgc_consensus_core::event::RoundNum;
use hgc_consensus_core::peer::{Peer, PeerSeckey};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_store::memory::InMemoryStore;
use hgc_store::Store as _;
use hgc_util_error::WhateverResult;
use hgc_validator::Validator;
use snafu::ResultExt as _;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::gateway::LoggingGateway;
use crate::transport::LoopbackNetwork;

pub const LOG_TARGET: &str = "hgc::node-bin";

#[tokio::main]
#[snafu::report]
async fn main() -> WhateverResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log_filter.clone()))
        .init();

    let mut validators = Vec::new();
    let mut peers = Vec::new();
    for i in 0..cli.peers {
        let seckey = PeerSeckey::generate();
        let moniker = format!("node-{i}");
        peers.push(Peer::new(seckey.pubkey(), format!("loopback:{i}"), moniker.clone()));
        validators.push(Validator::new(seckey, moniker));
    }
    let genesis = PeerSet::new(peers.clone()).whatever_context("duplicate validator keys")?;

    let network: Arc<LoopbackNetwork<InMemoryStore>> = LoopbackNetwork::new();
    let mut nodes = Vec::new();
    for validator in validators {
        let store = Arc::new(InMemoryStore::new());
        store
            .set_peer_set(RoundNum::from(0u64), genesis.clone())
            .await
            .whatever_context("seeding genesis peer-set")?;
        for peer in &peers {
            store.add_to_repertoire(peer.clone()).await.whatever_context("seeding repertoire")?;
        }

        let id = validator.id();
        let moniker = validator.moniker().to_string();
        let gateway = Arc::new(LoggingGateway { moniker: moniker.clone() });
        let config = cli.node_config(moniker);

        let node = hgc_node::Node::new(store, validator, gateway, network.clone(), config)
            .await
            .whatever_context("starting node")?;
        network.register(id, node.clone()).await;
        nodes.push(node);
    }

    tracing::info!(target: LOG_TARGET, peers = cli.peers, run_secs = cli.run_secs, "Fleet started");

    let mut join_set = JoinSet::new();
    for node in &nodes {
        let node = node.clone();
        join_set.spawn(async move { node.run().await });
    }

    tokio::time::sleep(Duration::from_secs(cli.run_secs)).await;
    for node in &nodes {
        node.request_shutdown();
    }

    while let Some(result) = join_set.join_next().await {
        if let Ok(Err(err)) = result {
            tracing::warn!(target: LOG_TARGET, err = %err, "Node exited with an error");
        }
    }

    tracing::info!(target: LOG_TARGET, "Fleet stopped");
    Ok(())
}
