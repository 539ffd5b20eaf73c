use std::sync::Arc;

use hgc_consensus_core::event::{Event, EventBody, EventExt as _, EventIndex, RoundNum};
use hgc_consensus_core::hash::Hash32;
use hgc_consensus_core::peer::{Peer, PeerPubkey, PeerSeckey};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_consensus_core::round_info::{Fame, RoundInfo, WitnessFame};
use hgc_consensus_core::timestamp::Timestamp;
use hgc_store::memory::InMemoryStore;
use hgc_store::Store as _;

use crate::Hashgraph;

fn event(creator: PeerPubkey, seckey: PeerSeckey, index: u64, self_parent: Hash32, other_parent: Option<Hash32>, ts: u64) -> Event {
    let body = EventBody {
        creator,
        index: EventIndex::from(index),
        self_parent,
        other_parent,
        transactions: vec![],
        internal_transactions: vec![],
        block_signatures: vec![],
        timestamp: Timestamp::from_micros(ts),
    };
    Event::new_sign(body, seckey)
}

fn round(n: u64) -> RoundNum {
    RoundNum::from(n)
}

#[tokio::test]
async fn genesis_self_parent_error_is_normal_when_unseen() {
    let store = Arc::new(InMemoryStore::new());
    let seckeys: Vec<PeerSeckey> = (0..2).map(|_| PeerSeckey::generate()).collect();
    let peers: Vec<Peer> = seckeys
        .iter()
        .map(|sk| Peer::new(sk.pubkey(), "addr", "moniker"))
        .collect();
    let peer_set = PeerSet::new(peers).unwrap();
    store.set_peer_set(round(0), peer_set).await.unwrap();

    let hg = Hashgraph::new(store);
    let genesis = event(seckeys[0].pubkey(), seckeys[0], 0, Hash32::ZERO, None, 0);
    let orphan = event(
        seckeys[0].pubkey(),
        seckeys[0],
        1,
        Hash32::from(blake3::hash(b"never inserted")),
        None,
        1,
    );

    let err = hg.insert_event(orphan, false).await.unwrap_err();
    assert!(err.is_normal(), "an unseen parent is a benign sync gap, not a fork");

    hg.insert_event(genesis, false).await.unwrap();
}

/// A lone peer's chain: every event strongly-sees the prior round's single
/// witness trivially (`n = 1` means a super-majority is just one vote), so
/// every event starts a fresh round and is that round's witness.
#[tokio::test]
async fn single_peer_chain_advances_one_round_per_event() {
    let store = Arc::new(InMemoryStore::new());
    let seckey = PeerSeckey::generate();
    let peer_set = PeerSet::new(vec![Peer::new(seckey.pubkey(), "addr", "solo")]).unwrap();
    assert_eq!(peer_set.super_majority(), 1);
    store.set_peer_set(round(0), peer_set).await.unwrap();

    let hg = Hashgraph::new(store.clone());

    let e0 = event(seckey.pubkey(), seckey, 0, Hash32::ZERO, None, 0);
    hg.insert_event(e0.clone(), false).await.unwrap();
    assert_eq!(hg.divide_rounds(&e0).await.unwrap(), round(0));

    let e1 = event(seckey.pubkey(), seckey, 1, e0.event_hash(), None, 1);
    hg.insert_event(e1.clone(), true).await.unwrap();
    assert_eq!(hg.divide_rounds(&e1).await.unwrap(), round(1));

    let e2 = event(seckey.pubkey(), seckey, 2, e1.event_hash(), None, 2);
    hg.insert_event(e2.clone(), true).await.unwrap();
    assert_eq!(hg.divide_rounds(&e2).await.unwrap(), round(2));

    for (r, hash) in [(0, e0.event_hash()), (1, e1.event_hash()), (2, e2.event_hash())] {
        let witnesses = store.round_witnesses(round(r)).await.unwrap();
        assert_eq!(witnesses, vec![hash], "round {r}'s only event is its witness");
    }
}

/// Exercises fame voting, round-received assignment, and block production
/// directly against a hand-built DAG (built through the store rather than
/// through `insert_event`/`divide_rounds`, which only need to be realistic
/// about round/witness bookkeeping — not about how the DAG itself was
/// gossiped into existence).
#[tokio::test]
async fn decided_round_closes_into_a_block() {
    let store = Arc::new(InMemoryStore::new());
    let seckeys: Vec<PeerSeckey> = (0..4).map(|_| PeerSeckey::generate()).collect();
    let pubkeys: Vec<PeerPubkey> = seckeys.iter().map(|sk| sk.pubkey()).collect();
    let peers: Vec<Peer> = pubkeys
        .iter()
        .enumerate()
        .map(|(i, pk)| Peer::new(*pk, format!("addr-{i}"), format!("peer-{i}")))
        .collect();
    let peer_set = PeerSet::new(peers).unwrap();
    assert_eq!(peer_set.super_majority(), 3);
    store.set_peer_set(round(0), peer_set).await.unwrap();

    let g0 = event(pubkeys[0], seckeys[0], 0, Hash32::ZERO, None, 0);
    let g1 = event(pubkeys[1], seckeys[1], 0, Hash32::ZERO, None, 0);
    let g2 = event(pubkeys[2], seckeys[2], 0, Hash32::ZERO, None, 0);
    let g3 = event(pubkeys[3], seckeys[3], 0, Hash32::ZERO, None, 0);

    // A small merge tree (authored, for convenience, under peer 3's index
    // space) that drags all four genesis events into one ancestor set.
    let ab = event(pubkeys[3], seckeys[3], 1, g0.event_hash(), Some(g1.event_hash()), 10);
    let cd = event(pubkeys[3], seckeys[3], 2, g2.event_hash(), Some(g3.event_hash()), 11);
    let abcd = event(pubkeys[3], seckeys[3], 3, ab.event_hash(), Some(cd.event_hash()), 12);

    // Round-1 witnesses: one per peer 0/1/2, each anchored on its own
    // genesis plus the merge tree, so each sees all four genesis events.
    let w0 = event(pubkeys[0], seckeys[0], 1, g0.event_hash(), Some(abcd.event_hash()), 20);
    let w1 = event(pubkeys[1], seckeys[1], 1, g1.event_hash(), Some(abcd.event_hash()), 21);
    let w2 = event(pubkeys[2], seckeys[2], 1, g2.event_hash(), Some(abcd.event_hash()), 22);

    // A second merge tree bringing w0/w1/w2 together.
    let wab = event(pubkeys[3], seckeys[3], 4, w0.event_hash(), Some(w1.event_hash()), 30);
    let wcd = event(pubkeys[3], seckeys[3], 5, w2.event_hash(), Some(wab.event_hash()), 31);

    // Round-2 witnesses: each sees all of round 1's witnesses.
    let x0 = event(pubkeys[0], seckeys[0], 2, w0.event_hash(), Some(wcd.event_hash()), 40);
    let x1 = event(pubkeys[1], seckeys[1], 2, w1.event_hash(), Some(wcd.event_hash()), 41);
    let x2 = event(pubkeys[2], seckeys[2], 2, w2.event_hash(), Some(wcd.event_hash()), 42);

    for ev in [&g0, &g1, &g2, &g3, &ab, &cd, &abcd, &w0, &w1, &w2, &wab, &wcd, &x0, &x1, &x2] {
        store.set_event(ev.clone()).await.unwrap();
    }

    let round0_witnesses = [&g0, &g1, &g2, &g3]
        .map(|e| WitnessFame { hash: e.event_hash(), fame: Fame::Undecided });
    store
        .set_round(
            round(0),
            RoundInfo {
                created_events: round0_witnesses.iter().map(|w| w.hash).collect(),
                received_events: vec![],
                witnesses: round0_witnesses.to_vec(),
                decided: false,
                queued: false,
            },
        )
        .await
        .unwrap();

    let round1_witnesses = [&w0, &w1, &w2]
        .map(|e| WitnessFame { hash: e.event_hash(), fame: Fame::Undecided });
    store
        .set_round(
            round(1),
            RoundInfo {
                created_events: round1_witnesses.iter().map(|w| w.hash).collect(),
                received_events: vec![],
                witnesses: round1_witnesses.to_vec(),
                decided: false,
                queued: false,
            },
        )
        .await
        .unwrap();

    let round2_witnesses = [&x0, &x1, &x2]
        .map(|e| WitnessFame { hash: e.event_hash(), fame: Fame::Undecided });
    store
        .set_round(
            round(2),
            RoundInfo {
                created_events: round2_witnesses.iter().map(|w| w.hash).collect(),
                received_events: vec![],
                witnesses: round2_witnesses.to_vec(),
                decided: false,
                queued: false,
            },
        )
        .await
        .unwrap();

    let hg = Hashgraph::new(store.clone());

    hg.decide_fame().await.unwrap();

    let round0_info = store.get_round(round(0)).await.unwrap().unwrap();
    assert!(round0_info.decided);
    assert!(round0_info.witnesses.iter().all(|w| w.fame == Fame::Yes));

    let round1_info = store.get_round(round(1)).await.unwrap().unwrap();
    assert!(round1_info.decided, "round 1's witnesses are all seen by round 2's");
    assert!(round1_info.witnesses.iter().all(|w| w.fame == Fame::Yes));

    let round2_info = store.get_round(round(2)).await.unwrap().unwrap();
    assert!(!round2_info.decided, "no round 3 exists yet to vote on round 2");

    hg.decide_round_received().await.unwrap();
    let round1_after = store.get_round(round(1)).await.unwrap().unwrap();
    let expected: std::collections::BTreeSet<_> =
        [g0.event_hash(), g1.event_hash(), g2.event_hash(), g3.event_hash()]
            .into_iter()
            .collect();
    let actual: std::collections::BTreeSet<_> = round1_after.received_events.iter().copied().collect();
    assert_eq!(actual, expected, "all four genesis events receive at round 1");

    let block = hg.close_next_decided_round().await.unwrap().expect("round 1 has something queued to close");
    assert_eq!(block.header.round_received, round(1));
    assert_eq!(block.body.internal_transactions.len(), 0);
    assert_eq!(block.body.transactions.len(), 0);

    let log = store.consensus_events().await.unwrap();
    assert_eq!(log.len(), 4);

    let again = hg.close_next_decided_round().await.unwrap();
    assert!(again.is_none(), "already-queued rounds are not re-closed");
}

/// `close_next_decided_round`'s one-round-at-a-time contract: the caller
/// must patch and persist a produced block's real state hash before asking
/// for the next one, since `parent_hash` is chained off whatever is
/// currently stored. This pins down the exact corruption the old
/// "produce everything, patch afterward" shape allowed: block 1's
/// `parent_hash` must reflect block 0's *patched* hash, not the
/// placeholder it briefly had while still in flight.
#[tokio::test]
async fn chained_blocks_parent_hash_reflects_the_patched_predecessor() {
    use hgc_consensus_core::signed::Signable as _;

    let store = Arc::new(InMemoryStore::new());
    let seckey = PeerSeckey::generate();
    let peer_set = PeerSet::new(vec![Peer::new(seckey.pubkey(), "addr", "solo")]).unwrap();
    store.set_peer_set(round(0), peer_set).await.unwrap();

    let e0 = event(seckey.pubkey(), seckey, 0, Hash32::ZERO, None, 0);
    let e1 = event(seckey.pubkey(), seckey, 1, e0.event_hash(), None, 1);
    store.set_event(e0.clone()).await.unwrap();
    store.set_event(e1.clone()).await.unwrap();

    store
        .set_round(
            round(0),
            RoundInfo { received_events: vec![e0.event_hash()], decided: true, queued: false, ..RoundInfo::default() },
        )
        .await
        .unwrap();
    store
        .set_round(
            round(1),
            RoundInfo { received_events: vec![e1.event_hash()], decided: true, queued: false, ..RoundInfo::default() },
        )
        .await
        .unwrap();

    let hg = Hashgraph::new(store.clone());

    let mut block0 = hg.close_next_decided_round().await.unwrap().expect("round 0 is decided and unqueued");
    let placeholder_hash = block0.hash();

    // Simulate the per-node façade's patch step: learn the real state hash,
    // re-hash, sign, and persist before asking for the next round.
    block0.header.state_hash = Hash32::from(blake3::hash(b"state after block 0"));
    let sig = block0.header.sign_with(seckey);
    block0.add_signature(seckey.pubkey(), sig);
    store.set_block(block0.clone()).await.unwrap();
    let patched_hash = block0.hash();
    assert_ne!(patched_hash, placeholder_hash, "patching the state hash must change the block's hash");

    let block1 = hg.close_next_decided_round().await.unwrap().expect("round 1 is decided and unqueued");
    assert_eq!(
        block1.header.parent_hash, patched_hash,
        "block 1 must chain off block 0's patched hash, not its placeholder"
    );
}
