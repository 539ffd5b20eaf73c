use super::*;
use crate::peer::PeerSeckey;

fn gen_peer(moniker: &str) -> Peer {
    let seckey = PeerSeckey::generate();
    Peer::new(seckey.pubkey(), "127.0.0.1:0", moniker)
}

#[test]
fn super_majority_thresholds() {
    for (n, expected_sm, expected_trust) in [(1, 1, 1), (2, 2, 1), (3, 3, 1), (4, 3, 2), (7, 5, 3)]
    {
        let peers: Vec<_> = (0..n).map(|i| gen_peer(&format!("p{i}"))).collect();
        let set = PeerSet::new(peers).unwrap();
        assert_eq!(set.n(), n);
        assert_eq!(set.super_majority(), expected_sm, "n={n}");
        assert_eq!(set.trust_count(), expected_trust, "n={n}");
    }
}

#[test]
fn lookup_by_id_and_pubkey() {
    let peers: Vec<_> = (0..4).map(|i| gen_peer(&format!("p{i}"))).collect();
    let pubkeys: Vec<_> = peers.iter().map(|p| p.pubkey).collect();
    let set = PeerSet::new(peers).unwrap();

    for pubkey in pubkeys {
        let peer = set.by_pubkey(pubkey).expect("must be present");
        assert_eq!(set.by_id(peer.id()).unwrap().pubkey, pubkey);
    }
}

#[test]
fn add_and_remove_produce_new_sets() {
    let peers: Vec<_> = (0..3).map(|i| gen_peer(&format!("p{i}"))).collect();
    let set = PeerSet::new(peers).unwrap();
    let new_peer = gen_peer("new");

    let grown = set.with_added(new_peer.clone()).unwrap();
    assert_eq!(grown.n(), 4);
    assert!(grown.contains_pubkey(new_peer.pubkey));
    assert_eq!(set.n(), 3, "original set is untouched");

    let shrunk = grown.with_removed(new_peer.pubkey);
    assert_eq!(shrunk.n(), 3);
    assert!(!shrunk.contains_pubkey(new_peer.pubkey));
}

#[test]
fn duplicate_id_rejected() {
    let peer = gen_peer("dup");
    let err = PeerSet::new(vec![peer.clone(), peer]).unwrap_err();
    assert!(matches!(err, PeerSetError::DuplicateId { .. }));
}
