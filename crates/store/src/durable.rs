//! redb-backed [`Store`], fronted by small LRU caches for the hot lookups
//! (event-by-hash, participant chain walks) that the hashgraph algorithm
//! performs on every insert.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use hgc_consensus_core::block::{Block, BlockIndex};
use hgc_consensus_core::event::{Event, EventExt as _, EventHash, EventIndex, Root, RoundNum};
use hgc_consensus_core::frame::Frame;
use hgc_consensus_core::peer::{Peer, PeerId, PeerPubkey};
use hgc_consensus_core::peer_set::PeerSet;
use hgc_consensus_core::round_info::{Fame, RoundInfo};
use hgc_db::Database;
use hgc_db::ctx::WriteTransactionCtx;
use hgc_db::error::TxErrorSnafu;
use hgc_util_db::cache::Cache;
use snafu::{ResultExt as _, Snafu};
use tracing::instrument;

use crate::tables::{
    blocks, consensus_log, consensus_log_len, first_round, frames, known_events, last_block_index,
    last_round, participant_events, peer_sets, repertoire, roots, rounds,
};
use crate::{DbSnafu, ForkDetectedSnafu, Store, StoreResult};

const LOG_TARGET: &str = "hgc::store";

#[derive(Debug, Snafu)]
pub enum SetEventError {
    Fork { participant: PeerId, index: EventIndex },
}

pub struct DurableStore {
    db: Arc<Database>,
    path: Option<PathBuf>,
    event_cache: Cache<EventHash, Event>,
}

impl DurableStore {
    pub async fn open(path: impl Into<PathBuf>, cache_size: usize) -> StoreResult<Self> {
        let path = path.into();
        let db = Database::open(path.clone()).await.context(DbSnafu)?;
        Self::init_tables(&db).await?;
        Ok(Self {
            db: Arc::new(db),
            path: Some(path),
            event_cache: Cache::new(cache_size),
        })
    }

    pub async fn open_in_memory(cache_size: usize) -> StoreResult<Self> {
        let db = Database::new_in_memory().await.context(DbSnafu)?;
        Self::init_tables(&db).await?;
        Ok(Self {
            db: Arc::new(db),
            path: None,
            event_cache: Cache::new(cache_size),
        })
    }

    async fn init_tables(db: &Database) -> StoreResult<()> {
        db.write_with_expect(|ctx| {
            ctx.open_table(&crate::tables::events::TABLE)?;
            ctx.open_table(&participant_events::TABLE)?;
            ctx.open_table(&known_events::TABLE)?;
            ctx.open_table(&first_round::TABLE)?;
            ctx.open_table(&peer_sets::TABLE)?;
            ctx.open_table(&repertoire::TABLE)?;
            ctx.open_table(&rounds::TABLE)?;
            ctx.open_table(&consensus_log::TABLE)?;
            ctx.open_table(&consensus_log_len::TABLE)?;
            ctx.open_table(&blocks::TABLE)?;
            ctx.open_table(&frames::TABLE)?;
            ctx.open_table(&roots::TABLE)?;
            ctx.open_table(&last_round::TABLE)?;
            ctx.open_table(&last_block_index::TABLE)?;
            Ok(())
        })
        .await
        .context(DbSnafu)
    }

    fn set_event_tx(
        ctx: &WriteTransactionCtx,
        event: &Event,
        hash: EventHash,
    ) -> hgc_db::error::DbTxResult<(), SetEventError> {
        let creator = event.inner.creator;
        let index = event.inner.index;

        let mut p_tbl = ctx.open_table(&participant_events::TABLE)?;
        if let Some(existing) = p_tbl.get(&(creator, index))?.map(|g| g.value()) {
            if existing != hash {
                return ForkSnafu {
                    participant: creator.id(),
                    index,
                }
                .fail()
                .context(TxErrorSnafu);
            }
            return Ok(());
        }
        p_tbl.insert(&(creator, index), &hash)?;

        let mut known_tbl = ctx.open_table(&known_events::TABLE)?;
        let cur = known_tbl.get(&creator)?.map(|g| g.value());
        if cur.is_none_or(|cur| cur < index) {
            known_tbl.insert(&creator, &index)?;
        }

        let mut events_tbl = ctx.open_table(&crate::tables::events::TABLE)?;
        events_tbl.insert(&hash, event)?;
        Ok(())
    }
}

#[async_trait]
impl Store for DurableStore {
    #[instrument(skip_all, target = LOG_TARGET)]
    async fn get_event(&self, hash: EventHash) -> StoreResult<Option<Event>> {
        if let Some(event) = self.event_cache.get(&hash) {
            return Ok(Some(event));
        }
        let event = self
            .db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&crate::tables::events::TABLE)?;
                Ok(tbl.get(&hash)?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)?;
        if let Some(event) = &event {
            self.event_cache.insert(hash, event.clone());
        }
        Ok(event)
    }

    #[instrument(skip_all, target = LOG_TARGET)]
    async fn set_event(&self, event: Event) -> StoreResult<()> {
        let hash = event.event_hash();
        let ev = event.clone();

        self.db
            .write_with_expect_falliable(move |ctx| Self::set_event_tx(ctx, &ev, hash))
            .await
            .map_err(|err| match err {
                SetEventError::Fork { participant, index } => {
                    ForkDetectedSnafu { participant, index }.build()
                }
            })?;

        self.event_cache.insert(hash, event);
        Ok(())
    }

    async fn participant_events(
        &self,
        creator: PeerPubkey,
        after: EventIndex,
    ) -> StoreResult<Vec<EventHash>> {
        let start = after.next().unwrap_or(EventIndex::MAX);
        self.db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&participant_events::TABLE)?;
                let mut out = vec![];
                for entry in tbl.range((creator, start)..(creator, EventIndex::MAX))? {
                    let ((k_creator, _), hash) = entry?;
                    let (k_creator, hash) = (k_creator.value(), hash.value());
                    if k_creator != creator {
                        break;
                    }
                    out.push(hash);
                }
                Ok(out)
            })
            .await
            .context(DbSnafu)
    }

    async fn participant_event(
        &self,
        creator: PeerPubkey,
        index: EventIndex,
    ) -> StoreResult<Option<EventHash>> {
        self.db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&participant_events::TABLE)?;
                Ok(tbl.get(&(creator, index))?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn known_events(&self) -> StoreResult<BTreeMap<PeerId, EventIndex>> {
        self.db
            .read_with_expect(|ctx| {
                let tbl = ctx.open_table(&known_events::TABLE)?;
                let mut out = BTreeMap::new();
                for entry in tbl.range(..)? {
                    let (pubkey, index) = entry?;
                    out.insert(pubkey.value().id(), index.value());
                }
                Ok(out)
            })
            .await
            .context(DbSnafu)
    }

    async fn first_round(&self, participant: PeerPubkey) -> StoreResult<Option<RoundNum>> {
        self.db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&first_round::TABLE)?;
                Ok(tbl.get(&participant)?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn set_first_round(&self, participant: PeerPubkey, round: RoundNum) -> StoreResult<()> {
        self.db
            .write_with_expect(move |ctx| {
                let mut tbl = ctx.open_table(&first_round::TABLE)?;
                if tbl.get(&participant)?.is_none() {
                    tbl.insert(&participant, &round)?;
                }
                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    async fn get_peer_set(&self, round: RoundNum) -> StoreResult<Option<PeerSet>> {
        self.db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&peer_sets::TABLE)?;
                Ok(tbl.get(&round)?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn set_peer_set(&self, round: RoundNum, peer_set: PeerSet) -> StoreResult<()> {
        self.db
            .write_with_expect(move |ctx| {
                let mut tbl = ctx.open_table(&peer_sets::TABLE)?;
                tbl.insert(&round, &peer_set)?;
                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    async fn all_peer_sets(&self) -> StoreResult<BTreeMap<RoundNum, PeerSet>> {
        self.db
            .read_with_expect(|ctx| {
                let tbl = ctx.open_table(&peer_sets::TABLE)?;
                let mut out = BTreeMap::new();
                for entry in tbl.range(..)? {
                    let (round, set) = entry?;
                    out.insert(round.value(), set.value());
                }
                Ok(out)
            })
            .await
            .context(DbSnafu)
    }

    async fn repertoire_by_pubkey(&self) -> StoreResult<BTreeMap<PeerPubkey, Peer>> {
        self.db
            .read_with_expect(|ctx| {
                let tbl = ctx.open_table(&repertoire::TABLE)?;
                let mut out = BTreeMap::new();
                for entry in tbl.range(..)? {
                    let (pk, peer) = entry?;
                    out.insert(pk.value(), peer.value());
                }
                Ok(out)
            })
            .await
            .context(DbSnafu)
    }

    async fn repertoire_by_id(&self) -> StoreResult<BTreeMap<PeerId, Peer>> {
        Ok(self
            .repertoire_by_pubkey()
            .await?
            .into_values()
            .map(|p| (p.id(), p))
            .collect())
    }

    async fn add_to_repertoire(&self, peer: Peer) -> StoreResult<()> {
        self.db
            .write_with_expect(move |ctx| {
                let mut tbl = ctx.open_table(&repertoire::TABLE)?;
                tbl.insert(&peer.pubkey, &peer)?;
                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    async fn get_round(&self, round: RoundNum) -> StoreResult<Option<RoundInfo>> {
        self.db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&rounds::TABLE)?;
                Ok(tbl.get(&round)?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn set_round(&self, round: RoundNum, info: RoundInfo) -> StoreResult<()> {
        self.db
            .write_with_expect(move |ctx: &WriteTransactionCtx| {
                let mut tbl = ctx.open_table(&rounds::TABLE)?;
                tbl.insert(&round, &info)?;
                let mut last_tbl = ctx.open_table(&last_round::TABLE)?;
                let cur = last_tbl.get(&())?.map(|g| g.value());
                if cur.is_none_or(|cur| cur < round) {
                    last_tbl.insert(&(), &round)?;
                }
                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    async fn last_round(&self) -> StoreResult<Option<RoundNum>> {
        self.db
            .read_with_expect(|ctx| {
                let tbl = ctx.open_table(&last_round::TABLE)?;
                Ok(tbl.get(&())?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn round_witnesses(&self, round: RoundNum) -> StoreResult<Vec<EventHash>> {
        Ok(self
            .get_round(round)
            .await?
            .map(|info| info.witnesses.into_iter().map(|w| w.hash).collect())
            .unwrap_or_default())
    }

    async fn round_events(&self, round: RoundNum) -> StoreResult<Vec<EventHash>> {
        Ok(self
            .get_round(round)
            .await?
            .map(|info| info.created_events)
            .unwrap_or_default())
    }

    async fn add_consensus_event(&self, hash: EventHash) -> StoreResult<()> {
        self.db
            .write_with_expect(move |ctx| {
                let mut len_tbl = ctx.open_table(&consensus_log_len::TABLE)?;
                let pos = len_tbl.get(&())?.map(|g| g.value()).unwrap_or(0);
                let mut log_tbl = ctx.open_table(&consensus_log::TABLE)?;
                log_tbl.insert(&pos, &hash)?;
                len_tbl.insert(&(), &(pos + 1))?;
                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    async fn consensus_events(&self) -> StoreResult<Vec<EventHash>> {
        self.db
            .read_with_expect(|ctx| {
                let tbl = ctx.open_table(&consensus_log::TABLE)?;
                let mut out = vec![];
                for entry in tbl.range(..)? {
                    let (_, hash) = entry?;
                    out.push(hash.value());
                }
                Ok(out)
            })
            .await
            .context(DbSnafu)
    }

    async fn get_block(&self, index: BlockIndex) -> StoreResult<Option<Block>> {
        self.db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&blocks::TABLE)?;
                Ok(tbl.get(&index)?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn set_block(&self, block: Block) -> StoreResult<()> {
        self.db
            .write_with_expect(move |ctx| {
                let mut tbl = ctx.open_table(&blocks::TABLE)?;
                let index = block.header.index;
                tbl.insert(&index, &block)?;
                let mut last_tbl = ctx.open_table(&last_block_index::TABLE)?;
                let cur = last_tbl.get(&())?.map(|g| g.value());
                if cur.is_none_or(|cur| cur < index) {
                    last_tbl.insert(&(), &index)?;
                }
                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    async fn last_block_index(&self) -> StoreResult<Option<BlockIndex>> {
        self.db
            .read_with_expect(|ctx| {
                let tbl = ctx.open_table(&last_block_index::TABLE)?;
                Ok(tbl.get(&())?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn get_frame(&self, round: RoundNum) -> StoreResult<Option<Frame>> {
        self.db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&frames::TABLE)?;
                Ok(tbl.get(&round)?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn set_frame(&self, frame: Frame) -> StoreResult<()> {
        self.db
            .write_with_expect(move |ctx| {
                let mut tbl = ctx.open_table(&frames::TABLE)?;
                tbl.insert(&frame.round, &frame)?;
                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    async fn get_root(&self, participant: PeerPubkey) -> StoreResult<Option<Root>> {
        self.db
            .read_with_expect(move |ctx| {
                let tbl = ctx.open_table(&roots::TABLE)?;
                Ok(tbl.get(&participant)?.map(|g| g.value()))
            })
            .await
            .context(DbSnafu)
    }

    async fn set_root(&self, participant: PeerPubkey, root: Root) -> StoreResult<()> {
        self.db
            .write_with_expect(move |ctx| {
                let mut tbl = ctx.open_table(&roots::TABLE)?;
                tbl.insert(&participant, &root)?;
                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    #[instrument(skip_all, target = LOG_TARGET)]
    async fn reset(&self, frame: Frame) -> StoreResult<()> {
        self.event_cache.clear();
        let round = frame.round;
        self.db
            .write_with_expect(move |ctx| {
                ctx.delete_table(crate::tables::events::TABLE)?;
                ctx.delete_table(participant_events::TABLE)?;
                ctx.delete_table(known_events::TABLE)?;
                ctx.delete_table(rounds::TABLE)?;
                ctx.delete_table(consensus_log::TABLE)?;
                ctx.delete_table(consensus_log_len::TABLE)?;

                let mut events_tbl = ctx.open_table(&crate::tables::events::TABLE)?;
                let mut p_tbl = ctx.open_table(&participant_events::TABLE)?;
                let mut known_tbl = ctx.open_table(&known_events::TABLE)?;
                for event in &frame.events {
                    let creator = event.inner.creator;
                    let index = event.inner.index;
                    let hash = event.event_hash();
                    events_tbl.insert(&hash, event)?;
                    p_tbl.insert(&(creator, index), &hash)?;
                    let cur = known_tbl.get(&creator)?.map(|g| g.value());
                    if cur.is_none_or(|cur| cur < index) {
                        known_tbl.insert(&creator, &index)?;
                    }
                }

                let mut peer_sets_tbl = ctx.open_table(&peer_sets::TABLE)?;
                for (r, set) in &frame.peer_sets {
                    peer_sets_tbl.insert(r, set)?;
                }

                let mut roots_tbl = ctx.open_table(&roots::TABLE)?;
                for (pubkey, root) in &frame.roots {
                    roots_tbl.insert(pubkey, root)?;
                }

                let mut frames_tbl = ctx.open_table(&frames::TABLE)?;
                frames_tbl.insert(&round, &frame)?;

                // The frame's round was already closed into a block before
                // this fast-forward bundle was built; preserve that (spec
                // §4.1 "rounds <= frame round are preserved") rather than
                // leaving the freshly-recreated `rounds` table empty, or
                // `divide_rounds` would treat this node as having no
                // history at all past genesis.
                let mut round_info = RoundInfo {
                    decided: true,
                    queued: true,
                    ..RoundInfo::default()
                };
                for (_, root) in &frame.roots {
                    if root.self_parent.round == round {
                        round_info.created_events.push(root.self_parent.hash);
                        round_info.set_witness_fame(root.self_parent.hash, Fame::Yes);
                    }
                }
                let mut rounds_tbl = ctx.open_table(&rounds::TABLE)?;
                rounds_tbl.insert(&round, &round_info)?;

                let mut last_round_tbl = ctx.open_table(&last_round::TABLE)?;
                last_round_tbl.insert(&(), &round)?;

                Ok(())
            })
            .await
            .context(DbSnafu)
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }

    fn store_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }
}

#[cfg(test)]
mod tests {
    use hgc_consensus_core::event::{EventBody, EventIndex as Idx};
    use hgc_consensus_core::hash::Hash32;
    use hgc_consensus_core::peer::PeerSeckey;
    use hgc_consensus_core::timestamp::Timestamp;

    use super::*;

    fn event(seckey: PeerSeckey, index: u64, salt: u8) -> Event {
        let body = EventBody {
            creator: seckey.pubkey(),
            index: Idx::from(index),
            self_parent: Hash32::from(blake3::hash(&[salt])),
            other_parent: None,
            transactions: vec![],
            internal_transactions: vec![],
            block_signatures: vec![],
            timestamp: Timestamp::from_micros(0),
        };
        Event::new_sign(body, seckey)
    }

    #[tokio::test]
    async fn insert_and_lookup_roundtrip() {
        let store = DurableStore::open_in_memory(16).await.unwrap();
        let seckey = PeerSeckey::generate();
        let ev = event(seckey, 0, 1);
        let hash = ev.event_hash();
        store.set_event(ev).await.unwrap();

        assert_eq!(store.get_event(hash).await.unwrap().unwrap().event_hash(), hash);
        assert_eq!(
            store.known_events().await.unwrap().get(&seckey.pubkey().id()),
            Some(&Idx::from(0u64))
        );
    }

    #[tokio::test]
    async fn conflicting_event_at_same_index_is_a_fork() {
        let store = DurableStore::open_in_memory(16).await.unwrap();
        let seckey = PeerSeckey::generate();
        store.set_event(event(seckey, 0, 1)).await.unwrap();
        let err = store.set_event(event(seckey, 0, 2)).await.unwrap_err();
        assert!(matches!(err, crate::StoreError::ForkDetected { .. }));
    }

    #[tokio::test]
    async fn participant_events_respects_after_bound() {
        let store = DurableStore::open_in_memory(16).await.unwrap();
        let seckey = PeerSeckey::generate();
        for i in 0..3 {
            store.set_event(event(seckey, i, i as u8 + 1)).await.unwrap();
        }
        let hashes = store
            .participant_events(seckey.pubkey(), Idx::from(0u64))
            .await
            .unwrap();
        assert_eq!(hashes.len(), 2, "should skip index 0");
    }
}
