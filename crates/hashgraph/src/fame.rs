//! Witness fame voting (spec §4.3 "Fame voting").

use std::collections::HashMap;

use hgc_consensus_core::event::{EventHash, RoundNum};
use hgc_consensus_core::round_info::Fame;
use hgc_store::Store;
use tracing::instrument;

use crate::ancestry::{sees, strongly_sees};
use crate::errors::ConsensusResult;
use crate::Hashgraph;

/// Deterministic coin flip for a coin round, derived from the voting
/// witness's own hash (spec §4.3, §9): the low bit of its first byte.
fn coin_flip(witness: EventHash) -> bool {
    witness.as_bytes()[0] & 1 == 1
}

impl<S: Store> Hashgraph<S> {
    /// Runs one pass of fame voting over every undecided witness in every
    /// round for which enough later rounds exist to vote. Safe to call
    /// repeatedly as new rounds are divided; witnesses that cannot yet be
    /// decided are simply left undecided until the next call.
    #[instrument(target = "hgc::hashgraph", skip(self))]
    pub async fn decide_fame(&self) -> ConsensusResult<()> {
        let Some(last_round) = self.store.last_round().await? else {
            return Ok(());
        };

        let mut r = RoundNum::from(0u64);
        loop {
            let mut info = self.store.get_round(r).await?.unwrap_or_default();
            let undecided: Vec<EventHash> = info
                .witnesses
                .iter()
                .filter(|w| w.fame == Fame::Undecided)
                .map(|w| w.hash)
                .collect();

            let mut changed = false;
            for x in undecided {
                if let Some(fame) = self.vote_fame(r, x).await? {
                    info.set_witness_fame(x, fame);
                    changed = true;
                }
            }
            if changed {
                if info.all_witnesses_decided() {
                    info.decided = true;
                }
                self.store.set_round(r, info).await?;
            }

            if r >= last_round {
                break;
            }
            r = r.next_expect();
        }
        Ok(())
    }

    /// Votes on the fame of witness `x` from round `r`, walking later
    /// rounds' witnesses until a super-majority opinion forms (spec §4.3).
    /// Returns `None` if not enough later-round data exists yet to decide.
    async fn vote_fame(&self, r: RoundNum, x: EventHash) -> ConsensusResult<Option<Fame>> {
        let mut votes: HashMap<EventHash, bool> = HashMap::new();
        let mut d: u64 = 1;

        loop {
            let Some(round_d) = r.checked_add(d) else {
                return Ok(None);
            };
            let witnesses_d = self.store.round_witnesses(round_d).await?;
            if witnesses_d.is_empty() {
                return Ok(None);
            }
            let peer_set_d = self.peer_set_at(round_d).await?;

            let mut new_votes = HashMap::new();
            for y in &witnesses_d {
                let vote = if d == 1 {
                    sees(self.store.as_ref(), *y, x).await?
                } else {
                    let prev_round = round_d.prev().expect("d > 1 implies round_d > 0");
                    let prev_witnesses = self.store.round_witnesses(prev_round).await?;
                    let prev_peer_set = self.peer_set_at(prev_round).await?;

                    let mut yes = 0usize;
                    let mut no = 0usize;
                    for w in &prev_witnesses {
                        if strongly_sees(self.store.as_ref(), *y, *w, &prev_peer_set).await? {
                            match votes.get(w) {
                                Some(true) => yes += 1,
                                Some(false) => no += 1,
                                None => {}
                            }
                        }
                    }

                    if d % self.coin_frequency == 0 {
                        if prev_peer_set.is_super_majority(yes) {
                            true
                        } else if prev_peer_set.is_super_majority(no) {
                            false
                        } else {
                            coin_flip(*y)
                        }
                    } else {
                        yes >= no
                    }
                };
                new_votes.insert(*y, vote);
            }

            let yes_count = new_votes.values().filter(|v| **v).count();
            let no_count = new_votes.len() - yes_count;
            if peer_set_d.is_super_majority(yes_count) {
                return Ok(Some(Fame::Yes));
            }
            if peer_set_d.is_super_majority(no_count) {
                return Ok(Some(Fame::No));
            }

            votes = new_votes;
            d += 1;
        }
    }
}
