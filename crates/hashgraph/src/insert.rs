//! Event admission (spec §4.3 `insertEvent`, §4.4 failure classes).

use hgc_consensus_core::event::Event;
use hgc_store::Store;
use snafu::ResultExt as _;
use tracing::instrument;

use crate::errors::{InsertResult, SelfParentError, SelfParentSnafu, UnknownOtherParentSnafu};
use crate::Hashgraph;

impl<S: Store> Hashgraph<S> {
    /// Validates and stores `event`.
    ///
    /// `from_self` marks an event this node just created and signed itself:
    /// its self-parent is always already known locally, so the self-parent
    /// continuity check below is skipped (spec §4.4).
    #[instrument(
        target = "hgc::hashgraph",
        skip(self, event),
        fields(creator = %event.inner.creator.id(), index = %event.inner.index)
    )]
    pub async fn insert_event(&self, event: Event, from_self: bool) -> InsertResult<()> {
        let creator = event.inner.creator;
        let index = event.inner.index;

        event
            .verify_sig(creator)
            .context(crate::errors::InvalidSignatureSnafu {
                creator: creator.id(),
                index,
            })?;

        if !from_self && !event.inner.is_genesis() {
            let known_prev = match index.prev() {
                Some(prev_index) => self.store.participant_event(creator, prev_index).await?,
                None => None,
            };
            let root = self.store.get_root(creator).await?;
            let continues_root = root
                .as_ref()
                .map(|r| r.self_parent.hash == event.inner.self_parent)
                .unwrap_or(false);

            if known_prev != Some(event.inner.self_parent) && !continues_root {
                // Benign iff we simply have not received that parent yet;
                // abnormal if we have a conflicting view of this creator's
                // chain (a forked or malformed self-parent claim).
                let err = if known_prev.is_none() && root.is_none() {
                    SelfParentError::Normal { creator: creator.id(), index }
                } else {
                    SelfParentError::Abnormal {
                        creator: creator.id(),
                        index,
                        reason: "claimed self-parent does not match the known chain".to_string(),
                    }
                };
                return Err(err).context(SelfParentSnafu { creator: creator.id() });
            }
        }

        if let Some(other) = event.inner.other_parent {
            if self.store.get_event(other).await?.is_none() {
                let root = self.store.get_root(creator).await?;
                let known_via_root = root
                    .as_ref()
                    .map(|r| r.others.iter().any(|(_, s)| s.hash == other))
                    .unwrap_or(false);
                if !known_via_root {
                    return UnknownOtherParentSnafu {
                        creator: creator.id(),
                        hash: other,
                    }
                    .fail();
                }
            }
        }

        self.store.set_event(event).await?;
        Ok(())
    }
}
