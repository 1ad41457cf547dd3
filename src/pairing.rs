//! Parent linkage and slot conflict resolution.
//!
//! Every accepted comment is resolved against the store itself, never against
//! an in-memory batch, so a child that shows up before its parent still finds
//! the parent's text once the parent has been stored as somebody's reply.
//! Decisions are applied strictly one at a time: the replace/insert choice is a
//! read-then-write of a single `parent_id` slot.

use crate::filters::NormalizedComment;
use crate::store::{PairRecord, PairStore, Reply, StoreError};

/// Outcome of resolving one comment against its parent slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Slot existed and the new reply scored strictly higher.
    Replace,
    /// New slot whose parent text was already known.
    InsertPaired,
    /// New slot still waiting for its parent text.
    InsertUnpaired,
    /// Nothing written (lower/equal score, or the store failed).
    Skip,
}

impl Decision {
    pub fn tag(&self) -> &'static str {
        match self {
            Decision::Replace => "replace",
            Decision::InsertPaired => "insert_paired",
            Decision::InsertUnpaired => "insert_unpaired",
            Decision::Skip => "skip",
        }
    }
}

/// Running counters for one ingestion pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PairingCounts {
    pub replaced: u64,
    pub paired: u64,
    pub unpaired: u64,
    pub skipped: u64,
    pub store_errors: u64,
    /// Earlier unpaired slots that received their parent text late.
    pub backfilled: u64,
}

impl PairingCounts {
    fn record(&mut self, d: Decision) {
        match d {
            Decision::Replace => self.replaced += 1,
            Decision::InsertPaired => self.paired += 1,
            Decision::InsertUnpaired => self.unpaired += 1,
            Decision::Skip => self.skipped += 1,
        }
    }
}

pub struct Pairer<'a> {
    store: &'a dyn PairStore,
    counts: PairingCounts,
    backfill: bool,
}

impl<'a> Pairer<'a> {
    pub fn new(store: &'a dyn PairStore) -> Self {
        Self { store, counts: PairingCounts::default(), backfill: false }
    }

    /// When set, storing a comment also fills the parent text of the slot its
    /// own children already opened (child seen before parent). Off by default:
    /// such slots otherwise stay unpaired for the rest of the run.
    pub fn with_backfill(mut self, yes: bool) -> Self {
        self.backfill = yes;
        self
    }

    pub fn counts(&self) -> PairingCounts {
        self.counts
    }

    /// Resolve one comment and apply the resulting mutation.
    /// Store failures are logged and turned into `Decision::Skip`.
    pub fn ingest(&mut self, rec: &NormalizedComment) -> Decision {
        let d = match self.try_ingest(rec) {
            Ok(d) => d,
            Err(e) => {
                self.counts.store_errors += 1;
                tracing::error!(
                    parent_id = %rec.parent_id,
                    comment_id = %rec.comment_id,
                    score = rec.score,
                    "store error, skipping row: {e}"
                );
                Decision::Skip
            }
        };
        self.counts.record(d);
        if self.backfill && matches!(d, Decision::Replace | Decision::InsertPaired | Decision::InsertUnpaired) {
            self.backfill_children(rec);
        }
        d
    }

    fn backfill_children(&mut self, rec: &NormalizedComment) {
        match self.store.attach_parent(&rec.comment_id, &rec.body) {
            Ok(true) => self.counts.backfilled += 1,
            Ok(false) => {}
            Err(e) => {
                self.counts.store_errors += 1;
                tracing::error!(comment_id = %rec.comment_id, "store error during parent backfill: {e}");
            }
        }
    }

    fn try_ingest(&self, rec: &NormalizedComment) -> Result<Decision, StoreError> {
        let parent_text = self.store.comment_text(&rec.parent_id)?;
        let existing_score = self.store.slot_score(&rec.parent_id)?;

        match existing_score {
            Some(old) if rec.score > old => {
                self.store.update(&rec.parent_id, &reply_of(rec))?;
                Ok(Decision::Replace)
            }
            Some(_) => Ok(Decision::Skip),
            None => {
                let decision = if parent_text.is_some() { Decision::InsertPaired } else { Decision::InsertUnpaired };
                self.store.insert(&PairRecord {
                    parent_id: rec.parent_id.clone(),
                    comment_id: rec.comment_id.clone(),
                    parent_text,
                    comment_text: rec.body.clone(),
                    subreddit: rec.subreddit.clone(),
                    created_utc: rec.created_utc,
                    score: rec.score,
                })?;
                Ok(decision)
            }
        }
    }
}

fn reply_of(rec: &NormalizedComment) -> Reply {
    Reply {
        comment_id: rec.comment_id.clone(),
        comment_text: rec.body.clone(),
        subreddit: rec.subreddit.clone(),
        created_utc: rec.created_utc,
        score: rec.score,
    }
}
