//! Pair Store seam: the record types and the trait both backends implement.

use std::io;
use thiserror::Error;

/// One persisted parent slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairRecord {
    pub parent_id: String,
    pub comment_id: String,
    pub parent_text: Option<String>,
    pub comment_text: String,
    pub subreddit: String,
    pub created_utc: i64,
    pub score: i64,
}

impl PairRecord {
    pub fn is_paired(&self) -> bool {
        self.parent_text.is_some()
    }
}

/// The reply-side fields of a slot; what a score supersession overwrites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub comment_id: String,
    pub comment_text: String,
    pub subreddit: String,
    pub created_utc: i64,
    pub score: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub total: u64,
    pub paired: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("no slot for parent_id {0}")]
    NotFound(String),
    #[error("invalid table name {0:?}")]
    InvalidTable(String),
    #[error("sqlite: {0}")]
    Backend(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key-indexed collection of Pair Records.
///
/// Implementations must reject a second slot for the same `parent_id` and any
/// two slots sharing a `comment_id` with `StoreError::ConstraintViolation`.
pub trait PairStore {
    /// Create the schema if missing; wipe all rows when `reset` is set.
    fn prepare(&self, reset: bool) -> StoreResult<()>;

    /// Text of the reply stored under `comment_id`, if any slot holds it.
    fn comment_text(&self, comment_id: &str) -> StoreResult<Option<String>>;

    /// Score of the reply currently occupying the `parent_id` slot.
    fn slot_score(&self, parent_id: &str) -> StoreResult<Option<i64>>;

    fn insert(&self, rec: &PairRecord) -> StoreResult<()>;

    /// Overwrite the reply side of an existing slot. `parent_id` and
    /// `parent_text` stay as they are.
    fn update(&self, parent_id: &str, reply: &Reply) -> StoreResult<()>;

    /// Set `parent_text` on the `parent_id` slot if it is still unpaired.
    /// Returns whether a slot changed.
    fn attach_parent(&self, parent_id: &str, parent_text: &str) -> StoreResult<bool>;

    fn get(&self, parent_id: &str) -> StoreResult<Option<PairRecord>>;

    fn counts(&self) -> StoreResult<StoreCounts>;

    /// Feed `(parent_text, comment_text)` of every paired slot with
    /// `score >= min_score` to `sink`. Returns how many were emitted.
    fn for_each_pair(
        &self,
        min_score: i64,
        sink: &mut dyn FnMut(&str, &str) -> io::Result<()>,
    ) -> StoreResult<u64>;
}
