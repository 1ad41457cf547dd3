//! In-process Pair Store with the same uniqueness rules as the SQLite table.
//! Handy as a test double and for small dry runs.

use crate::store::{PairRecord, PairStore, Reply, StoreCounts, StoreError, StoreResult};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::io;

#[derive(Default)]
struct Tables {
    by_parent: AHashMap<String, PairRecord>,
    // comment_id -> parent_id
    by_comment: AHashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every slot, ordered by `parent_id`.
    pub fn records(&self) -> Vec<PairRecord> {
        let t = self.inner.lock();
        let mut v: Vec<PairRecord> = t.by_parent.values().cloned().collect();
        v.sort_by(|a, b| a.parent_id.cmp(&b.parent_id));
        v
    }
}

impl PairStore for MemoryStore {
    fn prepare(&self, reset: bool) -> StoreResult<()> {
        if reset {
            let mut t = self.inner.lock();
            t.by_parent.clear();
            t.by_comment.clear();
        }
        Ok(())
    }

    fn comment_text(&self, comment_id: &str) -> StoreResult<Option<String>> {
        let t = self.inner.lock();
        Ok(t
            .by_comment
            .get(comment_id)
            .and_then(|pid| t.by_parent.get(pid))
            .map(|r| r.comment_text.clone()))
    }

    fn slot_score(&self, parent_id: &str) -> StoreResult<Option<i64>> {
        Ok(self.inner.lock().by_parent.get(parent_id).map(|r| r.score))
    }

    fn insert(&self, rec: &PairRecord) -> StoreResult<()> {
        let mut t = self.inner.lock();
        if t.by_parent.contains_key(&rec.parent_id) {
            return Err(StoreError::ConstraintViolation(format!("parent_id {} already has a slot", rec.parent_id)));
        }
        if t.by_comment.contains_key(&rec.comment_id) {
            return Err(StoreError::ConstraintViolation(format!("comment_id {} already stored", rec.comment_id)));
        }
        t.by_comment.insert(rec.comment_id.clone(), rec.parent_id.clone());
        t.by_parent.insert(rec.parent_id.clone(), rec.clone());
        Ok(())
    }

    fn update(&self, parent_id: &str, reply: &Reply) -> StoreResult<()> {
        let mut t = self.inner.lock();
        let old_comment = match t.by_parent.get(parent_id) {
            Some(r) => r.comment_id.clone(),
            None => return Err(StoreError::NotFound(parent_id.to_string())),
        };
        if let Some(owner) = t.by_comment.get(&reply.comment_id) {
            if owner != parent_id {
                return Err(StoreError::ConstraintViolation(format!(
                    "comment_id {} already stored under parent {}",
                    reply.comment_id, owner
                )));
            }
        }
        t.by_comment.remove(&old_comment);
        t.by_comment.insert(reply.comment_id.clone(), parent_id.to_string());
        if let Some(r) = t.by_parent.get_mut(parent_id) {
            r.comment_id = reply.comment_id.clone();
            r.comment_text = reply.comment_text.clone();
            r.subreddit = reply.subreddit.clone();
            r.created_utc = reply.created_utc;
            r.score = reply.score;
        }
        Ok(())
    }

    fn attach_parent(&self, parent_id: &str, parent_text: &str) -> StoreResult<bool> {
        let mut t = self.inner.lock();
        match t.by_parent.get_mut(parent_id) {
            Some(r) if r.parent_text.is_none() => {
                r.parent_text = Some(parent_text.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn get(&self, parent_id: &str) -> StoreResult<Option<PairRecord>> {
        Ok(self.inner.lock().by_parent.get(parent_id).cloned())
    }

    fn counts(&self) -> StoreResult<StoreCounts> {
        let t = self.inner.lock();
        let paired = t.by_parent.values().filter(|r| r.is_paired()).count() as u64;
        Ok(StoreCounts { total: t.by_parent.len() as u64, paired })
    }

    fn for_each_pair(
        &self,
        min_score: i64,
        sink: &mut dyn FnMut(&str, &str) -> io::Result<()>,
    ) -> StoreResult<u64> {
        // Snapshot first so the sink never runs under the lock.
        let rows: Vec<(String, String)> = self
            .records()
            .into_iter()
            .filter(|r| r.score >= min_score)
            .filter_map(|r| r.parent_text.map(|p| (p, r.comment_text)))
            .collect();
        let mut n = 0u64;
        for (p, c) in &rows {
            sink(p, c)?;
            n += 1;
        }
        Ok(n)
    }
}
