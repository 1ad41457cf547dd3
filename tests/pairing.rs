#[path = "common/mod.rs"]
mod common;

use common::*;
use replypairs::{
    Decision, MemoryStore, PairRecord, PairStore, Pairer, Reply, SqliteStore, StoreCounts, StoreError, StoreResult,
};
use std::collections::HashMap;
use std::io;

/// Parent seen before its child: the child lands in a paired slot carrying the
/// parent's normalized body.
#[test]
fn child_after_parent_is_insert_paired() {
    let store = MemoryStore::new();
    let mut p = Pairer::new(&store);

    assert_eq!(p.ingest(&nc("x", "t3_root", "hello \"there\"\nfriend", 2)), Decision::InsertUnpaired);
    assert_eq!(p.ingest(&nc("b", "t1_x", "reply", 1)), Decision::InsertPaired);

    let slot = store.get("x").unwrap().unwrap();
    assert_eq!(slot.parent_text.as_deref(), Some("hello 'there'friend"));
    assert_eq!(slot.comment_id, "b");
    assert_eq!(slot.comment_text, "reply");
    assert_eq!(p.counts().paired, 1);
    assert_eq!(p.counts().unpaired, 1);
}

#[test]
fn replace_only_on_strictly_higher_score() {
    let store = MemoryStore::new();
    let mut p = Pairer::new(&store);

    assert_eq!(p.ingest(&nc("a", "t1_p", "first", 5)), Decision::InsertUnpaired);
    assert_eq!(p.ingest(&nc("b", "t1_p", "same score", 5)), Decision::Skip);
    assert_eq!(p.ingest(&nc("c", "t1_p", "lower", 4)), Decision::Skip);
    assert_eq!(store.get("p").unwrap().unwrap().comment_id, "a");

    assert_eq!(p.ingest(&nc("d", "t1_p", "higher", 6)), Decision::Replace);
    let slot = store.get("p").unwrap().unwrap();
    assert_eq!(slot.comment_id, "d");
    assert_eq!(slot.comment_text, "higher");
    assert_eq!(slot.score, 6);

    let c = p.counts();
    assert_eq!((c.unpaired, c.skipped, c.replaced), (1, 2, 1));
}

#[test]
fn replace_keeps_existing_parent_text() {
    let store = MemoryStore::new();
    let mut p = Pairer::new(&store);
    p.ingest(&nc("x", "t3_root", "question", 1));
    assert_eq!(p.ingest(&nc("a", "t1_x", "answer", 1)), Decision::InsertPaired);
    assert_eq!(p.ingest(&nc("b", "t1_x", "better answer", 3)), Decision::Replace);

    let slot = store.get("x").unwrap().unwrap();
    assert_eq!(slot.parent_text.as_deref(), Some("question"));
    assert_eq!(slot.comment_text, "better answer");
}

/// A reply stored before its own parent can still serve as parent text for a
/// later grandchild.
#[test]
fn unpaired_reply_is_reused_by_its_children() {
    let store = MemoryStore::new();
    let mut p = Pairer::new(&store);
    assert_eq!(p.ingest(&nc("c2", "t1_c1", "hi", 5)), Decision::InsertUnpaired);
    assert_eq!(p.ingest(&nc("c4", "t1_c2", "grandchild", 1)), Decision::InsertPaired);
    assert_eq!(store.get("c2").unwrap().unwrap().parent_text.as_deref(), Some("hi"));
}

/// Without backfill, a slot opened by a child before its parent arrived stays
/// unpaired even after the parent shows up.
#[test]
fn late_parent_does_not_pair_existing_slot_by_default() {
    let store = MemoryStore::new();
    let mut p = Pairer::new(&store);
    p.ingest(&nc("c2", "t1_c1", "hi", 5));
    p.ingest(&nc("c1", "t3_root", "hello", 2));

    assert_eq!(store.get("c1").unwrap().unwrap().parent_text, None);
    assert_eq!(p.counts().backfilled, 0);
}

/// c2 (child of c1) arrives first, then c1, then a better reply to c1.
#[test]
fn late_parent_scenario_with_backfill() {
    let store = MemoryStore::new();
    let mut p = Pairer::new(&store).with_backfill(true);

    assert_eq!(p.ingest(&nc("c2", "t_c1", "hi", 5)), Decision::InsertUnpaired);
    assert_eq!(p.ingest(&nc("c1", "t_root", "hello", 2)), Decision::InsertUnpaired);

    let slot = store.get("c1").unwrap().unwrap();
    assert_eq!(slot.parent_text.as_deref(), Some("hello"));
    assert_eq!(slot.comment_text, "hi");
    assert_eq!(p.counts().backfilled, 1);

    assert_eq!(p.ingest(&nc("c3", "t_c1", "hey", 9)), Decision::Replace);
    let slot = store.get("c1").unwrap().unwrap();
    assert_eq!(slot.comment_text, "hey");
    assert_eq!(slot.comment_id, "c3");
    assert_eq!(slot.score, 9);
    assert_eq!(slot.parent_text.as_deref(), Some("hello"));
}

/// Any interleaving leaves one slot per parent holding the first reply that
/// reached the maximum score.
#[test]
fn one_slot_per_parent_with_max_score() {
    let sqlite = SqliteStore::open_in_memory("replies").unwrap();
    sqlite.prepare(false).unwrap();
    let memory = MemoryStore::new();

    let scores = [3i64, 7, -2, 7, 11, 0, 5, 11, 4, 9, 1, 8];
    let mut expected: HashMap<String, (i64, String)> = HashMap::new();
    let mut recs = Vec::new();
    for (i, s) in scores.iter().cycle().take(60).enumerate() {
        let parent = format!("p{}", (i * 7) % 9);
        let id = format!("c{i}");
        let e = expected.entry(parent.clone()).or_insert((*s, id.clone()));
        if *s > e.0 {
            *e = (*s, id.clone());
        }
        recs.push(nc(&id, &format!("t1_{parent}"), &format!("body {i}"), *s));
    }

    for store in [&sqlite as &dyn PairStore, &memory as &dyn PairStore] {
        let mut p = Pairer::new(store);
        for r in &recs {
            p.ingest(r);
        }
        assert_eq!(p.counts().store_errors, 0);
        assert_eq!(store.counts().unwrap().total, expected.len() as u64);
        for (parent, (score, id)) in &expected {
            let slot = store.get(parent).unwrap().unwrap();
            assert_eq!(slot.score, *score, "score for {parent}");
            assert_eq!(&slot.comment_id, id, "winner for {parent}");
        }
    }
}

/// Store double whose writes always fail.
struct BrokenStore;

impl PairStore for BrokenStore {
    fn prepare(&self, _reset: bool) -> StoreResult<()> { Ok(()) }
    fn comment_text(&self, _id: &str) -> StoreResult<Option<String>> { Ok(None) }
    fn slot_score(&self, _id: &str) -> StoreResult<Option<i64>> { Ok(None) }
    fn insert(&self, _rec: &PairRecord) -> StoreResult<()> {
        Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "connection reset")))
    }
    fn update(&self, parent_id: &str, _reply: &Reply) -> StoreResult<()> {
        Err(StoreError::NotFound(parent_id.to_string()))
    }
    fn attach_parent(&self, _parent_id: &str, _text: &str) -> StoreResult<bool> { Ok(false) }
    fn get(&self, _id: &str) -> StoreResult<Option<PairRecord>> { Ok(None) }
    fn counts(&self) -> StoreResult<StoreCounts> { Ok(StoreCounts::default()) }
    fn for_each_pair(&self, _min: i64, _sink: &mut dyn FnMut(&str, &str) -> io::Result<()>) -> StoreResult<u64> {
        Ok(0)
    }
}

#[test]
fn store_failure_is_a_skip_not_a_crash() {
    let store = BrokenStore;
    let mut p = Pairer::new(&store);
    assert_eq!(p.ingest(&nc("a", "t1_p", "x", 1)), Decision::Skip);
    assert_eq!(p.ingest(&nc("b", "t1_q", "y", 1)), Decision::Skip);
    let c = p.counts();
    assert_eq!(c.store_errors, 2);
    assert_eq!(c.skipped, 2);
    assert_eq!(c.paired + c.unpaired + c.replaced, 0);
}

#[test]
fn duplicate_comment_id_is_rejected_by_store_and_skipped() {
    let store = MemoryStore::new();
    let mut p = Pairer::new(&store);
    assert_eq!(p.ingest(&nc("dup", "t1_p1", "one", 1)), Decision::InsertUnpaired);
    // same comment id under a different parent violates comment_id uniqueness
    assert_eq!(p.ingest(&nc("dup", "t1_p2", "two", 1)), Decision::Skip);
    assert_eq!(p.counts().store_errors, 1);
    assert!(store.get("p2").unwrap().is_none());
}
