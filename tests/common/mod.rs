#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use gradebookd::engine::Engine;
use gradebookd::model::{Partition, Record};
use gradebookd::store;

pub fn record(
    id: &str,
    owner_id: &str,
    owner_name: &str,
    partition: Partition,
    subject: &str,
    score: i64,
) -> Record {
    Record {
        record_id: id.to_string(),
        owner_id: owner_id.to_string(),
        owner_name: owner_name.to_string(),
        partition,
        subject: subject.to_string(),
        score,
        term: "1".to_string(),
        teacher_name: "Ms. Fields".to_string(),
        entry_date: "2025-09-01".to_string(),
    }
}

/// Seeds owners and records through the store layer, then drops the
/// connection so the engine opens its own.
pub fn seed(workspace: &Path, records: &[Record]) {
    let conn = store::open_store(workspace).expect("open store");
    for r in records {
        store::upsert_owner(&conn, &r.owner_id, &r.owner_name, r.partition).expect("seed owner");
        assert_eq!(store::insert_record(&conn, r).expect("seed record"), 1);
    }
}

/// Engine with a zero progress-dismissal grace so tests never sleep.
pub fn open_engine(workspace: &Path) -> Engine {
    Engine::open_with_grace(workspace, Duration::ZERO).expect("open engine")
}

pub fn store_ids(workspace: &Path, partition: Partition) -> Vec<String> {
    let conn = store::open_store(workspace).expect("open store");
    let mut ids: Vec<String> = store::query_partition(&conn, partition)
        .expect("query partition")
        .into_iter()
        .map(|r| r.record_id)
        .collect();
    ids.sort();
    ids
}

pub fn model_ids(engine: &Engine, partition: Partition) -> Vec<String> {
    let mut ids: Vec<String> = engine
        .snapshot_rows(partition)
        .into_iter()
        .map(|r| r.record_id)
        .collect();
    ids.sort();
    ids
}
