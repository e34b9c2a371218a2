mod common;

use gradebookd::model::{Field, Partition};
use gradebookd::store;
use tempfile::TempDir;

use common::{open_engine, record, seed};

fn score_of(engine: &gradebookd::engine::Engine, partition: Partition, id: &str) -> i64 {
    engine
        .snapshot_rows(partition)
        .into_iter()
        .find(|r| r.record_id == id)
        .expect("row present")
        .score
}

#[test]
fn edit_undo_redo_and_redo_invalidation() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class4;
    seed(
        dir.path(),
        &[
            record("42", "s-hana", "Hana", partition, "Math", 70),
            record("43", "s-iwan", "Iwan", partition, "Math", 88),
        ],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");

    engine
        .record_edit("42", partition, Field::Score, "55")
        .expect("edit");
    assert_eq!(score_of(&engine, partition, "42"), 55);

    engine.undo().expect("undo").expect("frame applied");
    assert_eq!(score_of(&engine, partition, "42"), 70);
    assert!(engine.can_redo());

    engine.redo().expect("redo").expect("frame applied");
    assert_eq!(score_of(&engine, partition, "42"), 55);

    // Store tracks every application.
    let conn = store::open_store(dir.path()).expect("store");
    let stored = store::get_record(&conn, "42").expect("get").expect("row");
    assert_eq!(stored.score, 55);

    // A fresh forward edit between undo and redo invalidates the redo
    // frame for record 42: single linear history.
    engine.undo().expect("undo").expect("frame applied");
    assert_eq!(score_of(&engine, partition, "42"), 70);
    engine
        .record_edit("43", partition, Field::Score, "90")
        .expect("edit other record");
    assert!(!engine.can_redo());
    assert!(engine.redo().expect("redo").is_none());
    assert_eq!(score_of(&engine, partition, "42"), 70);
}

#[test]
fn undo_on_empty_stack_is_idempotent() {
    let dir = TempDir::new().expect("temp dir");
    let mut engine = open_engine(dir.path());

    assert!(!engine.can_undo());
    assert!(!engine.can_redo());
    assert!(engine.undo().expect("undo").is_none());
    assert!(engine.redo().expect("redo").is_none());
    assert_eq!(engine.undo_depth(), 0);
    assert_eq!(engine.redo_depth(), 0);
}

#[test]
fn exhausting_the_stack_disables_undo() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class5;
    seed(
        dir.path(),
        &[record("50", "s-joko", "Joko", partition, "Music", 77)],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");
    assert!(!engine.can_undo());

    engine
        .record_edit("50", partition, Field::Score, "80")
        .expect("edit");
    engine
        .record_edit("50", partition, Field::Term, "2")
        .expect("edit");
    assert!(engine.can_undo());

    engine.undo().expect("undo").expect("frame applied");
    engine.undo().expect("undo").expect("frame applied");
    assert!(!engine.can_undo());
    assert!(engine.undo().expect("undo").is_none());
}

#[test]
fn same_value_edit_records_no_frame() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class6;
    seed(
        dir.path(),
        &[record("60", "s-kiki", "Kiki", partition, "Math", 40)],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");

    engine
        .record_edit("60", partition, Field::Score, "40")
        .expect("edit");
    assert_eq!(engine.undo_depth(), 0);
}
