mod common;

use gradebookd::history::DeleteScope;
use gradebookd::model::Partition;
use gradebookd::store;
use tempfile::TempDir;

use common::{model_ids, open_engine, record, seed, store_ids};

#[test]
fn delete_entirely_then_undo_then_redo_round_trips() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class3;
    seed(
        dir.path(),
        &[
            record("10", "s-ana", "Ana", partition, "Math", 81),
            record("11", "s-ben", "Ben", partition, "Math", 74),
            record("12", "s-cara", "Cara", partition, "Science", 92),
            record("13", "s-dian", "Dian", partition, "Science", 66),
        ],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");
    let before = model_ids(&engine, partition);

    let ids: Vec<String> = vec!["10".into(), "11".into(), "12".into()];
    let deleted = engine
        .delete_rows(partition, &ids, DeleteScope::Entirely)
        .expect("delete");
    assert_eq!(deleted, 3);
    assert_eq!(model_ids(&engine, partition), vec!["13".to_string()]);
    assert_eq!(store_ids(dir.path(), partition), vec!["13".to_string()]);

    // Undo restores the identifier set and the original field values.
    engine.undo().expect("undo").expect("frame applied");
    assert_eq!(model_ids(&engine, partition), before);
    assert_eq!(
        store_ids(dir.path(), partition),
        vec!["10", "11", "12", "13"]
    );
    let restored = engine
        .snapshot_rows(partition)
        .into_iter()
        .find(|r| r.record_id == "10")
        .expect("row 10 back");
    assert_eq!(restored.score, 81);
    assert_eq!(restored.subject, "Math");

    // Redo removes them from the model and the store again.
    engine.redo().expect("redo").expect("frame applied");
    assert_eq!(model_ids(&engine, partition), vec!["13".to_string()]);
    assert_eq!(store_ids(dir.path(), partition), vec!["13".to_string()]);

    let conn = store::open_store(dir.path()).expect("store");
    assert!(!store::record_exists(&conn, "10").expect("exists"));
    assert!(!store::record_exists(&conn, "11").expect("exists"));
    assert!(!store::record_exists(&conn, "12").expect("exists"));
}

#[test]
fn roster_only_delete_keeps_the_underlying_record() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class1;
    seed(
        dir.path(),
        &[
            record("20", "s-eko", "Eko", partition, "Math", 55),
            record("21", "s-fia", "Fia", partition, "Math", 60),
        ],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");

    engine
        .delete_rows(
            partition,
            &["20".to_string()],
            DeleteScope::ActiveRosterOnly,
        )
        .expect("delete");

    // Gone from the active view, still present in the store.
    assert_eq!(model_ids(&engine, partition), vec!["21".to_string()]);
    assert_eq!(store_ids(dir.path(), partition), vec!["21".to_string()]);
    let conn = store::open_store(dir.path()).expect("store");
    assert!(store::record_exists(&conn, "20").expect("exists"));

    engine.undo().expect("undo").expect("frame applied");
    assert_eq!(model_ids(&engine, partition), vec!["20", "21"]);
    assert_eq!(store_ids(dir.path(), partition), vec!["20", "21"]);
}

#[test]
fn empty_selection_is_a_no_op() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class2;
    seed(
        dir.path(),
        &[record("30", "s-gus", "Gus", partition, "Art", 70)],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");

    let deleted = engine
        .delete_rows(partition, &[], DeleteScope::Entirely)
        .expect("delete nothing");
    assert_eq!(deleted, 0);
    assert_eq!(engine.undo_depth(), 0);

    // Unknown identifiers leave state and stacks untouched as well.
    let deleted = engine
        .delete_rows(partition, &["missing".to_string()], DeleteScope::Entirely)
        .expect("delete missing");
    assert_eq!(deleted, 0);
    assert_eq!(engine.undo_depth(), 0);
    assert_eq!(model_ids(&engine, partition), vec!["30".to_string()]);
}
