mod common;

use gradebookd::events::Event;
use gradebookd::model::Partition;
use tempfile::TempDir;

use common::{open_engine, record, seed};

#[test]
fn teacher_rename_propagates_and_flags_pending_reloads() {
    let dir = TempDir::new().expect("temp dir");
    seed(
        dir.path(),
        &[
            record("a1", "s-a", "Ana", Partition::Class1, "Math", 80),
            record("b1", "s-b", "Ben", Partition::Class2, "Math", 75),
            record("c1", "s-c", "Cara", Partition::Class2, "Art", 90),
        ],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(Partition::Class1).expect("load");
    engine.load_partition(Partition::Class2).expect("load");
    let events = engine.subscribe();

    let affected = engine
        .rename_teacher("Ms. Fields", "Ms. Archer")
        .expect("rename");
    assert_eq!(affected, 3);

    // Loaded rows patched in place across both partitions.
    for partition in [Partition::Class1, Partition::Class2] {
        for row in engine.snapshot_rows(partition) {
            assert_eq!(row.teacher_name, "Ms. Archer");
        }
    }

    // Each affected partition flags its rows for a display refresh; the
    // set drains once.
    let mut pending = engine.take_pending_reload(Partition::Class2);
    pending.sort();
    assert_eq!(pending, vec!["b1".to_string(), "c1".to_string()]);
    assert!(engine.take_pending_reload(Partition::Class2).is_empty());
    assert_eq!(
        engine.take_pending_reload(Partition::Class1),
        vec!["a1".to_string()]
    );

    let renames = events
        .try_iter()
        .filter(|e| matches!(e, Event::TeacherRenamed { .. }))
        .count();
    assert_eq!(renames, 2);
}

#[test]
fn owner_rename_updates_every_loaded_partition() {
    let dir = TempDir::new().expect("temp dir");
    seed(
        dir.path(),
        &[
            record("a1", "s-a", "Ana", Partition::Class1, "Math", 80),
            record("a2", "s-a", "Ana", Partition::Class1, "Art", 85),
        ],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(Partition::Class1).expect("load");

    let touched = engine.rename_owner("s-a", "Ana Maria").expect("rename");
    assert_eq!(touched, 2);
    for row in engine.snapshot_rows(Partition::Class1) {
        assert_eq!(row.owner_name, "Ana Maria");
    }

    assert!(engine.rename_owner("s-missing", "Nobody").is_err());
}

#[test]
fn subject_rename_uses_the_same_propagation_path() {
    let dir = TempDir::new().expect("temp dir");
    seed(
        dir.path(),
        &[
            record("a1", "s-a", "Ana", Partition::Class1, "Math", 80),
            record("b1", "s-b", "Ben", Partition::Class3, "Math", 70),
        ],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(Partition::Class1).expect("load");

    let affected = engine
        .rename_subject("Math", "Mathematics")
        .expect("rename");
    assert_eq!(affected, 2);

    // Class 3 was never loaded; its rows rename in the store and surface
    // on the next load.
    engine.load_partition(Partition::Class3).expect("load");
    let rows = engine.snapshot_rows(Partition::Class3);
    assert_eq!(rows[0].subject, "Mathematics");
}
