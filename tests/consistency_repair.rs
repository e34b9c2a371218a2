mod common;

use gradebookd::events::Event;
use gradebookd::history::DeleteScope;
use gradebookd::model::Partition;
use tempfile::TempDir;

use common::{model_ids, open_engine, record, seed, store_ids};

#[test]
fn promoted_owner_is_not_resurrected_by_undo() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class3;
    seed(
        dir.path(),
        &[
            record("x1", "s-x", "Xavier", partition, "Math", 50),
            record("x2", "s-x", "Xavier", partition, "Science", 60),
            record("y1", "s-y", "Yara", partition, "Math", 70),
        ],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");
    let events = engine.subscribe();

    engine
        .delete_rows(
            partition,
            &["x1".to_string(), "x2".to_string()],
            DeleteScope::Entirely,
        )
        .expect("delete");
    assert!(engine.can_undo());

    // A different code path promotes Xavier out of Class 3 while the
    // deletion is still pending on the undo stack.
    engine
        .promote_owners(partition, &["s-x".to_string()])
        .expect("promote");
    assert!(!engine.can_undo());

    // Undo must not bring Xavier's rows back into Class 3: the snapshot is
    // filtered, a repair notice raised, nothing restored.
    let report = engine.undo().expect("undo").expect("frame consumed");
    assert!(report.record_ids.is_empty());
    assert_eq!(model_ids(&engine, partition), vec!["y1".to_string()]);
    assert_eq!(store_ids(dir.path(), partition), vec!["y1".to_string()]);

    let notice = engine.repair_notice().expect("repair notice");
    assert_eq!(notice.partitions, vec![partition]);
    assert_eq!(notice.dropped, 2);

    let repair_events = events
        .try_iter()
        .filter(|e| matches!(e, Event::RepairPerformed { .. }))
        .count();
    assert_eq!(repair_events, 1);

    // Acknowledgement self-heals by re-fetching the partition.
    let reloaded = engine.acknowledge_repair().expect("acknowledge");
    assert_eq!(reloaded, vec![partition]);
    assert!(engine.repair_notice().is_none());
    assert_eq!(model_ids(&engine, partition), vec!["y1".to_string()]);
}

#[test]
fn pending_frames_for_other_owners_are_filtered_after_a_restore() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class2;
    seed(
        dir.path(),
        &[
            record("x1", "s-x", "Xavier", partition, "Math", 50),
            record("x2", "s-x", "Xavier", partition, "Science", 60),
            record("y1", "s-y", "Yara", partition, "Math", 70),
        ],
    );

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");
    let events = engine.subscribe();

    engine
        .delete_rows(partition, &["x1".to_string()], DeleteScope::Entirely)
        .expect("delete x1");
    engine
        .delete_rows(partition, &["y1".to_string()], DeleteScope::Entirely)
        .expect("delete y1");

    // Xavier still has x2 in Class 2; the promotion moves it to Class 3
    // and invalidates the stacked x1 deletion frame.
    engine
        .promote_owners(partition, &["s-x".to_string()])
        .expect("promote");

    // The top frame only references Yara, so undo is still available.
    assert!(engine.can_undo());
    engine.undo().expect("undo").expect("frame applied");

    // Yara's row came back; Xavier's stacked frame was filtered away
    // instead of waiting to resurrect him later.
    assert_eq!(model_ids(&engine, partition), vec!["y1".to_string()]);
    assert_eq!(engine.undo_depth(), 0);

    let notice = engine.repair_notice().expect("repair notice");
    assert_eq!(notice.dropped, 1);
    let repair_events = events
        .try_iter()
        .filter(|e| matches!(e, Event::RepairPerformed { .. }))
        .count();
    assert_eq!(repair_events, 1);

    // Xavier's records live in Class 3 now.
    assert_eq!(store_ids(dir.path(), Partition::Class3), vec!["x2".to_string()]);
}
