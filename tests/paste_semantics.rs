mod common;

use gradebookd::engine::PasteRow;
use gradebookd::model::Partition;
use tempfile::TempDir;

use common::{model_ids, open_engine, store_ids};

fn paste_row(owner: &str, subject: &str, score: i64) -> PasteRow {
    PasteRow {
        owner_id: format!("s-{owner}"),
        owner_name: owner.to_string(),
        subject: subject.to_string(),
        score,
        term: "1".to_string(),
        teacher_name: "Mr. Holt".to_string(),
        entry_date: Some("2025-10-02".to_string()),
    }
}

#[test]
fn paste_undo_removes_exactly_the_pasted_rows() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class2;

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");

    let inserted = engine
        .paste_rows(
            partition,
            vec![paste_row("Lena", "Math", 85), paste_row("Marko", "Math", 78)],
        )
        .expect("paste");
    assert_eq!(inserted.len(), 2);
    let mut pasted_ids: Vec<String> = inserted.iter().map(|r| r.record_id.clone()).collect();
    pasted_ids.sort();

    assert_eq!(model_ids(&engine, partition), pasted_ids);
    assert_eq!(store_ids(dir.path(), partition), pasted_ids);

    engine.undo().expect("undo").expect("frame applied");
    assert!(model_ids(&engine, partition).is_empty());
    assert!(store_ids(dir.path(), partition).is_empty());

    // Redo re-inserts the same identities with the same values.
    engine.redo().expect("redo").expect("frame applied");
    assert_eq!(model_ids(&engine, partition), pasted_ids);
    assert_eq!(store_ids(dir.path(), partition), pasted_ids);
    let row = engine
        .snapshot_rows(partition)
        .into_iter()
        .find(|r| r.owner_name == "Lena")
        .expect("Lena's row");
    assert_eq!(row.score, 85);
    assert_eq!(row.entry_date, "2025-10-02");
}

#[test]
fn paste_surrounded_by_deletes_keeps_one_linear_history() {
    let dir = TempDir::new().expect("temp dir");
    let partition = Partition::Class5;

    let mut engine = open_engine(dir.path());
    engine.load_partition(partition).expect("load");

    engine
        .paste_rows(partition, vec![paste_row("Nora", "Art", 95)])
        .expect("paste");
    let id = model_ids(&engine, partition)[0].clone();

    engine
        .delete_rows(
            partition,
            &[id.clone()],
            gradebookd::history::DeleteScope::Entirely,
        )
        .expect("delete");
    assert_eq!(engine.undo_depth(), 2);

    // Chronological order: undo the delete first, then the paste.
    engine.undo().expect("undo").expect("frame applied");
    assert_eq!(model_ids(&engine, partition), vec![id.clone()]);
    engine.undo().expect("undo").expect("frame applied");
    assert!(model_ids(&engine, partition).is_empty());
    assert!(store_ids(dir.path(), partition).is_empty());
    assert!(!engine.can_undo());
    assert_eq!(engine.redo_depth(), 2);
}
