use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::events::{Event, EventBus};
use crate::history::{DeleteScope, Frame, History};
use crate::model::{Field, Models, Partition, Record};
use crate::ordering::SortKey;
use crate::repair::{owner_belongs_to, repair_after_restore, RepairNotice};
use crate::restore::{
    restore_inline, BusProgress, RestoreExecutor, RestoreJob, RestoreOutcome,
    RESTORE_SYNC_THRESHOLD,
};
use crate::store;

/// Progress indicators linger this long after a restore completes so fast
/// batches do not flicker.
pub const PROGRESS_GRACE: Duration = Duration::from_secs(2);

/// One row of a bulk paste, before it gets an identity.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteRow {
    pub owner_id: String,
    pub owner_name: String,
    pub subject: String,
    pub score: i64,
    pub term: String,
    pub teacher_name: String,
    #[serde(default)]
    pub entry_date: Option<String>,
}

/// What an undo/redo application touched, for selection and scroll-to.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    pub kind: &'static str,
    pub partition: Partition,
    pub record_ids: Vec<String>,
    pub restored_indices: Vec<usize>,
}

/// The single ownership point for the six partition models, both history
/// stacks, the notifier, and the restoration worker. Every mutation of
/// roster state flows through here; views hold subscriptions, not copies.
pub struct Engine {
    conn: Connection,
    models: Arc<RwLock<Models>>,
    history: History,
    bus: EventBus,
    executor: RestoreExecutor,
    pending_promotions: HashSet<String>,
    repair_notice: Option<RepairNotice>,
    sort_keys: [SortKey; 6],
}

impl Engine {
    pub fn open(workspace: &Path) -> anyhow::Result<Engine> {
        Engine::open_with_grace(workspace, PROGRESS_GRACE)
    }

    /// `grace` is the progress-dismissal delay; tests pass zero.
    pub fn open_with_grace(workspace: &Path, grace: Duration) -> anyhow::Result<Engine> {
        let conn = store::open_store(workspace)?;
        let models = Arc::new(RwLock::new(Models::new()));
        let bus = EventBus::new();
        let executor = RestoreExecutor::new(models.clone(), grace);
        info!(workspace = %workspace.display(), "workspace opened");
        Ok(Engine {
            conn,
            models,
            history: History::default(),
            bus,
            executor,
            pending_promotions: HashSet::new(),
            repair_notice: None,
            sort_keys: [SortKey::DEFAULT; 6],
        })
    }

    pub fn subscribe(&self) -> Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn models_handle(&self) -> Arc<RwLock<Models>> {
        self.models.clone()
    }

    pub fn snapshot_rows(&self, partition: Partition) -> Vec<Record> {
        self.models.read().get(partition).rows().to_vec()
    }

    pub fn loaded_partitions(&self) -> Vec<Partition> {
        self.models.read().loaded_partitions()
    }

    pub fn sort_key(&self, partition: Partition) -> SortKey {
        self.sort_keys[partition.index()]
    }

    /// Loads (or force-reloads) one partition from the store, ordered by
    /// the persisted sort preference. An unparseable persisted key aborts
    /// the load; guessing an order would desynchronize every open view.
    pub fn load_partition(&mut self, partition: Partition) -> anyhow::Result<Vec<Record>> {
        let key = match store::get_pref(&self.conn, &pref_key(partition))? {
            Some(raw) => SortKey::parse(&raw)?,
            None => SortKey::DEFAULT,
        };
        let mut rows = store::query_partition(&self.conn, partition)?;
        rows.sort_by(|a, b| key.compare(a, b));
        self.sort_keys[partition.index()] = key;
        self.models.write().get_mut(partition).set_rows(rows.clone());
        Ok(rows)
    }

    /// Re-sorts one partition and persists the preference.
    pub fn sort_partition(&mut self, partition: Partition, key: SortKey) -> anyhow::Result<()> {
        store::set_pref(&self.conn, &pref_key(partition), &key.serialize())?;
        self.sort_keys[partition.index()] = key;
        self.models.write().get_mut(partition).sort(&key);
        Ok(())
    }

    /// Drains the pending-reload set for a partition; called when the
    /// owning view redraws its stale cells.
    pub fn take_pending_reload(&mut self, partition: Partition) -> Vec<String> {
        self.models.write().get_mut(partition).take_pending_reload()
    }

    /// Single-field edit: store and model mutate together, the inverse
    /// goes on the undo stack, redo history is invalidated.
    pub fn record_edit(
        &mut self,
        record_id: &str,
        partition: Partition,
        field: Field,
        new_value: &str,
    ) -> anyhow::Result<()> {
        let old_value = self
            .models
            .read()
            .get(partition)
            .get(record_id)
            .map(|r| r.field_value(field))
            .ok_or_else(|| CoreError::RecordNotFound(record_id.to_string()))?;
        if old_value == new_value {
            return Ok(());
        }

        self.apply_edit(record_id, partition, field, new_value)?;
        self.history.push_forward(Frame::Edit {
            record_id: record_id.to_string(),
            partition,
            field,
            old_value,
            new_value: new_value.to_string(),
        });
        Ok(())
    }

    /// Removes records by identifier (never by displayed row index: a
    /// concurrent reload may have shifted indices since the selection was
    /// made), snapshots them for undo, and announces the deletion.
    pub fn delete_rows(
        &mut self,
        partition: Partition,
        record_ids: &[String],
        scope: DeleteScope,
    ) -> anyhow::Result<usize> {
        if record_ids.is_empty() {
            return Ok(0);
        }
        let (_indices, removed) = self
            .models
            .write()
            .get_mut(partition)
            .remove_by_ids(record_ids);
        if removed.is_empty() {
            return Ok(0);
        }

        for record in &removed {
            match scope {
                DeleteScope::Entirely => {
                    store::delete_record(&self.conn, &record.record_id)?;
                }
                DeleteScope::ActiveRosterOnly => {
                    store::set_record_active(&self.conn, &record.record_id, false)?;
                }
            }
        }

        let ids: Vec<String> = removed.iter().map(|r| r.record_id.clone()).collect();
        let count = removed.len();
        self.history.push_forward(Frame::Deletion {
            partition,
            scope,
            records: removed,
        });
        self.bus.publish(Event::RowsDeleted {
            partition,
            record_ids: ids,
            scope,
        });
        Ok(count)
    }

    /// Bulk paste: each row gets a fresh identity, lands at its comparator
    /// position, and the whole batch becomes one undoable frame.
    pub fn paste_rows(
        &mut self,
        partition: Partition,
        rows: Vec<PasteRow>,
    ) -> anyhow::Result<Vec<Record>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.sort_keys[partition.index()];
        let mut inserted = Vec::with_capacity(rows.len());

        for row in rows {
            let record = Record {
                record_id: Uuid::new_v4().to_string(),
                owner_id: row.owner_id.clone(),
                owner_name: row.owner_name.clone(),
                partition,
                subject: row.subject,
                score: row.score,
                term: row.term,
                teacher_name: row.teacher_name,
                entry_date: row
                    .entry_date
                    .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
            };
            store::upsert_owner(&self.conn, &row.owner_id, &row.owner_name, partition)?;
            store::insert_record(&self.conn, &record)?;
            let _ = self
                .models
                .write()
                .get_mut(partition)
                .insert_sorted(record.clone(), &key);
            inserted.push(record);
        }

        self.history.push_forward(Frame::Paste {
            partition,
            records: inserted.clone(),
        });
        self.bus.publish(Event::RowsRestored {
            partition,
            records: inserted.clone(),
        });
        Ok(inserted)
    }

    /// Moves owners' active records to the next partition (Class 6 owners
    /// leave the roster). This is the cross-partition move that pending
    /// deletion frames must survive: the owners are registered as pending
    /// promotions, which gates undo/redo availability until the repair
    /// pass reconciles the stacks.
    pub fn promote_owners(
        &mut self,
        from: Partition,
        owner_ids: &[String],
    ) -> anyhow::Result<usize> {
        let to = from.next();
        let mut moved = 0usize;

        for owner_id in owner_ids {
            let ids = store::owner_record_ids(&self.conn, owner_id, from)?;
            match to {
                Some(t) => {
                    for id in &ids {
                        store::update_record_partition(&self.conn, id, t)?;
                    }
                }
                None => {
                    for id in &ids {
                        store::set_record_active(&self.conn, id, false)?;
                    }
                }
            }
            store::set_owner_partition(&self.conn, owner_id, to)?;
            self.models.write().get_mut(from).remove_by_ids(&ids);
            if let Some(t) = to {
                let dest_loaded = self.models.read().get(t).is_loaded();
                if dest_loaded {
                    self.reload_partition(t)?;
                }
            }
            self.pending_promotions.insert(owner_id.clone());
            moved += ids.len();
            self.bus.publish(Event::OwnerPromoted {
                owner_id: owner_id.clone(),
                from,
                to,
                record_ids: ids,
            });
        }
        Ok(moved)
    }

    /// Renames a student; every loaded partition patches its display rows
    /// in place by owner id.
    pub fn rename_owner(&mut self, owner_id: &str, new_name: &str) -> anyhow::Result<usize> {
        let n = store::update_owner_name(&self.conn, owner_id, new_name)?;
        if n == 0 {
            return Err(CoreError::OwnerNotFound(owner_id.to_string()).into());
        }

        let mut touched = 0usize;
        {
            let mut models = self.models.write();
            for partition in Partition::ALL {
                for record in models.get_mut(partition).rows_mut() {
                    if record.owner_id == owner_id {
                        record.owner_name = new_name.to_string();
                        touched += 1;
                    }
                }
            }
        }
        self.bus.publish(Event::OwnerRenamed {
            owner_id: owner_id.to_string(),
            new_name: new_name.to_string(),
        });
        Ok(touched)
    }

    /// Bulk teacher rename across all six partitions. Loaded rows patch in
    /// place and join the pending-reload set so views refresh the derived
    /// cells on their next redraw.
    pub fn rename_teacher(&mut self, old_name: &str, new_name: &str) -> anyhow::Result<usize> {
        let affected = store::rename_teacher(&self.conn, old_name, new_name)?;
        let by_partition = self.apply_rename(&affected, |record| {
            record.teacher_name = new_name.to_string();
        });
        for (partition, record_ids) in by_partition {
            self.bus.publish(Event::TeacherRenamed {
                partition,
                old_name: old_name.to_string(),
                new_name: new_name.to_string(),
                record_ids,
            });
        }
        Ok(affected.len())
    }

    /// Bulk subject rename; same propagation contract as teacher renames.
    pub fn rename_subject(&mut self, old_name: &str, new_name: &str) -> anyhow::Result<usize> {
        let affected = store::rename_subject(&self.conn, old_name, new_name)?;
        let by_partition = self.apply_rename(&affected, |record| {
            record.subject = new_name.to_string();
        });
        for (partition, record_ids) in by_partition {
            self.bus.publish(Event::SubjectRenamed {
                partition,
                old_name: old_name.to_string(),
                new_name: new_name.to_string(),
                record_ids,
            });
        }
        Ok(affected.len())
    }

    fn apply_rename(
        &mut self,
        affected: &[(Partition, String)],
        mut patch: impl FnMut(&mut Record),
    ) -> HashMap<Partition, Vec<String>> {
        let mut by_partition: HashMap<Partition, Vec<String>> = HashMap::new();
        for (partition, id) in affected {
            by_partition
                .entry(*partition)
                .or_default()
                .push(id.clone());
        }

        let mut models = self.models.write();
        for (partition, ids) in &by_partition {
            let model = models.get_mut(*partition);
            for id in ids {
                if let Some(record) = model.get_mut(id) {
                    patch(record);
                }
            }
            model.mark_pending_reload(ids.iter().cloned());
        }
        by_partition
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo(&self.pending_promotions)
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo(&self.pending_promotions)
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Applies the chronologically newest frame in reverse. An empty stack
    /// is a silent no-op, not an error.
    pub fn undo(&mut self) -> anyhow::Result<Option<HistoryReport>> {
        let Some(frame) = self.history.pop_undo() else {
            return Ok(None);
        };

        let report = match frame {
            Frame::Edit {
                record_id,
                partition,
                field,
                old_value,
                new_value,
            } => {
                self.apply_edit(&record_id, partition, field, &old_value)?;
                self.history.push_redo(Frame::Edit {
                    record_id: record_id.clone(),
                    partition,
                    field,
                    old_value,
                    new_value,
                });
                HistoryReport {
                    kind: "edit",
                    partition,
                    record_ids: vec![record_id],
                    restored_indices: Vec::new(),
                }
            }
            Frame::Deletion {
                partition,
                scope,
                records,
            } => {
                // The snapshot is validated against the owners' current
                // whereabouts before anything is reinserted; a promotion
                // performed through another code path must not be undone
                // into resurrection.
                let (kept, mut notice) = self.filter_deletion_snapshot(partition, records)?;
                let report = if kept.is_empty() {
                    HistoryReport {
                        kind: "deletion",
                        partition,
                        record_ids: Vec::new(),
                        restored_indices: Vec::new(),
                    }
                } else {
                    let outcome = self.apply_restore(partition, scope, &kept)?;
                    let record_ids = kept.iter().map(|r| r.record_id.clone()).collect();
                    self.history.push_redo(Frame::Deletion {
                        partition,
                        scope,
                        records: kept,
                    });
                    let post =
                        repair_after_restore(&self.conn, &mut self.history, &self.pending_promotions)?;
                    merge_notice(&mut notice, post);
                    HistoryReport {
                        kind: "deletion",
                        partition,
                        record_ids,
                        restored_indices: outcome.inserted_indices,
                    }
                };
                self.raise_repair(notice);
                report
            }
            Frame::Paste { partition, records } => {
                let ids: Vec<String> = records.iter().map(|r| r.record_id.clone()).collect();
                self.models.write().get_mut(partition).remove_by_ids(&ids);
                for id in &ids {
                    store::delete_record(&self.conn, id)?;
                }
                self.history.push_redo(Frame::Paste { partition, records });
                self.bus.publish(Event::RowsDeleted {
                    partition,
                    record_ids: ids.clone(),
                    scope: DeleteScope::Entirely,
                });
                HistoryReport {
                    kind: "paste",
                    partition,
                    record_ids: ids,
                    restored_indices: Vec::new(),
                }
            }
        };
        Ok(Some(report))
    }

    /// Re-applies the most recently undone frame. Symmetric to `undo`;
    /// empty stack is a no-op.
    pub fn redo(&mut self) -> anyhow::Result<Option<HistoryReport>> {
        let Some(frame) = self.history.pop_redo() else {
            return Ok(None);
        };

        let report = match frame {
            Frame::Edit {
                record_id,
                partition,
                field,
                old_value,
                new_value,
            } => {
                self.apply_edit(&record_id, partition, field, &new_value)?;
                self.history.push_undo(Frame::Edit {
                    record_id: record_id.clone(),
                    partition,
                    field,
                    old_value,
                    new_value,
                });
                HistoryReport {
                    kind: "edit",
                    partition,
                    record_ids: vec![record_id],
                    restored_indices: Vec::new(),
                }
            }
            Frame::Deletion {
                partition,
                scope,
                records,
            } => {
                let ids: Vec<String> = records.iter().map(|r| r.record_id.clone()).collect();
                self.models.write().get_mut(partition).remove_by_ids(&ids);
                for record in &records {
                    match scope {
                        DeleteScope::Entirely => {
                            store::delete_record(&self.conn, &record.record_id)?;
                        }
                        DeleteScope::ActiveRosterOnly => {
                            store::set_record_active(&self.conn, &record.record_id, false)?;
                        }
                    }
                }
                self.history.push_undo(Frame::Deletion {
                    partition,
                    scope,
                    records,
                });
                self.bus.publish(Event::RowsDeleted {
                    partition,
                    record_ids: ids.clone(),
                    scope,
                });
                HistoryReport {
                    kind: "deletion",
                    partition,
                    record_ids: ids,
                    restored_indices: Vec::new(),
                }
            }
            Frame::Paste { partition, records } => {
                for record in &records {
                    store::insert_record(&self.conn, record)?;
                }
                let outcome = self.restore_into_model(partition, &records)?;
                self.bus.publish(Event::RowsRestored {
                    partition,
                    records: outcome.restored.clone(),
                });
                let ids: Vec<String> = records.iter().map(|r| r.record_id.clone()).collect();
                self.history.push_undo(Frame::Paste { partition, records });
                let post =
                    repair_after_restore(&self.conn, &mut self.history, &self.pending_promotions)?;
                self.raise_repair(post);
                HistoryReport {
                    kind: "paste",
                    partition,
                    record_ids: ids,
                    restored_indices: outcome.inserted_indices,
                }
            }
        };
        Ok(Some(report))
    }

    /// The unacknowledged consistency warning, if any.
    pub fn repair_notice(&self) -> Option<RepairNotice> {
        self.repair_notice.clone()
    }

    /// User acknowledged the warning: self-heal by re-fetching the
    /// affected partitions rather than reconciling in place.
    pub fn acknowledge_repair(&mut self) -> anyhow::Result<Vec<Partition>> {
        let Some(notice) = self.repair_notice.take() else {
            return Ok(Vec::new());
        };
        for partition in &notice.partitions {
            self.reload_partition(*partition)?;
            self.bus.publish(Event::PartitionReloaded {
                partition: *partition,
            });
        }
        self.pending_promotions.clear();
        Ok(notice.partitions)
    }

    fn reload_partition(&mut self, partition: Partition) -> anyhow::Result<()> {
        let key = self.sort_keys[partition.index()];
        let mut rows = store::query_partition(&self.conn, partition)?;
        rows.sort_by(|a, b| key.compare(a, b));
        self.models.write().get_mut(partition).set_rows(rows);
        Ok(())
    }

    fn apply_edit(
        &mut self,
        record_id: &str,
        partition: Partition,
        field: Field,
        value: &str,
    ) -> anyhow::Result<()> {
        let n = store::update_record_field(&self.conn, record_id, field, value)?;
        if n == 0 {
            // The record vanished since the frame was captured; the rest of
            // the operation still applies.
            warn!(record_id, "edit target missing from store; skipping");
        }
        if let Some(record) = self.models.write().get_mut(partition).get_mut(record_id) {
            record.set_field(field, value);
        }
        self.bus.publish(Event::CellEdited {
            record_id: record_id.to_string(),
            partition,
            field: field.as_str().to_string(),
            new_value: value.to_string(),
        });
        Ok(())
    }

    fn filter_deletion_snapshot(
        &self,
        partition: Partition,
        records: Vec<Record>,
    ) -> anyhow::Result<(Vec<Record>, Option<RepairNotice>)> {
        let mut kept = Vec::with_capacity(records.len());
        let mut dropped = 0usize;
        for record in records {
            if owner_belongs_to(&self.conn, &record.owner_id, partition, &self.pending_promotions)? {
                kept.push(record);
            } else {
                warn!(
                    record_id = %record.record_id,
                    owner_id = %record.owner_id,
                    partition = partition.as_str(),
                    "snapshot entry dropped before restore; owner left the partition"
                );
                dropped += 1;
            }
        }
        let notice = (dropped > 0).then(|| RepairNotice {
            partitions: vec![partition],
            dropped,
        });
        Ok((kept, notice))
    }

    /// Store-side reinsertion first (snapshots make this independent of
    /// the store still holding the rows), then comparator placement into
    /// the model, inline or via the serialized worker depending on size.
    fn apply_restore(
        &mut self,
        partition: Partition,
        scope: DeleteScope,
        records: &[Record],
    ) -> anyhow::Result<RestoreOutcome> {
        for record in records {
            let written = match scope {
                DeleteScope::ActiveRosterOnly => {
                    if store::set_record_active(&self.conn, &record.record_id, true)? == 0 {
                        store::insert_record(&self.conn, record)?
                    } else {
                        1
                    }
                }
                DeleteScope::Entirely => store::insert_record(&self.conn, record)?,
            };
            if written == 0 {
                warn!(record_id = %record.record_id, "store row already present during restore");
            }
        }

        let outcome = self.restore_into_model(partition, records)?;
        self.bus.publish(Event::RowsRestored {
            partition,
            records: outcome.restored.clone(),
        });
        Ok(outcome)
    }

    fn restore_into_model(
        &mut self,
        partition: Partition,
        records: &[Record],
    ) -> anyhow::Result<RestoreOutcome> {
        let key = self.sort_keys[partition.index()];
        if records.len() >= RESTORE_SYNC_THRESHOLD {
            let rx = self.executor.restore(RestoreJob {
                partition,
                records: records.to_vec(),
                sort_key: key,
                sink: Box::new(BusProgress {
                    bus: self.bus.clone(),
                    partition,
                }),
            });
            rx.recv()
                .map_err(|_| anyhow::anyhow!("restoration worker hung up"))
        } else {
            Ok(restore_inline(&self.models, partition, records, &key))
        }
    }

    fn raise_repair(&mut self, notice: Option<RepairNotice>) {
        let Some(notice) = notice else { return };
        self.bus.publish(Event::RepairPerformed {
            partitions: notice.partitions.clone(),
            dropped: notice.dropped,
        });
        match &mut self.repair_notice {
            Some(existing) => existing.merge(notice),
            None => self.repair_notice = Some(notice),
        }
    }
}

fn merge_notice(into: &mut Option<RepairNotice>, from: Option<RepairNotice>) {
    match (into.as_mut(), from) {
        (_, None) => {}
        (Some(existing), Some(notice)) => existing.merge(notice),
        (None, Some(notice)) => *into = Some(notice),
    }
}

fn pref_key(partition: Partition) -> String {
    format!("sort.{}", partition.as_str())
}
