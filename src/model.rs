use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ordering::{insertion_index, SortKey};

/// One of the six class partitions. A record belongs to exactly one
/// partition at a time; membership changes only via an explicit promote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Partition {
    Class1,
    Class2,
    Class3,
    Class4,
    Class5,
    Class6,
}

impl Partition {
    pub const ALL: [Partition; 6] = [
        Partition::Class1,
        Partition::Class2,
        Partition::Class3,
        Partition::Class4,
        Partition::Class5,
        Partition::Class6,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Class1 => "class1",
            Partition::Class2 => "class2",
            Partition::Class3 => "class3",
            Partition::Class4 => "class4",
            Partition::Class5 => "class5",
            Partition::Class6 => "class6",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Partition::Class1 => "Class 1",
            Partition::Class2 => "Class 2",
            Partition::Class3 => "Class 3",
            Partition::Class4 => "Class 4",
            Partition::Class5 => "Class 5",
            Partition::Class6 => "Class 6",
        }
    }

    pub fn parse(s: &str) -> Result<Partition, CoreError> {
        match s {
            "class1" => Ok(Partition::Class1),
            "class2" => Ok(Partition::Class2),
            "class3" => Ok(Partition::Class3),
            "class4" => Ok(Partition::Class4),
            "class5" => Ok(Partition::Class5),
            "class6" => Ok(Partition::Class6),
            other => Err(CoreError::UnknownPartition(other.to_string())),
        }
    }

    /// The partition an owner moves to on promotion. `None` for Class6:
    /// promoted owners leave the active roster entirely.
    pub fn next(self) -> Option<Partition> {
        match self {
            Partition::Class1 => Some(Partition::Class2),
            Partition::Class2 => Some(Partition::Class3),
            Partition::Class3 => Some(Partition::Class4),
            Partition::Class4 => Some(Partition::Class5),
            Partition::Class5 => Some(Partition::Class6),
            Partition::Class6 => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Partition::Class1 => 0,
            Partition::Class2 => 1,
            Partition::Class3 => 2,
            Partition::Class4 => 3,
            Partition::Class5 => 4,
            Partition::Class6 => 5,
        }
    }
}

/// One grade entry. `record_id` is globally unique and immutable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub record_id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub partition: Partition,
    pub subject: String,
    pub score: i64,
    pub term: String,
    pub teacher_name: String,
    pub entry_date: String,
}

/// Editable single-value fields of a record. Owner name edits go through
/// the owner rename operation, not through here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Subject,
    Score,
    Term,
    Teacher,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Subject => "subject",
            Field::Score => "score",
            Field::Term => "term",
            Field::Teacher => "teacherName",
        }
    }

    pub fn parse(s: &str) -> Result<Field, CoreError> {
        match s {
            "subject" => Ok(Field::Subject),
            "score" => Ok(Field::Score),
            "term" => Ok(Field::Term),
            "teacherName" => Ok(Field::Teacher),
            other => Err(CoreError::UnknownField(other.to_string())),
        }
    }
}

impl Record {
    pub fn field_value(&self, field: Field) -> String {
        match field {
            Field::Subject => self.subject.clone(),
            Field::Score => self.score.to_string(),
            Field::Term => self.term.clone(),
            Field::Teacher => self.teacher_name.clone(),
        }
    }

    /// Non-numeric score input collapses to 0, matching the store layer.
    pub fn set_field(&mut self, field: Field, value: &str) {
        match field {
            Field::Subject => self.subject = value.to_string(),
            Field::Score => self.score = value.parse().unwrap_or(0),
            Field::Term => self.term = value.to_string(),
            Field::Teacher => self.teacher_name = value.to_string(),
        }
    }
}

/// The in-memory ordered rows of one partition, plus the pending-reload
/// set of record ids whose derived cells are stale after a bulk rename.
#[derive(Default)]
pub struct PartitionModel {
    rows: Vec<Record>,
    pending_reload: HashSet<String>,
    loaded: bool,
}

impl PartitionModel {
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replaces the rows wholesale (initial load or forced reload).
    pub fn set_rows(&mut self, rows: Vec<Record>) {
        self.rows = rows;
        self.loaded = true;
    }

    pub fn sort(&mut self, key: &SortKey) {
        self.rows.sort_by(|a, b| key.compare(a, b));
    }

    pub fn position_of(&self, record_id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.record_id == record_id)
    }

    pub fn contains(&self, record_id: &str) -> bool {
        self.position_of(record_id).is_some()
    }

    pub fn get(&self, record_id: &str) -> Option<&Record> {
        self.rows.iter().find(|r| r.record_id == record_id)
    }

    pub fn get_mut(&mut self, record_id: &str) -> Option<&mut Record> {
        self.rows.iter_mut().find(|r| r.record_id == record_id)
    }

    pub fn rows_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }

    /// Comparator placement against the current rows. Returns `None` when a
    /// row with the same id is already present (restore idempotence).
    pub fn insert_sorted(&mut self, record: Record, key: &SortKey) -> Option<usize> {
        if self.contains(&record.record_id) {
            return None;
        }
        let idx = insertion_index(&self.rows, &record, key);
        self.rows.insert(idx, record);
        Some(idx)
    }

    /// Removes by identifier, never by displayed row index. Returns the
    /// removed indices (descending) and snapshots in the same order.
    pub fn remove_by_ids(&mut self, ids: &[String]) -> (Vec<usize>, Vec<Record>) {
        let mut indices = Vec::new();
        let mut removed = Vec::new();
        for (index, row) in self.rows.iter().enumerate().rev() {
            if ids.iter().any(|id| *id == row.record_id) {
                indices.push(index);
                removed.push(row.clone());
            }
        }
        for &index in &indices {
            self.rows.remove(index);
        }
        (indices, removed)
    }

    pub fn mark_pending_reload<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.pending_reload.extend(ids);
    }

    /// Drains the pending-reload set; called when the owning view redraws.
    pub fn take_pending_reload(&mut self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending_reload.drain().collect();
        ids.sort();
        ids
    }

    pub fn pending_reload_len(&self) -> usize {
        self.pending_reload.len()
    }
}

/// All six partition models. Exactly one instance exists per engine;
/// secondary views hold subscriptions, never copies.
pub struct Models {
    partitions: [PartitionModel; 6],
}

impl Models {
    pub fn new() -> Models {
        Models {
            partitions: std::array::from_fn(|_| PartitionModel::default()),
        }
    }

    pub fn get(&self, partition: Partition) -> &PartitionModel {
        &self.partitions[partition.index()]
    }

    pub fn get_mut(&mut self, partition: Partition) -> &mut PartitionModel {
        &mut self.partitions[partition.index()]
    }

    pub fn loaded_partitions(&self) -> Vec<Partition> {
        Partition::ALL
            .into_iter()
            .filter(|p| self.get(*p).is_loaded())
            .collect()
    }
}

impl Default for Models {
    fn default() -> Self {
        Models::new()
    }
}
