use std::cmp::Ordering;

use crate::error::CoreError;
use crate::model::Record;

/// Sortable columns of the roster tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    OwnerName,
    Subject,
    Score,
    Term,
    TeacherName,
    EntryDate,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::OwnerName => "ownerName",
            SortField::Subject => "subject",
            SortField::Score => "score",
            SortField::Term => "term",
            SortField::TeacherName => "teacherName",
            SortField::EntryDate => "entryDate",
        }
    }

    pub fn parse(s: &str) -> Result<SortField, CoreError> {
        match s {
            "ownerName" => Ok(SortField::OwnerName),
            "subject" => Ok(SortField::Subject),
            "score" => Ok(SortField::Score),
            "term" => Ok(SortField::Term),
            "teacherName" => Ok(SortField::TeacherName),
            "entryDate" => Ok(SortField::EntryDate),
            other => Err(CoreError::UnknownSortField(other.to_string())),
        }
    }
}

/// A user-chosen sort key. Produces a total, deterministic order: ties on
/// the primary field fall back to `record_id` so placement is stable
/// regardless of direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub ascending: bool,
}

impl SortKey {
    pub const DEFAULT: SortKey = SortKey {
        field: SortField::OwnerName,
        ascending: true,
    };

    /// Parses the persisted preference form `<field>:<asc|desc>`.
    /// A bare field name means ascending. Anything else fails loudly;
    /// a wrong insertion index corrupts displayed order, so there is no
    /// silent default here.
    pub fn parse(s: &str) -> Result<SortKey, CoreError> {
        let (field, dir) = match s.split_once(':') {
            Some((field, dir)) => (field, Some(dir)),
            None => (s, None),
        };
        let field = SortField::parse(field)?;
        let ascending = match dir {
            None | Some("asc") => true,
            Some("desc") => false,
            Some(other) => return Err(CoreError::BadSortKey(format!("{}:{}", field.as_str(), other))),
        };
        Ok(SortKey { field, ascending })
    }

    pub fn serialize(&self) -> String {
        format!(
            "{}:{}",
            self.field.as_str(),
            if self.ascending { "asc" } else { "desc" }
        )
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let primary = match self.field {
            SortField::OwnerName => a.owner_name.cmp(&b.owner_name),
            SortField::Subject => a.subject.cmp(&b.subject),
            SortField::Score => a.score.cmp(&b.score),
            SortField::Term => a.term.cmp(&b.term),
            SortField::TeacherName => a.teacher_name.cmp(&b.teacher_name),
            SortField::EntryDate => a.entry_date.cmp(&b.entry_date),
        };
        let primary = if self.ascending {
            primary
        } else {
            primary.reverse()
        };
        primary.then_with(|| a.record_id.cmp(&b.record_id))
    }
}

/// Binary placement: the index at which `record` preserves the order of
/// `rows` under `key`. `rows` must already be sorted by `key`.
pub fn insertion_index(rows: &[Record], record: &Record, key: &SortKey) -> usize {
    rows.partition_point(|r| key.compare(r, record) == Ordering::Less)
}
