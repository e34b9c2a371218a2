use std::collections::HashSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::model::{Field, Partition, Record};

/// Distinguishes "remove this entry from the active-class view only" from
/// "remove the underlying record altogether". Each keeps its own
/// restoration semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeleteScope {
    #[serde(rename = "fromActiveRosterOnly")]
    ActiveRosterOnly,
    #[serde(rename = "entirely")]
    Entirely,
}

impl DeleteScope {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteScope::ActiveRosterOnly => "fromActiveRosterOnly",
            DeleteScope::Entirely => "entirely",
        }
    }

    pub fn parse(s: &str) -> Result<DeleteScope, CoreError> {
        match s {
            "fromActiveRosterOnly" => Ok(DeleteScope::ActiveRosterOnly),
            "entirely" => Ok(DeleteScope::Entirely),
            other => Err(CoreError::UnknownScope(other.to_string())),
        }
    }
}

/// One inverse operation plus the state needed to re-derive the forward
/// state on redo. Deletion and paste frames carry full snapshots so
/// restoration never depends on the store still holding the rows.
#[derive(Clone, Debug)]
pub enum Frame {
    Edit {
        record_id: String,
        partition: Partition,
        field: Field,
        old_value: String,
        new_value: String,
    },
    Deletion {
        partition: Partition,
        scope: DeleteScope,
        records: Vec<Record>,
    },
    Paste {
        partition: Partition,
        records: Vec<Record>,
    },
}

impl Frame {
    /// A frame is unusable while any owner it references has a pending
    /// cross-partition move; applying it would resurrect rows into a
    /// partition the owner already left.
    pub fn invalidated_by(&self, pending_promotions: &HashSet<String>) -> bool {
        match self {
            Frame::Edit { .. } => false,
            Frame::Deletion { records, .. } | Frame::Paste { records, .. } => records
                .iter()
                .any(|r| pending_promotions.contains(&r.owner_id)),
        }
    }
}

/// One chronological undo stack and one redo stack shared by every frame
/// kind. Whichever frame is logically "current" is simply the top of the
/// stack; there is no per-kind ordering.
#[derive(Default)]
pub struct History {
    undo: Vec<Frame>,
    redo: Vec<Frame>,
}

impl History {
    /// Records a new forward action. Invalidates all redo history; this is
    /// a single linear history, not a tree.
    pub fn push_forward(&mut self, frame: Frame) {
        self.undo.push(frame);
        self.redo.clear();
    }

    /// Re-pushes onto the undo side after a redo was applied. Does not
    /// clear the redo stack.
    pub fn push_undo(&mut self, frame: Frame) {
        self.undo.push(frame);
    }

    pub fn push_redo(&mut self, frame: Frame) {
        self.redo.push(frame);
    }

    pub fn pop_undo(&mut self) -> Option<Frame> {
        self.undo.pop()
    }

    pub fn pop_redo(&mut self) -> Option<Frame> {
        self.redo.pop()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self, pending_promotions: &HashSet<String>) -> bool {
        self.undo
            .last()
            .map_or(false, |f| !f.invalidated_by(pending_promotions))
    }

    pub fn can_redo(&self, pending_promotions: &HashSet<String>) -> bool {
        self.redo
            .last()
            .map_or(false, |f| !f.invalidated_by(pending_promotions))
    }

    /// Mutable view over every stacked frame, undo side first. Used by the
    /// consistency repair pass.
    pub fn frames_mut(&mut self) -> impl Iterator<Item = &mut Frame> {
        self.undo.iter_mut().chain(self.redo.iter_mut())
    }

    /// Drops deletion/paste frames whose snapshots were filtered down to
    /// nothing by the repair pass.
    pub fn drop_empty_frames(&mut self) {
        let is_empty = |f: &Frame| match f {
            Frame::Edit { .. } => false,
            Frame::Deletion { records, .. } | Frame::Paste { records, .. } => records.is_empty(),
        };
        self.undo.retain(|f| !is_empty(f));
        self.redo.retain(|f| !is_empty(f));
    }
}
