use std::collections::HashSet;

use rusqlite::Connection;
use serde::Serialize;
use tracing::warn;

use crate::history::{Frame, History};
use crate::model::Partition;
use crate::store;

/// One-shot warning surfaced when stacked undo state had to be discarded.
/// The UI acknowledges it, which forces a reload of the affected
/// partitions from the store.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairNotice {
    pub partitions: Vec<Partition>,
    pub dropped: usize,
}

impl RepairNotice {
    pub fn merge(&mut self, other: RepairNotice) {
        for p in other.partitions {
            if !self.partitions.contains(&p) {
                self.partitions.push(p);
            }
        }
        self.partitions.sort();
        self.dropped += other.dropped;
    }
}

/// Post-restoration validation. A record deleted from partition A can have
/// its owner promoted or removed through a different code path before the
/// deletion is undone; reinserting it later would resurrect state the
/// owner already left. This pass filters every pending deletion frame on
/// either stack down to entries whose owner still belongs to the frame's
/// target partition, drops frames that become empty, and reports what was
/// discarded. Repair is by filter-and-reload, not in-place reconciliation.
pub fn repair_after_restore(
    conn: &Connection,
    history: &mut History,
    pending_promotions: &HashSet<String>,
) -> anyhow::Result<Option<RepairNotice>> {
    let mut affected: Vec<Partition> = Vec::new();
    let mut dropped = 0usize;

    for frame in history.frames_mut() {
        let Frame::Deletion {
            partition, records, ..
        } = frame
        else {
            continue;
        };
        let target = *partition;

        let mut kept = Vec::with_capacity(records.len());
        for record in records.drain(..) {
            if owner_belongs_to(conn, &record.owner_id, target, pending_promotions)? {
                kept.push(record);
            } else {
                warn!(
                    record_id = %record.record_id,
                    owner_id = %record.owner_id,
                    partition = target.as_str(),
                    "dropping stacked deletion entry; owner left the partition"
                );
                dropped += 1;
                if !affected.contains(&target) {
                    affected.push(target);
                }
            }
        }
        *records = kept;
    }

    history.drop_empty_frames();

    if dropped == 0 {
        return Ok(None);
    }
    affected.sort();
    Ok(Some(RepairNotice {
        partitions: affected,
        dropped,
    }))
}

pub(crate) fn owner_belongs_to(
    conn: &Connection,
    owner_id: &str,
    partition: Partition,
    pending_promotions: &HashSet<String>,
) -> anyhow::Result<bool> {
    if pending_promotions.contains(owner_id) {
        return Ok(false);
    }
    let owner = store::find_owner(conn, owner_id)?;
    Ok(matches!(owner, Some(o) if o.active_partition == Some(partition)))
}
