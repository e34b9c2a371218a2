use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;

use crate::history::DeleteScope;
use crate::model::{Partition, Record};

/// Typed change notifications. Payloads carry stable identifiers, never
/// row indices; index translation happens inside the view that owns a
/// partition's display.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    RowsDeleted {
        partition: Partition,
        record_ids: Vec<String>,
        scope: DeleteScope,
    },
    #[serde(rename_all = "camelCase")]
    RowsRestored {
        partition: Partition,
        records: Vec<Record>,
    },
    #[serde(rename_all = "camelCase")]
    CellEdited {
        record_id: String,
        partition: Partition,
        field: String,
        new_value: String,
    },
    #[serde(rename_all = "camelCase")]
    OwnerRenamed { owner_id: String, new_name: String },
    #[serde(rename_all = "camelCase")]
    OwnerPromoted {
        owner_id: String,
        from: Partition,
        to: Option<Partition>,
        record_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    TeacherRenamed {
        partition: Partition,
        old_name: String,
        new_name: String,
        record_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubjectRenamed {
        partition: Partition,
        old_name: String,
        new_name: String,
        record_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    RepairPerformed {
        partitions: Vec<Partition>,
        dropped: usize,
    },
    #[serde(rename_all = "camelCase")]
    PartitionReloaded { partition: Partition },
    #[serde(rename_all = "camelCase")]
    RestoreProgress {
        partition: Partition,
        processed: usize,
        total: usize,
    },
    #[serde(rename_all = "camelCase")]
    RestoreCompleted {
        partition: Partition,
        restored: usize,
    },
    #[serde(rename_all = "camelCase")]
    RestoreDismissed { partition: Partition },
}

/// Publish/subscribe bus. Each subscriber gets its own channel, so
/// delivery is FIFO per subscriber with no ordering guarantee across
/// subscribers. Publishers never know who is listening.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<Event>>>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Clones the event to every live subscriber and prunes the ones that
    /// hung up.
    pub fn publish(&self, event: Event) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_out_is_fifo_per_subscriber() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(Event::OwnerRenamed {
            owner_id: "o1".to_string(),
            new_name: "First".to_string(),
        });
        bus.publish(Event::OwnerRenamed {
            owner_id: "o1".to_string(),
            new_name: "Second".to_string(),
        });

        for rx in [a, b] {
            let names: Vec<String> = rx
                .try_iter()
                .map(|e| match e {
                    Event::OwnerRenamed { new_name, .. } => new_name,
                    other => panic!("unexpected event: {other:?}"),
                })
                .collect();
            assert_eq!(names, vec!["First".to_string(), "Second".to_string()]);
        }
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.publish(Event::PartitionReloaded {
            partition: Partition::Class1,
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
