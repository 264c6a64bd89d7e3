//! Notification engine: subscriber index and per-client MODIFIED_QUEUE
//! (component F).
//!
//! Subscriptions are keyed by the Storage slot, not the handle a client
//! registered through: the notification list lives on the Storage, so every
//! alias of the same Storage shares one subscriber set.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use varserver_types::{ClientId, NotificationKind, NotifyQueueRecord, StorageRef, VarError, VarResult};

#[derive(Default)]
pub struct NotifyRegistry {
    subscribers: FxHashMap<(StorageRef, NotificationKind), Vec<ClientId>>,
    queues: FxHashMap<ClientId, VecDeque<NotifyQueueRecord>>,
    queue_cap: usize,
}

impl NotifyRegistry {
    pub fn new(queue_cap: usize) -> Self {
        NotifyRegistry {
            subscribers: FxHashMap::default(),
            queues: FxHashMap::default(),
            queue_cap,
        }
    }

    /// NOTIFY: CALC/VALIDATE/PRINT grant exclusive ownership; a second client
    /// registering the same exclusive kind on the same Storage gets NOT_SUPPORTED.
    pub fn register(
        &mut self,
        storage_ref: StorageRef,
        kind: NotificationKind,
        client: ClientId,
    ) -> VarResult<()> {
        let subs = self.subscribers.entry((storage_ref, kind)).or_default();
        if kind.is_exclusive() {
            if subs.iter().any(|&c| c != client) {
                return Err(VarError::NotSupported);
            }
            if !subs.contains(&client) {
                subs.push(client);
            }
        } else if !subs.contains(&client) {
            subs.push(client);
        }
        Ok(())
    }

    pub fn cancel(&mut self, storage_ref: StorageRef, kind: NotificationKind, client: ClientId) {
        if let Some(subs) = self.subscribers.get_mut(&(storage_ref, kind)) {
            subs.retain(|&c| c != client);
        }
    }

    pub fn subscribers(&self, storage_ref: StorageRef, kind: NotificationKind) -> Vec<ClientId> {
        self.subscribers.get(&(storage_ref, kind)).cloned().unwrap_or_default()
    }

    /// Drop every subscription and queued data belonging to a closed client.
    pub fn remove_client(&mut self, client: ClientId) {
        for subs in self.subscribers.values_mut() {
            subs.retain(|&c| c != client);
        }
        self.queues.remove(&client);
    }

    pub fn enqueue(&mut self, client: ClientId, record: NotifyQueueRecord) {
        let queue = self.queues.entry(client).or_default();
        if queue.len() >= self.queue_cap {
            queue.pop_front();
        }
        queue.push_back(record);
    }

    pub fn drain(&mut self, client: ClientId) -> Vec<NotifyQueueRecord> {
        self.queues.get_mut(&client).map(|q| q.drain(..).collect()).unwrap_or_default()
    }
}
