//! Blocked-client set keyed by (Storage reference, notification kind), used
//! to find and resolve every in-flight transaction against a Storage/kind
//! pair without scanning the whole transaction table (component H).

use rustc_hash::FxHashMap;

use varserver_types::{NotificationKind, StorageRef, TransactionId};

#[derive(Default)]
pub struct BlockedSet {
    blocked: FxHashMap<(StorageRef, NotificationKind), Vec<TransactionId>>,
}

impl BlockedSet {
    pub fn new() -> Self {
        BlockedSet::default()
    }

    pub fn block(&mut self, storage_ref: StorageRef, kind: NotificationKind, txn: TransactionId) {
        self.blocked.entry((storage_ref, kind)).or_default().push(txn);
    }

    pub fn unblock(&mut self, storage_ref: StorageRef, kind: NotificationKind, txn: TransactionId) {
        if let Some(list) = self.blocked.get_mut(&(storage_ref, kind)) {
            list.retain(|&t| t != txn);
        }
    }

    /// Remove and return every transaction id blocked on this Storage/kind,
    /// used when the handler serving that kind goes away or a write resolves
    /// pending CALC callers.
    pub fn unblock_all(&mut self, storage_ref: StorageRef, kind: NotificationKind) -> Vec<TransactionId> {
        self.blocked.remove(&(storage_ref, kind)).unwrap_or_default()
    }
}
