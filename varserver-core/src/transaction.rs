//! Transaction table correlating a requester and a handler across a
//! deferred CALC/VALIDATE/PRINT round trip (component G).

use rustc_hash::FxHashMap;

use varserver_types::{ClientId, Handle, NotificationKind, TransactionId, Value, VarError, VarResult};

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub handle: Handle,
    pub kind: NotificationKind,
    pub requester: ClientId,
    pub handler: ClientId,
    /// The proposed value for VALIDATE, or the snapshot value for PRINT. CALC carries none.
    pub request_value: Option<Value>,
    /// Credentials the requester was verified against when the transaction
    /// was opened, carried forward so a later commit (e.g. an accepted
    /// VALIDATE) doesn't need to re-derive them from an unrelated caller.
    pub requester_credentials: Vec<u32>,
}

#[derive(Default)]
pub struct TransactionTable {
    next_id: u32,
    by_id: FxHashMap<TransactionId, Transaction>,
}

impl TransactionTable {
    pub fn new() -> Self {
        TransactionTable::default()
    }

    pub fn open(
        &mut self,
        handle: Handle,
        kind: NotificationKind,
        requester: ClientId,
        handler: ClientId,
        request_value: Option<Value>,
        requester_credentials: Vec<u32>,
    ) -> TransactionId {
        self.next_id += 1;
        let id = TransactionId::new(self.next_id);
        self.by_id.insert(
            id,
            Transaction {
                id,
                handle,
                kind,
                requester,
                handler,
                request_value,
                requester_credentials,
            },
        );
        id
    }

    pub fn peek(&self, id: TransactionId) -> VarResult<&Transaction> {
        self.by_id.get(&id).ok_or(VarError::NotFound)
    }

    pub fn take(&mut self, id: TransactionId) -> VarResult<Transaction> {
        self.by_id.remove(&id).ok_or(VarError::NotFound)
    }

    /// Remove and return every open transaction where `client` is the
    /// handler, used to resolve in-flight requests when that client's
    /// session closes.
    pub fn orphan_by_handler(&mut self, client: ClientId) -> Vec<Transaction> {
        let ids: Vec<TransactionId> = self
            .by_id
            .values()
            .filter(|t| t.handler == client)
            .map(|t| t.id)
            .collect();
        ids.into_iter().filter_map(|id| self.by_id.remove(&id)).collect()
    }
}
