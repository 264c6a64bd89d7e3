//! Client session lifecycle: registration, credentials and work buffer
//! sizing (component K).

use rustc_hash::FxHashMap;

use varserver_types::constants::{DEFAULT_WORK_BUFFER_LEN, MAX_WORK_BUFFER_LEN};
use varserver_types::{ClientId, VarError, VarResult};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: ClientId,
    pub credentials: Vec<u32>,
    pub work_buffer_len: usize,
}

#[derive(Default)]
pub struct SessionTable {
    sessions: FxHashMap<ClientId, Session>,
    next_id: u32,
}

impl SessionTable {
    pub fn new() -> Self {
        SessionTable::default()
    }

    /// OPEN: register a new session. `requested_len` of 0 falls back to the default.
    pub fn register(&mut self, credentials: Vec<u32>, requested_len: usize) -> VarResult<ClientId> {
        let work_buffer_len = if requested_len == 0 { DEFAULT_WORK_BUFFER_LEN } else { requested_len };
        if work_buffer_len > MAX_WORK_BUFFER_LEN {
            return Err(VarError::TooBig);
        }
        self.next_id += 1;
        let id = ClientId::new(self.next_id);
        self.sessions.insert(id, Session { id, credentials, work_buffer_len });
        Ok(id)
    }

    /// CLOSE: remove a session, returning it so the caller can release
    /// whatever state it still held (subscriptions, transactions, queues).
    pub fn close(&mut self, id: ClientId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: ClientId) -> VarResult<&Session> {
        self.sessions.get(&id).ok_or(VarError::NotFound)
    }
}
