//! `VarServer`: the crate's public entry point, wrapping [`Engine`] with the
//! session bookkeeping a caller needs without reaching into its internals.
//! Integration tests drive the broker exclusively through this type.

use varserver_types::{ClientId, NotifyQueueRecord, RequestKind, VarResult};

use crate::dispatch::{Engine, HandlerOutcome, Orphaned, Request, Response};

pub struct VarServer {
    engine: Engine,
}

impl VarServer {
    pub fn new(max_variables: usize, notify_queue_len: usize) -> Self {
        VarServer { engine: Engine::new(max_variables, notify_queue_len) }
    }

    /// OPEN: register a client session before any request made on its behalf.
    pub fn open_session(&mut self, credentials: Vec<u32>, requested_len: usize) -> VarResult<ClientId> {
        self.engine.open_session(credentials, requested_len)
    }

    pub fn close_session(&mut self, client: ClientId) -> Vec<Orphaned> {
        self.engine.client_closed(client)
    }

    pub fn dispatch(
        &mut self,
        client: ClientId,
        credentials: &[u32],
        request: Request,
    ) -> VarResult<HandlerOutcome> {
        self.engine.dispatch(client, credentials, request)
    }

    /// Responses queued outside a request/response pair: an accepted
    /// VALIDATE or a CALC round trip resolving with its computed value.
    pub fn drain_pushes(&mut self) -> Vec<(ClientId, Response)> {
        self.engine.drain_pushes()
    }

    pub fn drain_queue(&mut self, client: ClientId) -> Vec<NotifyQueueRecord> {
        self.engine.drain_queue(client)
    }

    pub fn modified_subscribers(&self, handle: varserver_types::Handle) -> Vec<ClientId> {
        self.engine.modified_subscribers(handle)
    }

    pub fn invocation_count(&self, kind: RequestKind) -> u64 {
        self.engine.invocation_count(kind)
    }

    pub fn get(&self, handle: varserver_types::Handle, credentials: &[u32]) -> VarResult<varserver_types::Value> {
        self.engine.registry.get(handle, credentials)
    }

    pub fn flags_of(&self, handle: varserver_types::Handle) -> VarResult<varserver_types::VariableFlags> {
        self.engine.registry.flags_of(handle)
    }
}
