//! `ClientChannel`: the pluggable transport boundary between a client
//! process and the broker (§10.6).
//!
//! A real deployment swaps in whatever local IPC primitive the platform
//! offers (a named pipe, a UNIX socket, a shared-memory ring); what every
//! implementation must preserve is a framed request/response boundary plus a
//! wake primitive for deferred and fan-out notifications, the same shape the
//! teacher's `memory_ring` gave the Windows SECTION transport. This module
//! provides the in-process reference implementation, built on
//! `crossbeam-channel` rather than a mapped ring, used by tests and by
//! `varserverd` when run without a platform transport compiled in.

use crossbeam_channel::{unbounded, Receiver, RecvError, SendError, Sender};

use varserver_types::ClientId;

use crate::dispatch::{Request, Response};

/// One inbound unit of work: a request from `client`, or that client
/// closing its session.
pub enum Envelope {
    Request { client: ClientId, credentials: Vec<u32>, request: Request },
    Close { client: ClientId },
}

/// Server-side handle used to push a response or a fan-out wakeup back to
/// one client.
#[derive(Clone)]
pub struct ClientReplyHandle {
    to_client: Sender<Response>,
}

impl ClientReplyHandle {
    pub fn reply(&self, response: Response) -> Result<(), SendError<Response>> {
        self.to_client.send(response)
    }
}

/// Client-side handle: send a request, block for its response.
pub struct ClientChannel {
    client: ClientId,
    to_server: Sender<Envelope>,
    from_server: Receiver<Response>,
}

impl ClientChannel {
    pub fn id(&self) -> ClientId {
        self.client
    }

    pub fn call(&self, credentials: Vec<u32>, request: Request) -> Result<Response, RecvError> {
        let _ = self.to_server.send(Envelope::Request { client: self.client, credentials, request });
        self.from_server.recv()
    }

    /// Receive a notification pushed outside of a request/response pair
    /// (MODIFIED fan-out, a deferred transaction's eventual resolution).
    pub fn recv_push(&self) -> Result<Response, RecvError> {
        self.from_server.recv()
    }
}

impl Drop for ClientChannel {
    fn drop(&mut self) {
        let _ = self.to_server.send(Envelope::Close { client: self.client });
    }
}

/// Server-side entry point: the one queue every client's requests funnel
/// into, matching the single-threaded serialization point in the engine.
pub struct Listener {
    inbox: Receiver<Envelope>,
    inbox_tx: Sender<Envelope>,
}

impl Listener {
    pub fn new() -> Self {
        let (inbox_tx, inbox) = unbounded();
        Listener { inbox, inbox_tx }
    }

    pub fn recv(&self) -> Result<Envelope, RecvError> {
        self.inbox.recv()
    }

    /// Wire up the transport side of a client session. `client` must come
    /// from `Engine::open_session`/`SessionTable::register`, not be invented
    /// here: the listener only plumbs channels, it doesn't assign identity.
    pub fn connect(&self, client: ClientId) -> (ClientChannel, ClientReplyHandle) {
        let (to_client, from_server) = unbounded();
        let channel = ClientChannel {
            client,
            to_server: self.inbox_tx.clone(),
            from_server,
        };
        (channel, ClientReplyHandle { to_client })
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener::new()
    }
}
