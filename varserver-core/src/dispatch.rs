//! Request dispatcher: fixed request-kind table driving the registry,
//! notification engine, transaction table and search engine (component J).
//!
//! A handler either completes immediately ([`HandlerOutcome::Done`]) or, when
//! a handle has a registered CALC/VALIDATE/PRINT subscriber, defers to that
//! subscriber and returns [`HandlerOutcome::Deferred`]. `IN_PROGRESS` from
//! the source taxonomy never surfaces as an error: it is this enum's
//! `Deferred` arm instead. TRIGGER variables are the one exception: their
//! `Set` bypasses VALIDATE deferral entirely (see the `Set` branch below).

use rustc_hash::FxHashMap;

use varserver_types::constants::DEFAULT_NOTIFY_RECORD_LEN;
use varserver_types::{
    ClientId, Handle, NotificationKind, RequestKind, TagSet, TransactionId, Value, ValueType,
    VariableFlags, VariableInfo, VarError, VarResult, WriteOutcome,
};

use crate::blocked::BlockedSet;
use crate::notify::NotifyRegistry;
use crate::registry::Registry;
use crate::search::{SearchEngine, SearchQuery};
use crate::session::SessionTable;
use crate::transaction::TransactionTable;

#[derive(Debug, Clone)]
pub enum Request {
    Echo { payload: Vec<u8> },
    New { name: String, instance_id: u32, initial: Value, capacity: usize },
    Find { name: String, instance_id: u32 },
    Get { handle: Handle },
    Set { handle: Handle, value: Value },
    Type { handle: Handle },
    Name { handle: Handle },
    Length { handle: Handle },
    GetFlags { handle: Handle },
    GetInfo { handle: Handle },
    GetAliases { handle: Handle },
    SetTags { handle: Handle, tags: TagSet },
    Notify { handle: Handle, kind: NotificationKind },
    NotifyCancel { handle: Handle, kind: NotificationKind },
    GetValidationRequest { transaction: TransactionId },
    SendValidationResponse { transaction: TransactionId, accept: bool },
    OpenPrintSession { handle: Handle },
    ClosePrintSession { transaction: TransactionId },
    Print { handle: Handle },
    GetFirst { query: SearchQuery },
    GetNext,
    Alias { handle: Handle, alias_name: String, instance_id: u32 },
    SetFlags { handle: Handle, flags: VariableFlags },
    ClearFlags { handle: Handle, flags: VariableFlags },
}

impl Request {
    /// The fixed table entry this request dispatches through, used to key
    /// the per-kind invocation counters (§4.6).
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Echo { .. } => RequestKind::Echo,
            Request::New { .. } => RequestKind::New,
            Request::Find { .. } => RequestKind::Find,
            Request::Get { .. } => RequestKind::Get,
            Request::Set { .. } => RequestKind::Set,
            Request::Type { .. } => RequestKind::Type,
            Request::Name { .. } => RequestKind::Name,
            Request::Length { .. } => RequestKind::Length,
            Request::GetFlags { .. } => RequestKind::GetFlags,
            Request::GetInfo { .. } => RequestKind::GetInfo,
            Request::GetAliases { .. } => RequestKind::GetAliases,
            Request::SetTags { .. } => RequestKind::SetTags,
            Request::Notify { .. } => RequestKind::Notify,
            Request::NotifyCancel { .. } => RequestKind::NotifyCancel,
            Request::GetValidationRequest { .. } => RequestKind::GetValidationRequest,
            Request::SendValidationResponse { .. } => RequestKind::SendValidationResponse,
            Request::OpenPrintSession { .. } => RequestKind::OpenPrintSession,
            Request::ClosePrintSession { .. } => RequestKind::ClosePrintSession,
            Request::Print { .. } => RequestKind::Print,
            Request::GetFirst { .. } => RequestKind::GetFirst,
            Request::GetNext => RequestKind::GetNext,
            Request::Alias { .. } => RequestKind::Alias,
            Request::SetFlags { .. } => RequestKind::SetFlags,
            Request::ClearFlags { .. } => RequestKind::ClearFlags,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Unit,
    Handle(Handle),
    Value(Value),
    Type(ValueType),
    Name(String),
    Length(usize),
    Flags(VariableFlags),
    Info(Box<VariableInfo>),
    Aliases(Vec<Handle>),
    Echo(Vec<u8>),
    Search(Option<Handle>),
    ValidationRequest { handle: Handle, proposed: Value },
    PrintTarget { handler: ClientId, formatted: String },
}

#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    Done(Response),
    Deferred(TransactionId),
}

/// Resolution delivered to a blocked requester when its handler's session
/// closes before completing the transaction.
pub struct Orphaned {
    pub requester: ClientId,
    pub error: VarError,
}

pub struct Engine {
    pub registry: Registry,
    notify: NotifyRegistry,
    transactions: TransactionTable,
    blocked: BlockedSet,
    search: SearchEngine,
    sessions: SessionTable,
    pending_pushes: Vec<(ClientId, Response)>,
    invocation_counts: FxHashMap<RequestKind, u64>,
}

impl Engine {
    pub fn new(max_variables: usize, notify_queue_len: usize) -> Self {
        Engine {
            registry: Registry::new(max_variables),
            notify: NotifyRegistry::new(notify_queue_len),
            transactions: TransactionTable::new(),
            blocked: BlockedSet::new(),
            search: SearchEngine::new(),
            sessions: SessionTable::new(),
            pending_pushes: Vec::new(),
            invocation_counts: FxHashMap::default(),
        }
    }

    /// OPEN: register a new client session (component K) ahead of any
    /// dispatch call made on its behalf.
    pub fn open_session(&mut self, credentials: Vec<u32>, requested_len: usize) -> VarResult<ClientId> {
        let id = self.sessions.register(credentials, requested_len)?;
        *self.invocation_counts.entry(RequestKind::Open).or_default() += 1;
        Ok(id)
    }

    /// Responses queued outside the normal request/response round trip: an
    /// accepted VALIDATE or a resolved CALC delivering its value back to the
    /// requester that was parked in [`HandlerOutcome::Deferred`].
    pub fn drain_pushes(&mut self) -> Vec<(ClientId, Response)> {
        std::mem::take(&mut self.pending_pushes)
    }

    pub fn invocation_count(&self, kind: RequestKind) -> u64 {
        self.invocation_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn dispatch(
        &mut self,
        client: ClientId,
        credentials: &[u32],
        request: Request,
    ) -> VarResult<HandlerOutcome> {
        *self.invocation_counts.entry(request.kind()).or_default() += 1;
        match request {
            Request::Echo { payload } => Ok(HandlerOutcome::Done(Response::Echo(payload))),

            Request::New { name, instance_id, initial, capacity } => {
                let handle = self.registry.new_variable(&name, instance_id, initial, capacity)?;
                Ok(HandlerOutcome::Done(Response::Handle(handle)))
            }

            Request::Find { name, instance_id } => {
                let handle = self.registry.find(&name, instance_id).ok_or(VarError::NotFound)?;
                Ok(HandlerOutcome::Done(Response::Handle(handle)))
            }

            Request::Get { handle } => {
                self.registry.check_read(handle, credentials)?;
                if let Some(txn) =
                    self.defer_to_handler(handle, NotificationKind::Calc, client, None, credentials)?
                {
                    return Ok(HandlerOutcome::Deferred(txn));
                }
                let value = self.registry.get(handle, credentials)?;
                Ok(HandlerOutcome::Done(Response::Value(value)))
            }

            Request::Set { handle, value } => {
                self.registry.check_write(handle, credentials)?;
                let flags = self.registry.flags_of(handle)?;
                if flags.contains(VariableFlags::TRIGGER) {
                    // TRIGGER is an event channel, not persistent state: it
                    // bypasses VALIDATE deferral, always fires MODIFIED/
                    // MODIFIED_QUEUE even when the value is unchanged, and
                    // never sets DIRTY.
                    self.registry.force_set(handle, value.clone(), credentials)?;
                    self.audit_if_flagged(handle, client, &value);
                    self.fanout_modified(handle, &value);
                    self.resolve_calc_waiters(handle, &value)?;
                    return Ok(HandlerOutcome::Done(Response::Value(value)));
                }
                if let Some(txn) = self.defer_to_handler(
                    handle,
                    NotificationKind::Validate,
                    client,
                    Some(value.clone()),
                    credentials,
                )? {
                    return Ok(HandlerOutcome::Deferred(txn));
                }
                let outcome = self.registry.set(handle, value.clone(), credentials)?;
                if outcome == WriteOutcome::Written {
                    self.audit_if_flagged(handle, client, &value);
                    self.fanout_modified(handle, &value);
                }
                self.resolve_calc_waiters(handle, &value)?;
                Ok(HandlerOutcome::Done(Response::Value(value)))
            }

            Request::Type { handle } => {
                self.registry.check_read(handle, credentials)?;
                let ty = self.registry.storage(handle)?.value.value_type();
                Ok(HandlerOutcome::Done(Response::Type(ty)))
            }

            Request::Name { handle } => {
                self.registry.check_read(handle, credentials)?;
                let name = self.registry.name_of(handle)?.to_string();
                Ok(HandlerOutcome::Done(Response::Name(name)))
            }

            Request::Length { handle } => {
                self.registry.check_read(handle, credentials)?;
                let len = self.registry.storage(handle)?.value.byte_len();
                Ok(HandlerOutcome::Done(Response::Length(len)))
            }

            Request::GetFlags { handle } => {
                self.registry.check_read(handle, credentials)?;
                let flags = self.registry.flags_of(handle)?;
                Ok(HandlerOutcome::Done(Response::Flags(flags)))
            }

            Request::GetInfo { handle } => {
                self.registry.check_read(handle, credentials)?;
                let info = self.registry.info_of(handle)?;
                Ok(HandlerOutcome::Done(Response::Info(Box::new(info))))
            }

            Request::GetAliases { handle } => {
                self.registry.check_read(handle, credentials)?;
                let aliases = self.registry.aliases_of(handle)?;
                if aliases.len() <= 1 {
                    return Err(VarError::NotFound);
                }
                Ok(HandlerOutcome::Done(Response::Aliases(aliases)))
            }

            Request::SetTags { handle, tags } => {
                self.registry.set_tags(handle, tags)?;
                Ok(HandlerOutcome::Done(Response::Unit))
            }

            Request::Notify { handle, kind } => {
                let storage_ref = self.registry.storage_ref_of(handle)?;
                self.notify.register(storage_ref, kind, client)?;
                Ok(HandlerOutcome::Done(Response::Unit))
            }

            Request::NotifyCancel { handle, kind } => {
                let storage_ref = self.registry.storage_ref_of(handle)?;
                self.notify.cancel(storage_ref, kind, client);
                Ok(HandlerOutcome::Done(Response::Unit))
            }

            Request::GetValidationRequest { transaction } => {
                let txn = self.transactions.peek(transaction)?;
                let proposed = txn.request_value.clone().ok_or(VarError::NotFound)?;
                Ok(HandlerOutcome::Done(Response::ValidationRequest { handle: txn.handle, proposed }))
            }

            Request::SendValidationResponse { transaction, accept } => {
                let txn = self.transactions.take(transaction)?;
                let storage_ref = self.registry.storage_ref_of(txn.handle)?;
                self.blocked.unblock(storage_ref, txn.kind, transaction);
                if accept {
                    if let Some(value) = txn.request_value {
                        match self.registry.set(txn.handle, value.clone(), &txn.requester_credentials) {
                            Ok(outcome) => {
                                if outcome == WriteOutcome::Written {
                                    self.fanout_modified(txn.handle, &value);
                                }
                                self.resolve_calc_waiters(txn.handle, &value)?;
                                self.pending_pushes.push((txn.requester, Response::Value(value)));
                            }
                            Err(_) => {
                                self.pending_pushes.push((txn.requester, Response::Unit));
                            }
                        }
                    }
                } else {
                    self.pending_pushes.push((txn.requester, Response::Unit));
                }
                Ok(HandlerOutcome::Done(Response::Unit))
            }

            Request::OpenPrintSession { handle } => {
                let storage_ref = self.registry.storage_ref_of(handle)?;
                let handlers = self.notify.subscribers(storage_ref, NotificationKind::Print);
                let handler = *handlers.first().ok_or(VarError::NotSupported)?;
                let txn = self.transactions.open(
                    handle,
                    NotificationKind::Print,
                    client,
                    handler,
                    None,
                    credentials.to_vec(),
                );
                self.blocked.block(storage_ref, NotificationKind::Print, txn);
                Ok(HandlerOutcome::Deferred(txn))
            }

            Request::ClosePrintSession { transaction } => {
                let txn = self.transactions.take(transaction)?;
                let storage_ref = self.registry.storage_ref_of(txn.handle)?;
                self.blocked.unblock(storage_ref, txn.kind, transaction);
                Ok(HandlerOutcome::Done(Response::Unit))
            }

            Request::Print { handle } => {
                self.registry.check_read(handle, credentials)?;
                let storage_ref = self.registry.storage_ref_of(handle)?;
                let handlers = self.notify.subscribers(storage_ref, NotificationKind::Print);
                if let Some(&handler) = handlers.first() {
                    let txn = self.transactions.open(
                        handle,
                        NotificationKind::Print,
                        client,
                        handler,
                        None,
                        credentials.to_vec(),
                    );
                    self.blocked.block(storage_ref, NotificationKind::Print, txn);
                    return Ok(HandlerOutcome::Deferred(txn));
                }
                let value = self.registry.get(handle, credentials)?;
                let formatted = if self.registry.flags_of(handle)?.contains(VariableFlags::PASSWORD) {
                    "********".to_string()
                } else {
                    format_value(&value)
                };
                Ok(HandlerOutcome::Done(Response::PrintTarget { handler: client, formatted }))
            }

            Request::GetFirst { query } => {
                let found = self.search.get_first(client, query, &self.registry)?;
                Ok(HandlerOutcome::Done(Response::Search(found)))
            }

            Request::GetNext => {
                let found = self.search.get_next(client, &self.registry)?;
                Ok(HandlerOutcome::Done(Response::Search(found)))
            }

            Request::Alias { handle, alias_name, instance_id } => {
                match self.registry.find(&alias_name, instance_id) {
                    None => {
                        let alias = self.registry.alias(handle, &alias_name, instance_id)?;
                        Ok(HandlerOutcome::Done(Response::Handle(alias)))
                    }
                    Some(existing) => {
                        // Move: refuse if the exclusive CALC/VALIDATE/PRINT
                        // kinds are double-booked between the old and new
                        // Storage (invariant 8.1 #9).
                        let existing_ref = self.registry.storage_ref_of(existing)?;
                        let handle_ref = self.registry.storage_ref_of(handle)?;
                        for kind in
                            [NotificationKind::Calc, NotificationKind::Validate, NotificationKind::Print]
                        {
                            let old_has = !self.notify.subscribers(existing_ref, kind).is_empty();
                            let new_has = !self.notify.subscribers(handle_ref, kind).is_empty();
                            if old_has && new_has {
                                return Err(VarError::NotSupported);
                            }
                        }
                        self.registry.move_alias(existing, handle)?;
                        Ok(HandlerOutcome::Done(Response::Handle(existing)))
                    }
                }
            }

            Request::SetFlags { handle, flags } => {
                self.registry.set_flags(handle, flags)?;
                Ok(HandlerOutcome::Done(Response::Unit))
            }

            Request::ClearFlags { handle, flags } => {
                self.registry.clear_flags(handle, flags)?;
                Ok(HandlerOutcome::Done(Response::Unit))
            }
        }
    }

    /// Queue a CALC/VALIDATE transaction against `handle`'s registered
    /// exclusive handler, if one is registered for `kind`. Returns `None`
    /// when the request should proceed through the normal synchronous path.
    fn defer_to_handler(
        &mut self,
        handle: Handle,
        kind: NotificationKind,
        requester: ClientId,
        request_value: Option<Value>,
        requester_credentials: &[u32],
    ) -> VarResult<Option<TransactionId>> {
        let storage_ref = self.registry.storage_ref_of(handle)?;
        let handlers = self.notify.subscribers(storage_ref, kind);
        let Some(&handler) = handlers.first() else {
            return Ok(None);
        };
        let txn = self.transactions.open(
            handle,
            kind,
            requester,
            handler,
            request_value,
            requester_credentials.to_vec(),
        );
        self.blocked.block(storage_ref, kind, txn);
        Ok(Some(txn))
    }

    /// Release every CALC-blocked requester on `handle`'s Storage with the
    /// value just written, resolving the round trip a deferred Get started.
    fn resolve_calc_waiters(&mut self, handle: Handle, value: &Value) -> VarResult<()> {
        let storage_ref = self.registry.storage_ref_of(handle)?;
        let ids = self.blocked.unblock_all(storage_ref, NotificationKind::Calc);
        for id in ids {
            if let Ok(txn) = self.transactions.take(id) {
                self.pending_pushes.push((txn.requester, Response::Value(value.clone())));
            }
        }
        Ok(())
    }

    /// Log a write to an AUDIT-flagged variable with a timestamp, independent
    /// of the server's own request-processing log lines.
    fn audit_if_flagged(&self, handle: Handle, client: ClientId, value: &Value) {
        let Ok(flags) = self.registry.flags_of(handle) else { return };
        if !flags.contains(VariableFlags::AUDIT) {
            return;
        }
        let name = self.registry.name_of(handle).unwrap_or("<unknown>");
        log::info!(
            "[audit] {} client={client} variable={name} value={value:?}",
            chrono::Utc::now().to_rfc3339(),
        );
    }

    fn fanout_modified(&mut self, handle: Handle, value: &Value) {
        let Ok(storage_ref) = self.registry.storage_ref_of(handle) else { return };
        let direct = self.notify.subscribers(storage_ref, NotificationKind::Modified);
        let _ = direct; // delivery is the transport/session layer's responsibility

        let queued = self.notify.subscribers(storage_ref, NotificationKind::ModifiedQueue);
        if queued.is_empty() {
            return;
        }
        let record = varserver_types::NotifyQueueRecord::new(handle, value, DEFAULT_NOTIFY_RECORD_LEN);
        for client in queued {
            self.notify.enqueue(client, record.clone());
        }
    }

    /// MODIFIED subscribers that should be woken after a successful Set; the
    /// session layer owns actually signaling them through their channel.
    pub fn modified_subscribers(&self, handle: Handle) -> Vec<ClientId> {
        let Ok(storage_ref) = self.registry.storage_ref_of(handle) else { return Vec::new() };
        self.notify.subscribers(storage_ref, NotificationKind::Modified)
    }

    pub fn drain_queue(&mut self, client: ClientId) -> Vec<varserver_types::NotifyQueueRecord> {
        self.notify.drain(client)
    }

    /// Drop a client's subscriptions, search context and session, and
    /// resolve any transaction where it was the handler with
    /// NO_SUCH_PROCESS for the waiting requester.
    pub fn client_closed(&mut self, client: ClientId) -> Vec<Orphaned> {
        *self.invocation_counts.entry(RequestKind::Close).or_default() += 1;
        self.notify.remove_client(client);
        self.search.cancel(client);
        self.sessions.close(client);
        let orphaned = self.transactions.orphan_by_handler(client);
        orphaned
            .into_iter()
            .filter_map(|txn| {
                let storage_ref = self.registry.storage_ref_of(txn.handle).ok()?;
                self.blocked.unblock_all(storage_ref, txn.kind);
                Some(Orphaned { requester: txn.requester, error: VarError::NoSuchProcess })
            })
            .collect()
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::U16(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::Str(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
        Value::Invalid => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_defers_to_validate_handler() {
        let mut engine = Engine::new(16, 8);
        let owner = ClientId::new(1);
        let writer = ClientId::new(2);

        let handle = engine
            .dispatch(owner, &[], Request::New {
                name: "/sys/temp".into(),
                instance_id: 0,
                initial: Value::I32(0),
                capacity: 16,
            })
            .unwrap();
        let handle = match handle {
            HandlerOutcome::Done(Response::Handle(h)) => h,
            _ => panic!("expected handle"),
        };
        engine
            .dispatch(owner, &[], Request::Notify { handle, kind: NotificationKind::Validate })
            .unwrap();

        let outcome = engine
            .dispatch(writer, &[], Request::Set { handle, value: Value::I32(42) })
            .unwrap();
        let txn = match outcome {
            HandlerOutcome::Deferred(id) => id,
            _ => panic!("expected deferred outcome"),
        };

        let response = engine
            .dispatch(owner, &[], Request::SendValidationResponse { transaction: txn, accept: true })
            .unwrap();
        assert!(matches!(response, HandlerOutcome::Done(Response::Unit)));
        assert_eq!(engine.registry.get(handle, &[]), Ok(Value::I32(42)));
    }

    #[test]
    fn trigger_variable_bypasses_validate_deferral_and_fires_on_unchanged_write() {
        let mut engine = Engine::new(16, 8);
        let owner = ClientId::new(1);
        let writer = ClientId::new(2);
        let listener = ClientId::new(3);

        let handle = match engine
            .dispatch(owner, &[], Request::New {
                name: "/sys/trig".into(),
                instance_id: 0,
                initial: Value::I32(0),
                capacity: 16,
            })
            .unwrap()
        {
            HandlerOutcome::Done(Response::Handle(h)) => h,
            _ => panic!("expected handle"),
        };
        engine.registry.set_flags(handle, VariableFlags::TRIGGER).unwrap();
        engine
            .dispatch(owner, &[], Request::Notify { handle, kind: NotificationKind::Validate })
            .unwrap();
        engine
            .dispatch(listener, &[], Request::Notify { handle, kind: NotificationKind::ModifiedQueue })
            .unwrap();

        // Same value as the current contents: a plain write would short-circuit
        // to `Already` and fire nothing, but TRIGGER must still notify.
        let outcome = engine
            .dispatch(writer, &[], Request::Set { handle, value: Value::I32(0) })
            .unwrap();
        assert!(matches!(outcome, HandlerOutcome::Done(Response::Value(Value::I32(0)))));

        let queued = engine.drain_queue(listener);
        assert_eq!(queued.len(), 1);
        assert!(!engine.registry.flags_of(handle).unwrap().contains(VariableFlags::DIRTY));
    }

    #[test]
    fn password_flag_masks_direct_print() {
        let mut engine = Engine::new(16, 8);
        let owner = ClientId::new(1);

        let handle = match engine
            .dispatch(owner, &[], Request::New {
                name: "/sys/secret".into(),
                instance_id: 0,
                initial: Value::Str("hunter2".into()),
                capacity: 32,
            })
            .unwrap()
        {
            HandlerOutcome::Done(Response::Handle(h)) => h,
            _ => panic!("expected handle"),
        };
        engine.registry.set_flags(handle, VariableFlags::PASSWORD).unwrap();

        let outcome = engine.dispatch(owner, &[], Request::Print { handle }).unwrap();
        match outcome {
            HandlerOutcome::Done(Response::PrintTarget { formatted, .. }) => {
                assert_eq!(formatted, "********");
            }
            _ => panic!("expected direct print"),
        }
    }

    #[test]
    fn alias_move_reassigns_the_existing_name() {
        let mut engine = Engine::new(16, 8);
        let owner = ClientId::new(1);

        let a = match engine
            .dispatch(owner, &[], Request::New {
                name: "/a".into(),
                instance_id: 0,
                initial: Value::I32(1),
                capacity: 16,
            })
            .unwrap()
        {
            HandlerOutcome::Done(Response::Handle(h)) => h,
            _ => panic!("expected handle"),
        };
        let b = match engine
            .dispatch(owner, &[], Request::New {
                name: "/b".into(),
                instance_id: 0,
                initial: Value::I32(2),
                capacity: 16,
            })
            .unwrap()
        {
            HandlerOutcome::Done(Response::Handle(h)) => h,
            _ => panic!("expected handle"),
        };
        // Alias /c onto /a so /a's Storage has two references and a move
        // away from it won't orphan it.
        engine.dispatch(owner, &[], Request::Alias { handle: a, alias_name: "/c".into(), instance_id: 0 }).unwrap();

        let outcome = engine
            .dispatch(owner, &[], Request::Alias { handle: b, alias_name: "/a".into(), instance_id: 0 })
            .unwrap();
        assert!(matches!(outcome, HandlerOutcome::Done(Response::Handle(h)) if h == a));
        assert_eq!(engine.registry.get(a, &[]), Ok(Value::I32(2)));
    }

    #[test]
    fn alias_move_conflict_with_both_sides_having_calc_subscribers() {
        let mut engine = Engine::new(16, 8);
        let owner = ClientId::new(1);
        let handler_a = ClientId::new(2);
        let handler_b = ClientId::new(3);

        let a = match engine
            .dispatch(owner, &[], Request::New {
                name: "/a".into(),
                instance_id: 0,
                initial: Value::I32(1),
                capacity: 16,
            })
            .unwrap()
        {
            HandlerOutcome::Done(Response::Handle(h)) => h,
            _ => panic!("expected handle"),
        };
        let b = match engine
            .dispatch(owner, &[], Request::New {
                name: "/b".into(),
                instance_id: 0,
                initial: Value::I32(2),
                capacity: 16,
            })
            .unwrap()
        {
            HandlerOutcome::Done(Response::Handle(h)) => h,
            _ => panic!("expected handle"),
        };
        engine.dispatch(owner, &[], Request::Alias { handle: a, alias_name: "/c".into(), instance_id: 0 }).unwrap();
        engine.dispatch(handler_a, &[], Request::Notify { handle: a, kind: NotificationKind::Calc }).unwrap();
        engine.dispatch(handler_b, &[], Request::Notify { handle: b, kind: NotificationKind::Calc }).unwrap();

        let outcome = engine.dispatch(owner, &[], Request::Alias { handle: b, alias_name: "/a".into(), instance_id: 0 });
        assert!(matches!(outcome, Err(VarError::NotSupported)));
    }

    #[test]
    fn handler_close_resolves_blocked_requester_with_no_such_process() {
        let mut engine = Engine::new(16, 8);
        let owner = ClientId::new(1);
        let writer = ClientId::new(2);

        let handle = match engine
            .dispatch(owner, &[], Request::New {
                name: "/sys/calc".into(),
                instance_id: 0,
                initial: Value::I32(0),
                capacity: 16,
            })
            .unwrap()
        {
            HandlerOutcome::Done(Response::Handle(h)) => h,
            _ => panic!("expected handle"),
        };
        engine.dispatch(owner, &[], Request::Notify { handle, kind: NotificationKind::Calc }).unwrap();

        let outcome = engine.dispatch(writer, &[], Request::Get { handle }).unwrap();
        assert!(matches!(outcome, HandlerOutcome::Deferred(_)));

        let orphaned = engine.client_closed(owner);
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].requester, writer);
        assert_eq!(orphaned[0].error, VarError::NoSuchProcess);
    }
}
