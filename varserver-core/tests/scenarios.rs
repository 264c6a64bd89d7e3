//! End-to-end scenarios driven entirely through `VarServer`'s public API.

use varserver_core::{HandlerOutcome, Request, Response, VarServer};
use varserver_types::{ClientId, Handle, NotificationKind, TagSet, Value, VariableFlags};

fn new_var(server: &mut VarServer, owner: ClientId, name: &str, initial: Value) -> Handle {
    match server
        .dispatch(owner, &[], Request::New { name: name.into(), instance_id: 0, initial, capacity: 64 })
        .unwrap()
    {
        HandlerOutcome::Done(Response::Handle(h)) => h,
        other => panic!("expected handle, got {other:?}"),
    }
}

#[test]
fn s1_basic_lifecycle() {
    let mut server = VarServer::new(16, 8);
    let owner = server.open_session(vec![], 0).unwrap();
    let writer = server.open_session(vec![], 0).unwrap();

    let handle = new_var(&mut server, owner, "/sys/x", Value::I32(0));
    server.dispatch(owner, &[], Request::Notify { handle, kind: NotificationKind::Modified }).unwrap();

    let outcome = server.dispatch(writer, &[], Request::Set { handle, value: Value::I32(1) }).unwrap();
    assert!(matches!(outcome, HandlerOutcome::Done(Response::Value(Value::I32(1)))));

    assert_eq!(server.get(handle, &[]), Ok(Value::I32(1)));
    assert!(server.flags_of(handle).unwrap().contains(VariableFlags::DIRTY));
    assert_eq!(server.modified_subscribers(handle), vec![owner]);
}

#[test]
fn s2_validate_reject() {
    let mut server = VarServer::new(16, 8);
    let owner = server.open_session(vec![], 0).unwrap();
    let writer = server.open_session(vec![], 0).unwrap();

    let handle = new_var(&mut server, owner, "/cfg/y", Value::I32(0));
    server.dispatch(owner, &[], Request::Notify { handle, kind: NotificationKind::Validate }).unwrap();

    let outcome = server.dispatch(writer, &[], Request::Set { handle, value: Value::I32(42) }).unwrap();
    let txn = match outcome {
        HandlerOutcome::Deferred(id) => id,
        other => panic!("expected deferred outcome, got {other:?}"),
    };

    let request = server.dispatch(owner, &[], Request::GetValidationRequest { transaction: txn }).unwrap();
    match request {
        HandlerOutcome::Done(Response::ValidationRequest { proposed, .. }) => {
            assert_eq!(proposed, Value::I32(42));
        }
        other => panic!("expected validation request, got {other:?}"),
    }

    server
        .dispatch(owner, &[], Request::SendValidationResponse { transaction: txn, accept: false })
        .unwrap();

    assert_eq!(server.get(handle, &[]), Ok(Value::I32(0)));
    let pushes = server.drain_pushes();
    assert_eq!(pushes, vec![(writer, Response::Unit)]);
}

#[test]
fn s3_calc_resolves_a_blocked_get() {
    let mut server = VarServer::new(16, 8);
    let handler = server.open_session(vec![], 0).unwrap();
    let reader = server.open_session(vec![], 0).unwrap();

    let handle = new_var(&mut server, handler, "/calc/z", Value::I32(0));
    server.dispatch(handler, &[], Request::Notify { handle, kind: NotificationKind::Calc }).unwrap();

    let outcome = server.dispatch(reader, &[], Request::Get { handle }).unwrap();
    assert!(matches!(outcome, HandlerOutcome::Deferred(_)));

    server.dispatch(handler, &[], Request::Set { handle, value: Value::I32(7) }).unwrap();

    let pushes = server.drain_pushes();
    assert_eq!(pushes, vec![(reader, Response::Value(Value::I32(7)))]);
}

#[test]
fn s4_print_redirects_to_a_registered_handler() {
    let mut server = VarServer::new(16, 8);
    let handler = server.open_session(vec![], 0).unwrap();
    let caller = server.open_session(vec![], 0).unwrap();

    let handle = new_var(&mut server, handler, "/print/w", Value::Str("hello".into()));
    server.dispatch(handler, &[], Request::Notify { handle, kind: NotificationKind::Print }).unwrap();

    let outcome = server.dispatch(caller, &[], Request::Print { handle }).unwrap();
    let txn = match outcome {
        HandlerOutcome::Deferred(id) => id,
        other => panic!("expected deferred outcome, got {other:?}"),
    };

    let closed = server
        .dispatch(handler, &[], Request::ClosePrintSession { transaction: txn })
        .unwrap();
    assert!(matches!(closed, HandlerOutcome::Done(Response::Unit)));
}

#[test]
fn s5_alias_move_conflict_when_both_sides_hold_calc() {
    let mut server = VarServer::new(16, 8);
    let owner = server.open_session(vec![], 0).unwrap();
    let handler_a = server.open_session(vec![], 0).unwrap();
    let handler_b = server.open_session(vec![], 0).unwrap();

    let a = new_var(&mut server, owner, "/a", Value::I32(1));
    let b = new_var(&mut server, owner, "/b", Value::I32(2));
    // Keep /a's storage referenced by a second alias so the move doesn't
    // trip the "would orphan the old storage" check instead.
    server.dispatch(owner, &[], Request::Alias { handle: a, alias_name: "/c".into(), instance_id: 0 }).unwrap();

    server.dispatch(handler_a, &[], Request::Notify { handle: a, kind: NotificationKind::Calc }).unwrap();
    server.dispatch(handler_b, &[], Request::Notify { handle: b, kind: NotificationKind::Calc }).unwrap();

    let outcome =
        server.dispatch(owner, &[], Request::Alias { handle: b, alias_name: "/a".into(), instance_id: 0 });
    assert!(outcome.is_err());
}

#[test]
fn s6_search_by_tags_skips_hidden_variables() {
    let mut server = VarServer::new(16, 8);
    let owner = server.open_session(vec![], 0).unwrap();

    let net_a = new_var(&mut server, owner, "/a", Value::I32(0));
    let net_b = new_var(&mut server, owner, "/b", Value::I32(0));
    let net_hidden = new_var(&mut server, owner, "/c", Value::I32(0));

    for h in [net_a, net_b, net_hidden] {
        server.dispatch(owner, &[], Request::SetTags { handle: h, tags: TagSet::parse("net").unwrap() }).unwrap();
    }
    server.dispatch(owner, &[], Request::SetFlags { handle: net_hidden, flags: VariableFlags::HIDDEN }).unwrap();

    let query =
        varserver_core::search::SearchQuery { tags: Some(TagSet::parse("net").unwrap()), ..Default::default() };
    let first = match server.dispatch(owner, &[], Request::GetFirst { query }).unwrap() {
        HandlerOutcome::Done(Response::Search(found)) => found,
        other => panic!("expected search result, got {other:?}"),
    };
    assert_eq!(first, Some(net_a));
    let second = match server.dispatch(owner, &[], Request::GetNext).unwrap() {
        HandlerOutcome::Done(Response::Search(found)) => found,
        other => panic!("expected search result, got {other:?}"),
    };
    assert_eq!(second, Some(net_b));
    let third = match server.dispatch(owner, &[], Request::GetNext).unwrap() {
        HandlerOutcome::Done(Response::Search(found)) => found,
        other => panic!("expected search result, got {other:?}"),
    };
    assert_eq!(third, None);
}
