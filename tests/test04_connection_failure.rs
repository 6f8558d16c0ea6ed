mod common;

use common::{Event, MockConnector, Recorder, config, log, server, touch_until};
use sql_multiplex::prelude::*;

#[test]
fn test04_broken_connection_mid_query_detaches_request() -> Result<(), SqlMultiplexError> {
    let srv = server();
    srv.borrow_mut().busy_consumes = 5;
    let events = log();
    let mut mux = Multiplexer::new(MockConnector::new(&srv), config(1))?;

    let id = mux.submit("SELECT slow()", Recorder::new(1, &events));
    touch_until(&mut mux, 20, |m| m.queue().get(id).is_some_and(|r| r.is_assigned()));
    assert_eq!(mux.get_error(), "");

    assert!(
        srv.borrow_mut()
            .break_running("SELECT slow()", "server closed the connection unexpectedly")
    );
    assert_eq!(mux.touch(), TouchStatus::ConnectionError);
    assert_eq!(mux.get_error(), "server closed the connection unexpectedly");
    assert_eq!(mux.slot_states(), vec![SlotState::Disconnected]);
    assert_eq!(mux.ready_connections_count(), 0);
    assert!(srv.borrow().live.is_empty());

    // still queued, just no longer bound to a slot
    let request = mux.queue().get(id);
    assert!(request.is_some_and(|r| r.slot().is_none() && r.has_handler()));
    assert_eq!(mux.pending_count(), 1);
    assert!(events.borrow().is_empty());

    // the slot reconnects and the request runs on the new connection
    touch_until(&mut mux, 30, |m| m.pending_count() == 0);
    assert_eq!(srv.borrow().connects, 2);
    assert_eq!(
        events.borrow().as_slice(),
        &[(
            1,
            Event::Result {
                index: 0,
                first: Some("SELECT slow()".into())
            }
        )]
    );
    assert_eq!(mux.ready_connections_count(), 1);
    Ok(())
}

#[test]
fn test04_cancelled_request_is_not_rerun_after_break() -> Result<(), SqlMultiplexError> {
    let srv = server();
    srv.borrow_mut().busy_consumes = 5;
    let events = log();
    let mut mux = Multiplexer::new(MockConnector::new(&srv), config(1))?;

    let id = mux.submit("DELETE FROM jobs", Recorder::new(1, &events));
    touch_until(&mut mux, 20, |m| m.queue().get(id).is_some_and(|r| r.is_assigned()));
    assert_eq!(mux.cancel(id), CancelStatus::Success);

    srv.borrow_mut().break_running("DELETE FROM jobs", "connection reset by peer");
    assert_eq!(mux.touch(), TouchStatus::ConnectionError);
    assert!(mux.queue().get(id).is_none());
    assert_eq!(mux.pending_count(), 0);
    assert_eq!(mux.cancel(id), CancelStatus::NotFound);

    // the slot reconnects but has nothing to run
    for _ in 0..10 {
        mux.touch();
    }
    assert_eq!(mux.ready_connections_count(), 1);
    assert_eq!(srv.borrow().sent, vec!["DELETE FROM jobs".to_string()]);
    assert!(events.borrow().is_empty());
    Ok(())
}

#[test]
fn test04_sibling_slots_are_unaffected() -> Result<(), SqlMultiplexError> {
    let srv = server();
    srv.borrow_mut().busy_consumes = 4;
    let events = log();
    let mut mux = Multiplexer::new(MockConnector::new(&srv), config(2))?;

    let doomed = mux.submit("SELECT 'doomed'", Recorder::new(1, &events));
    let fine = mux.submit("SELECT 'fine'", Recorder::new(2, &events));
    touch_until(&mut mux, 20, |m| m.queue().iter().all(|r| r.is_assigned()));

    srv.borrow_mut().break_running("SELECT 'doomed'", "connection reset by peer");
    let statuses: Vec<TouchStatus> = (0..2).map(|_| mux.touch()).collect();
    assert!(statuses.contains(&TouchStatus::ConnectionError));
    assert_eq!(mux.ready_connections_count(), 1);
    assert!(mux.queue().get(fine).is_some_and(|r| r.is_assigned()));
    assert!(mux.queue().get(doomed).is_some_and(|r| !r.is_assigned()));

    touch_until(&mut mux, 50, |m| m.pending_count() == 0);
    let mut tags: Vec<u64> = events.borrow().iter().map(|(tag, _)| *tag).collect();
    tags.sort_unstable();
    assert_eq!(tags, vec![1, 2]);
    Ok(())
}

#[test]
fn test04_idle_connection_going_bad() -> Result<(), SqlMultiplexError> {
    let srv = server();
    let mut mux = Multiplexer::new(MockConnector::new(&srv), config(1))?;
    touch_until(&mut mux, 10, |m| m.ready_connections_count() == 1);

    {
        let mut s = srv.borrow_mut();
        s.broken.insert(1);
        s.error_message = "terminating connection due to administrator command".into();
    }
    assert_eq!(mux.touch(), TouchStatus::ConnectionError);
    assert_eq!(
        mux.get_error(),
        "terminating connection due to administrator command"
    );
    assert_eq!(mux.touch(), TouchStatus::Connecting);
    assert_eq!(mux.touch(), TouchStatus::Success);
    assert_eq!(mux.ready_connections_count(), 1);
    Ok(())
}

#[test]
fn test04_failed_handshake_is_retried() -> Result<(), SqlMultiplexError> {
    let srv = server();
    {
        let mut s = srv.borrow_mut();
        s.fail_connect = true;
        s.error_message = "password authentication failed for user \"tester\"".into();
    }
    let mut mux = Multiplexer::new(MockConnector::new(&srv), config(1))?;
    let id = mux.submit("SELECT 1", Discard);

    assert_eq!(mux.touch(), TouchStatus::Connecting);
    assert_eq!(mux.touch(), TouchStatus::ConnectionError);
    assert!(mux.get_error().contains("password authentication failed"));
    assert_eq!(mux.slot_states(), vec![SlotState::Disconnected]);
    assert!(mux.queue().get(id).is_some());

    srv.borrow_mut().fail_connect = false;
    touch_until(&mut mux, 10, |m| m.pending_count() == 0);
    assert_eq!(srv.borrow().connects, 2);
    // the message stays until a newer failure replaces it
    assert!(mux.get_error().contains("password authentication failed"));
    Ok(())
}

#[test]
fn test04_handle_allocation_failure() -> Result<(), SqlMultiplexError> {
    let srv = server();
    srv.borrow_mut().refuse_connect = true;
    let mut mux = Multiplexer::new(MockConnector::new(&srv), config(2))?;

    assert_eq!(mux.touch(), TouchStatus::AllocError);
    assert_eq!(mux.touch(), TouchStatus::AllocError);
    assert!(mux.get_error().starts_with("out of memory connecting to tester@localhost:5432"));
    assert!(mux.slot_states().iter().all(|s| *s == SlotState::Disconnected));

    srv.borrow_mut().refuse_connect = false;
    assert_eq!(mux.touch(), TouchStatus::Connecting);
    Ok(())
}

#[test]
fn test04_newest_failure_wins() -> Result<(), SqlMultiplexError> {
    let srv = server();
    let mut mux = Multiplexer::new(MockConnector::new(&srv), config(1))?;

    srv.borrow_mut().refuse_connect = true;
    assert_eq!(mux.touch(), TouchStatus::AllocError);
    let first = mux.get_error().to_string();

    {
        let mut s = srv.borrow_mut();
        s.refuse_connect = false;
        s.fail_connect = true;
        s.error_message = "could not translate host name".into();
    }
    assert_eq!(mux.touch(), TouchStatus::Connecting);
    assert_eq!(mux.touch(), TouchStatus::ConnectionError);
    assert_ne!(mux.get_error(), first);
    assert_eq!(mux.get_error(), "could not translate host name");
    Ok(())
}
