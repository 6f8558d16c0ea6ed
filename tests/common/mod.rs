//! Scripted in-memory driver for exercising the multiplexer without a server.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use sql_multiplex::driver::{Connector, NativeConnection, ResultPoll};
use sql_multiplex::{
    ConnStatus, ConnectTarget, Interest, MultiplexConfig, PollPhase, QueryResult,
    SqlMultiplexError,
};

/// Behaviour shared by every connection the connector hands out.
#[derive(Debug, Default)]
pub struct MockServer {
    /// `Reading` polls each handshake goes through before `Ok`
    pub connect_polls: usize,
    /// Handshakes end in `Failed`
    pub fail_connect: bool,
    /// `connect_start` refuses to create a handle
    pub refuse_connect: bool,
    /// Readiness waits time out while set
    pub stalled: bool,
    /// `consume_input` calls a query needs before its results arrive
    pub busy_consumes: usize,
    /// Canned results by exact SQL text; unknown SQL echoes itself in one row
    pub responses: HashMap<String, Vec<QueryResult>>,
    /// Every statement sent, in order
    pub sent: Vec<String>,
    /// Connection ids whose status reads `Bad`
    pub broken: HashSet<usize>,
    /// Connection ids that have not been dropped
    pub live: HashSet<usize>,
    /// Connection ids currently executing a statement, with the statement
    pub running: HashMap<usize, String>,
    pub connects: usize,
    pub error_message: String,
}

impl MockServer {
    pub fn respond(&mut self, sql: &str, results: Vec<QueryResult>) {
        self.responses.insert(sql.to_string(), results);
    }

    /// Mark whichever connection runs `sql` as broken.
    pub fn break_running(&mut self, sql: &str, message: &str) -> bool {
        let Some(id) = self
            .running
            .iter()
            .find_map(|(id, s)| (s == sql).then_some(*id))
        else {
            return false;
        };
        self.broken.insert(id);
        self.error_message = message.to_string();
        true
    }

    fn results_for(&self, sql: &str) -> Vec<QueryResult> {
        self.responses.get(sql).cloned().unwrap_or_else(|| {
            vec![QueryResult::tuples(
                vec!["echo".to_string()],
                vec![vec![Some(sql.to_string())]],
            )]
        })
    }
}

pub type Shared = Rc<RefCell<MockServer>>;

pub fn server() -> Shared {
    Rc::new(RefCell::new(MockServer::default()))
}

pub struct MockConnector {
    pub server: Shared,
}

impl MockConnector {
    pub fn new(server: &Shared) -> Self {
        Self {
            server: Rc::clone(server),
        }
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    fn connect_start(
        &mut self,
        target: &ConnectTarget,
    ) -> Result<MockConnection, SqlMultiplexError> {
        let mut srv = self.server.borrow_mut();
        if srv.refuse_connect {
            return Err(SqlMultiplexError::AllocError(format!(
                "out of memory connecting to {target}"
            )));
        }
        srv.connects += 1;
        let id = srv.connects;
        srv.live.insert(id);
        Ok(MockConnection {
            id,
            server: Rc::clone(&self.server),
            polls_left: srv.connect_polls,
            connected: false,
            results: None,
            consumes_left: 0,
        })
    }
}

pub struct MockConnection {
    pub id: usize,
    server: Shared,
    polls_left: usize,
    connected: bool,
    results: Option<VecDeque<QueryResult>>,
    consumes_left: usize,
}

impl NativeConnection for MockConnection {
    fn status(&self) -> ConnStatus {
        if self.server.borrow().broken.contains(&self.id) {
            ConnStatus::Bad
        } else if self.connected {
            ConnStatus::Ok
        } else {
            ConnStatus::Pending
        }
    }

    fn wait_ready(
        &mut self,
        _interest: Interest,
        _timeout: Duration,
    ) -> Result<bool, SqlMultiplexError> {
        Ok(!self.server.borrow().stalled)
    }

    fn connect_poll(&mut self) -> PollPhase {
        let srv = self.server.borrow();
        if srv.fail_connect {
            return PollPhase::Failed;
        }
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return PollPhase::Reading;
        }
        self.connected = true;
        PollPhase::Ok
    }

    fn send_query(&mut self, sql: &str) -> Result<(), SqlMultiplexError> {
        let mut srv = self.server.borrow_mut();
        srv.sent.push(sql.to_string());
        srv.running.insert(self.id, sql.to_string());
        self.results = Some(srv.results_for(sql).into());
        self.consumes_left = srv.busy_consumes;
        Ok(())
    }

    fn consume_input(&mut self) -> Result<(), SqlMultiplexError> {
        self.consumes_left = self.consumes_left.saturating_sub(1);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.results.is_some() && self.consumes_left > 0
    }

    fn next_result(&mut self) -> ResultPoll {
        if self.consumes_left > 0 {
            return ResultPoll::Pending;
        }
        let Some(results) = self.results.as_mut() else {
            return ResultPoll::Complete;
        };
        if let Some(result) = results.pop_front() {
            return ResultPoll::Ready(result);
        }
        self.results = None;
        self.server.borrow_mut().running.remove(&self.id);
        ResultPoll::Complete
    }

    fn error_message(&self) -> String {
        self.server.borrow().error_message.clone()
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        if let Ok(mut srv) = self.server.try_borrow_mut() {
            srv.live.remove(&self.id);
            srv.running.remove(&self.id);
        }
    }
}

pub fn config(pool_size: i64) -> MultiplexConfig {
    MultiplexConfig::new("tester", "secret", "testing", "localhost", 5432, pool_size)
        .with_poll_timeout(Duration::from_millis(1))
}

/// What a [`Recorder`] saw, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Result { index: usize, first: Option<String> },
    Retained { index: usize, rows: usize },
    Error { index: usize, message: String, sql: String },
}

pub type Log = Rc<RefCell<Vec<(u64, Event)>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Handler that records everything into a shared log, tagged with `tag`.
pub struct Recorder {
    pub tag: u64,
    pub log: Log,
    /// Keep results instead of letting them be freed
    pub keep: bool,
}

impl Recorder {
    pub fn new(tag: u64, log: &Log) -> Self {
        Self {
            tag,
            log: Rc::clone(log),
            keep: false,
        }
    }

    pub fn keeping(tag: u64, log: &Log) -> Self {
        Self {
            keep: true,
            ..Self::new(tag, log)
        }
    }
}

impl sql_multiplex::QueryHandler for Recorder {
    fn on_result(&mut self, result: &QueryResult, index: usize) -> bool {
        let first = result.as_str(0, 0).map(str::to_string);
        self.log
            .borrow_mut()
            .push((self.tag, Event::Result { index, first }));
        !self.keep
    }

    fn retain(&mut self, result: QueryResult, index: usize) {
        self.log.borrow_mut().push((
            self.tag,
            Event::Retained {
                index,
                rows: result.n_rows(),
            },
        ));
    }

    fn on_error(&mut self, message: &str, index: usize, sql: &str) {
        self.log.borrow_mut().push((
            self.tag,
            Event::Error {
                index,
                message: message.to_string(),
                sql: sql.to_string(),
            },
        ));
    }
}

/// Touch until `done` holds, failing after `limit` touches.
pub fn touch_until<C: Connector>(
    mux: &mut sql_multiplex::Multiplexer<C>,
    limit: usize,
    mut done: impl FnMut(&sql_multiplex::Multiplexer<C>) -> bool,
) -> usize {
    for n in 0..limit {
        if done(mux) {
            return n;
        }
        mux.touch();
    }
    assert!(done(mux), "condition not reached after {limit} touches");
    limit
}
