use std::borrow::Cow;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{ConnectTarget, MultiplexConfig};
use crate::dispatch::{self, DrainOutcome};
use crate::driver::{Connector, NativeConnection};
use crate::error::SqlMultiplexError;
use crate::format::{Param, format_query};
use crate::handler::QueryHandler;
use crate::pool::SlotPool;
use crate::queue::RequestQueue;
use crate::types::{CancelStatus, ConnStatus, Interest, PollPhase, SlotState, TouchStatus};

/// Runs queued SQL over a bounded pool of non-blocking connections.
///
/// Nothing happens in the background: every call to [`touch`](Self::touch)
/// advances exactly one slot, round-robin, and waits at most the configured
/// poll timeout. Callers drive the pool by calling `touch` from their event
/// loop:
///
/// ```rust,no_run
/// use sql_multiplex::prelude::*;
///
/// # fn main() -> Result<(), SqlMultiplexError> {
/// let cfg = MultiplexConfig::new("app", "secret", "appdb", "localhost", 5432, 4);
/// let mut mux = Multiplexer::new(PgConnector::new()?, cfg)?;
///
/// let id = mux.submit_formatted(
///     "SELECT name FROM users WHERE id = $1",
///     &[Param::Int64(42)],
///     handler(
///         |rs: &QueryResult, _| {
///             println!("{:?}", rs.get_str(0, "name"));
///             true
///         },
///         |msg: &str, _, _| eprintln!("query failed: {msg}"),
///     ),
/// );
/// assert_ne!(id, 0);
///
/// while mux.pending_count() > 0 {
///     if mux.touch() == TouchStatus::ConnectionError {
///         eprintln!("{}", mux.get_error());
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Multiplexer<C: Connector> {
    connector: C,
    target: ConnectTarget,
    pool: SlotPool<C::Connection>,
    queue: RequestQueue,
    poll_timeout: Duration,
    last_error: String,
}

impl<C: Connector> Multiplexer<C> {
    /// Build the pool; no connection is attempted until the first `touch`.
    ///
    /// # Errors
    /// Returns `SqlMultiplexError::ConfigError` if a required credential is missing.
    pub fn new(connector: C, config: MultiplexConfig) -> Result<Self, SqlMultiplexError> {
        config.validate()?;
        let size = config.clamped_pool_size();
        let target = config.target();
        debug!(%target, pool_size = size, "multiplexer initialised");
        Ok(Self {
            connector,
            target,
            pool: SlotPool::new(size),
            queue: RequestQueue::new(),
            poll_timeout: config.poll_timeout(),
            last_error: String::new(),
        })
    }

    /// Advance one slot of the pool.
    pub fn touch(&mut self) -> TouchStatus {
        let index = self.pool.advance();
        let state = self.pool.slot(index).state();
        let step = match state {
            SlotState::Disconnected => self.start_connect(index),
            SlotState::Connecting(phase) => self.advance_connect(index, phase),
            SlotState::Idle => self.assign(index),
            SlotState::Busy {
                request_id,
                sequence,
            } => self.drain(index, request_id, sequence),
        };
        step.unwrap_or_else(|err| self.fail_slot(index, &err))
    }

    /// Queue `sql` and return its request id, or 0 if it was rejected.
    ///
    /// Pass a `String` to hand the buffer over, a `&'static str` to lend it.
    pub fn submit(
        &mut self,
        sql: impl Into<Cow<'static, str>>,
        handler: impl QueryHandler + 'static,
    ) -> u64 {
        let sql = sql.into();
        if sql.trim().is_empty() {
            warn!("refusing to queue an empty statement");
            return 0;
        }
        let id = self.queue.push(sql, Box::new(handler));
        debug!(request_id = id, pending = self.queue.len(), "request queued");
        id
    }

    /// Substitute `params` into `template` and queue the result.
    pub fn submit_formatted(
        &mut self,
        template: &str,
        params: &[Param<'_>],
        handler: impl QueryHandler + 'static,
    ) -> u64 {
        self.submit(format_query(template, params), handler)
    }

    /// Queue `sql` wrapped in `BEGIN;` / `COMMIT;`.
    pub fn submit_transaction(&mut self, sql: &str, handler: impl QueryHandler + 'static) -> u64 {
        if sql.trim().is_empty() {
            warn!("refusing to queue an empty transaction");
            return 0;
        }
        self.submit(format!("BEGIN;\n{sql}COMMIT;\n"), handler)
    }

    /// Cancel a request; see [`RequestQueue::cancel`].
    pub fn cancel(&mut self, id: u64) -> CancelStatus {
        let status = self.queue.cancel(id);
        debug!(request_id = id, ?status, "cancel");
        status
    }

    /// Message of the most recent connection failure; empty before any.
    #[must_use]
    pub fn get_error(&self) -> &str {
        &self.last_error
    }

    /// Slots currently holding an established connection.
    #[must_use]
    pub fn ready_connections_count(&self) -> usize {
        self.pool.ready_count()
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Requests queued or in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn slot_states(&self) -> Vec<SlotState> {
        self.pool.states()
    }

    #[must_use]
    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    #[must_use]
    pub fn target(&self) -> &ConnectTarget {
        &self.target
    }

    /// Close every connection; the next touches reconnect.
    ///
    /// Requests that were running become unassigned again; those cancelled
    /// while running are dropped.
    pub fn reconnect_all(&mut self) {
        for request_id in self.pool.reset_all() {
            self.queue.detach(request_id);
        }
        info!(target = %self.target, "all connections reset");
    }

    /// Close every connection and drop all requests without reporting them.
    pub fn release(&mut self) {
        self.pool.reset_all();
        let dropped = self.queue.len();
        self.queue.clear();
        debug!(dropped, "multiplexer released");
    }

    fn start_connect(&mut self, index: usize) -> Result<TouchStatus, SqlMultiplexError> {
        let conn = self
            .connector
            .connect_start(&self.target)
            .map_err(|e| SqlMultiplexError::AllocError(e.message()))?;
        let slot = self.pool.slot_mut(index);
        slot.conn = Some(conn);
        slot.state = SlotState::Connecting(PollPhase::Writing);
        debug!(slot = index, target = %self.target, "connecting");
        Ok(TouchStatus::Connecting)
    }

    fn advance_connect(
        &mut self,
        index: usize,
        phase: PollPhase,
    ) -> Result<TouchStatus, SqlMultiplexError> {
        let timeout = self.poll_timeout;
        let slot = self.pool.slot_mut(index);
        let conn = slot.conn.as_mut().ok_or_else(missing_handle)?;
        if conn.status() == ConnStatus::Bad {
            return Err(SqlMultiplexError::ConnectionError(conn.error_message()));
        }

        let interest = match phase {
            PollPhase::Writing => Interest::Writable,
            PollPhase::Reading => Interest::Readable,
            PollPhase::Ok => {
                slot.state = SlotState::Idle;
                return Ok(TouchStatus::Success);
            }
            PollPhase::Failed => {
                return Err(SqlMultiplexError::ConnectionError(conn.error_message()));
            }
        };
        if !conn.wait_ready(interest, timeout)? {
            return Ok(TouchStatus::Connecting);
        }

        match conn.connect_poll() {
            PollPhase::Ok => {
                slot.state = SlotState::Idle;
                info!(slot = index, "connection established");
                Ok(TouchStatus::Success)
            }
            PollPhase::Failed => Err(SqlMultiplexError::ConnectionError(conn.error_message())),
            next => {
                slot.state = SlotState::Connecting(next);
                Ok(TouchStatus::Connecting)
            }
        }
    }

    fn assign(&mut self, index: usize) -> Result<TouchStatus, SqlMultiplexError> {
        let slot = self.pool.slot_mut(index);
        let conn = slot.conn.as_mut().ok_or_else(missing_handle)?;
        if conn.status() == ConnStatus::Bad {
            return Err(SqlMultiplexError::ConnectionError(conn.error_message()));
        }
        let Some(request) = self.queue.next_unassigned_mut() else {
            return Ok(TouchStatus::Success);
        };

        conn.send_query(request.sql())?;
        request.assign(index);
        slot.state = SlotState::Busy {
            request_id: request.id(),
            sequence: 0,
        };
        debug!(slot = index, request_id = request.id(), "request dispatched");
        Ok(TouchStatus::Success)
    }

    fn drain(
        &mut self,
        index: usize,
        request_id: u64,
        sequence: usize,
    ) -> Result<TouchStatus, SqlMultiplexError> {
        let timeout = self.poll_timeout;
        let slot = self.pool.slot_mut(index);
        let conn = slot.conn.as_mut().ok_or_else(missing_handle)?;
        if conn.status() == ConnStatus::Bad {
            return Err(SqlMultiplexError::ConnectionError(conn.error_message()));
        }

        slot.state = match dispatch::drain(conn, &mut self.queue, request_id, sequence, timeout)? {
            DrainOutcome::Pending { sequence } => SlotState::Busy {
                request_id,
                sequence,
            },
            DrainOutcome::Complete => SlotState::Idle,
        };
        Ok(TouchStatus::Success)
    }

    /// Tear a slot down after `err` and report it.
    fn fail_slot(&mut self, index: usize, err: &SqlMultiplexError) -> TouchStatus {
        let status = match err {
            SqlMultiplexError::AllocError(_) => TouchStatus::AllocError,
            _ => TouchStatus::ConnectionError,
        };
        if let Some(request_id) = self.pool.slot_mut(index).reset() {
            if self.queue.detach(request_id) {
                warn!(slot = index, request_id, "in-flight request requeued");
            } else {
                debug!(slot = index, request_id, "cancelled in-flight request dropped");
            }
        }
        self.last_error = err.message();
        warn!(slot = index, error = %err, "connection slot failed");
        status
    }
}

fn missing_handle() -> SqlMultiplexError {
    SqlMultiplexError::ConnectionError("slot has no connection handle".to_string())
}

impl<C: Connector> std::fmt::Debug for Multiplexer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("target", &self.target)
            .field("slots", &self.pool.states())
            .field("pending", &self.queue.len())
            .field("poll_timeout", &self.poll_timeout)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
