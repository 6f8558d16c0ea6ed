//! The seam between the multiplexer and a concrete database driver.
//!
//! A [`NativeConnection`] mirrors the non-blocking primitives of a libpq-style
//! client: a handshake advanced by explicit polls, bounded readiness waits,
//! asynchronous query submission, and result objects pulled one at a time. The
//! multiplexer schedules these handles but never looks inside them.

use std::time::Duration;

use crate::config::ConnectTarget;
use crate::error::SqlMultiplexError;
use crate::results::QueryResult;
use crate::types::{ConnStatus, Interest, PollPhase};

/// What [`NativeConnection::next_result`] found.
#[derive(Debug)]
pub enum ResultPoll {
    /// A complete result object for the running query.
    Ready(QueryResult),
    /// More results are expected but have not arrived yet.
    Pending,
    /// The running query produced all of its results.
    Complete,
}

/// A non-blocking connection handle owned by one pool slot.
///
/// Dropping the handle closes the connection.
pub trait NativeConnection {
    /// Current coarse status; `Bad` makes the slot tear the handle down.
    fn status(&self) -> ConnStatus;

    /// Wait at most `timeout` for `interest`, returning whether it is ready.
    ///
    /// # Errors
    /// Returns an error when the underlying socket or runtime fails.
    fn wait_ready(&mut self, interest: Interest, timeout: Duration)
    -> Result<bool, SqlMultiplexError>;

    /// Advance the connection handshake one step.
    fn connect_poll(&mut self) -> PollPhase;

    /// Start executing `sql` without waiting for its results.
    ///
    /// # Errors
    /// Returns an error when the query could not be handed to the server.
    fn send_query(&mut self, sql: &str) -> Result<(), SqlMultiplexError>;

    /// Absorb whatever input has arrived, without blocking.
    ///
    /// # Errors
    /// Returns an error when reading from the connection failed.
    fn consume_input(&mut self) -> Result<(), SqlMultiplexError>;

    /// Whether the running query is still producing its next result.
    fn is_busy(&self) -> bool;

    /// Pull the next available result object of the running query.
    fn next_result(&mut self) -> ResultPoll;

    /// Most recent connection-level failure text.
    fn error_message(&self) -> String;
}

/// Factory for native handles.
pub trait Connector {
    type Connection: NativeConnection;

    /// Begin an asynchronous connect to `target`; must not block.
    ///
    /// # Errors
    /// Returns an error when no handle could be created at all. A handshake
    /// that later fails is reported through the handle instead.
    fn connect_start(&mut self, target: &ConnectTarget)
    -> Result<Self::Connection, SqlMultiplexError>;
}
