//! Single-threaded, poll-driven SQL multiplexer.
//!
//! A [`Multiplexer`] owns a fixed pool of non-blocking connections and a FIFO
//! queue of requests. Each call to [`Multiplexer::touch`] advances one
//! connection slot: it moves a handshake forward, hands the oldest waiting
//! request to an idle connection, or drains results of a running request into
//! that request's [`QueryHandler`]. Nothing runs between touches.
//!
//! The database driver sits behind the [`driver`] traits; the `postgres`
//! feature (on by default) provides one on top of `tokio-postgres`.

pub mod config;
pub mod datetime;
pub mod driver;
pub mod error;
pub mod format;
pub mod handler;
pub mod multiplexer;
pub mod pool;
pub mod prelude;
pub mod queue;
pub mod results;
pub mod types;

mod dispatch;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{ConnectTarget, MAX_POOL_SIZE, MIN_POOL_SIZE, MultiplexConfig};
pub use error::SqlMultiplexError;
pub use format::{Param, format_query};
pub use handler::{Discard, FnHandler, QueryHandler, handler};
pub use multiplexer::Multiplexer;
pub use results::{QueryResult, ResultStatus, RowRef};
pub use types::{CancelStatus, ConnStatus, Interest, PollPhase, SlotState, TouchStatus};

#[cfg(feature = "postgres")]
pub use postgres::{PgConnection, PgConnector};
