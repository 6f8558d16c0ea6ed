//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::MultiplexConfig;
pub use crate::driver::{Connector, NativeConnection, ResultPoll};
pub use crate::error::SqlMultiplexError;
pub use crate::format::{Param, format_query};
pub use crate::handler::{Discard, QueryHandler, handler};
pub use crate::multiplexer::Multiplexer;
pub use crate::results::{QueryResult, ResultStatus, RowRef};
pub use crate::types::{CancelStatus, SlotState, TouchStatus};

#[cfg(feature = "postgres")]
pub use crate::postgres::PgConnector;
