//! Draining a busy slot's connection into its request's handler.

use std::time::Duration;

use crate::driver::{NativeConnection, ResultPoll};
use crate::error::SqlMultiplexError;
use crate::queue::RequestQueue;
use crate::results::QueryResult;
use crate::types::Interest;

/// What a drain step left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainOutcome {
    /// The request is still running; `sequence` is where the next result lands.
    Pending { sequence: usize },
    /// Every result was delivered and the request is gone.
    Complete,
}

/// Move whatever results have arrived for `request_id` into its handler.
///
/// Waits at most `timeout` for input. Results are numbered from `sequence`.
pub(crate) fn drain<N: NativeConnection>(
    conn: &mut N,
    queue: &mut RequestQueue,
    request_id: u64,
    mut sequence: usize,
    timeout: Duration,
) -> Result<DrainOutcome, SqlMultiplexError> {
    if !conn.wait_ready(Interest::Readable, timeout)? {
        return Ok(DrainOutcome::Pending { sequence });
    }
    conn.consume_input()?;
    if conn.is_busy() {
        return Ok(DrainOutcome::Pending { sequence });
    }

    loop {
        match conn.next_result() {
            ResultPoll::Ready(result) => {
                deliver(queue, request_id, result, sequence);
                sequence += 1;
            }
            ResultPoll::Pending => return Ok(DrainOutcome::Pending { sequence }),
            ResultPoll::Complete => break,
        }
    }

    if queue.remove(request_id).is_some() {
        tracing::debug!(request_id, results = sequence, "request complete");
    }
    Ok(DrainOutcome::Complete)
}

fn deliver(queue: &mut RequestQueue, request_id: u64, result: QueryResult, sequence: usize) {
    let Some(request) = queue.get_mut(request_id) else {
        return;
    };
    let (sql, handler) = request.sql_and_handler();
    // cancelled in flight: the result is simply freed
    let Some(handler) = handler else {
        return;
    };
    if result.status().is_success() {
        if !handler.on_result(&result, sequence) {
            handler.retain(result, sequence);
        }
    } else {
        handler.on_error(result.error_message(), sequence, sql);
    }
}
