use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handler::QueryHandler;
use crate::types::CancelStatus;

// Shared by every queue so ids never repeat within a process.
static LAST_REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// The id following `prev`; 0 is reserved for "submission failed".
pub(crate) fn id_after(prev: u64) -> u64 {
    match prev.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

fn next_request_id() -> u64 {
    let prev = LAST_REQUEST_ID
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
            Some(id_after(prev))
        })
        .unwrap_or_else(|prev| prev);
    id_after(prev)
}

/// One submitted statement and the handler awaiting its results.
pub struct Request {
    id: u64,
    sql: Cow<'static, str>,
    handler: Option<Box<dyn QueryHandler>>,
    slot: Option<usize>,
}

impl Request {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether the SQL buffer is owned by the request.
    #[must_use]
    pub fn owns_sql(&self) -> bool {
        matches!(self.sql, Cow::Owned(_))
    }

    /// Slot currently executing this request.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.slot.is_some()
    }

    /// `false` once the request was cancelled in flight.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn assign(&mut self, slot: usize) {
        self.slot = Some(slot);
    }

    pub(crate) fn sql_and_handler(&mut self) -> (&str, Option<&mut (dyn QueryHandler + 'static)>) {
        (&self.sql, self.handler.as_deref_mut())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("sql", &self.sql)
            .field("slot", &self.slot)
            .field("cancelled", &self.handler.is_none())
            .finish()
    }
}

/// Pending and in-flight requests in submission order.
#[derive(Debug, Default)]
pub struct RequestQueue {
    requests: VecDeque<Request>,
}

impl RequestQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request and return its id.
    pub fn push(&mut self, sql: Cow<'static, str>, handler: Box<dyn QueryHandler>) -> u64 {
        let id = next_request_id();
        self.requests.push_back(Request {
            id,
            sql,
            handler: Some(handler),
            slot: None,
        });
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.requests.iter()
    }

    /// Oldest request not yet running on any slot.
    pub fn next_unassigned_mut(&mut self) -> Option<&mut Request> {
        self.requests.iter_mut().find(|r| !r.is_assigned())
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Request> {
        self.requests.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Request> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    /// Remove a request, handing it back to the caller to drop.
    pub fn remove(&mut self, id: u64) -> Option<Request> {
        let pos = self.requests.iter().position(|r| r.id == id)?;
        self.requests.remove(pos)
    }

    /// Clear the slot back-reference of a request whose connection went away.
    ///
    /// The request stays queued and becomes eligible for assignment again,
    /// unless it was cancelled while running: then it is dropped. Returns
    /// whether the request is still queued.
    pub fn detach(&mut self, id: u64) -> bool {
        let Some(pos) = self.requests.iter().position(|r| r.id == id) else {
            return false;
        };
        if self.requests[pos].has_handler() {
            self.requests[pos].slot = None;
            true
        } else {
            self.requests.remove(pos);
            false
        }
    }

    /// Cancel a request.
    ///
    /// Unassigned requests are dropped at once. A running request keeps its
    /// place until its results drain, but its handler is dropped so nothing
    /// is reported.
    pub fn cancel(&mut self, id: u64) -> CancelStatus {
        let Some(pos) = self.requests.iter().position(|r| r.id == id) else {
            return CancelStatus::NotFound;
        };
        if self.requests[pos].is_assigned() {
            self.requests[pos].handler = None;
        } else {
            self.requests.remove(pos);
        }
        CancelStatus::Success
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }
}
