use serde::Serialize;

/// Outcome of a single [`Multiplexer::touch`](crate::Multiplexer::touch) cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TouchStatus {
    /// The visited slot is usable (idle, busy, or just finished its handshake).
    Success,
    /// The visited slot is still establishing its connection.
    Connecting,
    /// The visited slot lost (or never got) its connection; see `get_error`.
    ConnectionError,
    /// The connector could not create a native handle for the visited slot.
    AllocError,
}

impl TouchStatus {
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::ConnectionError | Self::AllocError)
    }
}

/// Outcome of [`Multiplexer::cancel`](crate::Multiplexer::cancel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CancelStatus {
    Success,
    NotFound,
}

/// Lifecycle state of one connection slot.
///
/// `Busy` can only follow `Idle`, so a busy slot is always connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SlotState {
    /// No native handle; the next touch starts connecting.
    Disconnected,
    /// Handshake in progress, waiting on the given phase.
    Connecting(PollPhase),
    /// Connected and free to take the oldest unassigned request.
    Idle,
    /// Executing `request_id`; `sequence` counts result objects drained so far.
    Busy { request_id: u64, sequence: usize },
}

impl SlotState {
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Idle | Self::Busy { .. })
    }
}

/// Progress reported by a connection handshake poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PollPhase {
    /// Wait until the socket is writable, then poll again.
    Writing,
    /// Wait until the socket is readable, then poll again.
    Reading,
    Ok,
    Failed,
}

/// Readiness a bounded wait is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interest {
    Readable,
    Writable,
}

/// Coarse state of a native connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnStatus {
    /// Handshake not finished yet.
    Pending,
    Ok,
    /// Broken; the handle must be discarded.
    Bad,
}
