use crate::types::SlotState;

/// One entry of the connection pool.
#[derive(Debug)]
pub struct Slot<N> {
    pub(crate) conn: Option<N>,
    pub(crate) state: SlotState,
}

impl<N> Slot<N> {
    fn new() -> Self {
        Self {
            conn: None,
            state: SlotState::Disconnected,
        }
    }

    #[must_use]
    pub fn state(&self) -> SlotState {
        self.state
    }

    #[must_use]
    pub fn has_handle(&self) -> bool {
        self.conn.is_some()
    }

    /// Drop the native handle and return to `Disconnected`.
    ///
    /// Returns the id of the request that was running, if any.
    pub(crate) fn reset(&mut self) -> Option<u64> {
        let running = match self.state {
            SlotState::Busy { request_id, .. } => Some(request_id),
            _ => None,
        };
        self.conn = None;
        self.state = SlotState::Disconnected;
        running
    }
}

/// Fixed-size array of connection slots visited round-robin.
#[derive(Debug)]
pub struct SlotPool<N> {
    slots: Vec<Slot<N>>,
    cursor: usize,
}

impl<N> SlotPool<N> {
    /// `size` must already be clamped by the caller.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            slots: (0..size.max(1)).map(|_| Slot::new()).collect(),
            cursor: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index of the slot to visit now; moves the cursor on, wrapping.
    pub fn advance(&mut self) -> usize {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.slots.len();
        index
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> &Slot<N> {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut Slot<N> {
        &mut self.slots[index]
    }

    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.slots.iter().filter(|s| s.state.is_connected()).count()
    }

    #[must_use]
    pub fn states(&self) -> Vec<SlotState> {
        self.slots.iter().map(|s| s.state).collect()
    }

    /// Reset every slot, returning the ids of requests that were running.
    pub fn reset_all(&mut self) -> Vec<u64> {
        self.slots.iter_mut().filter_map(Slot::reset).collect()
    }
}
