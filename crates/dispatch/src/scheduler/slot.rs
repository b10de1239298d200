use serde::Serialize;

/// Lifecycle of one execution lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SlotState {
    Idle,
    /// Index claimed; waiting on the pacing timer or the ready queue.
    Waiting { index: usize },
    Running { index: usize },
    /// Nothing left to claim. Terminal.
    Drained,
}

/// One of the fixed number of concurrent lanes.
#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    id: usize,
    state: SlotState,
    completed: usize,
}

impl Slot {
    pub fn new(id: usize) -> Self {
        Self { id, state: SlotState::Idle, completed: 0 }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Idle → Waiting.
    pub fn assign(&mut self, index: usize) {
        debug_assert_eq!(self.state, SlotState::Idle, "slot {} assigned while busy", self.id);
        self.state = SlotState::Waiting { index };
    }

    /// Waiting → Running.
    pub fn begin(&mut self, index: usize) {
        debug_assert_eq!(self.state, SlotState::Waiting { index });
        self.state = SlotState::Running { index };
    }

    /// Running → Idle.
    pub fn complete(&mut self, index: usize) {
        debug_assert_eq!(self.state, SlotState::Running { index });
        self.state = SlotState::Idle;
        self.completed += 1;
    }

    /// Idle → Drained.
    pub fn drain(&mut self) {
        debug_assert_eq!(self.state, SlotState::Idle);
        self.state = SlotState::Drained;
    }

    /// Waiting → Drained, dropping the claimed index without running it.
    pub fn cancel(&mut self, index: usize) {
        debug_assert_eq!(self.state, SlotState::Waiting { index });
        self.state = SlotState::Drained;
    }

    pub fn is_drained(&self) -> bool {
        self.state == SlotState::Drained
    }
}
