//! Slot scheduler: cursor, per-slot state machines, and the event loop that
//! owns both.
//!
//! Split into focused submodules:
//! - `cursor`: scheduled/finished counters and index claiming
//! - `slot`: Idle/Waiting/Running/Drained state machine for one lane
//! - `event_loop`: single task serializing every cursor and slot mutation

pub mod cursor;
mod event_loop;
pub mod slot;

pub use cursor::Cursor;
pub(crate) use event_loop::EventLoop;
pub use slot::{Slot, SlotState};
