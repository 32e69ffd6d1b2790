//! Board projection and drag handling.
//!
//! Pure view logic over the reconciled task set: lane partitioning and
//! the interpretation of drag-and-drop gestures. Nothing in here mutates
//! state or talks to the store.

pub mod drag;
pub mod lanes;

pub use drag::{DropTarget, StatusChange, resolve_drop};
pub use lanes::{BoardView, lane_for};
