//! Shared task model and event wire types for Syncboard.

pub mod codec;
pub mod event;
pub mod task;
