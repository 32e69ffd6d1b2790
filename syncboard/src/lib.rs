//! Syncboard — client-side synchronization for a shared task board.

pub mod board;
pub mod channel;
pub mod client;
pub mod config;
pub mod directory;
pub mod store;
pub mod sync;
