//! Session implementations.

mod memory;

pub use memory::{InMemorySession, ReceivedStatement};
