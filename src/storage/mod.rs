//! Key-value storage backends for store persistence.
//!
//! Backends store opaque strings under string keys. Two named areas are
//! available to stores through [`StorageAreas`]: a durable "local" area and
//! a process-lifetime "session" area.

mod file;
mod memory;
mod storage;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use storage::{Storage, StorageAreas, StorageType};
