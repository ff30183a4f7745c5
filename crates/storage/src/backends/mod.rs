//! Storage backend implementations
//!
//! - [`MemoryStorage`] - In-process map, for tests and ephemeral sessions
//! - [`FileStorage`] - One file per key under a directory

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;
