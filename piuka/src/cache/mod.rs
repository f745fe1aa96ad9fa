//! Result cache for memory-mode fetches.

mod memory;

pub use memory::MemoryCache;
