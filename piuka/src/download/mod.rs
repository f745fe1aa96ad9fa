//! Download protocol run by workers.
//!
//! Covers chunk planning, the per-phase retry loop and the disk and memory
//! fetch paths. Scheduling lives in [`crate::executor`].

mod chunk;
mod error;
mod retry;
mod worker;

pub use chunk::{ByteRange, ChunkPlan};
pub use error::{AttemptError, FetchError, Phase};
pub use worker::{Worker, WorkerContext};
