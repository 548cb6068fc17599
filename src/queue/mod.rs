//! Conversion tasks and the batch that runs them.

pub mod batch;
pub mod task;

pub use batch::{Batch, BatchHandle, BatchSummary};
pub use task::{transition, ConversionTask, TaskStatus};
