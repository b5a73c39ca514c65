//! SQL text produced and consumed by dumps.

mod generator;
mod splitter;

pub use generator::{SqlChunks, SqlGenerator, DEFAULT_BATCH_SIZE};
pub use splitter::StatementSplitter;
