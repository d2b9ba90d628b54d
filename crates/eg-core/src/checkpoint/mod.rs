//! Progress tracking across runs: what a source has already processed and
//! how to skip it next time.

mod record;
mod resume;
mod store;

pub use record::{Checkpoint, SCHEMA_VERSION};
pub use resume::{commit_point, resume_filter};
pub use store::{CheckpointStore, FileCheckpointStore, load_checkpoint, save_checkpoint};
