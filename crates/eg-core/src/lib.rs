pub mod checkpoint;
pub mod error;
pub mod message;
pub mod window;

pub use checkpoint::{
    Checkpoint, CheckpointStore, FileCheckpointStore, commit_point, load_checkpoint,
    resume_filter, save_checkpoint,
};
pub use error::{CoreError, CoreReason, CoreResult};
pub use message::{Message, is_time_ordered, sort_messages};
pub use window::{Window, WindowPolicy, Windower, Windows, split_window};
