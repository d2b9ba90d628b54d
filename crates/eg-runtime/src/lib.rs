#[macro_use]
mod log_macros;

pub mod driver;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod processor;
pub mod source;
pub mod tracing_init;

pub use driver::{DriverOptions, RunReport, WindowDriver};
pub use error::{RuntimeError, RuntimeReason, RuntimeResult};
pub use export::WindowExporter;
pub use pipeline::{Pipeline, WindowSummary};
pub use processor::{ProcessError, WindowProcessor};
