pub mod logging;
pub mod pipeline;
pub mod source;
pub mod types;
pub mod validate;
pub mod window;

pub use logging::{LogFormat, LoggingConfig};
pub use pipeline::{PipelineConfig, PipelineDefaults};
pub use source::{SourceConfig, SourceOverride};
pub use types::{ByteSize, HumanDuration, StepUnit};
pub use window::WindowSpec;
