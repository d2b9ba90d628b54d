//! Message windowing: turning a time-ordered conversation into a sequence of
//! bounded, overlapping windows for downstream processing.

mod policy;
mod split;
mod view;
mod windower;

pub use policy::WindowPolicy;
pub use split::split_window;
pub use view::Window;
pub use windower::{Windower, Windows};
