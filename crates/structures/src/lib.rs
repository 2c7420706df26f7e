//! Small, dependency-light containers shared across the workspace.

pub mod flags;
pub mod ring;

pub use flags::AtomicFlags;
pub use ring::{OverwritePolicy, RingBuffer};
