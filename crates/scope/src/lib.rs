//! A real-time framebuffer display harness.
//!
//! ## Goals
//!
//! - One shared frame of pixels, any number of producer threads writing
//!   into it, one render loop flushing it to a window surface.
//! - Coordination through an atomic flag word and a single frame lock:
//!   cheap enough to poll, impossible to tear.
//! - Backend neutrality: the window system sits behind
//!   [`graphics::Provider`], the event source behind
//!   [`shell::EventSource`].
//!
//! ## Non-goals
//!
//! - Drawing primitives, text layout, multiple windows.
//! - Smart scheduling. Both loops are plain bounded-sleep polling loops,
//!   which is all this harness needs.

mod coordinator;

use std::num::NonZeroU32;
use std::time::Duration;

use geometry::{Extent, Px};
use graphics::{FontDesc, SurfaceDesc};
use shell::Key;

pub use coordinator::{Coordinator, FrameWriter, Screen, Status};

/// Cadence of the render loop when no target rate is configured.
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(50);

/// Options for a harness instance. Fixed once the coordinator is created.
pub struct Config {
    /// Client-area size of the window, in pixels. Defaults to 640 × 480.
    pub extent: Extent<u32, Px>,

    /// Window title.
    pub title: String,

    /// Font to open alongside the presentation stack, if any. A requested
    /// font that fails to open fails startup.
    pub font: Option<FontDesc>,

    /// Target presentation rate in frames per second. The render loop
    /// sleeps `1000 / fps` milliseconds between cycles; `None` falls back
    /// to [`DEFAULT_CADENCE`].
    pub target_fps: Option<NonZeroU32>,

    /// Pressing this key terminates the harness, same as a quit event.
    /// Defaults to [`Key::Q`].
    pub quit_key: Key,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extent: Extent::new(640, 480),
            title: "scope".to_string(),
            font: None,
            target_fps: None,
            quit_key: Key::Q,
        }
    }
}

impl Config {
    fn cadence(&self) -> Duration {
        match self.target_fps {
            Some(fps) => Duration::from_millis(1000 / u64::from(fps.get())),
            None => DEFAULT_CADENCE,
        }
    }

    fn surface_desc(&self) -> SurfaceDesc {
        SurfaceDesc {
            extent: self.extent,
            title: self.title.clone(),
            font: self.font.clone(),
        }
    }
}
