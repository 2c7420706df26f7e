pub use euclid::{Point2D as Point, Size2D as Extent};

/// Unit tag for pixels in a window's client area or a frame buffer.
#[derive(Clone, Copy)]
pub struct Px();
