use std::path::Path;

use geometry::{Extent, Px};
use thiserror::Error;

use crate::frame::PixelFormat;

/// A graphics or font backend refused an operation.
///
/// The backend's diagnostic string travels inside the error. Callers log
/// it; nothing downstream branches on its contents.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ProviderError(String);

impl ProviderError {
    #[must_use]
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self(diagnostic.into())
    }
}

/// Contract between the harness and a windowing/graphics backend.
///
/// The handle types are associated so a backend can hand out whatever it
/// likes (raw ids, smart pointers, FFI wrappers). The harness only ever
/// stores them and passes them back.
///
/// Creation dependencies: a renderer needs a surface, a texture needs a
/// renderer. Fonts are independent. [`SurfaceStack`](crate::SurfaceStack)
/// enforces the ordering; implementations may assume it.
pub trait Provider {
    type Surface;
    type Renderer;
    type Texture;
    type Font;

    fn create_surface(
        &mut self,
        extent: Extent<u32, Px>,
        title: &str,
    ) -> Result<Self::Surface, ProviderError>;

    fn destroy_surface(&mut self, surface: Self::Surface);

    fn create_renderer(&mut self, surface: &Self::Surface)
        -> Result<Self::Renderer, ProviderError>;

    fn destroy_renderer(&mut self, renderer: Self::Renderer);

    fn create_texture(
        &mut self,
        renderer: &Self::Renderer,
        extent: Extent<u32, Px>,
        format: PixelFormat,
    ) -> Result<Self::Texture, ProviderError>;

    fn destroy_texture(&mut self, texture: Self::Texture);

    fn open_font(&mut self, path: &Path, size: u16) -> Result<Self::Font, ProviderError>;

    fn close_font(&mut self, font: Self::Font);

    /// Copies a row-major pixel buffer into the texture. `stride_bytes` is
    /// the length of one row in bytes.
    fn upload_pixels(
        &mut self,
        texture: &Self::Texture,
        pixels: &[u32],
        stride_bytes: usize,
    ) -> Result<(), ProviderError>;

    /// Flips the texture's contents onto the surface.
    fn present(&mut self, renderer: &Self::Renderer) -> Result<(), ProviderError>;
}
