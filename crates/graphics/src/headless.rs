//! A null graphics backend.
//!
//! Hands out integer handles, records every accepted call in order, and
//! can be told to refuse individual operations. Tests use the call log to
//! pin lifecycle ordering; the demo uses the backend to run the harness
//! without a window system.

use std::path::Path;

use geometry::{Extent, Px};

use crate::frame::PixelFormat;
use crate::provider::{Provider, ProviderError};

/// One provider operation, as recorded in the call log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    CreateSurface,
    DestroySurface,
    CreateRenderer,
    DestroyRenderer,
    CreateTexture,
    DestroyTexture,
    OpenFont,
    CloseFont,
    Upload,
    Present,
}

impl Call {
    fn acquires(self) -> bool {
        matches!(
            self,
            Self::CreateSurface | Self::CreateRenderer | Self::CreateTexture | Self::OpenFont
        )
    }

    fn releases(self) -> bool {
        matches!(
            self,
            Self::DestroySurface | Self::DestroyRenderer | Self::DestroyTexture | Self::CloseFont
        )
    }
}

/// The null backend. See the module docs.
#[derive(Default)]
pub struct HeadlessProvider {
    calls: Vec<Call>,
    refusals: Vec<Call>,
    next_handle: u32,
}

impl HeadlessProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `call` fail from now on. Refused calls do not appear in the
    /// log and hand out no handle.
    pub fn refuse(&mut self, call: Call) {
        self.refusals.push(call);
    }

    /// Every accepted call, in order.
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Create/open calls minus destroy/close calls. Zero means every
    /// handle the backend handed out came back.
    #[must_use]
    pub fn live_handles(&self) -> i64 {
        self.calls
            .iter()
            .map(|call| i64::from(call.acquires()) - i64::from(call.releases()))
            .sum()
    }

    /// Number of accepted present calls.
    #[must_use]
    pub fn presents(&self) -> usize {
        self.calls.iter().filter(|call| **call == Call::Present).count()
    }

    fn admit(&mut self, call: Call) -> Result<(), ProviderError> {
        if self.refusals.contains(&call) {
            return Err(ProviderError::new(format!("headless: {call:?} refused")));
        }
        self.calls.push(call);
        Ok(())
    }

    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl Provider for HeadlessProvider {
    type Surface = u32;
    type Renderer = u32;
    type Texture = u32;
    type Font = u32;

    fn create_surface(
        &mut self,
        _extent: Extent<u32, Px>,
        _title: &str,
    ) -> Result<u32, ProviderError> {
        self.admit(Call::CreateSurface)?;
        Ok(self.handle())
    }

    fn destroy_surface(&mut self, _surface: u32) {
        self.calls.push(Call::DestroySurface);
    }

    fn create_renderer(&mut self, _surface: &u32) -> Result<u32, ProviderError> {
        self.admit(Call::CreateRenderer)?;
        Ok(self.handle())
    }

    fn destroy_renderer(&mut self, _renderer: u32) {
        self.calls.push(Call::DestroyRenderer);
    }

    fn create_texture(
        &mut self,
        _renderer: &u32,
        _extent: Extent<u32, Px>,
        _format: PixelFormat,
    ) -> Result<u32, ProviderError> {
        self.admit(Call::CreateTexture)?;
        Ok(self.handle())
    }

    fn destroy_texture(&mut self, _texture: u32) {
        self.calls.push(Call::DestroyTexture);
    }

    fn open_font(&mut self, _path: &Path, _size: u16) -> Result<u32, ProviderError> {
        self.admit(Call::OpenFont)?;
        Ok(self.handle())
    }

    fn close_font(&mut self, _font: u32) {
        self.calls.push(Call::CloseFont);
    }

    fn upload_pixels(
        &mut self,
        _texture: &u32,
        pixels: &[u32],
        stride_bytes: usize,
    ) -> Result<(), ProviderError> {
        if stride_bytes == 0 || (pixels.len() * 4) % stride_bytes != 0 {
            return Err(ProviderError::new("headless: pixel buffer does not divide into rows"));
        }
        self.admit(Call::Upload)
    }

    fn present(&mut self, _renderer: &u32) -> Result<(), ProviderError> {
        self.admit(Call::Present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_refuses() {
        let mut provider = HeadlessProvider::new();

        let surface = provider
            .create_surface(Extent::new(8, 8), "headless")
            .expect("surface");
        let renderer = provider.create_renderer(&surface).expect("renderer");
        assert_eq!(provider.live_handles(), 2);

        provider.refuse(Call::Present);
        assert!(provider.present(&renderer).is_err());
        assert_eq!(provider.presents(), 0);

        provider.destroy_renderer(renderer);
        provider.destroy_surface(surface);
        assert_eq!(provider.live_handles(), 0);
    }

    #[test]
    fn upload_checks_row_alignment() {
        let mut provider = HeadlessProvider::new();
        let pixels = [0u32; 8];

        assert!(provider.upload_pixels(&1, &pixels, 16).is_ok());
        assert!(provider.upload_pixels(&1, &pixels, 12).is_err());
        assert!(provider.upload_pixels(&1, &pixels, 0).is_err());
    }
}
