use std::path::PathBuf;

use geometry::{Extent, Px};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::frame::PixelFormat;
use crate::provider::{Provider, ProviderError};

/// Failure modes of surface stack operations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StackError {
    /// Caller error: a prerequisite resource is missing, or the resource
    /// in question does not exist. Never worth retrying.
    #[error("invalid parameters: resource missing or prerequisite not met")]
    InvalidParams,
    /// The backend refused. Its diagnostic has been logged; the failed
    /// stage acquired nothing.
    #[error("graphics provider refused the operation")]
    Provider,
}

/// A font to open alongside the stack: file path and point size.
#[derive(Clone, Debug)]
pub struct FontDesc {
    pub path: PathBuf,
    pub size: u16,
}

/// Everything needed to build a full presentation stack.
#[derive(Clone, Debug)]
pub struct SurfaceDesc {
    pub extent: Extent<u32, Px>,
    pub title: String,
    /// Fonts are optional; `None` skips the font stage entirely.
    pub font: Option<FontDesc>,
}

/// A presentation stack: window surface, renderer, streaming texture, and
/// an optional font, created top-down and destroyed bottom-up.
///
/// The stack moves through its stages in dependency order (surface, then
/// renderer, then texture, then optionally font) and each `create_*`
/// primitive checks its prerequisite, so partial stacks can be assembled
/// piecewise in tests. [`create`](SurfaceStack::create) builds the whole
/// chain and rolls back the stages already acquired, in reverse order, if
/// any stage fails: the stack is never left partially live.
///
/// [`destroy`](SurfaceStack::destroy) tears down in the same reverse
/// order. Dropping a stack that still holds handles cannot return them to
/// the provider and leaks them in the backend; the drop logs a warning.
pub struct SurfaceStack<P: Provider> {
    surface: Option<P::Surface>,
    renderer: Option<P::Renderer>,
    texture: Option<P::Texture>,
    font: Option<P::Font>,
    desc: SurfaceDesc,
}

impl<P: Provider> SurfaceStack<P> {
    /// A stack with no resources; combine with the `create_*` primitives.
    #[must_use]
    pub fn empty(desc: SurfaceDesc) -> Self {
        Self {
            surface: None,
            renderer: None,
            texture: None,
            font: None,
            desc,
        }
    }

    /// Builds the full chain described by `desc`.
    ///
    /// Stages run in dependency order. The first failure destroys every
    /// resource acquired so far, in reverse order, and reports the error;
    /// a requested font that fails to open fails the whole creation.
    pub fn create(provider: &mut P, desc: &SurfaceDesc) -> Result<Self, StackError> {
        debug!(title = %desc.title, "creating surface stack");

        let mut partial = PartialStack::new(provider);

        partial.surface(desc.extent, &desc.title)?;
        partial.renderer()?;
        partial.texture(desc.extent)?;

        match &desc.font {
            Some(font) => partial.font(font)?,
            None => debug!("no font requested"),
        }

        Ok(partial.finish(desc.clone()))
    }

    /// Destroys whatever the stack holds: font, texture, renderer,
    /// surface, in that order. Absent resources are skipped, so a partial
    /// or already-destroyed stack tears down cleanly.
    pub fn destroy(&mut self, provider: &mut P) {
        debug!("destroying surface stack");

        if let Some(font) = self.font.take() {
            provider.close_font(font);
        }
        if let Some(texture) = self.texture.take() {
            provider.destroy_texture(texture);
        }
        if let Some(renderer) = self.renderer.take() {
            provider.destroy_renderer(renderer);
        }
        if let Some(surface) = self.surface.take() {
            provider.destroy_surface(surface);
        }
    }

    /// Creates the surface stage. Fails with [`StackError::InvalidParams`]
    /// if the surface already exists.
    pub fn create_surface(&mut self, provider: &mut P) -> Result<(), StackError> {
        if self.surface.is_some() {
            return Err(StackError::InvalidParams);
        }

        let surface = report(
            provider.create_surface(self.desc.extent, &self.desc.title),
            "create_surface",
        )?;
        self.surface = Some(surface);
        Ok(())
    }

    /// Creates the renderer stage. The surface must exist first.
    pub fn create_renderer(&mut self, provider: &mut P) -> Result<(), StackError> {
        if self.renderer.is_some() {
            return Err(StackError::InvalidParams);
        }
        let surface = self.surface.as_ref().ok_or(StackError::InvalidParams)?;

        let renderer = report(provider.create_renderer(surface), "create_renderer")?;
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Creates the texture stage. The renderer must exist first.
    pub fn create_texture(&mut self, provider: &mut P) -> Result<(), StackError> {
        if self.texture.is_some() {
            return Err(StackError::InvalidParams);
        }
        let renderer = self.renderer.as_ref().ok_or(StackError::InvalidParams)?;

        let texture = report(
            provider.create_texture(renderer, self.desc.extent, PixelFormat::Rgba8),
            "create_texture",
        )?;
        self.texture = Some(texture);
        Ok(())
    }

    /// Opens the font named in the description. Fails with
    /// [`StackError::InvalidParams`] if none was requested or one is
    /// already open.
    pub fn open_font(&mut self, provider: &mut P) -> Result<(), StackError> {
        if self.font.is_some() {
            return Err(StackError::InvalidParams);
        }
        let desc = self.desc.font.as_ref().ok_or(StackError::InvalidParams)?;

        let font = report(provider.open_font(&desc.path, desc.size), "open_font")?;
        self.font = Some(font);
        Ok(())
    }

    pub fn destroy_surface(&mut self, provider: &mut P) -> Result<(), StackError> {
        let surface = self.surface.take().ok_or(StackError::InvalidParams)?;
        provider.destroy_surface(surface);
        Ok(())
    }

    pub fn destroy_renderer(&mut self, provider: &mut P) -> Result<(), StackError> {
        let renderer = self.renderer.take().ok_or(StackError::InvalidParams)?;
        provider.destroy_renderer(renderer);
        Ok(())
    }

    pub fn destroy_texture(&mut self, provider: &mut P) -> Result<(), StackError> {
        let texture = self.texture.take().ok_or(StackError::InvalidParams)?;
        provider.destroy_texture(texture);
        Ok(())
    }

    pub fn close_font(&mut self, provider: &mut P) -> Result<(), StackError> {
        let font = self.font.take().ok_or(StackError::InvalidParams)?;
        provider.close_font(font);
        Ok(())
    }

    #[must_use]
    pub fn surface(&self) -> Option<&P::Surface> {
        self.surface.as_ref()
    }

    #[must_use]
    pub fn renderer(&self) -> Option<&P::Renderer> {
        self.renderer.as_ref()
    }

    #[must_use]
    pub fn texture(&self) -> Option<&P::Texture> {
        self.texture.as_ref()
    }

    #[must_use]
    pub fn font(&self) -> Option<&P::Font> {
        self.font.as_ref()
    }

    /// True once the renderer and texture both exist, which is everything
    /// an upload-and-present cycle needs.
    #[must_use]
    pub fn is_presentable(&self) -> bool {
        self.renderer.is_some() && self.texture.is_some()
    }
}

impl<P: Provider> Drop for SurfaceStack<P> {
    fn drop(&mut self) {
        if self.surface.is_some()
            || self.renderer.is_some()
            || self.texture.is_some()
            || self.font.is_some()
        {
            warn!(title = %self.desc.title, "surface stack dropped while live; backend handles leak");
        }
    }
}

/// Maps a provider refusal onto [`StackError::Provider`], logging the
/// diagnostic on the way. The string goes no further than the log.
fn report<T>(result: Result<T, ProviderError>, operation: &str) -> Result<T, StackError> {
    result.map_err(|refusal| {
        error!(operation, diagnostic = %refusal, "graphics provider refused");
        StackError::Provider
    })
}

/// Accumulates resources during staged creation and, unless defused by
/// [`finish`](PartialStack::finish), releases them in reverse order when
/// dropped. Every early return out of [`SurfaceStack::create`] rolls back
/// through this guard.
struct PartialStack<'p, P: Provider> {
    provider: &'p mut P,
    surface: Option<P::Surface>,
    renderer: Option<P::Renderer>,
    texture: Option<P::Texture>,
    font: Option<P::Font>,
}

impl<'p, P: Provider> PartialStack<'p, P> {
    fn new(provider: &'p mut P) -> Self {
        Self {
            provider,
            surface: None,
            renderer: None,
            texture: None,
            font: None,
        }
    }

    fn surface(&mut self, extent: Extent<u32, Px>, title: &str) -> Result<(), StackError> {
        let surface = report(self.provider.create_surface(extent, title), "create_surface")?;
        self.surface = Some(surface);
        Ok(())
    }

    fn renderer(&mut self) -> Result<(), StackError> {
        let surface = self.surface.as_ref().ok_or(StackError::InvalidParams)?;
        let renderer = report(self.provider.create_renderer(surface), "create_renderer")?;
        self.renderer = Some(renderer);
        Ok(())
    }

    fn texture(&mut self, extent: Extent<u32, Px>) -> Result<(), StackError> {
        let renderer = self.renderer.as_ref().ok_or(StackError::InvalidParams)?;
        let texture = report(
            self.provider
                .create_texture(renderer, extent, PixelFormat::Rgba8),
            "create_texture",
        )?;
        self.texture = Some(texture);
        Ok(())
    }

    fn font(&mut self, desc: &FontDesc) -> Result<(), StackError> {
        let font = report(self.provider.open_font(&desc.path, desc.size), "open_font")?;
        self.font = Some(font);
        Ok(())
    }

    /// Hands the acquired resources over to a finished stack. The guard
    /// then drops empty, so no teardown runs.
    fn finish(mut self, desc: SurfaceDesc) -> SurfaceStack<P> {
        SurfaceStack {
            surface: self.surface.take(),
            renderer: self.renderer.take(),
            texture: self.texture.take(),
            font: self.font.take(),
            desc,
        }
    }
}

impl<P: Provider> Drop for PartialStack<'_, P> {
    fn drop(&mut self) {
        if let Some(font) = self.font.take() {
            self.provider.close_font(font);
        }
        if let Some(texture) = self.texture.take() {
            self.provider.destroy_texture(texture);
        }
        if let Some(renderer) = self.renderer.take() {
            self.provider.destroy_renderer(renderer);
        }
        if let Some(surface) = self.surface.take() {
            self.provider.destroy_surface(surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{Call, HeadlessProvider};

    fn desc(font: Option<FontDesc>) -> SurfaceDesc {
        SurfaceDesc {
            extent: Extent::new(640, 480),
            title: "stack test".to_string(),
            font,
        }
    }

    fn font_desc() -> FontDesc {
        FontDesc {
            path: PathBuf::from("fonts/test.ttf"),
            size: 12,
        }
    }

    #[test]
    fn create_then_destroy_reverses_order() {
        let mut provider = HeadlessProvider::new();

        let mut stack =
            SurfaceStack::create(&mut provider, &desc(Some(font_desc()))).expect("full stack");
        assert!(stack.is_presentable());
        assert!(stack.font().is_some());

        stack.destroy(&mut provider);
        assert!(!stack.is_presentable());

        assert_eq!(
            provider.calls(),
            &[
                Call::CreateSurface,
                Call::CreateRenderer,
                Call::CreateTexture,
                Call::OpenFont,
                Call::CloseFont,
                Call::DestroyTexture,
                Call::DestroyRenderer,
                Call::DestroySurface,
            ]
        );
        assert_eq!(provider.live_handles(), 0);
    }

    #[test]
    fn texture_failure_rolls_back_in_reverse() {
        let mut provider = HeadlessProvider::new();
        provider.refuse(Call::CreateTexture);

        let result = SurfaceStack::create(&mut provider, &desc(None));
        assert!(matches!(result, Err(StackError::Provider)));

        // Only the resources acquired before the failure come down, newest
        // first.
        assert_eq!(
            provider.calls(),
            &[
                Call::CreateSurface,
                Call::CreateRenderer,
                Call::DestroyRenderer,
                Call::DestroySurface,
            ]
        );
        assert_eq!(provider.live_handles(), 0);
    }

    #[test]
    fn font_failure_fails_the_whole_creation() {
        let mut provider = HeadlessProvider::new();
        provider.refuse(Call::OpenFont);

        let result = SurfaceStack::create(&mut provider, &desc(Some(font_desc())));
        assert!(matches!(result, Err(StackError::Provider)));

        assert_eq!(
            provider.calls(),
            &[
                Call::CreateSurface,
                Call::CreateRenderer,
                Call::CreateTexture,
                Call::DestroyTexture,
                Call::DestroyRenderer,
                Call::DestroySurface,
            ]
        );
        assert_eq!(provider.live_handles(), 0);
    }

    #[test]
    fn surface_failure_acquires_nothing() {
        let mut provider = HeadlessProvider::new();
        provider.refuse(Call::CreateSurface);

        let result = SurfaceStack::create(&mut provider, &desc(None));
        assert!(matches!(result, Err(StackError::Provider)));
        assert!(provider.calls().is_empty());
        assert_eq!(provider.live_handles(), 0);
    }

    #[test]
    fn primitives_enforce_prerequisites() {
        let mut provider = HeadlessProvider::new();
        let mut stack = SurfaceStack::<HeadlessProvider>::empty(desc(None));

        // No surface yet: renderer and texture stages are caller errors and
        // reach no provider.
        assert_eq!(
            stack.create_renderer(&mut provider),
            Err(StackError::InvalidParams)
        );
        assert_eq!(
            stack.create_texture(&mut provider),
            Err(StackError::InvalidParams)
        );
        assert_eq!(
            stack.open_font(&mut provider),
            Err(StackError::InvalidParams)
        );
        assert!(provider.calls().is_empty());

        // Piecewise assembly in order works.
        assert_eq!(stack.create_surface(&mut provider), Ok(()));
        assert_eq!(stack.create_renderer(&mut provider), Ok(()));
        assert_eq!(stack.create_texture(&mut provider), Ok(()));
        assert!(stack.is_presentable());

        // Double creation is a caller error.
        assert_eq!(
            stack.create_surface(&mut provider),
            Err(StackError::InvalidParams)
        );

        stack.destroy(&mut provider);
        assert_eq!(provider.live_handles(), 0);
    }

    #[test]
    fn destroy_primitives_report_absent_resources() {
        let mut provider = HeadlessProvider::new();
        let mut stack = SurfaceStack::<HeadlessProvider>::empty(desc(None));

        assert_eq!(
            stack.destroy_surface(&mut provider),
            Err(StackError::InvalidParams)
        );
        assert_eq!(
            stack.close_font(&mut provider),
            Err(StackError::InvalidParams)
        );

        stack.create_surface(&mut provider).expect("surface");
        assert_eq!(stack.destroy_surface(&mut provider), Ok(()));

        // Aggregate destroy on an emptied stack is a no-op.
        stack.destroy(&mut provider);
        assert_eq!(
            provider.calls(),
            &[Call::CreateSurface, Call::DestroySurface]
        );
    }
}
