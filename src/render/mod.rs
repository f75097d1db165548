//! Preview rendering.
//!
//! This module provides:
//! - The [`Renderer`] capability injected into a session
//! - A bounded, age-limited preview cache
//! - The single-flight [`Previewer`] with its background preload queue
//! - A header-sniffing renderer for common image formats

pub mod cache;
pub mod header;
pub mod previewer;

pub use cache::PreviewCache;
pub use header::HeaderRenderer;
pub use previewer::{PreloadReport, Previewer};

use futures_util::future::LocalBoxFuture;

use crate::error::RenderError;
use crate::types::{ContentLocator, RenderedPreview};

/// Turns evidence content into a preview.
///
/// The returned future must not borrow from the renderer or the locator; clone
/// whatever it needs up front.
pub trait Renderer {
    fn render(&self, locator: &ContentLocator) -> LocalBoxFuture<'static, Result<RenderedPreview, RenderError>>;
}

/// Current instant on the runtime clock, so paused-time tests stay consistent.
pub(crate) fn clock_now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
