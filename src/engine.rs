//! Engine capability surface consumed by the session factory and pipeline
//!
//! The browser engine is treated as an opaque collaborator: four nested
//! handle types mirroring the resources of one automation session (engine
//! runtime, browser process, isolated browsing context, single page), plus a
//! `ScreenshotEngine` entry point that starts the runtime. The CDP-backed
//! implementation lives in [`crate::cdp`]; tests substitute fakes.

use crate::{BrowserFamily, LoadState, ThumbnailError, WorkerConfig};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options for a raw screenshot capture.
#[derive(Debug, Clone)]
pub struct ScreenshotOptions {
    /// Destination the engine writes the raw capture to.
    pub path: PathBuf,
    /// Capture the full page height instead of the viewport.
    pub full_page: bool,
}

/// Entry point that brings up the engine runtime.
#[async_trait]
pub trait ScreenshotEngine: Send + Sync {
    async fn start(&self, config: &WorkerConfig) -> Result<Arc<dyn EngineHandle>, ThumbnailError>;
}

/// The engine runtime itself, outermost resource of a session.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    async fn launch(
        &self,
        family: BrowserFamily,
        config: &WorkerConfig,
    ) -> Result<Arc<dyn BrowserHandle>, ThumbnailError>;

    async fn close(&self) -> Result<(), ThumbnailError>;
}

/// A launched browser process.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    async fn new_context(&self) -> Result<Arc<dyn ContextHandle>, ThumbnailError>;

    async fn close(&self) -> Result<(), ThumbnailError>;
}

/// An isolated browsing context within a browser.
#[async_trait]
pub trait ContextHandle: Send + Sync {
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>, ThumbnailError>;

    async fn close(&self) -> Result<(), ThumbnailError>;
}

/// A single page belonging to one context.
///
/// Not safe for concurrent navigation or capture; callers serialize access.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn set_viewport_size(&self, width: u32, height: u32) -> Result<(), ThumbnailError>;

    /// Navigate to `url`, failing with [`ThumbnailError::Navigation`] on
    /// timeout or transport failure.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ThumbnailError>;

    /// Wait for the configured readiness signal after a navigation.
    async fn wait_for_load_state(&self, state: LoadState) -> Result<(), ThumbnailError>;

    /// Capture a raw screenshot and write it to `options.path`.
    async fn screenshot(&self, options: &ScreenshotOptions) -> Result<(), ThumbnailError>;

    async fn close(&self) -> Result<(), ThumbnailError>;
}
