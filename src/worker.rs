//! Thumbnail worker: session ownership and serialized generation
//!
//! The worker owns exactly one browser session and serializes every
//! screenshot against it. `generate` never raises per-request failures to
//! the caller; it cleans up and returns `false` instead.

use crate::{
    close_session, ensure_parent_dir, ExecutionMode, Metrics, ScreenshotEngine,
    ScreenshotPipeline, Session, SessionFactory, ThumbnailError, WorkerConfig,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Resolution of a thumbnail id to its crawl config and target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub config_id: String,
    pub url: String,
}

/// Lookup capability mapping thumbnail ids to target URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThumbnailResolver: Send + Sync {
    /// Fails with [`ThumbnailError::NotFound`] for unknown ids.
    async fn resolve(&self, thumbnail_id: &str) -> Result<ResolvedTarget, ThumbnailError>;
}

/// Update capability for the stored thumbnail reference of a document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    /// Idempotent clear; a failure is logged by the caller, never surfaced.
    async fn clear_thumbnail_reference(&self, thumbnail_id: &str) -> Result<(), ThumbnailError>;
}

pub struct ThumbnailWorker {
    config: WorkerConfig,
    factory: SessionFactory,
    pipeline: ScreenshotPipeline,
    resolver: Arc<dyn ThumbnailResolver>,
    store: Arc<dyn ThumbnailStore>,
    metrics: Metrics,
    // Holding this lock is what serializes captures against the single page.
    session: Mutex<Option<Session>>,
    available: AtomicBool,
}

impl ThumbnailWorker {
    pub fn new(
        config: WorkerConfig,
        engine: Arc<dyn ScreenshotEngine>,
        resolver: Arc<dyn ThumbnailResolver>,
        store: Arc<dyn ThumbnailStore>,
    ) -> Self {
        let pipeline = ScreenshotPipeline::new(&config);
        Self {
            factory: SessionFactory::new(engine),
            pipeline,
            resolver,
            store,
            metrics: Metrics::new(),
            session: Mutex::new(None),
            available: AtomicBool::new(false),
            config,
        }
    }

    /// Conditionally create the session.
    ///
    /// The same artifact runs on crawler, suggest and thumbnail workers;
    /// only the thumbnail mode allocates browser resources. Availability
    /// becomes true only after the session is fully created.
    pub async fn init(&self, mode: ExecutionMode) -> Result<(), ThumbnailError> {
        if mode != ExecutionMode::Thumbnail {
            debug!("Execution mode is {:?}, thumbnail worker is disabled", mode);
            return Ok(());
        }

        match self.factory.create(&self.config).await {
            Ok(session) => {
                *self.session.lock().await = Some(session);
                self.available.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.available.store(false, Ordering::SeqCst);
                warn!("Failed to create browser session: {}", e);
                Err(e)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Generate a thumbnail for `thumbnail_id` at `output_path`.
    ///
    /// Returns true iff the output file exists when the call completes:
    /// immediately for an already-existing file, after a successful capture
    /// otherwise. Every per-request failure is caught, logged, and cleaned
    /// up (stored reference cleared, partial output deleted) before
    /// returning false.
    pub async fn generate(&self, thumbnail_id: &str, output_path: &Path) -> bool {
        if !self.is_available() {
            warn!("[{}] Browser session is not available", thumbnail_id);
            return false;
        }

        debug!("Generate thumbnail: {}", thumbnail_id);

        if output_path.exists() {
            debug!("The thumbnail file exists: {}", output_path.display());
            return true;
        }

        match ensure_parent_dir(output_path) {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    "[{}] Output parent is not a directory: {}",
                    thumbnail_id,
                    output_path.display()
                );
                return false;
            }
            Err(e) => {
                warn!(
                    "[{}] Failed to create output directory for {}: {}",
                    thumbnail_id,
                    output_path.display(),
                    e
                );
                return false;
            }
        }

        let start = Instant::now();
        if let Err(e) = self.try_generate(thumbnail_id, output_path).await {
            warn!(
                "Failed to create thumbnail: {} ({}: {})",
                thumbnail_id,
                e.classification(),
                e
            );
            self.metrics.record_error(e.classification());
            self.cleanup_failed(thumbnail_id, output_path).await;
        }

        // The metric and the return value come from the same final
        // existence check, so they can never disagree.
        let created = output_path.exists();
        self.metrics.record_generation(start.elapsed(), created);
        created
    }

    async fn try_generate(
        &self,
        thumbnail_id: &str,
        output_path: &Path,
    ) -> Result<(), ThumbnailError> {
        let target = self.resolver.resolve(thumbnail_id).await?;
        debug!(
            "Resolved {} -> {} (config: {})",
            thumbnail_id, target.url, target.config_id
        );

        // One capture at a time against the single session page.
        let session = self.session.lock().await;
        let page = session
            .as_ref()
            .and_then(|s| s.page())
            .ok_or_else(|| ThumbnailError::Capture("session is closed".to_string()))?;

        self.pipeline
            .capture(
                page.as_ref(),
                &target.url,
                self.config.target_width,
                self.config.max_height,
                output_path,
            )
            .await
    }

    async fn cleanup_failed(&self, thumbnail_id: &str, output_path: &Path) {
        if let Err(e) = self.store.clear_thumbnail_reference(thumbnail_id).await {
            warn!(
                "Failed to clear thumbnail reference for {}: {}",
                thumbnail_id, e
            );
        }

        if output_path.exists() {
            if let Err(e) = std::fs::remove_file(output_path) {
                warn!("Failed to delete {}: {}", output_path.display(), e);
            }
        }
    }

    /// Tear down the session under the bounded close budget.
    ///
    /// The session is invalidated first, so a `generate` call racing with
    /// destruction fails fast instead of reusing closed handles. Safe to
    /// call when no session exists.
    pub async fn destroy(&self) {
        self.available.store(false, Ordering::SeqCst);
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            close_session(session, self.config.close_timeout()).await;
        }
    }
}
