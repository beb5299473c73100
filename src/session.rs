//! Browser session ownership and bounded teardown
//!
//! A [`Session`] bundles the four nested resources of one automation session
//! in creation order. [`SessionFactory`] brings them up in fixed order and
//! tears down whatever was already created when a later step fails, so a
//! partial session is never returned or leaked. [`close_session`] is the
//! bounded shutdown: each resource gets its own background close task and
//! its own time budget, so the caller never blocks past four budgets.

use crate::{BrowserHandle, ContextHandle, EngineHandle, PageHandle, ScreenshotEngine};
use crate::{ThumbnailError, WorkerConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// The four resources of one live browser automation session.
///
/// Strict ownership chain: if `page` is present, `context`, `browser` and
/// `engine` are present too. Owned exclusively by one worker and consumed by
/// [`close_session`].
pub struct Session {
    pub engine: Option<Arc<dyn EngineHandle>>,
    pub browser: Option<Arc<dyn BrowserHandle>>,
    pub context: Option<Arc<dyn ContextHandle>>,
    pub page: Option<Arc<dyn PageHandle>>,
}

impl Session {
    pub fn page(&self) -> Option<&Arc<dyn PageHandle>> {
        self.page.as_ref()
    }
}

/// Creates sessions from configuration in fixed order:
/// engine -> browser -> context -> page.
pub struct SessionFactory {
    engine: Arc<dyn ScreenshotEngine>,
}

impl SessionFactory {
    pub fn new(engine: Arc<dyn ScreenshotEngine>) -> Self {
        Self { engine }
    }

    pub async fn create(&self, config: &WorkerConfig) -> Result<Session, ThumbnailError> {
        debug!("Creating {} session", config.browser_family);
        let close_budget = config.close_timeout();

        let engine = self
            .engine
            .start(config)
            .await
            .map_err(creation_error)?;

        let browser = match engine.launch(config.browser_family, config).await {
            Ok(browser) => browser,
            Err(e) => {
                self.abort_partial(Some(engine), None, None, None, close_budget)
                    .await;
                return Err(creation_error(e));
            }
        };

        let context = match browser.new_context().await {
            Ok(context) => context,
            Err(e) => {
                self.abort_partial(Some(engine), Some(browser), None, None, close_budget)
                    .await;
                return Err(creation_error(e));
            }
        };

        let page = match context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                self.abort_partial(Some(engine), Some(browser), Some(context), None, close_budget)
                    .await;
                return Err(creation_error(e));
            }
        };

        if let Err(e) = page
            .set_viewport_size(config.viewport_width, config.viewport_height)
            .await
        {
            self.abort_partial(
                Some(engine),
                Some(browser),
                Some(context),
                Some(page),
                close_budget,
            )
            .await;
            return Err(creation_error(e));
        }

        debug!(
            "Session created with {}x{} viewport",
            config.viewport_width, config.viewport_height
        );

        Ok(Session {
            engine: Some(engine),
            browser: Some(browser),
            context: Some(context),
            page: Some(page),
        })
    }

    async fn abort_partial(
        &self,
        engine: Option<Arc<dyn EngineHandle>>,
        browser: Option<Arc<dyn BrowserHandle>>,
        context: Option<Arc<dyn ContextHandle>>,
        page: Option<Arc<dyn PageHandle>>,
        close_budget: Duration,
    ) {
        warn!("Session creation failed, tearing down partial session");
        close_session(
            Session {
                engine,
                browser,
                context,
                page,
            },
            close_budget,
        )
        .await;
    }
}

/// Close all session resources, tolerating any subset being absent.
///
/// Each resource is closed by its own spawned task and awaited under its own
/// `close_budget`; a close that overruns is abandoned and logged, never
/// joined. Worst case the call returns after four budgets. Close order
/// mirrors creation order in reverse as a convention; correctness does not
/// depend on it since each close runs independently.
pub async fn close_session(session: Session, close_budget: Duration) {
    let Session {
        engine,
        browser,
        context,
        page,
    } = session;

    if let Some(page) = page {
        debug!("Closing page...");
        close_in_background("page", close_budget, async move { page.close().await }).await;
    }
    if let Some(context) = context {
        debug!("Closing browser context...");
        close_in_background("browser context", close_budget, async move {
            context.close().await
        })
        .await;
    }
    if let Some(browser) = browser {
        debug!("Closing browser...");
        close_in_background("browser", close_budget, async move { browser.close().await }).await;
    }
    if let Some(engine) = engine {
        debug!("Closing engine...");
        close_in_background("engine", close_budget, async move { engine.close().await }).await;
    }
}

async fn close_in_background<F>(name: &'static str, close_budget: Duration, close: F)
where
    F: Future<Output = Result<(), ThumbnailError>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        if let Err(e) = close.await {
            warn!("Failed to close the {}: {}", name, e);
        }
    });

    match timeout(close_budget, task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Close task for the {} panicked: {}", name, e),
        Err(_) => warn!(
            "Closing the {} timed out after {:?}, abandoning it",
            name, close_budget
        ),
    }
}

fn creation_error(e: ThumbnailError) -> ThumbnailError {
    match e {
        e @ ThumbnailError::UnsupportedBrowser(_) | e @ ThumbnailError::SessionCreation(_) => e,
        other => ThumbnailError::SessionCreation(other.to_string()),
    }
}
