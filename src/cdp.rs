//! Chrome DevTools Protocol implementation of the engine capability surface
//!
//! Maps the four session resources onto chromiumoxide: the engine handle
//! owns the CDP event-handler task, the browser handle owns the launched
//! Chrome process, the context handle is an isolated CDP browser context and
//! the page handle wraps a single chromiumoxide page.

use crate::{
    create_browser_config, BrowserFamily, BrowserHandle, ContextHandle, EngineHandle, LoadState,
    PageHandle, ScreenshotEngine, ScreenshotOptions, ThumbnailError, WorkerConfig,
};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

/// CDP-backed screenshot engine.
pub struct CdpEngine;

impl CdpEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CdpEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScreenshotEngine for CdpEngine {
    async fn start(&self, _config: &WorkerConfig) -> Result<Arc<dyn EngineHandle>, ThumbnailError> {
        debug!("Starting CDP engine runtime");
        Ok(Arc::new(CdpEngineHandle {
            handler_task: Mutex::new(None),
        }))
    }
}

/// Owns the background task that drives CDP event traffic for the launched
/// browser. Closing the engine abandons that task.
pub struct CdpEngineHandle {
    handler_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[async_trait]
impl EngineHandle for CdpEngineHandle {
    async fn launch(
        &self,
        family: BrowserFamily,
        config: &WorkerConfig,
    ) -> Result<Arc<dyn BrowserHandle>, ThumbnailError> {
        if family != BrowserFamily::Chromium {
            return Err(ThumbnailError::SessionCreation(format!(
                "{family} is not launchable over CDP; only chromium is supported by this engine"
            )));
        }

        debug!("Launching {family} browser");
        let browser_config = create_browser_config(config)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ThumbnailError::SessionCreation(e.to_string()))?;

        // The handler implements Stream and must be polled for the browser
        // connection to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::error!("CDP handler error: {}", e);
                    break;
                }
            }
            info!("CDP handler stream ended");
        });

        *self.handler_task.lock().await = Some(handler_task);

        Ok(Arc::new(CdpBrowserHandle {
            browser: Arc::new(Mutex::new(browser)),
        }))
    }

    async fn close(&self) -> Result<(), ThumbnailError> {
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}

pub struct CdpBrowserHandle {
    browser: Arc<Mutex<Browser>>,
}

#[async_trait]
impl BrowserHandle for CdpBrowserHandle {
    async fn new_context(&self) -> Result<Arc<dyn ContextHandle>, ThumbnailError> {
        let browser = self.browser.lock().await;
        let resp = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| ThumbnailError::SessionCreation(e.to_string()))?;
        let context_id = resp.result.browser_context_id.clone();

        Ok(Arc::new(CdpContextHandle {
            browser: self.browser.clone(),
            context_id,
        }))
    }

    async fn close(&self) -> Result<(), ThumbnailError> {
        self.browser
            .lock()
            .await
            .close()
            .await
            .map_err(|e| ThumbnailError::Io(e.to_string()))?;
        Ok(())
    }
}

/// An isolated CDP browser context (separate cookies and storage, like an
/// incognito profile).
pub struct CdpContextHandle {
    browser: Arc<Mutex<Browser>>,
    context_id: chromiumoxide::cdp::browser_protocol::browser::BrowserContextId,
}

#[async_trait]
impl ContextHandle for CdpContextHandle {
    async fn new_page(&self) -> Result<Arc<dyn PageHandle>, ThumbnailError> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.context_id.clone())
            .build()
            .map_err(ThumbnailError::SessionCreation)?;

        let browser = self.browser.lock().await;
        let page = browser
            .new_page(params)
            .await
            .map_err(|e| ThumbnailError::SessionCreation(e.to_string()))?;

        Ok(Arc::new(CdpPageHandle { page }))
    }

    async fn close(&self) -> Result<(), ThumbnailError> {
        let browser = self.browser.lock().await;
        browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await
            .map_err(|e| ThumbnailError::Io(e.to_string()))?;
        Ok(())
    }
}

pub struct CdpPageHandle {
    page: Page,
}

#[async_trait]
impl PageHandle for CdpPageHandle {
    async fn set_viewport_size(&self, width: u32, height: u32) -> Result<(), ThumbnailError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(ThumbnailError::SessionCreation)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| ThumbnailError::SessionCreation(e.to_string()))?;
        Ok(())
    }

    async fn navigate(&self, url: &str, nav_timeout: Duration) -> Result<(), ThumbnailError> {
        match timeout(nav_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ThumbnailError::Navigation(e.to_string())),
            Err(_) => Err(ThumbnailError::Navigation(format!(
                "timed out after {nav_timeout:?}: {url}"
            ))),
        }
    }

    async fn wait_for_load_state(&self, state: LoadState) -> Result<(), ThumbnailError> {
        // CDP exposes a single navigation-finished signal; all three load
        // states map onto it as the coarse readiness proxy.
        let _ = state;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| ThumbnailError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn screenshot(&self, options: &ScreenshotOptions) -> Result<(), ThumbnailError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(options.full_page)
            .build();

        let png_data = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| ThumbnailError::Capture(e.to_string()))?;

        tokio::fs::write(&options.path, &png_data)
            .await
            .map_err(|e| ThumbnailError::Capture(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ThumbnailError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| ThumbnailError::Io(e.to_string()))?;
        Ok(())
    }
}
