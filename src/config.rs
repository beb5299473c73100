//! Configuration management with serde serialization/deserialization
//!
//! This module provides the worker configuration plus the enumerated browser
//! family, load state and execution mode values, and the Chrome argument
//! builders used by the CDP engine adapter.

use crate::ThumbnailError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Browser family used to launch the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFamily {
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserFamily::Chromium => "chromium",
            BrowserFamily::Firefox => "firefox",
            BrowserFamily::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserFamily {
    type Err = ThumbnailError;

    /// Values outside the enumerated set are rejected before any browser
    /// resource is created.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(BrowserFamily::Chromium),
            "firefox" => Ok(BrowserFamily::Firefox),
            "webkit" => Ok(BrowserFamily::Webkit),
            other => Err(ThumbnailError::UnsupportedBrowser(other.to_string())),
        }
    }
}

impl Default for BrowserFamily {
    fn default() -> Self {
        BrowserFamily::Chromium
    }
}

/// Coarse page readiness signal the pipeline waits for before capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::NetworkIdle
    }
}

/// Execution mode of the deployable artifact.
///
/// The same binary runs on crawler, suggest and thumbnail workers; only the
/// `Thumbnail` mode allocates a browser session during `init()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Crawler,
    Suggest,
    Thumbnail,
}

impl ExecutionMode {
    /// Environment value consulted when no explicit mode is passed.
    pub const ENV_KEY: &'static str = "WORKER_EXECUTE_TYPE";

    pub fn from_env() -> Option<Self> {
        std::env::var(Self::ENV_KEY).ok().and_then(|v| v.parse().ok())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crawler" => Ok(ExecutionMode::Crawler),
            "suggest" => Ok(ExecutionMode::Suggest),
            "thumbnail" => Ok(ExecutionMode::Thumbnail),
            other => Err(format!("unknown execution mode: {other}")),
        }
    }
}

/// Worker configuration, read once at session-creation time
///
/// Immutable after worker construction. Defaults match the production
/// thumbnail workers: a 960x960 viewport, 30s navigation timeout and a 15s
/// per-resource close budget.
///
/// # Examples
///
/// ```rust
/// use thumbnail_worker::WorkerConfig;
///
/// // Use default configuration
/// let config = WorkerConfig::default();
///
/// // Create custom configuration
/// let config = WorkerConfig {
///     target_width: 400,
///     max_height: 600,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Browser family to launch (default: chromium)
    pub browser_family: BrowserFamily,

    /// Viewport width in pixels applied to the session page (default: 960)
    pub viewport_width: u32,

    /// Viewport height in pixels applied to the session page (default: 960)
    pub viewport_height: u32,

    /// Navigation timeout in milliseconds (default: 30000)
    ///
    /// A stuck navigation occupies the session until the engine reports a
    /// timeout; there is no per-call override.
    pub navigation_timeout_ms: u64,

    /// Readiness signal waited for after navigation (default: networkidle)
    pub load_state: LoadState,

    /// Per-resource close budget in seconds during shutdown (default: 15)
    pub close_timeout_secs: u64,

    /// Capture the full page height instead of the viewport (default: false)
    pub full_page_capture: bool,

    /// Output thumbnail width in pixels (default: 100)
    pub target_width: u32,

    /// Maximum output thumbnail height in pixels (default: 100)
    ///
    /// Taller resized images are clipped from the top-left origin, not
    /// rescaled a second time.
    pub max_height: u32,

    /// Path to the browser executable (default: auto-detect)
    pub browser_path: Option<String>,

    /// Extra launch arguments appended to the generated set
    pub launch_args: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            browser_family: BrowserFamily::default(),
            viewport_width: 960,
            viewport_height: 960,
            navigation_timeout_ms: 30_000,
            load_state: LoadState::default(),
            close_timeout_secs: 15,
            full_page_capture: false,
            target_width: 100,
            max_height: 100,
            browser_path: None,
            launch_args: Vec::new(),
        }
    }
}

impl WorkerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }
}

/// Generate Chrome command-line arguments for a thumbnail session
///
/// The set is tuned for a single long-lived headless instance: sandboxing
/// and GPU are off, background throttling is disabled so offscreen pages
/// keep rendering, and the user data directory is unique per process.
pub fn get_browser_args(config: &WorkerConfig) -> Vec<String> {
    let mut args = vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--ignore-certificate-errors".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport_width, config.viewport_height
        ),
        format!(
            "--user-data-dir=/tmp/thumbnail-worker-{}",
            std::process::id()
        ),
    ];

    args.extend(config.launch_args.iter().cloned());
    args
}

pub fn create_browser_config(
    config: &WorkerConfig,
) -> Result<chromiumoxide::browser::BrowserConfig, ThumbnailError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport_width, config.viewport_height)
        .args(get_browser_args(config));

    if let Some(path) = &config.browser_path {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(ThumbnailError::SessionCreation)
}
