//! # Thumbnail Worker
//!
//! Renders visual thumbnails for crawled web pages: each worker owns a
//! single headless browser session, navigates to a page, captures a
//! screenshot and writes a resized/clipped PNG preview for the search index.
//!
//! The browser engine is an opaque capability behind the trait surface in
//! [`engine`]; the default implementation drives Chromium over the Chrome
//! DevTools Protocol. All captures against one worker are serialized, and
//! teardown is bounded: every session resource gets its own close budget so
//! shutdown can never hang on an uncooperative browser process.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thumbnail_worker::{
//!     CdpEngine, ExecutionMode, FileResolver, LoggingStore, ThumbnailWorker, WorkerConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = ThumbnailWorker::new(
//!         WorkerConfig::default(),
//!         Arc::new(CdpEngine::new()),
//!         Arc::new(FileResolver::single("doc-1", "https://example.com")),
//!         Arc::new(LoggingStore),
//!     );
//!     worker.init(ExecutionMode::Thumbnail).await?;
//!
//!     let created = worker.generate("doc-1", "thumbnails/doc-1.png".as_ref()).await;
//!     println!("thumbnail created: {created}");
//!
//!     worker.destroy().await;
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # One thumbnail
//! thumbnail-worker single --id doc-1 --url https://example.com --output doc-1.png
//!
//! # Batch from an id<TAB>url mapping file
//! thumbnail-worker run --input ids.tsv --output thumbnails/
//! ```

/// Configuration, browser family, load state and execution mode values
pub mod config;

/// Error types and classification
pub mod error;

/// Opaque engine capability surface (handle traits)
pub mod engine;

/// Chrome DevTools Protocol engine implementation
pub mod cdp;

/// Session ownership, factory and bounded shutdown
pub mod session;

/// Screenshot pipeline: navigate, capture, resize, clip, encode
pub mod pipeline;

/// Thumbnail worker with serialized generation
pub mod worker;

/// Generation metrics
pub mod metrics;

/// Command-line interface and host wiring
pub mod cli;

/// Temp-file, path and URL helpers
pub mod utils;


pub use cdp::*;
pub use cli::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use metrics::*;
pub use pipeline::*;
pub use session::*;
pub use utils::*;
pub use worker::*;
