use crate::{
    sanitize_filename, ResolvedTarget, ThumbnailError, ThumbnailResolver, ThumbnailStore,
    ThumbnailWorker, WorkerConfig,
};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "thumbnail-worker")]
#[command(about = "Web page thumbnail generation worker")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        help = "Execution mode (crawler, suggest, thumbnail); overrides WORKER_EXECUTE_TYPE"
    )]
    pub mode: Option<String>,

    #[arg(long, help = "Browser executable path")]
    pub browser_path: Option<String>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate thumbnails for all ids in a mapping file
    Run {
        #[arg(
            short,
            long,
            help = "Input file mapping thumbnail ids to URLs (id<TAB>url per line)"
        )]
        input: PathBuf,

        #[arg(short, long, help = "Output directory for thumbnails")]
        output: PathBuf,
    },

    /// Generate a single thumbnail
    Single {
        #[arg(long, help = "Thumbnail id")]
        id: String,

        #[arg(short, long, help = "URL to thumbnail")]
        url: String,

        #[arg(short, long, help = "Output file path")]
        output: PathBuf,
    },

    /// Validate configuration
    Validate {
        #[arg(short, long, help = "Configuration file to validate")]
        config: PathBuf,
    },
}

/// Resolver backed by an id-to-URL mapping file.
#[derive(Debug)]
pub struct FileResolver {
    targets: HashMap<String, ResolvedTarget>,
}

impl FileResolver {
    pub fn new(targets: HashMap<String, ResolvedTarget>) -> Self {
        Self { targets }
    }

    pub fn single(id: &str, url: &str) -> Self {
        let mut targets = HashMap::new();
        targets.insert(
            id.to_string(),
            ResolvedTarget {
                config_id: "default".to_string(),
                url: url.to_string(),
            },
        );
        Self { targets }
    }

    /// Parse `id<TAB>url` lines; blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Result<Self, ThumbnailError> {
        let mut targets = HashMap::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (id, url) = line.split_once('\t').ok_or_else(|| {
                ThumbnailError::Io(format!("line {}: expected id<TAB>url", number + 1))
            })?;
            targets.insert(
                id.trim().to_string(),
                ResolvedTarget {
                    config_id: "default".to_string(),
                    url: url.trim().to_string(),
                },
            );
        }
        Ok(Self { targets })
    }

    pub async fn from_file(path: &Path) -> Result<Self, ThumbnailError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.targets.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ThumbnailResolver for FileResolver {
    async fn resolve(&self, thumbnail_id: &str) -> Result<ResolvedTarget, ThumbnailError> {
        self.targets
            .get(thumbnail_id)
            .cloned()
            .ok_or_else(|| ThumbnailError::NotFound(thumbnail_id.to_string()))
    }
}

/// Store that only logs the cleared reference; the CLI has no record store.
pub struct LoggingStore;

#[async_trait]
impl ThumbnailStore for LoggingStore {
    async fn clear_thumbnail_reference(&self, thumbnail_id: &str) -> Result<(), ThumbnailError> {
        debug!("Clearing thumbnail reference: {}", thumbnail_id);
        Ok(())
    }
}

pub struct CliRunner {
    pub worker: Arc<ThumbnailWorker>,
}

impl CliRunner {
    pub fn new(worker: Arc<ThumbnailWorker>) -> Self {
        Self { worker }
    }

    pub async fn run_batch(&self, ids: Vec<String>, output_dir: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(output_dir).await?;

        let mut generated = 0usize;
        let mut failed = 0usize;
        for id in &ids {
            let output = output_dir.join(format!("{}.png", sanitize_filename(id)));
            if self.worker.generate(id, &output).await {
                generated += 1;
            } else {
                failed += 1;
                warn!("Thumbnail not produced: {}", id);
            }
        }

        info!(
            "Thumbnail run completed. Generated: {}, Failed: {}",
            generated, failed
        );
        Ok(())
    }

    pub async fn run_single(&self, id: &str, output: &Path) -> anyhow::Result<()> {
        if self.worker.generate(id, output).await {
            info!("Thumbnail written to {}", output.display());
            Ok(())
        } else {
            anyhow::bail!("thumbnail not produced for {id}")
        }
    }
}

pub async fn validate_config_file(path: &Path) -> anyhow::Result<WorkerConfig> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: WorkerConfig = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &WorkerConfig) -> anyhow::Result<()> {
    if config.viewport_width == 0 || config.viewport_height == 0 {
        anyhow::bail!("Viewport dimensions must be greater than 0");
    }

    if config.target_width == 0 || config.max_height == 0 {
        anyhow::bail!("Thumbnail dimensions must be greater than 0");
    }

    if config.navigation_timeout_ms == 0 {
        anyhow::bail!("Navigation timeout must be greater than 0");
    }

    if config.close_timeout_secs == 0 {
        anyhow::bail!("Close timeout must be greater than 0");
    }

    Ok(())
}

pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_resolver_parse_and_resolve() {
        let resolver = FileResolver::parse(
            "# mapping\ndoc-1\thttps://example.com/a\n\ndoc-2\thttps://example.com/b\n",
        )
        .unwrap();

        assert_eq!(resolver.ids(), vec!["doc-1", "doc-2"]);
        assert_eq!(
            resolver.resolve("doc-1").await.unwrap(),
            ResolvedTarget {
                config_id: "default".to_string(),
                url: "https://example.com/a".to_string(),
            }
        );
        assert!(matches!(
            resolver.resolve("missing").await,
            Err(ThumbnailError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_resolver_rejects_malformed_line() {
        let err = FileResolver::parse("doc-1 https://example.com/a").unwrap_err();
        assert!(matches!(err, ThumbnailError::Io(_)));
    }

    #[test]
    fn test_validate_config_rejects_zero_dimensions() {
        let config = WorkerConfig {
            target_width: 0,
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
        assert!(validate_config(&WorkerConfig::default()).is_ok());
    }
}
