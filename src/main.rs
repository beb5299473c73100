use clap::Parser;
use std::sync::Arc;
use thumbnail_worker::{
    setup_logging, validate_config, validate_config_file, CdpEngine, Cli, CliRunner, Commands,
    ExecutionMode, FileResolver, LoggingStore, ThumbnailWorker, WorkerConfig,
};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    info!("Starting thumbnail-worker v{}", env!("CARGO_PKG_VERSION"));

    if let Commands::Validate { config } = &args.command {
        let config = validate_config_file(config).await?;
        info!("Configuration is valid: {:?}", config);
        return Ok(());
    }

    let config = load_config(&args).await?;
    let mode = resolve_mode(&args)?;
    info!("Execution mode: {:?}", mode);

    let resolver: Arc<FileResolver> = match &args.command {
        Commands::Run { input, .. } => Arc::new(FileResolver::from_file(input).await?),
        Commands::Single { id, url, .. } => Arc::new(FileResolver::single(id, url)),
        Commands::Validate { .. } => unreachable!(),
    };

    let worker = Arc::new(ThumbnailWorker::new(
        config,
        Arc::new(CdpEngine::new()),
        resolver.clone(),
        Arc::new(LoggingStore),
    ));
    worker.init(mode).await?;

    let runner = CliRunner::new(worker.clone());

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel(1);
    let _shutdown_handler = setup_shutdown_handler(shutdown_tx);

    let result = tokio::select! {
        result = run_command(&runner, &resolver, &args.command) => {
            info!("Command completed");
            result
        }
        _ = shutdown_rx.recv() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    info!("Shutting down...");
    worker.destroy().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        std::process::exit(1);
    }

    info!("thumbnail-worker stopped");
    Ok(())
}

async fn run_command(
    runner: &CliRunner,
    resolver: &FileResolver,
    command: &Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Run { output, .. } => runner.run_batch(resolver.ids(), output).await,
        Commands::Single { id, output, .. } => runner.run_single(id, output).await,
        Commands::Validate { .. } => unreachable!(),
    }
}

async fn load_config(args: &Cli) -> anyhow::Result<WorkerConfig> {
    let mut config = if let Some(config_path) = &args.config {
        let content = tokio::fs::read_to_string(config_path).await?;
        serde_json::from_str(&content)?
    } else {
        WorkerConfig::default()
    };

    if let Some(browser_path) = &args.browser_path {
        config.browser_path = Some(browser_path.clone());
    }

    validate_config(&config)?;

    info!("Configuration loaded successfully");
    info!(
        "Viewport: {}x{}, thumbnail: {}x{} max",
        config.viewport_width, config.viewport_height, config.target_width, config.max_height
    );

    Ok(config)
}

fn resolve_mode(args: &Cli) -> anyhow::Result<ExecutionMode> {
    if let Some(mode) = &args.mode {
        return mode.parse().map_err(|e: String| anyhow::anyhow!(e));
    }

    // The standalone binary defaults to thumbnail mode; deployments that
    // share the artifact across worker roles set WORKER_EXECUTE_TYPE.
    Ok(ExecutionMode::from_env().unwrap_or(ExecutionMode::Thumbnail))
}

fn setup_shutdown_handler(
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to create SIGINT handler");
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to create SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        let _ = shutdown_tx.send(());
    })
}
