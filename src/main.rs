use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use color_eyre::eyre::{Result, bail, eyre};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lazyfetch::application::{MediaLoader, SlotRequest, ViewportTracker, generate_placeholder};
use lazyfetch::domain::entities::{RenderContent, RenderState};
use lazyfetch::domain::ports::MediaCachePort;
use lazyfetch::infrastructure::{
    AppConfig, CacheBackend, CliArgs, Command, DiskMediaCache, HttpMediaFetcher, MemoryMediaCache,
    StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(storage: &StorageManager, args: &CliArgs) -> Result<AppConfig> {
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn run_config(
    storage: &StorageManager,
    config: &AppConfig,
    path_override: Option<&Path>,
    save: bool,
) -> Result<()> {
    let path = if save {
        let path = storage.save_config(config, path_override)?;
        info!(path = %path.display(), "Saved configuration");
        path
    } else {
        storage.config_path(path_override)
    };

    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn create_cache(config: &AppConfig) -> Result<Arc<dyn MediaCachePort>> {
    let cache: Arc<dyn MediaCachePort> = match config.cache.backend {
        CacheBackend::Disk => {
            let dir = config.cache.effective_dir();
            debug!(dir = %dir.display(), "Using disk cache");
            Arc::new(DiskMediaCache::new(dir).await?)
        }
        CacheBackend::Memory => Arc::new(MemoryMediaCache::new(config.cache.memory_capacity)),
    };
    Ok(cache)
}

async fn create_loader(config: &AppConfig) -> Result<MediaLoader> {
    let cache = create_cache(config).await?;
    let fetcher = Arc::new(HttpMediaFetcher::new(&config.network)?);
    Ok(MediaLoader::new(
        cache,
        fetcher,
        ViewportTracker::default(),
        config.loader.clone(),
    ))
}

async fn run_prefetch(config: &AppConfig, urls: Vec<String>) -> Result<()> {
    let loader = create_loader(config).await?;
    let report = loader.prefetcher().prefetch_all(urls).await;

    println!("{report}");
    for (url, error) in report.failures() {
        println!("  {url}: {error}");
    }
    Ok(())
}

async fn run_get(config: &AppConfig, url: String, output: Option<&Path>) -> Result<()> {
    let loader = create_loader(config).await?;
    let (slot, mut states) = loader.mount(SlotRequest::priority(url));

    let mut terminal: Option<RenderState> = None;
    while let Some(state) = states.recv().await {
        debug!(phase = %state.phase, "Slot state");
        if state.phase.is_terminal() {
            terminal = Some(state);
            break;
        }
    }
    let url = slot.source_url().to_string();
    slot.dispose();

    let Some(state) = terminal else {
        bail!("slot for {url} closed before settling");
    };

    let bytes: &[u8] = match &state.content {
        RenderContent::Image(payload) => &payload[..],
        RenderContent::Fallback(asset) => {
            eprintln!("Failed to load {url}; using fallback asset {}", asset.path);
            asset.bytes
        }
        RenderContent::Placeholder(_) => bail!("slot for {url} settled on a placeholder"),
    };

    match output {
        Some(path) => {
            tokio::fs::write(path, bytes).await?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => println!("{url}: {} bytes", bytes.len()),
    }

    if state.has_error {
        return Err(eyre!("failed to load {url}"));
    }
    Ok(())
}

async fn run_inspect(config: &AppConfig, url: &str) -> Result<()> {
    let cache = create_cache(config).await?;

    let Some(entry) = cache.load_entry(url).await? else {
        println!("{url}: not cached");
        return Ok(());
    };

    let now = Utc::now();
    println!("{url}");
    println!("  captured_at:    {}", entry.captured_at.to_rfc3339());
    println!("  age:            {}h", entry.age_at(now).num_hours());
    println!("  format_version: {}", entry.format_version);
    println!("  size:           {} bytes", entry.size());
    println!("  fresh:          {}", entry.is_fresh_at(now));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let storage = StorageManager::new()?;
    let config = load_config(&storage, &args)?;

    init_logging(&config)?;

    info!(version = lazyfetch::VERSION, "Starting lazyfetch");

    match args.command {
        Command::Prefetch { urls } => run_prefetch(&config, urls).await,
        Command::Get { url, output } => run_get(&config, url, output.as_deref()).await,
        Command::Inspect { url } => run_inspect(&config, &url).await,
        Command::Config { save } => run_config(&storage, &config, args.config.as_deref(), save),
        Command::Placeholder { width, height } => {
            println!("{}", generate_placeholder(width, height).data_uri);
            Ok(())
        }
    }
}
