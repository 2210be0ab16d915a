//! driveremote CLI - command line access to a Google Drive remote.
//!
//! Each command takes full `gdrive://<root>/<path>` URLs. Client settings
//! and stored credentials come from the config file and the credential
//! store; run `login` once before anything else.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use driveremote_common::StoragePath;
use driveremote_storage::gdrive::{AuthManager, CLIENT_ID_ENV};
use driveremote_storage::{create_default_registry, GDriveConfig, NoProgress, Remote};

#[derive(Parser)]
#[command(name = "driveremote")]
#[command(about = "driveremote - Google Drive remote storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// JSON config file (default: <config dir>/driveremote/config.json).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize access to Google Drive and store the tokens.
    Login,

    /// Check whether remote paths exist.
    Exists {
        /// Remote URLs to check.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Upload a local file.
    Upload {
        /// Local file to upload.
        source: PathBuf,

        /// Destination URL.
        dest: String,

        /// Do not report progress.
        #[arg(long)]
        no_progress: bool,
    },

    /// Download a remote file.
    Download {
        /// Source URL.
        source: String,

        /// Local destination file.
        dest: PathBuf,

        /// Do not report progress.
        #[arg(long)]
        no_progress: bool,
    },

    /// Create a folder chain.
    Mkdir {
        /// Folder URL.
        url: String,
    },

    /// Print the MD5 checksum of a remote file.
    Checksum {
        /// File URL.
        url: String,
    },

    /// List entries directly under a remote folder.
    Ls {
        /// Folder URL.
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = load_config(&config_path).await?;

    match cli.command {
        Commands::Login => cmd_login(config).await,

        Commands::Exists { urls } => cmd_exists(config, &urls).await,

        Commands::Upload {
            source,
            dest,
            no_progress,
        } => cmd_upload(config, &source, &dest, no_progress).await,

        Commands::Download {
            source,
            dest,
            no_progress,
        } => cmd_download(config, &source, &dest, no_progress).await,

        Commands::Mkdir { url } => cmd_mkdir(config, &url).await,

        Commands::Checksum { url } => cmd_checksum(config, &url).await,

        Commands::Ls { url } => cmd_ls(config, &url).await,
    }
}

fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Cannot determine user config directory")?;
    Ok(dir.join("driveremote").join("config.json"))
}

/// Read the config file as a JSON object; a missing file means defaults.
async fn load_config(path: &Path) -> Result<Value> {
    match tokio::fs::read(path).await {
        Ok(raw) => {
            let value: Value = serde_json::from_slice(&raw)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            anyhow::ensure!(value.is_object(), "Config file {} must hold a JSON object", path.display());
            Ok(value)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Object(Default::default())),
        Err(e) => Err(e).with_context(|| format!("Failed to read config file {}", path.display())),
    }
}

/// Build the remote rooted at `url`.
fn open_remote(mut config: Value, url: &str) -> Result<Arc<dyn Remote>> {
    config["url"] = Value::String(url.to_string());
    create_default_registry()
        .resolve("gdrive", config)
        .context("Failed to open remote")
}

fn parse_url(url: &str) -> Result<StoragePath> {
    StoragePath::parse(url).with_context(|| format!("Invalid remote URL: {}", url))
}

/// Run the OAuth2 consent flow and store the tokens.
async fn cmd_login(mut config: Value) -> Result<()> {
    config["url"] = Value::String("gdrive://root".to_string());
    let config: GDriveConfig = serde_json::from_value(config).context("Invalid config")?;

    let auth_config = config.auth_config.clone().unwrap_or_default();
    anyhow::ensure!(
        !auth_config.client_id.is_empty(),
        "No OAuth2 client ID: set auth_config.client_id in the config file or {}",
        CLIENT_ID_ENV
    );
    let auth_manager = AuthManager::new(auth_config)?;
    let (url, _csrf) = auth_manager.authorization_url();

    println!("Open this URL in your browser to authorize access:\n\n  {}\n", url);
    if let Err(e) = open::that(&url) {
        warn!("Could not open browser: {}", e);
    }

    println!("Paste the authorization code:");
    let mut code = String::new();
    std::io::stdin()
        .read_line(&mut code)
        .context("Failed to read authorization code")?;

    let tokens = auth_manager
        .exchange_code(code.trim())
        .await
        .context("Failed to exchange authorization code")?;

    let store = config.credential_store()?;
    store.save(&tokens).await.context("Failed to store credentials")?;

    println!("Credentials saved to {}", store.path().display());
    Ok(())
}

/// Check existence of one or more paths.
async fn cmd_exists(config: Value, urls: &[String]) -> Result<()> {
    let paths = urls
        .iter()
        .map(|url| parse_url(url))
        .collect::<Result<Vec<_>>>()?;

    let remote = open_remote(config, &urls[0])?;
    let results = remote
        .batch_exists(&paths, &NoProgress)
        .await
        .context("Existence check failed")?;

    for (path, found) in paths.iter().zip(results) {
        println!("{}\t{}", if found { "yes" } else { "no" }, path);
    }

    Ok(())
}

/// Upload a local file.
async fn cmd_upload(config: Value, source: &Path, dest: &str, no_progress: bool) -> Result<()> {
    info!("Uploading {} to {}", source.display(), dest);

    let dest_path = parse_url(dest)?;
    let remote = open_remote(config, dest)?;
    let name = dest_path.name().to_string();

    remote
        .upload(source, &dest_path, &name, no_progress)
        .await
        .context("Upload failed")?;

    println!("Uploaded {} to {}", source.display(), dest);
    Ok(())
}

/// Download a remote file.
async fn cmd_download(config: Value, source: &str, dest: &Path, no_progress: bool) -> Result<()> {
    info!("Downloading {} to {}", source, dest.display());

    let source_path = parse_url(source)?;
    let remote = open_remote(config, source)?;
    let name = source_path.name().to_string();

    remote
        .download(&source_path, dest, &name, no_progress)
        .await
        .context("Download failed")?;

    println!("Downloaded {} to {}", source, dest.display());
    Ok(())
}

/// Create a folder chain.
async fn cmd_mkdir(config: Value, url: &str) -> Result<()> {
    let path = parse_url(url)?;
    let remote = open_remote(config, url)?;

    let id = remote.makedirs(&path).await.context("Failed to create folders")?;

    println!("{}\t{}", id, path);
    Ok(())
}

/// Print a file checksum.
async fn cmd_checksum(config: Value, url: &str) -> Result<()> {
    let path = parse_url(url)?;
    let remote = open_remote(config, url)?;

    let checksum = remote
        .get_file_checksum(&path)
        .await
        .context("Failed to get checksum")?;

    println!("{}\t{}", checksum, path);
    Ok(())
}

/// List a folder.
async fn cmd_ls(config: Value, url: &str) -> Result<()> {
    let remote = open_remote(config, url)?;

    let entries = remote
        .list_cache_paths()
        .await
        .context("Failed to list folder")?;

    if entries.is_empty() {
        println!("Folder is empty or does not exist.");
    } else {
        for entry in entries {
            println!("{}", entry);
        }
    }

    Ok(())
}
