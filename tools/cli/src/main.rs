//! KeeBridge CLI - serve vault lookups to local clients.
//!
//! `serve` runs the loopback HTTP service; `init` creates a vault file,
//! optionally seeded from a JSON export.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use keebridge_app::{expand_home, ServiceConfig, VaultService};
use keebridge_crypto::KdfParams;
use keebridge_vault::{LocalLibrary, VaultEntry, VaultWriter};

#[derive(Parser)]
#[command(name = "keebridge")]
#[command(about = "KeeBridge - Local credential lookup for browser extensions")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lookup service.
    Serve {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on.
        #[arg(short, long, default_value = "127.0.0.1:5000")]
        bind: SocketAddr,

        /// Vault opened when an unlock request names no path.
        #[arg(long)]
        vault: Option<String>,
    },

    /// Create a new vault file.
    Init {
        /// Where to write the vault.
        #[arg(short, long)]
        path: String,

        /// Key file combined with the password.
        #[arg(short, long)]
        keyfile: Option<String>,

        /// JSON array of entries to seed the vault with.
        #[arg(short, long)]
        import: Option<PathBuf>,

        /// KDF strength: "interactive" or "moderate".
        #[arg(short, long, default_value = "moderate")]
        strength: String,

        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// One record of an import file.
#[derive(Deserialize)]
struct ImportRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: Zeroizing<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    notes: String,
}

impl ImportRecord {
    fn into_entry(self) -> VaultEntry {
        VaultEntry::new(self.title, self.username, self.password.as_str(), self.url)
            .with_notes(self.notes)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve {
            config,
            bind,
            vault,
        } => cmd_serve(config.as_deref(), bind, vault.as_deref()).await,

        Commands::Init {
            path,
            keyfile,
            import,
            strength,
            force,
        } => {
            cmd_init(
                &expand_home(&path),
                keyfile.as_deref().map(expand_home).as_deref(),
                import.as_deref(),
                &strength,
                force,
            )
            .await
        }
    }
}

/// Prompt for password securely.
fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(Zeroizing::new(password))
}

fn load_config(path: Option<&Path>, vault: Option<&str>) -> Result<ServiceConfig> {
    let mut config = match path {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    if let Some(vault) = vault {
        config.default_vault_path = expand_home(vault);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run the HTTP service until Ctrl-C.
async fn cmd_serve(config: Option<&Path>, bind: SocketAddr, vault: Option<&str>) -> Result<()> {
    let config = load_config(config, vault)?;

    if !bind.ip().is_loopback() {
        warn!(
            "Listening on non-loopback address {}; credentials will be reachable from the network",
            bind
        );
    }
    info!("Default vault: {}", config.default_vault_path.display());

    let service = Arc::new(VaultService::new(Arc::new(LocalLibrary), config));
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    keebridge_http::serve(listener, Arc::clone(&service), shutdown_signal())
        .await
        .context("Server error")?;

    service.lock().await;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Create a new vault.
async fn cmd_init(
    path: &Path,
    keyfile: Option<&Path>,
    import: Option<&Path>,
    strength: &str,
    force: bool,
) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to replace it)", path.display());
    }

    let kdf_params = match strength {
        "interactive" => KdfParams::interactive(),
        "moderate" => KdfParams::moderate(),
        _ => {
            anyhow::bail!("Invalid strength. Use: interactive or moderate");
        }
    };

    let entries = match import {
        Some(import) => read_import(import).await?,
        None => Vec::new(),
    };

    let password = prompt_password("Enter password: ")?;
    let confirm = prompt_password("Confirm password: ")?;

    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    if password.is_empty() && keyfile.is_none() {
        anyhow::bail!("Password cannot be empty without a key file");
    }

    info!("Creating vault at {}", path.display());
    VaultWriter::new(kdf_params)
        .save(path, &password, keyfile, &entries)
        .await
        .context("Failed to create vault")?;

    println!("Vault created successfully!");
    println!("  Location: {}", path.display());
    println!("  Entries: {}", entries.len());
    if let Some(keyfile) = keyfile {
        println!("  Key file: {}", keyfile.display());
    }

    Ok(())
}

async fn read_import(path: &Path) -> Result<Vec<VaultEntry>> {
    let json = Zeroizing::new(
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
    );
    let records: Vec<ImportRecord> =
        serde_json::from_str(&json).context("Import file must be a JSON array of entries")?;

    Ok(records.into_iter().map(ImportRecord::into_entry).collect())
}
