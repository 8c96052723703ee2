//! sealdrop: encrypted file sharing CLI
//!
//! Commands:
//!   upload <path> [--password P | --prompt-password]  - seal a file and print its share link
//!   info <id|link>                                    - show share metadata
//!   download <id|link> [-o <path>] [--password P]     - fetch and decrypt a share
//!   delete <id|link>                                  - remove a share
//!   status                                            - check the storage backend
//!   config show                                       - display the active configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use sealdrop_core::config::{SealdropConfig, StorageBackend};
use sealdrop_core::{SealdropError, ShareLink};
use sealdrop_store::{build_operator, check_health, S3Credentials, ShareClient};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealdrop",
    version,
    about = "Client-side encrypted file sharing",
    long_about = "sealdrop: encrypt files locally, store only ciphertext, share by link"
)]
struct Cli {
    /// Path to sealdrop.toml configuration file
    #[arg(long, short = 'c', env = "SEALDROP_CONFIG", default_value = "sealdrop.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "SEALDROP_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "SEALDROP_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file and upload it as a new share
    ///
    /// Without a password the share is keyless: anyone with the link can
    /// open it, and the server keeps the key.
    Upload {
        /// Local file to share
        path: PathBuf,
        /// Protect the share with this password
        #[arg(long, env = "SEALDROP_PASSWORD", conflicts_with = "prompt_password")]
        password: Option<String>,
        /// Read the password interactively
        #[arg(long)]
        prompt_password: bool,
    },

    /// Show a share's metadata
    Info {
        /// Share link or file ID
        share: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch and decrypt a share
    Download {
        /// Share link or file ID
        share: String,
        /// Output path (default: the shared file name in the current directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Password for protected shares (prompted for if omitted)
        #[arg(long, env = "SEALDROP_PASSWORD")]
        password: Option<String>,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },

    /// Delete a share (envelope and metadata)
    Delete {
        /// Share link or file ID
        share: String,
    },

    /// Check that the storage backend is reachable
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, found) = load_config(&cli.config).await?;

    let level = cli.log.as_deref().unwrap_or(&config.logging.level);
    let format = cli.log_format.clone().unwrap_or(match config.logging.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(level, &format);

    if !found {
        warn!("config file not found: {}  (using defaults)", cli.config.display());
    }

    match cli.command {
        Commands::Upload {
            path,
            password,
            prompt_password,
        } => cmd_upload(&config, &path, password, prompt_password).await,
        Commands::Info { share, json } => cmd_info(&config, &share, json).await,
        Commands::Download {
            share,
            output,
            password,
            force,
        } => cmd_download(&config, &share, output.as_deref(), password, force).await,
        Commands::Delete { share } => cmd_delete(&config, &share).await,
        Commands::Status => cmd_status(&config).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr.json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .init();
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<(SealdropConfig, bool)> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = SealdropConfig::from_toml_str(&content)
            .with_context(|| format!("loading config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((SealdropConfig::default(), false))
    }
}

// ── Client construction ───────────────────────────────────────────────────────

fn build_client(config: &SealdropConfig) -> Result<ShareClient> {
    let credentials = match config.storage.backend {
        StorageBackend::S3 => Some(S3Credentials::from_env()?),
        StorageBackend::Memory | StorageBackend::Fs => None,
    };
    if config.storage.backend == StorageBackend::Memory {
        warn!("memory backend selected; shares vanish when this process exits");
    }
    let op = build_operator(&config.storage, credentials.as_ref())
        .context("building storage operator")?;
    Ok(ShareClient::from_config(op, config))
}

fn parse_share(share: &str) -> Result<ShareLink> {
    ShareLink::parse(share).with_context(|| format!("not a share link or id: {share}"))
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn prompt_new_password() -> Result<SecretString> {
    let first = rpassword::prompt_password("Share password: ").context("reading password")?;
    let second = rpassword::prompt_password("Repeat password: ").context("reading password")?;
    if first != second {
        anyhow::bail!("passwords do not match");
    }
    if first.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    Ok(SecretString::from(first))
}

/// Password for a protected share: the one given on the command line, else
/// whatever `read` prompts for. A prompt error is kept in `failure` so it can
/// be reported instead of a bare "password required".
fn supply_password(
    given: Option<String>,
    read: impl FnOnce() -> std::io::Result<String>,
    failure: &mut Option<std::io::Error>,
) -> Option<SecretString> {
    if let Some(password) = given {
        return Some(SecretString::from(password));
    }
    match read() {
        Ok(password) => Some(SecretString::from(password)),
        Err(e) => {
            warn!(error = %e, "password prompt failed");
            *failure = Some(e);
            None
        }
    }
}

/// Pick a local file name for a download. Only the final path component of
/// the shared name is used so a share cannot write outside the current
/// directory.
fn default_output_name(file_name: &str) -> PathBuf {
    Path::new(file_name)
        .file_name()
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("download.bin"))
}

fn fmt_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

// ── `sealdrop upload` ─────────────────────────────────────────────────────────

async fn cmd_upload(
    config: &SealdropConfig,
    path: &Path,
    password: Option<String>,
    prompt_password: bool,
) -> Result<()> {
    let client = build_client(config)?;

    let password = match (password, prompt_password) {
        (Some(p), _) => Some(SecretString::from(p)),
        (None, true) => Some(prompt_new_password()?),
        (None, false) => None,
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("not a file: {}", path.display()))?;
    let plaintext = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let pb = make_spinner("upload");
    pb.set_message(format!("sealing {file_name}"));
    let result = client
        .upload(&file_name, &plaintext, password.as_ref())
        .await
        .with_context(|| format!("uploading {}", path.display()));
    pb.finish_and_clear();
    let receipt = result?;

    info!(file_id = %receipt.file_id, key_mode = %receipt.key_mode, "upload complete");
    println!("  file:    {} ({})", file_name, fmt_bytes(plaintext.len() as u64));
    println!("  id:      {}", receipt.file_id);
    println!("  mode:    {}", receipt.key_mode);
    println!("  link:    {}", receipt.link);
    if password.is_none() {
        println!("  note:    keyless share; anyone with the link can open it");
    }
    Ok(())
}

// ── `sealdrop info` ───────────────────────────────────────────────────────────

async fn cmd_info(config: &SealdropConfig, share: &str, json: bool) -> Result<()> {
    let client = build_client(config)?;
    let link = parse_share(share)?;
    let metadata = client
        .metadata(&link.file_id)
        .await
        .with_context(|| format!("fetching metadata for {}", link.file_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        println!("  id:        {}", link.file_id);
        println!("  file:      {}", metadata.file_name);
        println!("  size:      {}", fmt_bytes(metadata.file_size));
        println!("  protected: {}", metadata.is_password_protected);
    }
    Ok(())
}

// ── `sealdrop download` ───────────────────────────────────────────────────────

async fn cmd_download(
    config: &SealdropConfig,
    share: &str,
    output: Option<&Path>,
    password: Option<String>,
    force: bool,
) -> Result<()> {
    let client = build_client(config)?;
    let link = parse_share(share)?;

    let mut prompt_failure = None;
    let result = client
        .open(&link.file_id, |metadata| {
            supply_password(
                password,
                || rpassword::prompt_password(format!("Password for {}: ", metadata.file_name)),
                &mut prompt_failure,
            )
        })
        .await;

    let opened = match result {
        Ok(opened) => opened,
        // Wrong password and tampered data share one message
        Err(e) if e.is_authentication_failure() => anyhow::bail!("{e}"),
        Err(SealdropError::PasswordRequired) => match prompt_failure {
            Some(e) => return Err(anyhow::Error::new(e).context("reading password")),
            None => anyhow::bail!(
                "share is password protected; pass --password or enter one when prompted"
            ),
        },
        Err(e) => return Err(e).context("opening share"),
    };

    let dest = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_name(&opened.metadata.file_name));
    if dest.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", dest.display());
    }
    tokio::fs::write(&dest, &opened.plaintext)
        .await
        .with_context(|| format!("writing {}", dest.display()))?;

    println!(
        "  saved:   {} ({})",
        dest.display(),
        fmt_bytes(opened.plaintext.len() as u64)
    );
    Ok(())
}

// ── `sealdrop delete` ─────────────────────────────────────────────────────────

async fn cmd_delete(config: &SealdropConfig, share: &str) -> Result<()> {
    let client = build_client(config)?;
    let link = parse_share(share)?;
    client
        .delete(&link.file_id)
        .await
        .with_context(|| format!("deleting {}", link.file_id))?;
    println!("  deleted: {}", link.file_id);
    Ok(())
}

// ── `sealdrop status` ─────────────────────────────────────────────────────────

async fn cmd_status(config: &SealdropConfig) -> Result<()> {
    let client = build_client(config)?;
    let store = client.store();
    check_health(store.operator(), store.prefix()).await?;

    println!("  backend: {:?}", config.storage.backend);
    println!("  prefix:  {}", store.prefix());
    println!("  kdf:     PBKDF2-HMAC-SHA256, {} iterations", config.crypto.pbkdf2_iterations);
    println!("  storage: ok");
    Ok(())
}

// ── `sealdrop config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &SealdropConfig, path: &Path) -> Result<()> {
    println!("# config: {}", path.display());
    print!("{}", toml::to_string_pretty(config).context("serializing config")?);
    Ok(())
}
