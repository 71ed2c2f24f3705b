//! XZip client
//!
//! Compresses and extracts ZIP archives after the locally stored license key
//! has been accepted by the authorization server.
//!
//! Usage:
//!   xzip compress <source> [target.zip] [--encrypt]
//!   xzip extract <archive.zip> <target-dir> [--password]
//!   xzip init [KEY]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use xzip::archive::{self, ArchiveSummary};
use xzip::client::keyfile::{ensure_key_file, write_key};
use xzip::crypto::keygen::is_well_formed;
use xzip::config::{DEFAULT_AUTH_URL, DEFAULT_PURCHASE_URL, DEFAULT_SERVICE_IDENTITY};
use xzip::{Authorization, ClientConfig, EncryptionSupport, LicenseGate, XzipError};

#[derive(Parser, Debug)]
#[command(name = "xzip", version)]
#[command(about = "License-gated ZIP archiver")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Authorization endpoint
    #[arg(long, env = "XZIP_AUTH_URL", default_value = DEFAULT_AUTH_URL, global = true)]
    auth_url: String,

    /// DNS name the server certificate must carry
    #[arg(long, env = "XZIP_SERVICE_IDENTITY", default_value = DEFAULT_SERVICE_IDENTITY, global = true)]
    service_identity: String,

    /// License key file (default: ~/.xzip/key)
    #[arg(long, env = "XZIP_KEY_FILE", global = true)]
    key_file: Option<PathBuf>,

    /// Disable password-protected archives
    #[arg(long, env = "XZIP_NO_ENCRYPTION", global = true)]
    no_encryption: bool,

    /// Authorization request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    timeout: u64,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress a directory or file into a ZIP archive
    Compress {
        /// Directory or file to compress
        source: PathBuf,
        /// Archive to create (default: `<source>.zip` next to the source)
        target: Option<PathBuf>,
        /// Protect the archive with a password
        #[arg(short = 'p', long)]
        encrypt: bool,
    },
    /// Extract a ZIP archive into a directory
    Extract {
        /// Archive to extract
        source: PathBuf,
        /// Directory to extract into
        target: PathBuf,
        /// Ask for a password even if the archive does not look encrypted
        #[arg(short = 'p', long)]
        password: bool,
    },
    /// Create the key file, optionally storing a key in it
    Init {
        /// License key to store
        key: Option<String>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    // RUST_LOG wins over --verbose
    let default_filter = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;

    if let Command::Init { key } = &args.command {
        return init(&config, key.as_deref());
    }

    // Nothing below runs without a passing gate.
    let gate = LicenseGate::new(config.clone())?;
    let authorization = gate.authorize()?;
    println!("License authorized");

    match args.command {
        Command::Compress {
            source,
            target,
            encrypt,
        } => {
            let target = target.unwrap_or_else(|| archive::compress::default_target(&source));
            compress(&config, &authorization, &source, &target, encrypt)
        }
        Command::Extract {
            source,
            target,
            password,
        } => extract(&config, &authorization, &source, &target, password),
        Command::Init { .. } => Ok(()),
    }
}

fn build_config(args: &Args) -> Result<ClientConfig> {
    let key_file = match &args.key_file {
        Some(path) => path.clone(),
        None => xzip::config::default_key_file()?,
    };

    let config = ClientConfig {
        auth_url: args.auth_url.clone(),
        service_identity: args.service_identity.clone(),
        purchase_url: DEFAULT_PURCHASE_URL.to_string(),
        key_file,
        timeout: Duration::from_secs(args.timeout),
        encryption: if args.no_encryption {
            EncryptionSupport::Disabled
        } else {
            EncryptionSupport::Enabled
        },
    };
    config.validate()?;
    Ok(config)
}

fn init(config: &ClientConfig, key: Option<&str>) -> Result<()> {
    match key {
        Some(key) => {
            let key = key.trim();
            if !is_well_formed(key) {
                bail!(XzipError::Config(
                    "a license key is 32 hexadecimal characters".to_string()
                ));
            }
            write_key(&config.key_file, key)?;
            println!("Stored license key in {}", config.key_file.display());
        }
        None => match ensure_key_file(&config.key_file) {
            Ok(()) => println!("Key file already exists: {}", config.key_file.display()),
            Err(XzipError::KeyFileCreated { path }) => {
                println!("Created key file: {}", path.display());
                println!("Write your license key into this file");
            }
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

fn compress(
    config: &ClientConfig,
    authorization: &Authorization,
    source: &Path,
    target: &Path,
    encrypt: bool,
) -> Result<()> {
    debug!(key = %authorization.key_fingerprint, "Compress authorized");

    let password = if encrypt {
        if !config.encryption.is_enabled() {
            bail!(XzipError::Config(
                "password protection is disabled in this client".to_string()
            ));
        }
        Some(read_password(true)?)
    } else {
        None
    };

    println!("Compressing {} to {}", source.display(), target.display());
    let summary = archive::compress(source, target, password.as_deref())
        .with_context(|| format!("compression of {} failed", source.display()))?;
    report("Compressed", target, &summary);
    Ok(())
}

fn extract(
    config: &ClientConfig,
    authorization: &Authorization,
    source: &Path,
    target: &Path,
    ask_password: bool,
) -> Result<()> {
    debug!(key = %authorization.key_fingerprint, "Extract authorized");

    if ask_password && !config.encryption.is_enabled() {
        bail!(XzipError::Config(
            "password protection is disabled in this client".to_string()
        ));
    }

    let needs_password = config.encryption.is_enabled()
        && (ask_password || archive::is_encrypted(source)?);
    let password = if needs_password {
        Some(read_password(false)?)
    } else {
        None
    };

    println!("Extracting {} to {}", source.display(), target.display());
    let summary = archive::extract(source, target, password.as_deref())
        .with_context(|| format!("extraction of {} failed", source.display()))?;
    report("Extracted", target, &summary);
    Ok(())
}

/// Password from `XZIP_PASSWORD`, or prompted without echo.
fn read_password(confirm: bool) -> Result<String> {
    if let Ok(password) = std::env::var("XZIP_PASSWORD") {
        if !password.is_empty() {
            return Ok(password);
        }
    }

    let password = rpassword::prompt_password("Password: ").context("failed to read password")?;
    if password.is_empty() {
        bail!("password cannot be empty");
    }
    if confirm {
        let again = rpassword::prompt_password("Confirm password: ")
            .context("failed to read password")?;
        if again != password {
            bail!("passwords do not match");
        }
    }
    Ok(password)
}

fn report(action: &str, path: &Path, summary: &ArchiveSummary) {
    println!(
        "{} {}: {} files, {} directories, {} bytes",
        action,
        path.display(),
        summary.files,
        summary.directories,
        summary.bytes
    );
}
