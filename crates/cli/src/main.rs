//! Command-line interface for the anchorage trust database.

mod commands;

use anyhow::{Context, Result};
use anchorage_core::{Bundle, Config, Version};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anchorage")]
#[command(about = "Manage a trust database for root and intermediate bundles")]
#[command(version)]
struct Cli {
    /// Select a bundle (ca or int)
    #[arg(short, long, global = true, default_value = "int")]
    bundle: Bundle,

    /// Select a release version
    #[arg(short = 'r', long = "release", global = true)]
    release: Option<String>,

    /// Path to the trust database (overrides the config file)
    #[arg(short = 'd', long, global = true)]
    db: Option<PathBuf>,

    /// Config file path
    #[arg(short = 'f', long, global = true, env = "ANCHORAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the trust database and its schema
    Setup,
    /// Import PEM certificates, marking them under a release as needed
    Import {
        /// PEM files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Roll a new release from the previous one
    ///
    /// Copies all certificates from the previous release into the new
    /// release, skipping any that have expired or been revoked. With -r,
    /// certificates are copied into the named (already imported) release;
    /// without it, the latest release is rolled into a fresh version.
    Release {
        /// Grace window applied to the expiry and revocation cutoffs
        /// (e.g. 72h, 30d)
        window: Option<String>,
    },
    /// List all releases for a bundle
    Releases,
    /// Display the certificates in a release
    ReleaseInfo {
        /// Release version (defaults to the latest)
        version: Option<String>,
    },
    /// Show certificates expiring (or revoked) within a window
    Expiring {
        /// Look-ahead window (default 30d)
        window: Option<String>,
    },
    /// Emit a PEM certificate bundle for a release
    Bundle {
        /// Write the bundle to this file instead of stdout
        out: Option<PathBuf>,
    },
    /// Dump the PEM certificates matching an SKI
    Dump {
        /// Subject key identifier (hex)
        ski: String,
    },
    /// Display stored information about certificates by SKI
    Info {
        #[arg(required = true)]
        skis: Vec<String>,
    },
    /// Search certificates by SKI/AKI regular expressions
    Search {
        /// Regular expression matched against the SKI
        #[arg(long)]
        ski: Option<String>,
        /// Regular expression matched against the AKI
        #[arg(long)]
        aki: Option<String>,
    },
    /// Record a revocation for a key identifier
    Revoke {
        /// Subject key identifier (hex)
        ski: String,
        /// How the revocation was communicated (e.g. crl, ocsp, manual)
        #[arg(long, default_value = "manual")]
        mechanism: String,
        /// Why the certificate was revoked
        #[arg(long, default_value = "unspecified")]
        reason: String,
        /// Revocation time as Unix seconds (defaults to now)
        #[arg(long)]
        at: Option<i64>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let figment = match &cli.config {
        Some(path) => figment.merge(Toml::file(path)),
        None => figment.merge(Toml::file("anchorage.toml")),
    };
    figment
        .merge(Env::prefixed("ANCHORAGE_").split("_"))
        .extract()
        .context("loading configuration")
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli)?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    init_tracing(&config);

    if let Some(version) = &cli.release {
        Version::parse(version).with_context(|| format!("invalid release '{version}'"))?;
    }

    let store = anchorage_certdb::from_config(&config.database)
        .await
        .with_context(|| {
            format!("opening trust database {}", config.database.path.display())
        })?;
    let store = store.as_ref();

    let bundle = cli.bundle;
    let selected = cli.release.as_deref();

    match &cli.command {
        Commands::Setup => commands::setup::run(store, &config).await,
        Commands::Import { files } => {
            commands::import::run(store, bundle, selected, files).await
        }
        Commands::Release { window } => {
            commands::release::run(store, bundle, selected, window.as_deref()).await
        }
        Commands::Releases => commands::releases::run(store, bundle).await,
        Commands::ReleaseInfo { version } => {
            commands::release_info::run(store, bundle, version.as_deref().or(selected)).await
        }
        Commands::Expiring { window } => {
            commands::expiring::run(store, bundle, selected, window.as_deref()).await
        }
        Commands::Bundle { out } => {
            commands::bundle::run(store, bundle, selected, out.as_deref()).await
        }
        Commands::Dump { ski } => commands::dump::run(store, ski).await,
        Commands::Info { skis } => commands::info::run(store, skis).await,
        Commands::Search { ski, aki } => {
            commands::search::run(store, ski.as_deref(), aki.as_deref()).await
        }
        Commands::Revoke {
            ski,
            mechanism,
            reason,
            at,
        } => commands::revoke::run(store, ski, mechanism, reason, *at).await,
    }
}
