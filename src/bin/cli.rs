use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use social_auth_connect as lib;
use lib::config::Config;
use lib::db::SqliteSessionStore;
use lib::oauth::{AuthorizationRequestBuilder, CallbackHandler, SystemCrypto};
use lib::session::SessionStore;
use lib::Platform;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "social-auth-connect", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Session name; pending authorizations are only visible within it
    #[arg(long, default_value = "default")]
    session: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the authorization URL for a platform and record the pending attempt
    Authorize {
        platform: String,
        /// Use this state verbatim instead of generating and storing one
        #[arg(long)]
        state: Option<String>,
    },
    /// Validate a redirect URL and print the grant as JSON
    Callback {
        platform: String,
        url: String,
        /// Expected state when it was supplied to `authorize --state`
        #[arg(long)]
        state: Option<String>,
    },
    /// Authorize interactively: print the URL, then read the pasted redirect URL
    Connect {
        platform: String,
    },
    /// Drop the pending attempt for a platform
    Cancel {
        platform: String,
    },
    /// List pending entries of the session
    Pending,
    /// Remove expired entries from the session database
    Purge,
    /// Validate config file and exit
    ConfigValidate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Explicit --config wins; otherwise prefer the system-wide file and fall
    // back to the repository example config for local use.
    let resolved_config_path: PathBuf = match &cli.config {
        Some(p) => p.clone(),
        None => {
            let etc_path = Path::new("/etc/social-auth/config.toml");
            if etc_path.exists() {
                etc_path.to_path_buf()
            } else {
                PathBuf::from("config/example-config.toml")
            }
        }
    };

    if let Commands::ConfigValidate = cli.command {
        match Config::from_path(&resolved_config_path) {
            Ok(_) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {:#}", e);
                std::process::exit(2);
            }
        }
        return Ok(());
    }

    let cfg = Config::from_path(&resolved_config_path)
        .with_context(|| format!("loading config from {}", resolved_config_path.display()))?;

    // log -> tracing bridge, then stderr plus a daily-rotated file in cfg.log_dir.
    // stdout is reserved for URLs and JSON.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender = tracing_appender::rolling::daily(&cfg.log_dir, "social-auth.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .context("installing tracing subscriber")?;

    let store: Arc<dyn SessionStore> = Arc::new(
        SqliteSessionStore::open(&cfg.session_db_path, &cli.session)
            .with_context(|| format!("opening session db {}", cfg.session_db_path.display()))?
            .with_ttl(cfg.state_ttl()),
    );
    let builder = AuthorizationRequestBuilder::new(store.clone(), Arc::new(SystemCrypto));
    let handler = CallbackHandler::new(store.clone());

    match cli.command {
        Commands::Authorize { platform, state } => {
            let platform: Platform = platform.parse()?;
            let oauth = cfg.oauth_config(platform, state)?;
            let url = builder.build_for(platform, &oauth)?;
            println!("{}", url);
        }
        Commands::Callback { platform, url, state } => {
            let platform: Platform = platform.parse()?;
            let grant = match state {
                Some(expected) => handler.complete_with_state(platform, &url, &expected)?,
                None => handler.complete(platform, &url)?,
            };
            println!("{}", serde_json::to_string_pretty(&grant)?);
        }
        Commands::Connect { platform } => {
            let platform: Platform = platform.parse()?;
            let oauth = cfg.oauth_config(platform, None)?;
            let stdin = std::io::stdin();
            let grant = lib::oauth::connect::run_connect(
                &builder,
                &handler,
                platform,
                &oauth,
                stdin.lock(),
                std::io::stdout(),
            )?;
            println!("{}", serde_json::to_string_pretty(&grant)?);
        }
        Commands::Cancel { platform } => {
            let platform: Platform = platform.parse()?;
            handler.abandon(platform)?;
            println!("Cancelled pending {} authorization.", platform);
        }
        Commands::Pending => {
            let entries = store.pending()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Purge => {
            let removed = store.purge_expired()?;
            println!("Removed {} expired entries.", removed);
        }
        // handled before logging setup
        Commands::ConfigValidate => {}
    }

    Ok(())
}
