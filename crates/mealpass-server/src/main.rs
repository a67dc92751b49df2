//! mealpass server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `MEALPASS_*` environment variables, opens the SQLite store, and serves the
//! check-in API over HTTP.
//!
//! # Seeding users
//!
//! The `users.password_hash` column holds an argon2 PHC string. Print one
//! with:
//!
//! ```sh
//! cargo run -p mealpass-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use mealpass_core::clock::{CivilClock, SystemClock};
use mealpass_server::{AppState, ServerConfig, mailer::ConfiguredNotifier, session::SessionSigner};
use mealpass_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "mealpass check-in server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Read a password from stdin, print its argon2 PHC string, and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("MEALPASS")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("registrar_roles"),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let sessions = SessionSigner::new(&server_cfg.session_secret)
    .context("session_secret must be set to a non-empty value")?;

  let clock = CivilClock::with_zone_name(Arc::new(SystemClock), &server_cfg.time_zone)
    .context("invalid time_zone")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let notifier = ConfiguredNotifier::from_config(&server_cfg)
    .context("invalid SMTP configuration")?;
  if !notifier.is_enabled() {
    tracing::warn!("smtp_host not set; delivery notices will not be sent");
  }

  if server_cfg.registrar_roles.is_empty() {
    tracing::warn!("registrar_roles is empty; every registration will be refused");
  }

  let state = AppState {
    store:    Arc::new(store),
    notifier: Arc::new(notifier),
    sessions: Arc::new(sessions),
    clock,
    policy:   Arc::new(server_cfg.policy()),
    config:   Arc::new(server_cfg.clone()),
  };

  let app = mealpass_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(time_zone = %server_cfg.time_zone, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// `~/x` becomes `$HOME/x`.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
