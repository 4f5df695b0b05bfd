mod api;
mod app;
mod commands;
mod config;
mod epoch;
mod event;
mod filters;
mod logging;
mod metrics;
mod notify;
mod query;
mod session;
mod tabs;
mod ui;

use chrono::Utc;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use crate::filters::DatePreset;
use crate::session::{Session, SessionGate, SessionStore};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "A terminal dashboard for agency profitability")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/tally/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// File holding the identity assertion to sign in with (default: $TALLY_ID_TOKEN)
  #[arg(long)]
  id_token_file: Option<PathBuf>,

  /// Date preset to start with: 7days, 30days, 90days, lastmonth, ytd, all
  #[arg(short, long)]
  preset: Option<String>,

  /// Forget the stored session and exit
  #[arg(long)]
  logout: bool,
}

fn read_token(args: &Args) -> Result<Option<String>> {
  match &args.id_token_file {
    Some(path) => {
      let token = std::fs::read_to_string(path)
        .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
      Ok(Some(token.trim().to_string()))
    }
    None => Ok(config::Config::id_token_from_env()),
  }
}

/// Sign in with a fresh assertion, or fall back to the stored session.
fn sign_in(gate: &SessionGate, store: Option<&SessionStore>, token: Option<String>) -> Result<Session> {
  let now = Utc::now();

  if let Some(token) = token {
    let session = gate
      .verify(&token, now)
      .map_err(|e| eyre!("Sign-in failed: {}", e))?;
    if let Some(store) = store {
      if let Err(e) = store.save(&session) {
        tracing::warn!("failed to persist session: {}", e);
      }
    }
    return Ok(session);
  }

  let stored = store.and_then(|s| s.load(now));
  match stored {
    Some(session) => match gate.restore(session, now) {
      Ok(session) => {
        tracing::info!(email = %session.email, "restored session");
        Ok(session)
      }
      Err(e) => {
        if let Some(store) = store {
          store.clear()?;
        }
        Err(eyre!("Stored session is no longer valid: {}. Sign in again.", e))
      }
    },
    None => Err(eyre!(
      "Not signed in. Pass --id-token-file or set TALLY_ID_TOKEN to an identity token."
    )),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init()?;

  let store = SessionStore::default_path().map(SessionStore::new);
  if args.logout {
    if let Some(store) = &store {
      store.clear()?;
    }
    println!("Signed out.");
    return Ok(());
  }

  let preset = match args.preset.as_deref() {
    Some(name) => {
      Some(DatePreset::from_name(name).ok_or_else(|| eyre!("Unknown preset '{}'", name))?)
    }
    None => None,
  };

  let gate = SessionGate::new(config.access.clone());
  let session = sign_in(&gate, store.as_ref(), read_token(&args)?)?;

  // Initialize and run the app
  let mut app = app::App::new(config, session, store)?;
  if let Some(preset) = preset {
    app = app.with_preset(preset);
  }
  if app.run().await? {
    println!("Signed out.");
  }

  Ok(())
}
