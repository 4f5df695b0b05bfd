//! Identity gate and session persistence.
//!
//! The identity provider hands us a signed assertion in compact JWT form.
//! Checking its signature is the provider integration's job; this gate
//! trusts the channel that delivered the token and only checks the claims:
//! expiry, audience, verified email and the allow-list.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::AccessConfig;

/// Lifetime given to assertions that carry no `exp` claim
const DEFAULT_LIFETIME_HOURS: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
  #[error("identity token is malformed: {0}")]
  Malformed(String),
  #[error("identity token has expired, sign in again")]
  Expired,
  #[error("identity token was issued for another application")]
  AudienceMismatch,
  #[error("email {0} is not verified")]
  Unverified(String),
  #[error("{0} is not allowed to use this dashboard")]
  NotAllowed(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
  One(String),
  Many(Vec<String>),
}

impl Audience {
  fn contains(&self, client_id: &str) -> bool {
    match self {
      Audience::One(aud) => aud == client_id,
      Audience::Many(auds) => auds.iter().any(|a| a == client_id),
    }
  }
}

/// Claims read from the assertion payload
#[derive(Debug, Deserialize)]
struct IdentityClaims {
  email: String,
  email_verified: Option<bool>,
  name: Option<String>,
  picture: Option<String>,
  exp: Option<i64>,
  aud: Option<Audience>,
}

fn decode_claims(token: &str) -> Result<IdentityClaims, SessionError> {
  let mut parts = token.trim().split('.');
  let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
    (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
    _ => return Err(SessionError::Malformed("expected three segments".into())),
  };
  let bytes = URL_SAFE_NO_PAD
    .decode(payload.trim_end_matches('='))
    .map_err(|e| SessionError::Malformed(format!("payload is not base64url: {}", e)))?;
  serde_json::from_slice(&bytes)
    .map_err(|e| SessionError::Malformed(format!("payload is not valid claims: {}", e)))
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub email: String,
  pub name: Option<String>,
  pub picture: Option<String>,
  pub is_admin: bool,
  pub expires_at: DateTime<Utc>,
  /// The assertion itself, forwarded to the API when configured
  #[serde(default)]
  pub token: String,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }

  /// Name for the header: display name, else the email
  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.email)
  }
}

/// Checks assertions and restored sessions against the access config.
#[derive(Debug, Clone)]
pub struct SessionGate {
  access: AccessConfig,
}

impl SessionGate {
  pub fn new(access: AccessConfig) -> Self {
    Self { access }
  }

  fn is_allowed(&self, email: &str) -> bool {
    self.access.allowed_emails.contains(&email.to_lowercase())
  }

  fn is_admin(&self, email: &str) -> bool {
    self.access.admin_emails.contains(&email.to_lowercase())
  }

  /// Turn an identity assertion into a session.
  pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Session, SessionError> {
    let claims = decode_claims(token)?;

    let expires_at = match claims.exp {
      Some(exp) => Utc
        .timestamp_opt(exp, 0)
        .single()
        .ok_or_else(|| SessionError::Malformed(format!("bad exp claim {}", exp)))?,
      None => now + Duration::hours(DEFAULT_LIFETIME_HOURS),
    };
    if expires_at <= now {
      return Err(SessionError::Expired);
    }

    if let (Some(client_id), Some(aud)) = (&self.access.client_id, &claims.aud) {
      if !aud.contains(client_id) {
        return Err(SessionError::AudienceMismatch);
      }
    }

    if claims.email_verified == Some(false) {
      return Err(SessionError::Unverified(claims.email));
    }
    if !self.is_allowed(&claims.email) {
      tracing::warn!(email = %claims.email, "sign-in refused: not on the allow-list");
      return Err(SessionError::NotAllowed(claims.email));
    }

    let is_admin = self.is_admin(&claims.email);
    tracing::info!(email = %claims.email, is_admin, "signed in");
    Ok(Session {
      email: claims.email,
      name: claims.name,
      picture: claims.picture,
      is_admin,
      expires_at,
      token: token.trim().to_string(),
    })
  }

  /// Re-check a stored session; access lists may have changed since it was saved.
  pub fn restore(&self, session: Session, now: DateTime<Utc>) -> Result<Session, SessionError> {
    if session.is_expired(now) {
      return Err(SessionError::Expired);
    }
    if !self.is_allowed(&session.email) {
      return Err(SessionError::NotAllowed(session.email));
    }
    let is_admin = self.is_admin(&session.email);
    Ok(Session { is_admin, ..session })
  }
}

/// Session record on disk
#[derive(Debug, Clone)]
pub struct SessionStore {
  path: PathBuf,
}

impl SessionStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// `$XDG_DATA_HOME/tally/session.json`
  pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("tally").join("session.json"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Stored session, if present and unexpired. Corrupt or expired records
  /// are removed.
  pub fn load(&self, now: DateTime<Utc>) -> Option<Session> {
    let contents = match std::fs::read_to_string(&self.path) {
      Ok(contents) => contents,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
      Err(e) => {
        tracing::warn!(path = %self.path.display(), "cannot read session: {}", e);
        return None;
      }
    };

    match serde_json::from_str::<Session>(&contents) {
      Ok(session) if !session.is_expired(now) => Some(session),
      Ok(_) => {
        tracing::info!("stored session expired");
        self.discard();
        None
      }
      Err(e) => {
        tracing::warn!(path = %self.path.display(), "discarding corrupt session: {}", e);
        self.discard();
        None
      }
    }
  }

  pub fn save(&self, session: &Session) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    write_private(&self.path, serde_json::to_string_pretty(session)?.as_bytes())?;
    Ok(())
  }

  /// Remove the stored session. Missing files are fine.
  pub fn clear(&self) -> Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  fn discard(&self) {
    if let Err(e) = self.clear() {
      tracing::warn!("cannot remove session file: {}", e);
    }
  }
}

/// The stored session holds the identity token, so only the owner may read it.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
  use std::io::Write;
  use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

  let mut file = std::fs::OpenOptions::new()
    .write(true)
    .create(true)
    .truncate(true)
    .mode(0o600)
    .open(path)?;
  // mode() only applies to new files
  file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
  file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
  std::fs::write(path, contents)
}
