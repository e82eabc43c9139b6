//! Bearer-token sessions.
//!
//! A login issues 32 random bytes, base64url-encoded, to the client. Only the
//! SHA-256 digest of the token is stored.

use acad_core::{
  Error as Domain,
  account::{Account, Capability},
  store::{ArtifactStore, PointsStore},
};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
  AppState,
  error::{ApiError, store_err},
};

// ─── Tokens and passwords ────────────────────────────────────────────────────

/// Generate a fresh session token.
pub fn issue_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// The form in which a token is persisted.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Domain(Domain::storage(PasswordError(e.to_string()))))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
struct PasswordError(String);

pub(crate) fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller. Present in a handler means the token resolved
/// to an active account.
#[derive(Debug, Clone)]
pub struct Session {
  pub account: Account,
}

impl Session {
  /// Resolve the session carried by `headers`.
  pub async fn from_headers<S, A>(
    state: &AppState<S, A>,
    headers: &HeaderMap,
  ) -> Result<Self, ApiError>
  where
    S: PointsStore,
  {
    let token = bearer(headers).ok_or(ApiError::Unauthorized)?;
    let account = state
      .store
      .resolve_session(token_digest(token))
      .await
      .map_err(store_err)?
      .ok_or(ApiError::Unauthorized)?;

    if !account.is_active() {
      tracing::warn!(account = %account.account_id, "request from disabled account");
      return Err(Domain::AccountDisabled(account.account_id).into());
    }
    Ok(Self { account })
  }

  pub fn id(&self) -> Uuid { self.account.account_id }

  pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
    if self.account.can(capability) {
      Ok(())
    } else {
      Err(ApiError::Forbidden(format!(
        "{} accounts may not do this",
        self.account.role()
      )))
    }
  }

  /// A student's records are visible to the student and to anyone allowed
  /// to view all certificates.
  pub fn require_owner_or_viewer(&self, student_id: Uuid) -> Result<(), ApiError> {
    if self.id() == student_id {
      return Ok(());
    }
    self.require(Capability::ViewAllCertificates)
  }
}

impl<S, A> FromRequestParts<AppState<S, A>> for Session
where
  S: PointsStore + 'static,
  A: ArtifactStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, A>,
  ) -> Result<Self, Self::Rejection> {
    Session::from_headers(state, &parts.headers).await
  }
}
