//! HTTP API for the activity-point tracker.
//!
//! Exposes an axum [`Router`] backed by any [`PointsStore`] and
//! [`ArtifactStore`]. Every route except `/health` and `/auth/*` requires a
//! bearer token issued by `POST /auth/login`.
//!
//! | Method | Path | Capability |
//! |--------|------|------------|
//! | `POST` | `/auth/login` | none |
//! | `DELETE` | `/auth/session` | any session |
//! | `POST` | `/auth/students/register` | none |
//! | `POST` | `/auth/faculty/register` | none |
//! | `POST` | `/auth/admin/register` | first admin, then `ManageAccounts` |
//! | `POST` | `/certificates/submit` | `SubmitCertificate` |
//! | `PUT`  | `/certificates/review/{id}` | `ReviewCertificate` |
//! | `GET`  | `/certificates/student/{id}` | owner or `ViewAllCertificates` |
//! | `GET`  | `/certificates/student/{id}/totals` | owner or `ViewAllCertificates` |
//! | `GET`  | `/certificates/pending` | `ViewAllCertificates` |
//! | `GET`  | `/certificates/all` | `ViewAllCertificates` |
//! | `GET`  | `/certificates/{id}/file` | owner or `ViewAllCertificates` |
//! | `GET`  | `/users/students` | `ViewStudentDirectory` |
//! | `GET`  | `/users/teachers` | `ViewFacultyDirectory` |
//! | `GET`  | `/users/dashboard-stats` | `ViewStatistics` |
//! | `PUT`  | `/users/{id}/status` | `ManageAccounts` |

pub mod artifacts;
pub mod auth;
pub mod certificates;
pub mod error;
pub mod extract;
pub mod session;
pub mod users;


use std::{path::PathBuf, sync::Arc};

use acad_core::{
  policy::{PointsPolicy, UploadPolicy},
  store::{ArtifactStore, PointsStore},
};
use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{delete, get, post, put},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Server configuration, deserialised from `config.toml` and `ACAD_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// Directory certificate files are written to.
  #[serde(default = "default_upload_dir")]
  pub upload_dir:        PathBuf,
  /// Lifetime of a login session.
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: u16,
  #[serde(default)]
  pub policy:            PointsPolicy,
  #[serde(default)]
  pub uploads:           UploadPolicy,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/acad/acad.db") }
fn default_upload_dir() -> PathBuf { PathBuf::from("~/.local/share/acad/uploads") }
fn default_session_ttl_hours() -> u16 { 24 }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              default_host(),
      port:              default_port(),
      store_path:        default_store_path(),
      upload_dir:        default_upload_dir(),
      session_ttl_hours: default_session_ttl_hours(),
      policy:            PointsPolicy::default(),
      uploads:           UploadPolicy::default(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through every handler.
pub struct AppState<S, A> {
  pub store:     Arc<S>,
  pub artifacts: Arc<A>,
  pub config:    Arc<ServerConfig>,
}

impl<S, A> Clone for AppState<S, A> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      artifacts: Arc::clone(&self.artifacts),
      config:    Arc::clone(&self.config),
    }
  }
}

// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the application router.
pub fn router<S, A>(state: AppState<S, A>) -> Router
where
  S: PointsStore + 'static,
  A: ArtifactStore + 'static,
{
  let upload_limit = usize::try_from(
    state.config.uploads.max_bytes.saturating_add(MULTIPART_OVERHEAD),
  )
  .unwrap_or(usize::MAX);

  Router::new()
    .route("/health", get(health))
    // Auth
    .route("/auth/login", post(auth::login::<S, A>))
    .route("/auth/session", delete(auth::logout::<S, A>))
    .route("/auth/students/register", post(auth::register_student::<S, A>))
    .route("/auth/faculty/register", post(auth::register_faculty::<S, A>))
    .route("/auth/admin/register", post(auth::register_admin::<S, A>))
    // Certificates
    .route(
      "/certificates/submit",
      post(certificates::submit::<S, A>)
        .layer(DefaultBodyLimit::max(upload_limit)),
    )
    .route("/certificates/review/{id}", put(certificates::review::<S, A>))
    .route("/certificates/student/{id}", get(certificates::for_student::<S, A>))
    .route(
      "/certificates/student/{id}/totals",
      get(certificates::totals::<S, A>),
    )
    .route("/certificates/pending", get(certificates::pending::<S, A>))
    .route("/certificates/all", get(certificates::all::<S, A>))
    .route("/certificates/{id}/file", get(certificates::file::<S, A>))
    // Users
    .route("/users/students", get(users::students::<S, A>))
    .route("/users/teachers", get(users::teachers::<S, A>))
    .route("/users/dashboard-stats", get(users::dashboard_stats::<S, A>))
    .route("/users/{id}/status", put(users::set_status::<S, A>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> &'static str { "ok" }
