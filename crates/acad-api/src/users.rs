//! Handlers for `/users` endpoints: directories, statistics and account
//! status.

use acad_core::{
  Error as Domain,
  account::{Account, AccountStatus, Capability, Role},
  report::{self, DashboardStats},
  store::{ArtifactStore, PointsStore},
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  error::{ApiError, store_err},
  extract::JsonBody,
  session::Session,
};

#[derive(Debug, Deserialize)]
pub struct DirectoryParams {
  pub department: Option<String>,
}

fn department(params: DirectoryParams) -> Option<String> {
  params
    .department
    .map(|d| d.trim().to_owned())
    .filter(|d| !d.is_empty())
}

// ─── Directories ─────────────────────────────────────────────────────────────

/// A student with their uncapped approved-point total.
#[derive(Debug, Serialize)]
pub struct StudentEntry {
  #[serde(flatten)]
  pub account: Account,
  pub points:  u32,
}

/// `GET /users/students[?department=<name>]`
pub async fn students<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  Query(params): Query<DirectoryParams>,
) -> Result<Json<Vec<StudentEntry>>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require(Capability::ViewStudentDirectory)?;
  let accounts = state
    .store
    .list_accounts(Role::Student, department(params))
    .await
    .map_err(store_err)?;
  let points = state
    .store
    .approved_points_by_student()
    .await
    .map_err(store_err)?;

  let entries = accounts
    .into_iter()
    .map(|account| StudentEntry {
      points: points.get(&account.account_id).copied().unwrap_or(0),
      account,
    })
    .collect();
  Ok(Json(entries))
}

/// `GET /users/teachers[?department=<name>]`
pub async fn teachers<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  Query(params): Query<DirectoryParams>,
) -> Result<Json<Vec<Account>>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require(Capability::ViewFacultyDirectory)?;
  let accounts = state
    .store
    .list_accounts(Role::Faculty, department(params))
    .await
    .map_err(store_err)?;
  Ok(Json(accounts))
}

/// `GET /users/dashboard-stats`
pub async fn dashboard_stats<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
) -> Result<Json<DashboardStats>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require(Capability::ViewStatistics)?;
  let stats = report::dashboard_stats(&*state.store, &state.config.policy).await?;
  Ok(Json(stats))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: String,
}

/// `PUT /users/{id}/status` with body `{"status":"Active"|"Disabled"}`.
///
/// Admin accounts cannot be toggled.
pub async fn set_status<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<StatusBody>,
) -> Result<Json<Account>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require(Capability::ManageAccounts)?;
  let status: AccountStatus = body
    .status
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("invalid status: {:?}", body.status)))?;

  let target = state
    .store
    .get_account(id)
    .await
    .map_err(store_err)?
    .ok_or(Domain::AccountNotFound(id))?;
  if target.role() == Role::Admin {
    return Err(ApiError::BadRequest(
      "admin accounts cannot be enabled or disabled".into(),
    ));
  }

  let account = state
    .store
    .set_account_status(id, status)
    .await
    .map_err(store_err)?;
  tracing::info!(
    account = %id,
    by = %session.id(),
    %status,
    "account status updated by admin"
  );
  Ok(Json(account))
}
