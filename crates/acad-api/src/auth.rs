//! Handlers for `/auth` endpoints: login and per-role registration.

use acad_core::{
  Error as Domain,
  account::{Account, AccountKind, Capability, NewAccount, Role},
  store::{ArtifactStore, PointsStore},
};
use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  AppState,
  error::{ApiError, store_err},
  extract::JsonBody,
  session::{
    Session, bearer, hash_password, issue_token, token_digest, verify_password,
  },
};

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub role:     String,
  /// Register number, faculty ID or admin username.
  pub id:       String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub token: String,
  pub user:  Account,
}

/// `POST /auth/login`
pub async fn login<S, A>(
  State(state): State<AppState<S, A>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  let role: Role = body
    .role
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("invalid role: {:?}", body.role)))?;

  let (account, hash) = state
    .store
    .find_credentials(role, body.id.trim())
    .await
    .map_err(store_err)?
    .ok_or(Domain::InvalidCredentials)?;

  if !verify_password(&body.password, &hash) {
    tracing::info!(role = %role, "login failed");
    return Err(Domain::InvalidCredentials.into());
  }
  if !account.is_active() {
    return Err(Domain::AccountDisabled(account.account_id).into());
  }

  let token = issue_token();
  let expires_at =
    Utc::now() + Duration::hours(i64::from(state.config.session_ttl_hours));
  state
    .store
    .create_session(account.account_id, token_digest(&token), expires_at)
    .await
    .map_err(store_err)?;

  tracing::info!(account = %account.account_id, role = %role, "logged in");
  Ok(Json(LoginResponse { token, user: account }))
}

/// `DELETE /auth/session`: end the caller's session.
pub async fn logout<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  let token = bearer(&headers).ok_or(ApiError::Unauthorized)?;
  state
    .store
    .delete_session(token_digest(token))
    .await
    .map_err(store_err)?;
  tracing::info!(account = %session.id(), "logged out");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Registration ────────────────────────────────────────────────────────────

fn require_password(password: &str) -> Result<(), ApiError> {
  if password.is_empty() {
    return Err(Domain::MissingField("password").into());
  }
  Ok(())
}

async fn register<S: PointsStore>(
  store: &S,
  input: NewAccount,
) -> Result<(StatusCode, Json<Account>), ApiError> {
  input.validate()?;
  let account = store.create_account(input).await.map_err(store_err)?;
  tracing::info!(
    account = %account.account_id,
    role = %account.role(),
    "account registered"
  );
  Ok((StatusCode::CREATED, Json(account)))
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Read the semester leniently: a number or a numeric string in `1..=8`.
/// Blank strings and `null` mean "not given".
fn parse_semester(value: Option<Value>) -> Result<Option<u8>, ApiError> {
  let invalid =
    |v: &Value| ApiError::BadRequest(format!("invalid semester: {v}"));
  let n = match &value {
    None | Some(Value::Null) => return Ok(None),
    Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
    Some(v @ Value::String(s)) => s.trim().parse::<u8>().map_err(|_| invalid(v))?,
    Some(v @ Value::Number(n)) => n
      .as_u64()
      .and_then(|n| u8::try_from(n).ok())
      .ok_or_else(|| invalid(v))?,
    Some(v) => return Err(invalid(v)),
  };
  if !(1..=8).contains(&n) {
    return Err(ApiError::BadRequest(format!("invalid semester: {n}")));
  }
  Ok(Some(n))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegistration {
  pub register_number: String,
  pub name:            String,
  /// A number or a numeric string; blank means not given.
  #[serde(default)]
  pub semester:        Option<Value>,
  #[serde(default)]
  pub department:      Option<String>,
  pub password:        String,
}

/// `POST /auth/students/register`
pub async fn register_student<S, A>(
  State(state): State<AppState<S, A>>,
  JsonBody(body): JsonBody<StudentRegistration>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  require_password(&body.password)?;
  let semester = parse_semester(body.semester)?;
  let input = NewAccount {
    external_id:   body.register_number.trim().to_owned(),
    name:          body.name.trim().to_owned(),
    department:    non_empty(body.department),
    kind:          AccountKind::Student { semester },
    password_hash: hash_password(&body.password)?,
  };
  register(&*state.store, input).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyRegistration {
  pub teacher_id: String,
  pub name:       String,
  #[serde(default)]
  pub department: Option<String>,
  pub password:   String,
}

/// `POST /auth/faculty/register`
pub async fn register_faculty<S, A>(
  State(state): State<AppState<S, A>>,
  JsonBody(body): JsonBody<FacultyRegistration>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  require_password(&body.password)?;
  let input = NewAccount {
    external_id:   body.teacher_id.trim().to_owned(),
    name:          body.name.trim().to_owned(),
    department:    non_empty(body.department),
    kind:          AccountKind::Faculty,
    password_hash: hash_password(&body.password)?,
  };
  register(&*state.store, input).await
}

#[derive(Debug, Deserialize)]
pub struct AdminRegistration {
  pub username:    String,
  #[serde(default)]
  pub department:  Option<String>,
  #[serde(default)]
  pub institution: Option<String>,
  pub password:    String,
}

/// `POST /auth/admin/register`
///
/// Without a bearer token this registers the first administrator and is
/// refused once one exists. With a token the caller must be allowed to
/// manage accounts.
pub async fn register_admin<S, A>(
  State(state): State<AppState<S, A>>,
  headers: HeaderMap,
  JsonBody(body): JsonBody<AdminRegistration>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  let authenticated = bearer(&headers).is_some();
  if authenticated {
    Session::from_headers(&state, &headers)
      .await?
      .require(Capability::ManageAccounts)?;
  }

  require_password(&body.password)?;
  let username = body.username.trim().to_owned();
  let input = NewAccount {
    external_id:   username.clone(),
    name:          username,
    department:    non_empty(body.department),
    kind:          AccountKind::Admin { institution: non_empty(body.institution) },
    password_hash: hash_password(&body.password)?,
  };

  if authenticated {
    return register(&*state.store, input).await;
  }

  input.validate()?;
  match state.store.create_first_admin(input).await.map_err(store_err) {
    Ok(account) => {
      tracing::info!(account = %account.account_id, "first admin registered");
      Ok((StatusCode::CREATED, Json(account)))
    }
    Err(ApiError::Domain(Domain::AdminExists)) => Err(ApiError::Unauthorized),
    Err(e) => Err(e),
  }
}
