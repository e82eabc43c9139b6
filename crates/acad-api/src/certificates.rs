//! Handlers for `/certificates` endpoints.
//!
//! Submission goes through the gate in `acad_core::gate`; approval and
//! rejection go through `acad_core::review`, whose store call enforces the
//! per-category cap atomically.

use acad_core::{
  Error as Domain,
  account::Capability,
  gate::{self, SubmissionForm},
  report::{self, StudentTotals},
  review::{self, ReviewRequest},
  store::{ArtifactStore, PointsStore, Upload},
  submission::{Category, Submission, SubmissionStatus, SubmissionWithStudent},
};
use axum::{
  Json,
  extract::{Multipart, Path, State},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
  AppState,
  error::{ApiError, store_err},
  extract::JsonBody,
  session::Session,
};

// ─── Submit ──────────────────────────────────────────────────────────────────

/// `POST /certificates/submit` (multipart)
///
/// Fields: `certificateFile`, `group`, `activityType`, `certificateName`,
/// `description`, and optionally `studentId`, which must name the caller.
pub async fn submit<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require(Capability::SubmitCertificate)?;

  let mut upload = None;
  let mut group = None;
  let mut activity_type = String::new();
  let mut title = String::new();
  let mut description = String::new();
  let mut student_id = None;

  while let Some(field) = multipart.next_field().await? {
    let name = field.name().unwrap_or_default().to_owned();
    match name.as_str() {
      "certificateFile" => {
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;
        upload = Some(Upload { file_name, content_type, bytes });
      }
      "group" => group = Some(field.text().await?),
      "activityType" => activity_type = field.text().await?,
      "certificateName" => title = field.text().await?,
      "description" => description = field.text().await?,
      "studentId" => student_id = Some(field.text().await?),
      _ => {}
    }
  }

  if let Some(claimed) = student_id.as_deref().map(str::trim)
    && !claimed.is_empty()
    && claimed != session.id().to_string()
  {
    return Err(ApiError::Forbidden(
      "students may only submit for themselves".into(),
    ));
  }

  let upload = upload.ok_or(Domain::MissingField("certificateFile"))?;
  let category = Category::parse(group.as_deref().ok_or(Domain::MissingField("group"))?)?;

  let form = SubmissionForm {
    student_id: session.id(),
    category,
    activity_type,
    title,
    description,
  };
  let submission = gate::submit(
    &*state.store,
    &*state.artifacts,
    &state.config.uploads,
    form,
    upload,
  )
  .await?;

  Ok((StatusCode::CREATED, Json(submission)))
}

// ─── Review ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBody {
  pub status:      SubmissionStatus,
  /// A number or a numeric string; required only for approval.
  #[serde(default)]
  pub points:      Option<Value>,
  #[serde(default)]
  pub remarks:     Option<String>,
  /// When present, must be the caller.
  #[serde(default)]
  pub verified_by: Option<Uuid>,
}

/// Read the points field leniently. Anything not representable as a whole
/// number is rejected with the policy's bounds.
fn parse_points(value: Option<Value>, max: u32) -> Result<Option<i64>, Domain> {
  let invalid = || Domain::InvalidPoints { max };
  match value {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Number(n)) => match n.as_i64() {
      Some(i) => Ok(Some(i)),
      None => match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok(Some(f as i64)),
        _ => Err(invalid()),
      },
    },
    Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
    Some(_) => Err(invalid()),
  }
}

/// `PUT /certificates/review/{id}`
pub async fn review<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<ReviewBody>,
) -> Result<Json<Submission>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require(Capability::ReviewCertificate)?;
  if body.verified_by.is_some_and(|v| v != session.id()) {
    return Err(ApiError::Forbidden(
      "reviews are recorded under the caller's account".into(),
    ));
  }

  let policy = state.config.policy;
  let points = match body.status {
    SubmissionStatus::Approved => parse_points(body.points, policy.category_cap)?,
    _ => None,
  };

  let request = ReviewRequest {
    submission_id: id,
    reviewer_id: session.id(),
    status: body.status,
    points,
    remarks: body.remarks,
  };
  let submission = review::review(&*state.store, &policy, request).await?;
  Ok(Json(submission))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /certificates/student/{id}`, newest first.
pub async fn for_student<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Submission>>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require_owner_or_viewer(id)?;
  let submissions = state.store.list_for_student(id).await.map_err(store_err)?;
  Ok(Json(submissions))
}

/// `GET /certificates/student/{id}/totals`
pub async fn totals<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<StudentTotals>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require_owner_or_viewer(id)?;
  let totals = report::student_totals(&*state.store, &state.config.policy, id).await?;
  Ok(Json(totals))
}

/// `GET /certificates/pending`, oldest first.
pub async fn pending<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
) -> Result<Json<Vec<SubmissionWithStudent>>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require(Capability::ViewAllCertificates)?;
  let queue = state.store.list_pending().await.map_err(store_err)?;
  Ok(Json(queue))
}

/// `GET /certificates/all`, newest first.
pub async fn all<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
) -> Result<Json<Vec<SubmissionWithStudent>>, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  session.require(Capability::ViewAllCertificates)?;
  let everything = state.store.list_all().await.map_err(store_err)?;
  Ok(Json(everything))
}

/// `GET /certificates/{id}/file`
pub async fn file<S, A>(
  State(state): State<AppState<S, A>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: PointsStore,
  A: ArtifactStore,
{
  let submission = state
    .store
    .get_submission(id)
    .await
    .map_err(store_err)?
    .ok_or(Domain::SubmissionNotFound(id))?;
  session.require_owner_or_viewer(submission.student_id)?;

  let bytes = state
    .artifacts
    .load(&submission.artifact)
    .await
    .map_err(store_err)?;

  let mut res = bytes.into_response();
  let headers = res.headers_mut();
  if let Ok(v) = HeaderValue::from_str(&submission.artifact.media_type) {
    headers.insert(header::CONTENT_TYPE, v);
  }
  if let Ok(v) =
    HeaderValue::from_str(&content_disposition(&submission.artifact.original_name))
  {
    headers.insert(header::CONTENT_DISPOSITION, v);
  }
  Ok(res)
}

/// An `inline` disposition naming `file_name`. Names that are not plain
/// ASCII get an underscore-substituted `filename` plus an RFC 5987
/// `filename*` carrying the UTF-8 original.
fn content_disposition(file_name: &str) -> String {
  let fallback: String = file_name
    .chars()
    .map(|c| match c {
      '"' | '\\' => '_',
      c if c == ' ' || c.is_ascii_graphic() => c,
      _ => '_',
    })
    .collect();
  if fallback == file_name {
    return format!("inline; filename=\"{fallback}\"");
  }

  let mut encoded = String::with_capacity(file_name.len() * 3);
  for b in file_name.bytes() {
    if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
      encoded.push(char::from(b));
    } else {
      encoded.push_str(&format!("%{b:02X}"));
    }
  }
  format!("inline; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn points_accept_numbers_and_numeric_strings() {
    assert_eq!(parse_points(None, 40).unwrap(), None);
    assert_eq!(parse_points(Some(json!(null)), 40).unwrap(), None);
    assert_eq!(parse_points(Some(json!(12)), 40).unwrap(), Some(12));
    assert_eq!(parse_points(Some(json!(12.0)), 40).unwrap(), Some(12));
    assert_eq!(parse_points(Some(json!(" 7 ")), 40).unwrap(), Some(7));
    assert_eq!(parse_points(Some(json!(-3)), 40).unwrap(), Some(-3));
  }

  #[test]
  fn disposition_plain_ascii() {
    assert_eq!(content_disposition("award.pdf"), "inline; filename=\"award.pdf\"");
    assert_eq!(
      content_disposition("my \"best\".pdf"),
      "inline; filename=\"my _best_.pdf\"; filename*=UTF-8''my%20%22best%22.pdf"
    );
  }

  #[test]
  fn disposition_non_ascii_is_encoded() {
    let d = content_disposition("सर्टिफिकेट.pdf");
    assert!(HeaderValue::from_str(&d).is_ok());
    assert!(d.starts_with("inline; filename=\"__________.pdf\"; "));
    assert!(d.ends_with("filename*=UTF-8''%E0%A4%B8%E0%A4%B0%E0%A5%8D%E0%A4%9F%E0%A4%BF%E0%A4%AB%E0%A4%BF%E0%A4%95%E0%A5%87%E0%A4%9F.pdf"));
  }

  #[test]
  fn points_reject_non_integers() {
    for v in [json!(2.5), json!("ten"), json!(true), json!([5])] {
      assert!(matches!(
        parse_points(Some(v), 40),
        Err(Domain::InvalidPoints { max: 40 })
      ));
    }
  }
}
