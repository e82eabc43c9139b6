//! The submission gate.
//!
//! Accepts a certificate only from an active student account. No cap check
//! happens here; caps are enforced when a reviewer approves.

use uuid::Uuid;

use crate::{
  Error, Result,
  account::{Account, Role},
  policy::UploadPolicy,
  store::{ArtifactStore, PointsStore, Upload},
  submission::{Category, NewSubmission, Submission},
};

/// Metadata accompanying an upload.
#[derive(Debug, Clone)]
pub struct SubmissionForm {
  pub student_id:    Uuid,
  pub category:      Category,
  pub activity_type: String,
  pub title:         String,
  pub description:   String,
}

impl SubmissionForm {
  pub fn validate(&self) -> Result<()> {
    if self.activity_type.trim().is_empty() {
      return Err(Error::MissingField("activityType"));
    }
    if self.title.trim().is_empty() {
      return Err(Error::MissingField("certificateName"));
    }
    Ok(())
  }
}

/// The owner of a new submission must be a student and must be active.
pub fn ensure_can_submit(account: &Account) -> Result<()> {
  if account.role() != Role::Student {
    return Err(Error::NotAStudent(account.account_id));
  }
  if !account.is_active() {
    return Err(Error::AccountDisabled(account.account_id));
  }
  Ok(())
}

/// Run the gate: validate the form, check the student, persist the artifact
/// and create the pending record.
///
/// The artifact is only written once the account has passed the gate, and is
/// removed again if the record cannot be created.
pub async fn submit<S, A>(
  store: &S,
  artifacts: &A,
  uploads: &UploadPolicy,
  form: SubmissionForm,
  upload: Upload,
) -> Result<Submission>
where
  S: PointsStore,
  A: ArtifactStore,
{
  form.validate()?;

  let student = store
    .get_account(form.student_id)
    .await
    .map_err(Into::into)?
    .ok_or(Error::AccountNotFound(form.student_id))?;

  if let Err(e) = ensure_can_submit(&student) {
    tracing::warn!(student = %student.account_id, "submission refused: {e}");
    return Err(e);
  }

  let artifact = artifacts.store(upload, uploads).await.map_err(Into::into)?;

  let input = NewSubmission {
    student_id:    form.student_id,
    category:      form.category,
    activity_type: form.activity_type.trim().to_owned(),
    title:         form.title.trim().to_owned(),
    description:   form.description,
    artifact:      artifact.clone(),
  };

  match store.create_submission(input).await {
    Ok(submission) => {
      tracing::info!(
        submission = %submission.submission_id,
        student = %submission.student_id,
        category = %submission.category,
        "certificate submitted"
      );
      Ok(submission)
    }
    Err(e) => {
      if let Err(cleanup) = artifacts.remove(&artifact).await {
        let cleanup: Error = cleanup.into();
        tracing::warn!(
          file = %artifact.file_name,
          "failed to remove orphaned artifact: {cleanup}"
        );
      }
      Err(e.into())
    }
  }
}
