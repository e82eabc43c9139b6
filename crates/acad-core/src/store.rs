//! The `PointsStore` and `ArtifactStore` traits.
//!
//! Storage backends (e.g. `acad-store-sqlite`) implement [`PointsStore`]; the
//! API layer supplies an [`ArtifactStore`] for uploaded files. Higher layers
//! depend on these abstractions, not on any concrete backend.

use std::{collections::HashMap, future::Future};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  account::{Account, AccountCounts, AccountStatus, NewAccount, Role},
  policy::{PointsPolicy, UploadPolicy},
  report::StatusCounts,
  submission::{
    ArtifactRef, Category, NewSubmission, Review, Submission,
    SubmissionWithStudent,
  },
};

// ─── Persistence ─────────────────────────────────────────────────────────────

/// Abstraction over the account and submission store.
///
/// Backend errors must convert into [`crate::Error`]; domain failures raised
/// inside a backend travel as [`crate::Error`] unchanged, anything else
/// becomes [`crate::Error::Storage`].
pub trait PointsStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Persist a new account. Fails with `AccountExists` if the external ID is
  /// already taken for that role.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Persist `input` only if no admin account exists yet; otherwise fail
  /// with `AdminExists`. The check and the insert are one atomic step, so
  /// concurrent callers cannot both succeed.
  fn create_first_admin(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Look up an account and its password hash by role and external ID.
  fn find_credentials<'a>(
    &'a self,
    role: Role,
    external_id: &'a str,
  ) -> impl Future<Output = Result<Option<(Account, String)>, Self::Error>>
  + Send
  + 'a;

  /// List accounts of one role, optionally restricted to a department.
  fn list_accounts(
    &self,
    role: Role,
    department: Option<String>,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;

  /// Change an account's status and return the updated account.
  fn set_account_status(
    &self,
    id: Uuid,
    status: AccountStatus,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn count_accounts(
    &self,
  ) -> impl Future<Output = Result<AccountCounts, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Record a session for `account_id`, keyed by the digest of its token and
  /// valid until `expires_at`. Expired sessions may be purged here.
  fn create_session(
    &self,
    account_id: Uuid,
    token_digest: String,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a token digest to the account that owns the session. Expired
  /// sessions resolve to `None`.
  fn resolve_session(
    &self,
    token_digest: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// End a session. Returns whether one was removed.
  fn delete_session(
    &self,
    token_digest: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Submissions — writes ──────────────────────────────────────────────

  /// Create a pending submission. The owner must be an active student at the
  /// moment of insertion; no cap check happens here.
  fn create_submission(
    &self,
    input: NewSubmission,
  ) -> impl Future<Output = Result<Submission, Self::Error>> + Send + '_;

  /// Commit a review decision.
  ///
  /// The submission must be pending and the reviewer an active faculty
  /// member. On approval the cap check and the update happen atomically: no
  /// interleaving of concurrent reviews may push a (student, category) pair
  /// over `policy.category_cap`. Either the whole transition commits or
  /// nothing changes.
  fn review(
    &self,
    review: Review,
    policy: PointsPolicy,
  ) -> impl Future<Output = Result<Submission, Self::Error>> + Send + '_;

  // ── Submissions — reads ───────────────────────────────────────────────

  fn get_submission(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  /// All submissions of one student, newest first.
  fn list_for_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send + '_;

  /// The pending queue, oldest first.
  fn list_pending(
    &self,
  ) -> impl Future<Output = Result<Vec<SubmissionWithStudent>, Self::Error>>
  + Send
  + '_;

  /// Every submission, newest first.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<SubmissionWithStudent>, Self::Error>>
  + Send
  + '_;

  /// Sum of approved points for `(student_id, category)`, optionally
  /// excluding one submission.
  fn approved_points(
    &self,
    student_id: Uuid,
    category: Category,
    excluding: Option<Uuid>,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// Approved-point totals keyed by student.
  fn approved_points_by_student(
    &self,
  ) -> impl Future<Output = Result<HashMap<Uuid, u32>, Self::Error>> + Send + '_;

  fn status_counts(
    &self,
  ) -> impl Future<Output = Result<StatusCounts, Self::Error>> + Send + '_;
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
  pub file_name:    String,
  pub content_type: Option<String>,
  pub bytes:        Bytes,
}

/// Storage for certificate files.
pub trait ArtifactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  /// Validate `upload` against `policy` and persist it.
  fn store<'a>(
    &'a self,
    upload: Upload,
    policy: &'a UploadPolicy,
  ) -> impl Future<Output = Result<ArtifactRef, Self::Error>> + Send + 'a;

  fn load<'a>(
    &'a self,
    artifact: &'a ArtifactRef,
  ) -> impl Future<Output = Result<Bytes, Self::Error>> + Send + 'a;

  fn remove<'a>(
    &'a self,
    artifact: &'a ArtifactRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
