//! The review engine's rules.
//!
//! Parsing a reviewer's request into a [`Decision`] is pure and lives here.
//! The cap check and commit must be atomic, so a [`PointsStore`] performs
//! them inside its own transaction using [`check_transition`] and
//! [`PointsPolicy::admit`].

use uuid::Uuid;

use crate::{
  Error, Result,
  account::{Account, Role},
  policy::PointsPolicy,
  store::PointsStore,
  submission::{Decision, Review, Submission, SubmissionStatus},
};

/// A reviewer's raw request, before validation.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
  pub submission_id: Uuid,
  pub reviewer_id:   Uuid,
  pub status:        SubmissionStatus,
  pub points:        Option<i64>,
  pub remarks:       Option<String>,
}

impl ReviewRequest {
  /// Validate the decision and its points. Points sent with a rejection are
  /// ignored.
  pub fn into_review(self, policy: &PointsPolicy) -> Result<Review> {
    let decision = match self.status {
      SubmissionStatus::Approved => Decision::Approve {
        points: policy.check_points(self.points)?,
      },
      SubmissionStatus::Rejected => Decision::Reject,
      SubmissionStatus::Pending => return Err(Error::InvalidDecision),
    };
    let remarks = self
      .remarks
      .map(|r| r.trim().to_owned())
      .filter(|r| !r.is_empty());
    Ok(Review {
      submission_id: self.submission_id,
      reviewer_id: self.reviewer_id,
      decision,
      remarks,
    })
  }
}

/// The reviewer must be an active faculty member.
pub fn ensure_can_review(reviewer: &Account) -> Result<()> {
  if reviewer.role() != Role::Faculty {
    return Err(Error::NotAReviewer(reviewer.account_id));
  }
  if !reviewer.is_active() {
    return Err(Error::AccountDisabled(reviewer.account_id));
  }
  Ok(())
}

/// Checks every precondition of a review that does not depend on other
/// submissions: the target is still pending and the reviewer is eligible.
pub fn check_transition(submission: &Submission, reviewer: &Account) -> Result<()> {
  if submission.status.is_terminal() {
    return Err(Error::AlreadyReviewed(submission.submission_id));
  }
  ensure_can_review(reviewer)
}

/// Validate `request` and hand it to the store for an atomic commit.
pub async fn review<S: PointsStore>(
  store: &S,
  policy: &PointsPolicy,
  request: ReviewRequest,
) -> Result<Submission> {
  let review = request.into_review(policy)?;
  let submission_id = review.submission_id;
  let reviewer_id = review.reviewer_id;

  match store.review(review, *policy).await.map_err(Into::into) {
    Ok(submission) => {
      tracing::info!(
        submission = %submission_id,
        reviewer = %reviewer_id,
        status = %submission.status,
        points = ?submission.points,
        "certificate reviewed"
      );
      Ok(submission)
    }
    Err(e @ Error::CategoryCapExceeded { .. }) => {
      tracing::warn!(submission = %submission_id, reviewer = %reviewer_id, "{e}");
      Err(e)
    }
    Err(e) => Err(e),
  }
}
