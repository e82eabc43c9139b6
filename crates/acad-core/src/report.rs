//! The aggregation reporter — read-side totals and dashboard statistics.
//!
//! Nothing here mutates. Totals are computed from whatever set of
//! submissions the store returns; a view that is one refresh behind an
//! in-flight review is acceptable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  account::{AccountCounts, Role},
  policy::PointsPolicy,
  store::PointsStore,
  submission::{Category, Submission, SubmissionStatus},
};

// ─── Per-student totals ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
  /// Sum of approved points; not re-capped.
  pub earned:  u32,
  /// Number of submissions still awaiting review.
  pub pending: u32,
  pub max:     u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTotals {
  pub student_id:       Uuid,
  pub per_category:     BTreeMap<Category, CategoryTotals>,
  pub overall_earned:   u32,
  /// Overall total with each category clamped to the cap.
  pub capped_earned:    u32,
  pub overall_required: u32,
  pub percent_complete: f64,
}

/// Compute a student's totals from their submissions. Submissions owned by
/// other students are ignored.
pub fn totals_for_student(
  student_id: Uuid,
  submissions: &[Submission],
  policy: &PointsPolicy,
) -> StudentTotals {
  let mut per_category: BTreeMap<Category, CategoryTotals> = Category::iter()
    .map(|c| {
      (c, CategoryTotals { earned: 0, pending: 0, max: policy.category_cap })
    })
    .collect();

  for s in submissions.iter().filter(|s| s.student_id == student_id) {
    let Some(entry) = per_category.get_mut(&s.category) else {
      continue;
    };
    match s.status {
      SubmissionStatus::Approved => {
        entry.earned = entry.earned.saturating_add(s.points.unwrap_or(0));
      }
      SubmissionStatus::Pending => entry.pending += 1,
      SubmissionStatus::Rejected => {}
    }
  }

  let overall_earned = per_category.values().map(|t| t.earned).sum();
  let capped_earned = per_category
    .values()
    .map(|t| t.earned.min(policy.category_cap))
    .sum();

  StudentTotals {
    student_id,
    per_category,
    overall_earned,
    capped_earned,
    overall_required: policy.required_points,
    percent_complete: percent_complete(capped_earned, policy.required_points),
  }
}

/// `min(100, capped / required * 100)`, rounded to three decimal places.
pub fn percent_complete(capped_earned: u32, required: u32) -> f64 {
  if required == 0 {
    return 100.0;
  }
  let ratio = f64::from(capped_earned) / f64::from(required);
  let rounded = (ratio * 100_000.0).round() / 1000.0;
  rounded.min(100.0)
}

/// Load a student's submissions from `store` and total them.
pub async fn student_totals<S: PointsStore>(
  store: &S,
  policy: &PointsPolicy,
  student_id: Uuid,
) -> Result<StudentTotals> {
  let student = store
    .get_account(student_id)
    .await
    .map_err(Into::into)?
    .ok_or(Error::AccountNotFound(student_id))?;
  if student.role() != Role::Student {
    return Err(Error::NotAStudent(student_id));
  }
  let submissions = store.list_for_student(student_id).await.map_err(Into::into)?;
  Ok(totals_for_student(student_id, &submissions, policy))
}

// ─── System-wide statistics ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub approved: u64,
  pub pending:  u64,
  pub rejected: u64,
}

impl StatusCounts {
  pub fn total(&self) -> u64 { self.approved + self.pending + self.rejected }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStats {
  pub total:    u64,
  pub approved: u64,
  pub pending:  u64,
  pub rejected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  pub total_students:     u64,
  pub total_teachers:     u64,
  pub departments:        u32,
  pub pending_approvals:  u64,
  pub verification_stats: VerificationStats,
}

pub fn dashboard(
  accounts: AccountCounts,
  counts: StatusCounts,
  policy: &PointsPolicy,
) -> DashboardStats {
  DashboardStats {
    total_students:     accounts.students,
    total_teachers:     accounts.faculty,
    departments:        policy.departments,
    pending_approvals:  counts.pending,
    verification_stats: VerificationStats {
      total:    counts.total(),
      approved: counts.approved,
      pending:  counts.pending,
      rejected: counts.rejected,
    },
  }
}

pub async fn dashboard_stats<S: PointsStore>(
  store: &S,
  policy: &PointsPolicy,
) -> Result<DashboardStats> {
  let accounts = store.count_accounts().await.map_err(Into::into)?;
  let counts = store.status_counts().await.map_err(Into::into)?;
  Ok(dashboard(accounts, counts, policy))
}
