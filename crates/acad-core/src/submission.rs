//! Submissions — a student's request for point credit, backed by an uploaded
//! certificate.
//!
//! A submission is created `Pending` and moves exactly once to a terminal
//! state (`Approved` or `Rejected`). Owner, category and metadata never change
//! after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, account::Account};

// ─── Category ────────────────────────────────────────────────────────────────

/// The three fixed activity groups. Each is capped independently.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
  strum::IntoStaticStr,
)]
pub enum Category {
  #[serde(rename = "Group I")]
  #[strum(serialize = "Group I")]
  GroupI,
  #[serde(rename = "Group II")]
  #[strum(serialize = "Group II")]
  GroupII,
  #[serde(rename = "Group III")]
  #[strum(serialize = "Group III")]
  GroupIII,
}

impl Category {
  /// Parse the wire form (`"Group I"` etc.).
  pub fn parse(s: &str) -> Result<Self> {
    s.trim()
      .parse()
      .map_err(|_| Error::UnknownCategory(s.to_owned()))
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
pub enum SubmissionStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

impl SubmissionStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }
}

// ─── Artifact ────────────────────────────────────────────────────────────────

/// Reference to a stored certificate file. No binary data lives in the
/// database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
  /// Path relative to the configured upload directory.
  pub file_name:     String,
  /// Name the file had on the client, for display only.
  pub original_name: String,
  pub media_type:    String,
  pub size:          u64,
  /// SHA-256 hex digest of the stored bytes.
  pub sha256:        String,
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  pub submission_id: Uuid,
  pub student_id:    Uuid,
  pub category:      Category,
  pub activity_type: String,
  pub title:         String,
  pub description:   String,
  /// `None` until approved.
  pub points:        Option<u32>,
  pub status:        SubmissionStatus,
  /// The faculty member who decided; `None` while pending.
  pub reviewer_id:   Option<Uuid>,
  pub remarks:       Option<String>,
  pub artifact:      ArtifactRef,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`PointsStore::create_submission`](crate::store::PointsStore::create_submission).
#[derive(Debug, Clone)]
pub struct NewSubmission {
  pub student_id:    Uuid,
  pub category:      Category,
  pub activity_type: String,
  pub title:         String,
  pub description:   String,
  pub artifact:      ArtifactRef,
}

/// Minimal student identity joined onto submission listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentity {
  pub account_id:      Uuid,
  pub name:            String,
  pub register_number: String,
  pub semester:        Option<u8>,
}

impl From<&Account> for StudentIdentity {
  fn from(a: &Account) -> Self {
    Self {
      account_id:      a.account_id,
      name:            a.name.clone(),
      register_number: a.external_id.clone(),
      semester:        a.semester(),
    }
  }
}

/// A submission joined with its owner, as returned by the pending queue and
/// the admin listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionWithStudent {
  #[serde(flatten)]
  pub submission: Submission,
  pub student:    StudentIdentity,
}

// ─── Review ──────────────────────────────────────────────────────────────────

/// A validated review decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Approve { points: u32 },
  Reject,
}

impl Decision {
  pub fn status(self) -> SubmissionStatus {
    match self {
      Decision::Approve { .. } => SubmissionStatus::Approved,
      Decision::Reject => SubmissionStatus::Rejected,
    }
  }

  pub fn points(self) -> Option<u32> {
    match self {
      Decision::Approve { points } => Some(points),
      Decision::Reject => None,
    }
  }
}

/// A fully validated review, ready to be committed by a store.
#[derive(Debug, Clone)]
pub struct Review {
  pub submission_id: Uuid,
  pub reviewer_id:   Uuid,
  pub decision:      Decision,
  pub remarks:       Option<String>,
}
