//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order equals chronological order. UUIDs are stored as
//! hyphenated lowercase strings. Enums use their wire names.

use acad_core::{
  account::{Account, AccountKind, AccountStatus, Role},
  submission::{
    ArtifactRef, Category, StudentIdentity, Submission, SubmissionStatus,
    SubmissionWithStudent,
  },
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str { r.into() }

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::Decode(format!("unknown role: {s:?}")))
}

pub fn encode_account_status(s: AccountStatus) -> &'static str { s.into() }

pub fn decode_account_status(s: &str) -> Result<AccountStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown account status: {s:?}")))
}

pub fn encode_category(c: Category) -> &'static str { c.into() }

pub fn decode_category(s: &str) -> Result<Category> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown category: {s:?}")))
}

pub fn encode_submission_status(s: SubmissionStatus) -> &'static str { s.into() }

pub fn decode_submission_status(s: &str) -> Result<SubmissionStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown submission status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawAccount::from_row`]; expects `accounts a`.
pub const ACCOUNT_COLUMNS: &str = "a.account_id, a.role, a.external_id, a.name, \
   a.department, a.semester, a.institution, a.status, a.created_at, a.updated_at";

/// Number of columns in [`ACCOUNT_COLUMNS`].
pub const ACCOUNT_WIDTH: usize = 10;

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub account_id:  String,
  pub role:        String,
  pub external_id: String,
  pub name:        String,
  pub department:  Option<String>,
  pub semester:    Option<i64>,
  pub institution: Option<String>,
  pub status:      String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawAccount {
  /// Read [`ACCOUNT_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:  row.get(at)?,
      role:        row.get(at + 1)?,
      external_id: row.get(at + 2)?,
      name:        row.get(at + 3)?,
      department:  row.get(at + 4)?,
      semester:    row.get(at + 5)?,
      institution: row.get(at + 6)?,
      status:      row.get(at + 7)?,
      created_at:  row.get(at + 8)?,
      updated_at:  row.get(at + 9)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    let kind = match decode_role(&self.role)? {
      Role::Student => AccountKind::Student {
        semester: self
          .semester
          .map(u8::try_from)
          .transpose()
          .map_err(|e| Error::Decode(format!("semester: {e}")))?,
      },
      Role::Faculty => AccountKind::Faculty,
      Role::Admin => AccountKind::Admin { institution: self.institution },
    };
    Ok(Account {
      account_id: decode_uuid(&self.account_id)?,
      external_id: self.external_id,
      name: self.name,
      department: self.department,
      kind,
      status: decode_account_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawSubmission::from_row`]; expects `submissions s`.
pub const SUBMISSION_COLUMNS: &str = "s.submission_id, s.student_id, s.category, \
   s.activity_type, s.title, s.description, s.points, s.status, s.reviewer_id, \
   s.remarks, s.file_name, s.original_name, s.media_type, s.file_size, s.sha256, \
   s.created_at, s.updated_at";

/// Number of columns in [`SUBMISSION_COLUMNS`].
pub const SUBMISSION_WIDTH: usize = 17;

/// Raw values read directly from a `submissions` row.
pub struct RawSubmission {
  pub submission_id: String,
  pub student_id:    String,
  pub category:      String,
  pub activity_type: String,
  pub title:         String,
  pub description:   String,
  pub points:        Option<i64>,
  pub status:        String,
  pub reviewer_id:   Option<String>,
  pub remarks:       Option<String>,
  pub file_name:     String,
  pub original_name: String,
  pub media_type:    String,
  pub file_size:     i64,
  pub sha256:        String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawSubmission {
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      submission_id: row.get(at)?,
      student_id:    row.get(at + 1)?,
      category:      row.get(at + 2)?,
      activity_type: row.get(at + 3)?,
      title:         row.get(at + 4)?,
      description:   row.get(at + 5)?,
      points:        row.get(at + 6)?,
      status:        row.get(at + 7)?,
      reviewer_id:   row.get(at + 8)?,
      remarks:       row.get(at + 9)?,
      file_name:     row.get(at + 10)?,
      original_name: row.get(at + 11)?,
      media_type:    row.get(at + 12)?,
      file_size:     row.get(at + 13)?,
      sha256:        row.get(at + 14)?,
      created_at:    row.get(at + 15)?,
      updated_at:    row.get(at + 16)?,
    })
  }

  pub fn into_submission(self) -> Result<Submission> {
    let points = self
      .points
      .map(u32::try_from)
      .transpose()
      .map_err(|e| Error::Decode(format!("points: {e}")))?;
    let size = u64::try_from(self.file_size)
      .map_err(|e| Error::Decode(format!("file_size: {e}")))?;

    Ok(Submission {
      submission_id: decode_uuid(&self.submission_id)?,
      student_id: decode_uuid(&self.student_id)?,
      category: decode_category(&self.category)?,
      activity_type: self.activity_type,
      title: self.title,
      description: self.description,
      points,
      status: decode_submission_status(&self.status)?,
      reviewer_id: self.reviewer_id.as_deref().map(decode_uuid).transpose()?,
      remarks: self.remarks,
      artifact: ArtifactRef {
        file_name: self.file_name,
        original_name: self.original_name,
        media_type: self.media_type,
        size,
        sha256: self.sha256,
      },
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// A submission row joined with its owner's account row.
pub struct RawListing {
  pub submission: RawSubmission,
  pub student:    RawAccount,
}

impl RawListing {
  /// Read `SUBMISSION_COLUMNS, ACCOUNT_COLUMNS` from a joined row.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      submission: RawSubmission::from_row(row, 0)?,
      student:    RawAccount::from_row(row, SUBMISSION_WIDTH)?,
    })
  }

  pub fn into_listing(self) -> Result<SubmissionWithStudent> {
    let student = self.student.into_account()?;
    Ok(SubmissionWithStudent {
      submission: self.submission.into_submission()?,
      student:    StudentIdentity::from(&student),
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let a = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let b = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn enum_columns_use_wire_names() {
    assert_eq!(encode_role(Role::Faculty), "faculty");
    assert_eq!(encode_category(Category::GroupII), "Group II");
    assert_eq!(encode_submission_status(SubmissionStatus::Approved), "Approved");
    assert_eq!(decode_category("Group III").unwrap(), Category::GroupIII);
    assert!(decode_account_status("Frozen").is_err());
  }
}
