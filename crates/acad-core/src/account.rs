//! Accounts, roles and the capability table.
//!
//! An account is a tagged variant over its role. Handlers never branch on a
//! role string; they ask [`Role::can`] whether a [`Capability`] is granted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Role ────────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Student,
  Faculty,
  Admin,
}

/// A named permission. Each role is granted a fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
  /// Upload certificates for one's own account.
  SubmitCertificate,
  /// Approve or reject pending certificates.
  ReviewCertificate,
  /// Read any student's certificates, totals and artifacts.
  ViewAllCertificates,
  ViewStudentDirectory,
  ViewFacultyDirectory,
  /// Enable or disable student and faculty accounts.
  ManageAccounts,
  ViewStatistics,
}

impl Role {
  pub fn capabilities(self) -> &'static [Capability] {
    use Capability::*;
    match self {
      Role::Student => &[SubmitCertificate],
      Role::Faculty => &[
        ReviewCertificate,
        ViewAllCertificates,
        ViewStudentDirectory,
      ],
      Role::Admin => &[
        ViewAllCertificates,
        ViewStudentDirectory,
        ViewFacultyDirectory,
        ManageAccounts,
        ViewStatistics,
      ],
    }
  }

  pub fn can(self, capability: Capability) -> bool {
    self.capabilities().contains(&capability)
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
pub enum AccountStatus {
  #[default]
  Active,
  Disabled,
}

// ─── Account ─────────────────────────────────────────────────────────────────

/// Role-specific account data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum AccountKind {
  Student {
    #[serde(default)]
    semester: Option<u8>,
  },
  Faculty,
  Admin {
    #[serde(default)]
    institution: Option<String>,
  },
}

impl AccountKind {
  pub fn role(&self) -> Role {
    match self {
      AccountKind::Student { .. } => Role::Student,
      AccountKind::Faculty => Role::Faculty,
      AccountKind::Admin { .. } => Role::Admin,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub account_id:  Uuid,
  /// Register number, faculty ID or admin username; unique per role.
  pub external_id: String,
  pub name:        String,
  pub department:  Option<String>,
  #[serde(flatten)]
  pub kind:        AccountKind,
  pub status:      AccountStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Account {
  pub fn role(&self) -> Role { self.kind.role() }

  pub fn is_active(&self) -> bool { self.status == AccountStatus::Active }

  pub fn can(&self, capability: Capability) -> bool {
    self.role().can(capability)
  }

  pub fn semester(&self) -> Option<u8> {
    match &self.kind {
      AccountKind::Student { semester } => *semester,
      _ => None,
    }
  }
}

/// Input to [`PointsStore::create_account`](crate::store::PointsStore::create_account).
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub external_id:   String,
  pub name:          String,
  pub department:    Option<String>,
  pub kind:          AccountKind,
  /// Argon2 PHC string; never leaves the store except for login checks.
  pub password_hash: String,
}

impl NewAccount {
  /// Check registration fields. Student and faculty names may only contain
  /// letters and spaces; faculty must name a department.
  pub fn validate(&self) -> Result<()> {
    if self.external_id.trim().is_empty() {
      return Err(Error::MissingField("id"));
    }
    match self.kind {
      AccountKind::Admin { .. } => {}
      AccountKind::Faculty | AccountKind::Student { .. } => {
        if !is_valid_name(&self.name) {
          return Err(Error::InvalidName);
        }
      }
    }
    if matches!(self.kind, AccountKind::Faculty)
      && self.department.as_deref().is_none_or(|d| d.trim().is_empty())
    {
      return Err(Error::MissingField("department"));
    }
    Ok(())
  }
}

fn is_valid_name(name: &str) -> bool {
  !name.trim().is_empty()
    && name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
}

/// Head-counts used by the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountCounts {
  pub students: u64,
  pub faculty:  u64,
}
