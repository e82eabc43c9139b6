//! Error types for `acad-core`.
//!
//! Every variant except [`Error::Storage`] is a validation-class failure that
//! the caller can show to the user and retry with corrected input.

use thiserror::Error;
use uuid::Uuid;

use crate::{account::Role, submission::Category};

#[derive(Debug, Error)]
pub enum Error {
  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  #[error("submission not found: {0}")]
  SubmissionNotFound(Uuid),

  #[error("account {0} has been disabled by the administrator")]
  AccountDisabled(Uuid),

  #[error("account {0} is not a student account")]
  NotAStudent(Uuid),

  #[error("account {0} is not permitted to review certificates")]
  NotAReviewer(Uuid),

  #[error("points must be a whole number between 1 and {max}")]
  InvalidPoints { max: u32 },

  #[error(
    "{category} points cap exceeded: you may assign at most {remaining} more points"
  )]
  CategoryCapExceeded { category: Category, remaining: u32 },

  #[error("submission {0} has already been reviewed")]
  AlreadyReviewed(Uuid),

  #[error("a review decision must be Approved or Rejected")]
  InvalidDecision,

  #[error("unsupported file type: {0:?}")]
  UnsupportedFileType(String),

  #[error("file of {size} bytes exceeds the {max} byte limit")]
  FileTooLarge { size: u64, max: u64 },

  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("unknown category: {0:?}")]
  UnknownCategory(String),

  #[error("name must contain only alphabetical characters and spaces")]
  InvalidName,

  #[error("{role} account {external_id:?} already exists")]
  AccountExists { role: Role, external_id: String },

  #[error("invalid credentials")]
  InvalidCredentials,

  /// Open registration of the first administrator is closed.
  #[error("an administrator account already exists")]
  AdminExists,

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap an arbitrary backend failure.
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
