//! Tunable rules: the per-category points cap and the upload allow-list.
//!
//! Both are deserialisable so the server can read them from its config file;
//! the defaults are the values the institution has always used.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, submission::Category};

// ─── Points ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsPolicy {
  /// Maximum approved points per student per category. Also the upper bound
  /// for a single approval.
  pub category_cap:    u32,
  /// Points a student needs overall.
  pub required_points: u32,
  /// Department count reported on the admin dashboard.
  pub departments:     u32,
}

impl Default for PointsPolicy {
  fn default() -> Self {
    Self {
      category_cap:    40,
      required_points: 120,
      departments:     6,
    }
  }
}

impl PointsPolicy {
  /// Validate the points attached to an approval: present, integral and in
  /// `1..=category_cap`.
  pub fn check_points(&self, points: Option<i64>) -> Result<u32> {
    let invalid = Error::InvalidPoints { max: self.category_cap };
    let points = points.ok_or(invalid)?;
    if points < 1 || points > i64::from(self.category_cap) {
      return Err(Error::InvalidPoints { max: self.category_cap });
    }
    Ok(points as u32)
  }

  /// Points that may still be approved in a category holding
  /// `already_approved`.
  pub fn remaining(&self, already_approved: u32) -> u32 {
    self.category_cap.saturating_sub(already_approved)
  }

  /// The cap check: admit `points` on top of `already_approved` or report how
  /// many points are still available.
  pub fn admit(
    &self,
    category: Category,
    already_approved: u32,
    points: u32,
  ) -> Result<()> {
    if already_approved.saturating_add(points) > self.category_cap {
      return Err(Error::CategoryCapExceeded {
        category,
        remaining: self.remaining(already_approved),
      });
    }
    Ok(())
  }
}

// ─── Uploads ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
  pub max_bytes:          u64,
  /// Lower-case extensions without the dot.
  pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
  fn default() -> Self {
    Self {
      max_bytes:          5 * 1024 * 1024,
      allowed_extensions: vec!["pdf".to_owned()],
    }
  }
}

impl UploadPolicy {
  /// Check an upload against the allow-list and size bound. Returns the
  /// normalised extension and the media type to store it under.
  ///
  /// A declared content type, when present, must agree with the extension.
  pub fn check(
    &self,
    file_name: &str,
    content_type: Option<&str>,
    size: u64,
  ) -> Result<(String, &'static str)> {
    let ext = file_name
      .rsplit_once('.')
      .map(|(_, e)| e.to_ascii_lowercase())
      .unwrap_or_default();

    if !self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
      return Err(Error::UnsupportedFileType(file_name.to_owned()));
    }

    let media_type = media_type_for(&ext)
      .ok_or_else(|| Error::UnsupportedFileType(file_name.to_owned()))?;

    if let Some(declared) = content_type {
      let declared = declared.split(';').next().unwrap_or("").trim();
      if !declared.is_empty()
        && declared != "application/octet-stream"
        && !declared.eq_ignore_ascii_case(media_type)
      {
        return Err(Error::UnsupportedFileType(declared.to_owned()));
      }
    }

    if size > self.max_bytes {
      return Err(Error::FileTooLarge { size, max: self.max_bytes });
    }

    Ok((ext, media_type))
  }
}

fn media_type_for(ext: &str) -> Option<&'static str> {
  match ext {
    "pdf" => Some("application/pdf"),
    "png" => Some("image/png"),
    "jpg" | "jpeg" => Some("image/jpeg"),
    _ => None,
  }
}
