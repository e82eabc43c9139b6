//! Filesystem-backed [`ArtifactStore`].
//!
//! Files are written under a single root directory with a generated name
//! (`<uuid>.<ext>`); the client-supplied name is kept only as metadata.

use std::path::{Path, PathBuf};

use acad_core::{
  policy::UploadPolicy,
  store::{ArtifactStore, Upload},
  submission::ArtifactRef,
};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ArtifactError {
  /// The upload failed a policy check.
  #[error(transparent)]
  Rejected(#[from] acad_core::Error),

  #[error("artifact I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid artifact name: {0:?}")]
  InvalidName(String),
}

impl From<ArtifactError> for acad_core::Error {
  fn from(e: ArtifactError) -> Self {
    match e {
      ArtifactError::Rejected(inner) => inner,
      other => acad_core::Error::storage(other),
    }
  }
}

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
  root: PathBuf,
}

impl FsArtifactStore {
  /// Use `root` as the upload directory, creating it if needed.
  pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path { &self.root }

  fn path_for(&self, file_name: &str) -> Result<PathBuf, ArtifactError> {
    let plain = Path::new(file_name)
      .file_name()
      .is_some_and(|n| n == file_name);
    if !plain || file_name.starts_with('.') {
      return Err(ArtifactError::InvalidName(file_name.to_owned()));
    }
    Ok(self.root.join(file_name))
  }
}

/// The last path component of a client-supplied file name.
fn base_name(name: &str) -> &str {
  name.rsplit(['/', '\\']).next().unwrap_or(name)
}

impl ArtifactStore for FsArtifactStore {
  type Error = ArtifactError;

  async fn store(
    &self,
    upload: Upload,
    policy: &UploadPolicy,
  ) -> Result<ArtifactRef, ArtifactError> {
    let size = upload.bytes.len() as u64;
    let (ext, media_type) =
      policy.check(&upload.file_name, upload.content_type.as_deref(), size)?;

    let file_name = format!("{}.{ext}", Uuid::new_v4());
    let sha256 = hex::encode(Sha256::digest(&upload.bytes));
    tokio::fs::write(self.path_for(&file_name)?, &upload.bytes).await?;

    tracing::debug!(file = %file_name, size, "artifact stored");

    Ok(ArtifactRef {
      file_name,
      original_name: base_name(&upload.file_name).to_owned(),
      media_type: media_type.to_owned(),
      size,
      sha256,
    })
  }

  async fn load(&self, artifact: &ArtifactRef) -> Result<Bytes, ArtifactError> {
    let bytes = tokio::fs::read(self.path_for(&artifact.file_name)?).await?;
    Ok(Bytes::from(bytes))
  }

  async fn remove(&self, artifact: &ArtifactRef) -> Result<(), ArtifactError> {
    match tokio::fs::remove_file(self.path_for(&artifact.file_name)?).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}
