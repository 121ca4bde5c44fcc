//! Local-disk upload store.
//!
//! Uploaded images are persisted under a configured directory with a
//! random file name and served back under the public `/uploads/` path
//! space. The store also resolves public paths back to files for the
//! cleanup step of post deletion.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;
use weblog_common::content::{UPLOAD_PUBLIC_PREFIX, is_upload_name_char};

pub const UPLOAD_EXTENSION_MAX_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("The path does not reference an uploaded file: {0}")]
    ForeignPath(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn prepare(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Persists an upload under a fresh random name, keeping a
    /// sanitized version of the original extension, and returns the
    /// public path.
    pub async fn store(
        &self,
        original_name: Option<&str>,
        data: &[u8],
    ) -> Result<String, UploadError> {
        let file_name = match sanitized_extension(original_name) {
            Some(extension) => format!("{}.{extension}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };

        fs::write(self.root.join(&file_name), data).await?;

        Ok(format!("{UPLOAD_PUBLIC_PREFIX}{file_name}"))
    }

    /// Deletes the file behind a public `/uploads/...` path. Paths that
    /// do not point into the upload name space are rejected rather than
    /// resolved, so references cannot escape the root directory.
    pub async fn remove(&self, public_path: &str) -> Result<(), UploadError> {
        let file_name = public_path
            .strip_prefix(UPLOAD_PUBLIC_PREFIX)
            .filter(|name| !name.is_empty() && name.chars().all(is_upload_name_char))
            .ok_or_else(|| UploadError::ForeignPath(public_path.to_owned()))?;

        fs::remove_file(self.root.join(file_name)).await?;

        Ok(())
    }
}

fn sanitized_extension(original_name: Option<&str>) -> Option<&str> {
    let (_, extension) = original_name?.rsplit_once('.')?;

    let valid = !extension.is_empty()
        && extension.len() <= UPLOAD_EXTENSION_MAX_LEN
        && extension.chars().all(|c| c.is_ascii_alphanumeric());

    valid.then_some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_kept_when_harmless() {
        assert_eq!(sanitized_extension(Some("photo.png")), Some("png"));
        assert_eq!(sanitized_extension(Some("archive.tar.gz")), Some("gz"));
    }

    #[test]
    fn suspicious_extensions_are_dropped() {
        assert_eq!(sanitized_extension(Some("noext")), None);
        assert_eq!(sanitized_extension(Some("trailing.")), None);
        assert_eq!(sanitized_extension(Some("weird.p/ng")), None);
        assert_eq!(sanitized_extension(Some("long.aaaaaaaaa")), None);
        assert_eq!(sanitized_extension(None), None);
    }

    #[tokio::test]
    async fn stored_files_round_trip_through_the_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().to_owned());

        let url = store.store(Some("photo.png"), b"image-bytes").await.unwrap();
        assert!(url.starts_with(UPLOAD_PUBLIC_PREFIX));
        assert!(url.ends_with(".png"));

        let file_name = url.strip_prefix(UPLOAD_PUBLIC_PREFIX).unwrap();
        let on_disk = tokio::fs::read(dir.path().join(file_name)).await.unwrap();
        assert_eq!(on_disk, b"image-bytes");

        store.remove(&url).await.unwrap();
        assert!(!dir.path().join(file_name).exists());
    }

    #[tokio::test]
    async fn foreign_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().to_owned());

        assert!(matches!(
            store.remove("/etc/passwd").await,
            Err(UploadError::ForeignPath(_))
        ));
        assert!(matches!(
            store.remove("/uploads/../escape.png").await,
            Err(UploadError::ForeignPath(_))
        ));
        assert!(matches!(
            store.remove("/uploads/").await,
            Err(UploadError::ForeignPath(_))
        ));
    }

    #[tokio::test]
    async fn removing_a_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().to_owned());

        assert!(matches!(
            store.remove("/uploads/never-stored.png").await,
            Err(UploadError::Io(_))
        ));
    }
}
