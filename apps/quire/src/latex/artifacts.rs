//! Durable output directory for compiled PDFs.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 64;

/// A persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Opens (creating if needed) the output directory.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Artifact names are restricted to `[A-Za-z0-9_-]{1,64}` so they can never
    /// escape the output directory.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// `<UTC timestamp>-<8 hex chars>`, unique across concurrent jobs.
    pub fn generate_name() -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%S%3fZ"), &id[..8])
    }

    /// Location of a named artifact, or `None` for an invalid name.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        Self::is_valid_name(name).then(|| self.root.join(format!("{name}.pdf")))
    }

    /// Copies `source` into the store under `name` (or a generated name).
    ///
    /// The copy lands in a hidden partial file first and is renamed into place, so a
    /// reader never sees a half-written PDF.
    pub async fn persist(&self, source: &Path, name: Option<&str>) -> io::Result<StoredArtifact> {
        let name = match name {
            Some(name) => name.to_string(),
            None => Self::generate_name(),
        };
        let path = self.path_for(&name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid artifact name '{name}'"),
            )
        })?;

        let partial = self.root.join(format!(".{name}.{}.partial", Uuid::new_v4().simple()));
        let size_bytes = tokio::fs::copy(source, &partial).await?;
        if let Err(err) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err);
        }

        info!(artifact = %name, size_bytes, "Artifact persisted");
        Ok(StoredArtifact {
            name,
            path,
            size_bytes,
        })
    }

    /// Reads a stored artifact. Invalid names are reported as not found.
    pub async fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self
            .path_for(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such artifact"))?;
        tokio::fs::read(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_name_validation() {
        assert!(ArtifactStore::is_valid_name("resume_2024-v2"));
        assert!(!ArtifactStore::is_valid_name(""));
        assert!(!ArtifactStore::is_valid_name("../etc/passwd"));
        assert!(!ArtifactStore::is_valid_name("a.pdf"));
        assert!(!ArtifactStore::is_valid_name(&"x".repeat(65)));
    }

    #[test]
    fn test_generated_names_are_valid_and_unique() {
        let a = ArtifactStore::generate_name();
        let b = ArtifactStore::generate_name();
        assert!(ArtifactStore::is_valid_name(&a), "{a}");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_persist_and_read_back() {
        let dir = TempDir::new().expect("temp dir");
        let out = dir.path().join("out");
        let store = ArtifactStore::new(&out).expect("store");
        let src = dir.path().join("document.pdf");
        std::fs::write(&src, b"%PDF-1.5 body").unwrap();

        let stored = store.persist(&src, Some("resume")).await.expect("persist");
        assert_eq!(stored.name, "resume");
        assert_eq!(stored.size_bytes, 13);
        assert_eq!(store.read("resume").await.unwrap(), b"%PDF-1.5 body");

        // Only the final file remains; no partial copies.
        let entries: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_rejects_bad_name() {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::new(dir.path()).expect("store");
        let src = dir.path().join("document.pdf");
        std::fs::write(&src, b"%PDF-").unwrap();
        let err = store.persist(&src, Some("../escape")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_read_invalid_name_is_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::new(dir.path()).expect("store");
        let err = store.read("../x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
