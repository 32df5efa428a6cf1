//! Attachment path validation.
//!
//! Any path that may appear in generated script text is first resolved to
//! its canonical, symlink-free form and checked against an allow-list of
//! directory roots and a size ceiling. Rejection happens before any
//! automation call is made.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::OutpostError;

/// Default attachment size ceiling: 10 MiB.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// A validated attachment. Only produced for paths that passed every check;
/// `canonical` is the form scripts embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub requested: String,
    pub canonical: PathBuf,
    pub size: u64,
}

/// Allow-list of attachment root directories plus the size ceiling.
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    allowed_roots: Vec<PathBuf>,
    max_attachment_bytes: u64,
}

impl AttachmentPolicy {
    /// Build a policy. Roots are canonicalized here so the containment test
    /// always compares canonical paths on both sides; a root that cannot be
    /// canonicalized is dropped with a warning.
    pub fn new(roots: Vec<PathBuf>, max_attachment_bytes: u64) -> Self {
        let allowed_roots = roots
            .into_iter()
            .filter_map(|root| match std::fs::canonicalize(&root) {
                Ok(canonical) => Some(canonical),
                Err(e) => {
                    warn!("Dropping attachment root {}: {}", root.display(), e);
                    None
                }
            })
            .collect();
        Self {
            allowed_roots,
            max_attachment_bytes,
        }
    }

    pub fn allowed_roots(&self) -> &[PathBuf] {
        &self.allowed_roots
    }

    pub fn max_attachment_bytes(&self) -> u64 {
        self.max_attachment_bytes
    }

    /// Validate candidate paths in input order. The first violation rejects
    /// the entire batch; a rejected path never reaches a script.
    pub async fn validate(&self, paths: &[String]) -> Result<Vec<AttachmentRef>, OutpostError> {
        let mut refs = Vec::with_capacity(paths.len());
        for requested in paths {
            refs.push(self.validate_one(requested).await?);
        }
        Ok(refs)
    }

    async fn validate_one(&self, requested: &str) -> Result<AttachmentRef, OutpostError> {
        let path = Path::new(requested);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| {
                    OutpostError::Validation(format!("cannot resolve working directory: {e}"))
                })?
                .join(path)
        };

        // A broken symlink fails canonicalization; the absolute path then
        // fails the metadata check below.
        let canonical = tokio::fs::canonicalize(&absolute).await.unwrap_or(absolute);

        let meta = tokio::fs::metadata(&canonical).await.map_err(|e| {
            OutpostError::Validation(format!("attachment {requested} is not readable: {e}"))
        })?;
        if !meta.is_file() {
            return Err(OutpostError::Validation(format!(
                "attachment {requested} is not a regular file"
            )));
        }
        if meta.len() > self.max_attachment_bytes {
            return Err(OutpostError::Validation(format!(
                "attachment {requested} is {} bytes, over the {} byte limit",
                meta.len(),
                self.max_attachment_bytes
            )));
        }
        if !self
            .allowed_roots
            .iter()
            .any(|root| canonical.starts_with(root))
        {
            return Err(OutpostError::Validation(format!(
                "attachment {requested} resolves outside the allowed directories"
            )));
        }

        debug!(
            "Attachment allowed: {} ({} bytes)",
            canonical.display(),
            meta.len()
        );
        Ok(AttachmentRef {
            requested: requested.to_string(),
            canonical,
            size: meta.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(root: &Path, max: u64) -> AttachmentPolicy {
        AttachmentPolicy::new(vec![root.to_path_buf()], max)
    }

    #[tokio::test]
    async fn accepts_file_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.pdf");
        std::fs::write(&file, b"data").unwrap();

        let refs = policy(dir.path(), 1024)
            .validate(&[file.to_string_lossy().to_string()])
            .await
            .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].size, 4);
        assert!(refs[0].canonical.ends_with("report.pdf"));
    }

    #[tokio::test]
    async fn preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let paths = vec![
            dir.path().join("b.txt").to_string_lossy().to_string(),
            dir.path().join("a.txt").to_string_lossy().to_string(),
        ];
        let refs = policy(dir.path(), 1024).validate(&paths).await.unwrap();
        assert!(refs[0].canonical.ends_with("b.txt"));
        assert!(refs[1].canonical.ends_with("a.txt"));
    }

    #[tokio::test]
    async fn rejects_dot_dot_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        std::fs::write(&secret, b"x").unwrap();

        // Spelled as a descendant of the root, but `..` resolves it away.
        let sneaky = root
            .path()
            .join("..")
            .join(outside.path().file_name().unwrap())
            .join("secret.txt");
        let err = policy(root.path(), 1024)
            .validate(&[sneaky.to_string_lossy().to_string()])
            .await
            .unwrap_err();
        match err {
            OutpostError::Validation(message) => {
                assert!(message.contains("outside the allowed directories"), "{message}");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rejects_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        std::fs::write(&secret, b"x").unwrap();
        let link = root.path().join("innocent.txt");
        std::os::unix::fs::symlink(&secret, &link).unwrap();

        let err = policy(root.path(), 1024)
            .validate(&[link.to_string_lossy().to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, OutpostError::Validation(_)));
    }

    #[tokio::test]
    async fn size_ceiling_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let at_limit = dir.path().join("at_limit.bin");
        let over = dir.path().join("over.bin");
        std::fs::write(&at_limit, vec![0u8; 8]).unwrap();
        std::fs::write(&over, vec![0u8; 9]).unwrap();

        let policy = policy(dir.path(), 8);
        assert!(policy
            .validate(&[at_limit.to_string_lossy().to_string()])
            .await
            .is_ok());
        let err = policy
            .validate(&[over.to_string_lossy().to_string()])
            .await
            .unwrap_err();
        match err {
            OutpostError::Validation(message) => {
                assert!(message.contains("over the 8 byte limit"), "{message}");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_missing_file_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy(dir.path(), 1024);

        let missing = dir.path().join("nope.txt");
        assert!(matches!(
            policy
                .validate(&[missing.to_string_lossy().to_string()])
                .await,
            Err(OutpostError::Validation(_))
        ));

        let subdir = dir.path().join("sub");
        std::fs::create_dir(&subdir).unwrap();
        assert!(matches!(
            policy
                .validate(&[subdir.to_string_lossy().to_string()])
                .await,
            Err(OutpostError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn one_bad_path_rejects_the_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, b"x").unwrap();

        let result = policy(dir.path(), 1024)
            .validate(&[
                good.to_string_lossy().to_string(),
                "/does/not/exist.txt".to_string(),
            ])
            .await;
        assert!(result.is_err());
    }
}
