//! Permanent storage for uploaded images
//!
//! `<root>/<YYYY-MM-DD>/<YYYYmmdd_HHMMSS_mmm>_<name>.<ext>`

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::types::Result;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Whether the upload has an accepted image extension
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Filesystem-safe version of a client supplied name
pub fn secure_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

fn timestamped_filename(original: &str, now: DateTime<Utc>) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(original);
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            (stem, format!(".{}", secure_filename(&ext.to_ascii_lowercase())))
        }
        _ => (base, String::new()),
    };
    format!(
        "{}_{}{}",
        now.format("%Y%m%d_%H%M%S_%3f"),
        secure_filename(stem),
        ext
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedImage {
    pub permanent_filename: String,
    /// Path under the image root, `/`-separated
    pub relative_path: String,
    pub date_folder: String,
}

pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(&self, bytes: &[u8], original: &str, now: DateTime<Utc>) -> Result<SavedImage> {
        let date_folder = now.format("%Y-%m-%d").to_string();
        let permanent_filename = timestamped_filename(original, now);

        let folder = self.root.join(&date_folder);
        tokio::fs::create_dir_all(&folder).await?;
        tokio::fs::write(folder.join(&permanent_filename), bytes).await?;

        debug!(file = %permanent_filename, size = bytes.len(), "Image stored");
        Ok(SavedImage {
            relative_path: format!("{}/{}", date_folder, permanent_filename),
            permanent_filename,
            date_folder,
        })
    }

    /// Absolute path for a stored image; `None` if it would leave the root
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Bytes of a stored image, `None` when absent or out of bounds
    pub async fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(relative) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap() + chrono::Duration::milliseconds(589)
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(allowed_file("leaf.JPG"));
        assert!(allowed_file("a.b.png"));
        assert!(!allowed_file("leaf.gif"));
        assert!(!allowed_file("leaf"));
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("feuille maïs"), "feuille_ma_s");
        assert_eq!(secure_filename("..."), "image");
    }

    #[test]
    fn test_timestamped_filename() {
        assert_eq!(
            timestamped_filename("Leaf Photo.JPG", at()),
            "20250314_092653_589_Leaf_Photo.jpg"
        );
        assert_eq!(timestamped_filename("noext", at()), "20250314_092653_589_noext");
    }

    #[tokio::test]
    async fn test_save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let saved = store.save(b"png-bytes", "leaf.png", at()).await.unwrap();

        assert_eq!(saved.date_folder, "2025-03-14");
        assert_eq!(saved.relative_path, "2025-03-14/20250314_092653_589_leaf.png");
        let bytes = store.read(&saved.relative_path).await.unwrap().unwrap();
        assert_eq!(bytes, b"png-bytes");
        assert!(store.read("2025-03-14/missing.png").await.unwrap().is_none());
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = ImageStore::new("/srv/images");
        assert!(store.resolve("../secret").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("").is_none());
        assert_eq!(
            store.resolve("2025-03-14/a.png"),
            Some(PathBuf::from("/srv/images/2025-03-14/a.png"))
        );
    }
}
