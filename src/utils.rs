use std::path::{Path, PathBuf};
use url::Url;

/// Build a unique temporary file path under the system temp directory.
///
/// The file itself is created by whoever writes to the path; callers wrap it
/// in a [`TempFileGuard`] so it never survives the enclosing scope.
pub fn create_temp_file(prefix: &str, suffix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}{}{}", prefix, uuid::Uuid::new_v4(), suffix))
}

/// Removes the wrapped path on drop, success and failure paths alike.
pub struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to delete temp file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Create the parent directory of `path` if it is missing; returns false if
/// the parent exists but is not a directory.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<bool> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(parent.is_dir())
        }
        _ => Ok(true),
    }
}

pub fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn validate_url(url: &str) -> Result<Url, url::ParseError> {
    let parsed = Url::parse(url)?;

    // Ensure it's HTTP or HTTPS
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(url::ParseError::InvalidPort),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_temp_file_unique() {
        let a = create_temp_file("thumbnail-", ".png");
        let b = create_temp_file("thumbnail-", ".png");
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_string_lossy().ends_with(".png"));
    }

    #[test]
    fn test_temp_file_guard_removes_file() {
        let path = create_temp_file("guard-test-", ".tmp");
        std::fs::write(&path, b"data").unwrap();
        assert!(path.exists());
        {
            let _guard = TempFileGuard::new(path.clone());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_file_guard_tolerates_missing_file() {
        let path = create_temp_file("guard-missing-", ".tmp");
        let _guard = TempFileGuard::new(path);
    }

    #[test]
    fn test_ensure_parent_dir_creates_missing() {
        let dir = create_temp_file("parent-", "");
        let file = dir.join("nested").join("out.png");
        assert!(ensure_parent_dir(&file).unwrap());
        assert!(file.parent().unwrap().is_dir());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_ensure_parent_dir_rejects_file_parent() {
        let parent = create_temp_file("parent-file-", "");
        std::fs::write(&parent, b"not a dir").unwrap();
        let file = parent.join("out.png");
        assert!(!ensure_parent_dir(&file).unwrap());
        std::fs::remove_file(&parent).unwrap();
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("doc-42"), "doc-42");
        assert_eq!(sanitize_filename("a/b:c?"), "a_b_c_");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("invalid-url").is_err());
    }
}
