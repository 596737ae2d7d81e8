use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum FileFilterError {
    #[error("Failed to read file: {0}")]
    ReadError(String),
    #[error("Not a file: {0}")]
    NotAFile(String),
}

/// MIME type for a staged file: extension first (mime_guess), then magic
/// bytes (infer), then `application/octet-stream`.
pub fn detect_mime(path: &Path, bytes: &[u8]) -> String {
    if let Some(guessed) = mime_guess::from_path(path).first() {
        return guessed.essence_str().to_string();
    }
    match infer::get(bytes) {
        Some(kind) => kind.mime_type().to_string(),
        None => mime::APPLICATION_OCTET_STREAM.essence_str().to_string(),
    }
}

/// Whether a path looks like an image, by extension or by content
pub fn is_image(path: &Path) -> bool {
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    if guessed.type_() == mime::IMAGE {
        return true;
    }
    matches!(
        infer::get_from_path(path),
        Ok(Some(kind)) if kind.matcher_type() == infer::MatcherType::Image
    )
}

/// `data:` URL used as the staging preview
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Expand dropped paths into files to stage. Plain files are kept as given;
/// directories contribute every image found beneath them.
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        log::warn!("[Upload] Skipping unreadable entry: {}", e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && is_image(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

pub fn file_name(path: &Path) -> Result<String, FileFilterError> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| FileFilterError::NotAFile(path.display().to_string()))
}

pub async fn read_file(path: &Path) -> Result<Vec<u8>, FileFilterError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| FileFilterError::ReadError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_detect_mime_by_extension() {
        assert_eq!(detect_mime(Path::new("photo.jpg"), b""), "image/jpeg");
        assert_eq!(detect_mime(Path::new("photo.PNG"), b""), "image/png");
        assert_eq!(detect_mime(Path::new("photo.webp"), b""), "image/webp");
    }

    #[test]
    fn test_detect_mime_by_content() {
        let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(detect_mime(Path::new("no_extension"), &png_magic), "image/png");
        assert_eq!(
            detect_mime(Path::new("mystery"), b"plain words"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn test_collect_files_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("trip");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("b.jpg"), b"x").unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let loose = dir.path().join("notes.txt");
        let files = collect_files(&[dir.path().to_path_buf(), loose.clone()]);

        assert_eq!(files, vec![dir.path().join("a.png"), nested.join("b.jpg"), loose]);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/cat.jpg")).unwrap(), "cat.jpg");
        assert!(file_name(Path::new("/")).is_err());
    }
}
