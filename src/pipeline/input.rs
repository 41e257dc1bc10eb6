//! Input resolution: validate the user-supplied PDF path.
//!
//! We check existence, read permission and the PDF magic bytes (`%PDF`)
//! up front so callers get a meaningful input error rather than a pdfium
//! failure halfway through the run.

use crate::error::OcrPdfError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, OcrPdfError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(OcrPdfError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(OcrPdfError::NotAPdf {
            path,
            magic: [0; 4],
        });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic == b"%PDF" => {}
                Ok(()) => return Err(OcrPdfError::NotAPdf { path, magic }),
                // Shorter than four bytes: cannot be a PDF either.
                Err(_) => return Err(OcrPdfError::NotAPdf { path, magic }),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(OcrPdfError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(OcrPdfError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/a/real/file.pdf").unwrap_err();
        assert!(matches!(err, OcrPdfError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello, not a pdf").unwrap();
        let err = resolve_input(f.path()).unwrap_err();
        match err {
            OcrPdfError::NotAPdf { magic, .. } => assert_eq!(&magic, b"hell"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tiny_file_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(matches!(
            resolve_input(f.path()),
            Err(OcrPdfError::NotAPdf { .. })
        ));
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            resolve_input(dir.path()),
            Err(OcrPdfError::NotAPdf { .. })
        ));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%%EOF\n").unwrap();
        let resolved = resolve_input(f.path()).expect("valid magic");
        assert_eq!(resolved, f.path());
    }
}
