//! Checks for a candidate upload before it reaches detection.

use std::io::Cursor;
use std::path::Path;

use serde::Serialize;
use tracing::info;
use zip::ZipArchive;

use crate::docx::{CONTENT_TYPES_PART, DOCUMENT_PART};
use crate::error::ValidationError;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const DANGEROUS: [&str; 11] = ["..", "/", "\\", "\0", "<", ">", ":", "\"", "|", "?", "*"];
const MAX_STEM_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidatedFile {
    pub file_name: String,
    pub size_bytes: u64,
}

fn check_extension(path: &Path) -> Result<(), ValidationError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or(ValidationError::MissingExtension)?;
    if ext.eq_ignore_ascii_case("docx") {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedExtension(ext.to_lowercase()))
    }
}

/// Extension, size, and that the bytes are a zip holding the parts every
/// WordprocessingML package needs.
pub fn validate_docx(path: &Path, max_bytes: u64) -> Result<ValidatedFile, ValidationError> {
    check_extension(path)?;

    let bytes = std::fs::read(path).map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let size = bytes.len() as u64;
    if size == 0 {
        return Err(ValidationError::Empty);
    }
    if size > max_bytes {
        return Err(ValidationError::TooLarge { size, max: max_bytes });
    }
    if !bytes.starts_with(ZIP_MAGIC) {
        return Err(ValidationError::NotAZip);
    }

    let archive =
        ZipArchive::new(Cursor::new(bytes.as_slice())).map_err(|_| ValidationError::NotAZip)?;
    for required in [CONTENT_TYPES_PART, DOCUMENT_PART] {
        if !archive.file_names().any(|n| n == required) {
            return Err(ValidationError::MissingPart(required));
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(file = %file_name, size, "upload validated");
    Ok(ValidatedFile {
        file_name,
        size_bytes: size,
    })
}

/// Strip directories and characters unsafe in a stored file name, and cap
/// the stem length.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() {
        return "unnamed_file".to_string();
    }
    let mut clean = base.to_string();
    for bad in DANGEROUS {
        clean = clean.replace(bad, "_");
    }

    let (stem, ext) = match clean.rfind('.') {
        Some(i) if i > 0 => clean.split_at(i),
        _ => (clean.as_str(), ""),
    };
    let stem: String = stem.chars().take(MAX_STEM_CHARS).collect();
    format!("{stem}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::{document_xml, DocxPackage};

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn accepts_a_real_docx() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = DocxPackage::from_document_xml(&document_xml("<w:p/>"))
            .to_bytes()
            .unwrap();
        let path = write(dir.path(), "Contract.DOCX", &bytes);
        let ok = validate_docx(&path, 1024 * 1024).unwrap();
        assert_eq!(ok.file_name, "Contract.DOCX");
        assert_eq!(ok.size_bytes, bytes.len() as u64);
    }

    #[test]
    fn rejects_bad_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();

        assert!(matches!(
            validate_docx(&write(d, "notes", b"x"), 10),
            Err(ValidationError::MissingExtension)
        ));
        assert!(matches!(
            validate_docx(&write(d, "notes.pdf", b"x"), 10),
            Err(ValidationError::UnsupportedExtension(e)) if e == "pdf"
        ));
        assert!(matches!(
            validate_docx(&write(d, "empty.docx", b""), 10),
            Err(ValidationError::Empty)
        ));
        assert!(matches!(
            validate_docx(&write(d, "big.docx", &[0; 64]), 10),
            Err(ValidationError::TooLarge { size: 64, max: 10 })
        ));
        assert!(matches!(
            validate_docx(&write(d, "text.docx", b"hello world"), 100),
            Err(ValidationError::NotAZip)
        ));
        assert!(matches!(
            validate_docx(&d.join("missing.docx"), 100),
            Err(ValidationError::Io { .. })
        ));
    }

    #[test]
    fn rejects_zip_without_main_part() {
        use std::io::Write;
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(CONTENT_TYPES_PART, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<Types/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "partial.docx", &bytes);
        assert!(matches!(
            validate_docx(&path, 1 << 20),
            Err(ValidationError::MissingPart(DOCUMENT_PART))
        ));
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\Users\x\My:File?.docx"), "My_File_.docx");
        assert_eq!(sanitize_filename("a..b.docx"), "a_b.docx");
        assert_eq!(sanitize_filename(""), "unnamed_file");
        assert_eq!(sanitize_filename("dir/"), "unnamed_file");
        assert_eq!(sanitize_filename(".hidden"), ".hidden");

        let long = format!("{}.docx", "n".repeat(300));
        let clean = sanitize_filename(&long);
        assert_eq!(clean.len(), MAX_STEM_CHARS + ".docx".len());
        assert!(clean.ends_with(".docx"));
    }
}
