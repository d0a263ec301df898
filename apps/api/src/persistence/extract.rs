use bytes::Bytes;
use thiserror::Error;

use crate::models::resume::FileType;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction error: {0}")]
    Pdf(String),

    #[error("file is not valid UTF-8 text")]
    NotUtf8,

    #[error("no text could be extracted")]
    Empty,

    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Picks the file type from the mime type when given, else from the extension.
pub fn detect_file_type(file_name: &str, mime_type: Option<&str>) -> Option<FileType> {
    match mime_type.map(|m| m.trim().to_ascii_lowercase()) {
        Some(m) if m == "application/pdf" => return Some(FileType::Pdf),
        Some(m) if m.starts_with("text/") => return Some(FileType::Text),
        Some(m) if m != "application/octet-stream" => return None,
        _ => {}
    }
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => Some(FileType::Pdf),
        ext if TEXT_EXTENSIONS.contains(&ext) => Some(FileType::Text),
        _ => None,
    }
}

pub fn default_mime_type(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Pdf => "application/pdf",
        FileType::Text => "text/plain",
    }
}

/// PDF parsing is CPU-bound and runs on the blocking pool.
pub async fn extract_text(file_type: FileType, bytes: Bytes) -> Result<String, ExtractError> {
    let text = match file_type {
        FileType::Pdf => tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        })
        .await??,
        FileType::Text => String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::NotUtf8)?,
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_mime_then_extension() {
        assert_eq!(detect_file_type("cv", Some("application/pdf")), Some(FileType::Pdf));
        assert_eq!(detect_file_type("cv.pdf", Some("text/plain")), Some(FileType::Text));
        assert_eq!(detect_file_type("CV.PDF", None), Some(FileType::Pdf));
        assert_eq!(
            detect_file_type("cv.md", Some("application/octet-stream")),
            Some(FileType::Text)
        );
        assert_eq!(detect_file_type("cv.docx", None), None);
        assert_eq!(detect_file_type("cv.pdf", Some("image/png")), None);
    }

    #[tokio::test]
    async fn test_text_is_trimmed() {
        let text = extract_text(FileType::Text, Bytes::from_static(b"\n  Jane Doe \n"))
            .await
            .unwrap();
        assert_eq!(text, "Jane Doe");
    }

    #[tokio::test]
    async fn test_blank_text_rejected() {
        let err = extract_text(FileType::Text, Bytes::from_static(b"  \n"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let err = extract_text(FileType::Text, Bytes::from_static(&[0xff, 0xfe, 0x00]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotUtf8));
    }

    #[tokio::test]
    async fn test_garbage_pdf_rejected() {
        let err = extract_text(FileType::Pdf, Bytes::from_static(b"not a pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
