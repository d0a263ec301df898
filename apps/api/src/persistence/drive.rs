use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::persistence::DriveClient;

const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Google Drive rejected the access token")]
    Unauthorized,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drive API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Google Drive v3 client. Files land in `folder_id` when one is configured,
/// otherwise in the user's Drive root.
#[derive(Clone)]
pub struct GoogleDriveClient {
    client: Client,
    folder_id: Option<String>,
}

impl GoogleDriveClient {
    pub fn new(folder_id: Option<String>) -> Result<Self, DriveError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            folder_id,
        })
    }
}

#[async_trait]
impl DriveClient for GoogleDriveClient {
    async fn upload(
        &self,
        access_token: &str,
        file_name: &str,
        mime_type: &str,
        body: Vec<u8>,
    ) -> Result<String, DriveError> {
        let boundary = format!("careerpilot-{}", Uuid::new_v4().simple());
        let payload = multipart_related_body(
            &boundary,
            file_name,
            mime_type,
            self.folder_id.as_deref(),
            &body,
        );

        let response = self
            .client
            .post(DRIVE_UPLOAD_URL)
            .bearer_auth(access_token)
            .header(
                "content-type",
                format!("multipart/related; boundary={boundary}"),
            )
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(DriveError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Drive API returned {}: {}", status, message);
            return Err(DriveError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let file: DriveFile = response.json().await?;
        Ok(file.id)
    }
}

/// Metadata part followed by the media part, as Drive's multipart upload expects.
fn multipart_related_body(
    boundary: &str,
    file_name: &str,
    mime_type: &str,
    folder_id: Option<&str>,
    media: &[u8],
) -> Vec<u8> {
    let mut metadata = json!({ "name": file_name, "mimeType": mime_type });
    if let Some(folder) = folder_id {
        metadata["parents"] = json!([folder]);
    }

    let mut out = Vec::with_capacity(media.len() + 512);
    out.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
             --{boundary}\r\nContent-Type: {mime_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    out.extend_from_slice(media);
    out.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_related_body("b1", "cv.md", "text/markdown", Some("folder-7"), b"# Jane");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b1\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{"));
        assert!(text.contains(r#""parents":["folder-7"]"#));
        assert!(text.contains(r#""name":"cv.md""#));
        assert!(text.contains("--b1\r\nContent-Type: text/markdown\r\n\r\n# Jane\r\n--b1--\r\n"));
    }

    #[test]
    fn test_multipart_body_without_folder() {
        let body = multipart_related_body("b1", "cv.md", "text/markdown", None, b"x");
        let text = String::from_utf8(body).unwrap();
        assert!(!text.contains("parents"));
    }
}
