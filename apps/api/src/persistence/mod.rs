//! Persistence Gateway: resume records, blob storage, Google Drive export and the
//! OAuth credentials that export needs.
//!
//! Every backing service sits behind a trait and is injected as `Arc<dyn …>`, so the
//! gateway's ordering rules (auth before any store call, blob before record on
//! delete, compensation on failed upload) are tested against in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::credential::GoogleAuthCredential;
use crate::models::resume::{NewResume, ResumeDocument};

pub mod blobs;
pub mod credentials;
pub mod drive;
pub mod extract;
pub mod handlers;
pub mod oauth;
pub mod resumes;

use drive::DriveError;
use extract::detect_file_type;
use oauth::{OAuthError, OAuthProvider, OAuthStateStore};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

fn storage(context: &str, e: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Storage(format!("{context}: {e:#}"))
}

// ────────────────────────────────────────────────────────────────────────────
// Backing services
// ────────────────────────────────────────────────────────────────────────────

/// Per-user resume collection.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn insert(&self, resume: NewResume) -> anyhow::Result<ResumeDocument>;
    /// Returns `false` when no resume with `id` belongs to `owner_user_id`.
    async fn update(
        &self,
        id: Uuid,
        owner_user_id: &str,
        title: &str,
        content: &str,
    ) -> anyhow::Result<bool>;
    /// Newest-updated first.
    async fn list(&self, owner_user_id: &str) -> anyhow::Result<Vec<ResumeDocument>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ResumeDocument>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, user_id: &str) -> anyhow::Result<Option<GoogleAuthCredential>>;
    /// Insert or replace. A `None` refresh token keeps the stored one.
    async fn upsert(&self, credential: &GoogleAuthCredential) -> anyhow::Result<()>;
}

#[async_trait]
pub trait DriveClient: Send + Sync {
    /// Uploads a file and returns its Drive file id.
    async fn upload(
        &self,
        access_token: &str,
        file_name: &str,
        mime_type: &str,
        body: Vec<u8>,
    ) -> Result<String, DriveError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Requests / responses
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResumeRequest {
    #[serde(default)]
    pub owner_user_id: Option<String>,
    pub title: String,
    pub content: String,
    /// Re-save an existing resume instead of creating a new one.
    #[serde(default)]
    pub resume_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResume {
    pub resume_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResumeRequest {
    #[serde(default)]
    pub owner_user_id: Option<String>,
    pub resume_id: Uuid,
    #[serde(default)]
    pub storage_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadResumeRequest {
    pub owner_user_id: Option<String>,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveToDriveRequest {
    pub file_name: String,
    pub file_content_base64: String,
    pub mime_type: String,
    #[serde(default)]
    pub owner_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedToDrive {
    pub file_id: String,
}

/// Returns the owner id or `Unauthenticated` when it is absent or blank.
pub(crate) fn require_owner(owner: Option<&str>) -> Result<&str, PersistenceError> {
    match owner.map(str::trim) {
        Some(owner) if !owner.is_empty() => Ok(owner),
        _ => Err(PersistenceError::Unauthenticated(
            "a signed-in user is required".to_string(),
        )),
    }
}

/// Object key for an uploaded resume. Path separators in the file name are
/// replaced so a name cannot escape the owner's prefix.
pub fn upload_key(owner_user_id: &str, upload_id: Uuid, file_name: &str) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("resumes/{owner_user_id}/{upload_id}-{safe_name}")
}

// ────────────────────────────────────────────────────────────────────────────
// Gateway
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PersistenceGateway {
    resumes: Arc<dyn ResumeStore>,
    blobs: Arc<dyn BlobStore>,
    credentials: Arc<dyn CredentialStore>,
    drive: Arc<dyn DriveClient>,
    oauth: Arc<dyn OAuthProvider>,
    oauth_states: Arc<dyn OAuthStateStore>,
}

impl PersistenceGateway {
    pub fn new(
        resumes: Arc<dyn ResumeStore>,
        blobs: Arc<dyn BlobStore>,
        credentials: Arc<dyn CredentialStore>,
        drive: Arc<dyn DriveClient>,
        oauth: Arc<dyn OAuthProvider>,
        oauth_states: Arc<dyn OAuthStateStore>,
    ) -> Self {
        Self {
            resumes,
            blobs,
            credentials,
            drive,
            oauth,
            oauth_states,
        }
    }

    pub async fn save_resume(&self, req: SaveResumeRequest) -> Result<SavedResume, PersistenceError> {
        let owner = require_owner(req.owner_user_id.as_deref())?;

        if let Some(resume_id) = req.resume_id {
            let updated = self
                .resumes
                .update(resume_id, owner, &req.title, &req.content)
                .await
                .map_err(|e| storage("Failed to update resume", e))?;
            if !updated {
                return Err(PersistenceError::NotFound(format!("Resume {resume_id} not found")));
            }
            info!("Updated resume {resume_id} for user {owner}");
            return Ok(SavedResume { resume_id });
        }

        let doc = self
            .resumes
            .insert(NewResume {
                owner_user_id: owner.to_string(),
                title: req.title,
                content: req.content,
                storage_path: None,
                file_type: crate::models::resume::FileType::Text,
            })
            .await
            .map_err(|e| storage("Failed to save resume", e))?;
        info!("Saved resume {} for user {owner}", doc.id);
        Ok(SavedResume { resume_id: doc.id })
    }

    pub async fn list_resumes(&self, owner_user_id: Option<&str>) -> Result<Vec<ResumeDocument>, PersistenceError> {
        let owner = require_owner(owner_user_id)?;
        self.resumes
            .list(owner)
            .await
            .map_err(|e| storage("Failed to list resumes", e))
    }

    /// Deletes the backing blob first, then the record. A failed blob delete
    /// leaves the record in place so the delete can be retried.
    pub async fn delete_resume(&self, req: DeleteResumeRequest) -> Result<(), PersistenceError> {
        let owner = require_owner(req.owner_user_id.as_deref())?;
        let doc = self
            .resumes
            .get(req.resume_id)
            .await
            .map_err(|e| storage("Failed to load resume", e))?
            .filter(|doc| doc.owner_user_id == owner)
            .ok_or_else(|| PersistenceError::NotFound(format!("Resume {} not found", req.resume_id)))?;

        // The blob key always comes from the owned record; a client-supplied key
        // must name that same object.
        if let Some(requested) = req.storage_path.as_deref() {
            if doc.storage_path.as_deref() != Some(requested) {
                return Err(PersistenceError::InvalidInput(format!(
                    "storagePath does not belong to resume {}",
                    doc.id
                )));
            }
        }

        if let Some(path) = doc.storage_path {
            self.blobs.delete(&path).await.map_err(|e| {
                warn!("Blob delete failed for {path}, keeping resume {}: {e:#}", doc.id);
                storage("Failed to delete stored file", e)
            })?;
        }

        self.resumes
            .delete(doc.id)
            .await
            .map_err(|e| storage("Failed to delete resume", e))?;
        info!("Deleted resume {} for user {owner}", doc.id);
        Ok(())
    }

    /// Extracts text from an uploaded file, keeps the original in the blob store and
    /// records both. The blob is removed again if the record cannot be written.
    pub async fn upload_resume(&self, req: UploadResumeRequest) -> Result<ResumeDocument, PersistenceError> {
        let owner = require_owner(req.owner_user_id.as_deref())?.to_string();
        if req.bytes.is_empty() {
            return Err(PersistenceError::InvalidInput("uploaded file is empty".to_string()));
        }
        let file_type = detect_file_type(&req.file_name, req.mime_type.as_deref()).ok_or_else(|| {
            PersistenceError::InvalidInput(format!(
                "unsupported file '{}': upload a PDF or a plain-text file",
                req.file_name
            ))
        })?;
        let content = extract::extract_text(file_type, req.bytes.clone())
            .await
            .map_err(|e| PersistenceError::InvalidInput(format!("could not read '{}': {e}", req.file_name)))?;

        let key = upload_key(&owner, Uuid::new_v4(), &req.file_name);
        let content_type = req
            .mime_type
            .clone()
            .unwrap_or_else(|| extract::default_mime_type(file_type).to_string());
        self.blobs
            .put(&key, req.bytes, &content_type)
            .await
            .map_err(|e| storage("Failed to store uploaded file", e))?;

        let title = req
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| req.file_name.clone());
        let inserted = self
            .resumes
            .insert(NewResume {
                owner_user_id: owner.clone(),
                title,
                content,
                storage_path: Some(key.clone()),
                file_type,
            })
            .await;

        match inserted {
            Ok(doc) => {
                info!("Uploaded resume {} ({}) for user {owner}", doc.id, file_type.as_str());
                Ok(doc)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&key).await {
                    warn!("Orphaned upload {key} could not be removed: {cleanup:#}");
                }
                Err(storage("Failed to save resume", e))
            }
        }
    }

    /// Uploads a file to the owner's Google Drive, refreshing an expired access
    /// token first when a refresh token is on record.
    pub async fn save_file_to_external_drive(
        &self,
        req: SaveToDriveRequest,
    ) -> Result<SavedToDrive, PersistenceError> {
        let owner = require_owner(req.owner_user_id.as_deref())?;
        let credential = self
            .credentials
            .get(owner)
            .await
            .map_err(|e| storage("Failed to load Google credentials", e))?
            .ok_or_else(|| PersistenceError::Unauthenticated("Google Drive is not connected".to_string()))?;
        if credential.access_token.trim().is_empty() {
            return Err(PersistenceError::Unauthenticated(
                "Google Drive access token is missing".to_string(),
            ));
        }

        let body = base64::engine::general_purpose::STANDARD
            .decode(req.file_content_base64.trim())
            .map_err(|e| PersistenceError::InvalidInput(format!("fileContentBase64 is not valid base64: {e}")))?;

        let credential = self.fresh_credential(credential).await?;

        let file_id = self
            .drive
            .upload(&credential.access_token, &req.file_name, &req.mime_type, body)
            .await
            .map_err(|e| match e {
                DriveError::Unauthorized => PersistenceError::Unauthenticated(
                    "Google Drive rejected the stored credentials".to_string(),
                ),
                other => storage("Google Drive upload failed", other),
            })?;
        info!("Saved {} to Google Drive for user {owner} (file {file_id})", req.file_name);
        Ok(SavedToDrive { file_id })
    }

    async fn fresh_credential(
        &self,
        credential: GoogleAuthCredential,
    ) -> Result<GoogleAuthCredential, PersistenceError> {
        let now = Utc::now();
        if !credential.is_expired(now) {
            return Ok(credential);
        }
        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            return Err(PersistenceError::Unauthenticated(
                "Google Drive authorization expired; reconnect Google Drive".to_string(),
            ));
        };

        let grant = self.oauth.refresh(refresh_token).await.map_err(|e| {
            warn!("Token refresh failed for user {}: {e}", credential.user_id);
            PersistenceError::Unauthenticated("Google Drive authorization expired; reconnect Google Drive".to_string())
        })?;
        let refreshed = GoogleAuthCredential {
            user_id: credential.user_id.clone(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.or(credential.refresh_token),
            access_token_expires: now + Duration::seconds(grant.expires_in),
        };
        self.credentials
            .upsert(&refreshed)
            .await
            .map_err(|e| storage("Failed to store refreshed Google credentials", e))?;
        info!("Refreshed Google access token for user {}", refreshed.user_id);
        Ok(refreshed)
    }

    /// Issues a one-time state nonce bound to `user_id` and returns the consent URL.
    pub async fn authorization_url(&self, user_id: Option<&str>) -> Result<String, PersistenceError> {
        let user_id = require_owner(user_id)?;
        let state = Uuid::new_v4().simple().to_string();
        self.oauth_states
            .issue(&state, user_id)
            .await
            .map_err(|e| storage("Failed to record OAuth state", e))?;
        self.oauth
            .authorization_url(&state)
            .map_err(|e| storage("Failed to build Google consent URL", e))
    }

    /// Consumes the state nonce, exchanges the code and stores the credential.
    /// Returns the user the credential belongs to.
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<String, PersistenceError> {
        let user_id = self
            .oauth_states
            .consume(state)
            .await
            .map_err(|e| storage("Failed to read OAuth state", e))?
            .ok_or_else(|| PersistenceError::Unauthenticated("OAuth state is unknown or expired".to_string()))?;

        let grant = self.oauth.exchange_code(code).await.map_err(|e| match e {
            OAuthError::Rejected(msg) => PersistenceError::Unauthenticated(format!("Google rejected the authorization code: {msg}")),
            other => storage("Google token exchange failed", other),
        })?;
        let credential = GoogleAuthCredential {
            user_id: user_id.clone(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            access_token_expires: Utc::now() + Duration::seconds(grant.expires_in),
        };
        self.credentials
            .upsert(&credential)
            .await
            .map_err(|e| storage("Failed to store Google credentials", e))?;
        info!("Stored Google Drive credentials for user {user_id}");
        Ok(user_id)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fakes for every backing service.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use super::oauth::TokenGrant;
    use super::*;

    #[derive(Default)]
    pub struct MemoryResumes {
        pub docs: Mutex<Vec<ResumeDocument>>,
        pub calls: AtomicUsize,
        pub fail_insert: bool,
    }

    impl MemoryResumes {
        pub fn seed(&self, owner: &str, storage_path: Option<&str>, updated_at: DateTime<Utc>) -> Uuid {
            let id = Uuid::new_v4();
            self.docs.lock().unwrap().push(ResumeDocument {
                id,
                owner_user_id: owner.to_string(),
                title: "Seeded".into(),
                content: "content".into(),
                storage_path: storage_path.map(str::to_string),
                file_type: crate::models::resume::FileType::Text,
                created_at: updated_at,
                updated_at,
            });
            id
        }
    }

    #[async_trait]
    impl ResumeStore for MemoryResumes {
        async fn insert(&self, resume: NewResume) -> anyhow::Result<ResumeDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_insert {
                anyhow::bail!("connection reset");
            }
            let now = Utc::now();
            let doc = ResumeDocument {
                id: Uuid::new_v4(),
                owner_user_id: resume.owner_user_id,
                title: resume.title,
                content: resume.content,
                storage_path: resume.storage_path,
                file_type: resume.file_type,
                created_at: now,
                updated_at: now,
            };
            self.docs.lock().unwrap().push(doc.clone());
            Ok(doc)
        }

        async fn update(&self, id: Uuid, owner: &str, title: &str, content: &str) -> anyhow::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut docs = self.docs.lock().unwrap();
            match docs.iter_mut().find(|d| d.id == id && d.owner_user_id == owner) {
                Some(doc) => {
                    doc.title = title.to_string();
                    doc.content = content.to_string();
                    doc.updated_at = Utc::now();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn list(&self, owner: &str) -> anyhow::Result<Vec<ResumeDocument>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut docs: Vec<_> = self
                .docs
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.owner_user_id == owner)
                .cloned()
                .collect();
            docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(docs)
        }

        async fn get(&self, id: Uuid) -> anyhow::Result<Option<ResumeDocument>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.docs.lock().unwrap().iter().find(|d| d.id == id).cloned())
        }

        async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.docs.lock().unwrap().retain(|d| d.id != id);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MemoryBlobs {
        pub objects: Mutex<HashMap<String, (Bytes, String)>>,
        pub fail_delete: bool,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobs {
        async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), (body, content_type.to_string()));
            Ok(())
        }

        async fn delete(&self, key: &str) -> anyhow::Result<()> {
            if self.fail_delete {
                anyhow::bail!("503 Slow Down");
            }
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MemoryCredentials {
        pub rows: Mutex<HashMap<String, GoogleAuthCredential>>,
    }

    #[async_trait]
    impl CredentialStore for MemoryCredentials {
        async fn get(&self, user_id: &str) -> anyhow::Result<Option<GoogleAuthCredential>> {
            Ok(self.rows.lock().unwrap().get(user_id).cloned())
        }

        async fn upsert(&self, credential: &GoogleAuthCredential) -> anyhow::Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let mut next = credential.clone();
            if next.refresh_token.is_none() {
                next.refresh_token = rows
                    .get(&credential.user_id)
                    .and_then(|c| c.refresh_token.clone());
            }
            rows.insert(credential.user_id.clone(), next);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingDrive {
        pub uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
        pub reject: bool,
    }

    #[async_trait]
    impl DriveClient for RecordingDrive {
        async fn upload(
            &self,
            access_token: &str,
            file_name: &str,
            _mime_type: &str,
            body: Vec<u8>,
        ) -> Result<String, DriveError> {
            if self.reject {
                return Err(DriveError::Unauthorized);
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((access_token.to_string(), file_name.to_string(), body));
            Ok(format!("drive-file-{}", uploads.len()))
        }
    }

    #[derive(Default)]
    pub struct FakeOAuth {
        pub refreshes: AtomicUsize,
    }

    #[async_trait]
    impl OAuthProvider for FakeOAuth {
        fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
            Ok(format!("https://accounts.example/auth?state={state}"))
        }

        async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthError> {
            if code == "bad" {
                return Err(OAuthError::Rejected("invalid_grant".into()));
            }
            Ok(TokenGrant {
                access_token: format!("access-for-{code}"),
                refresh_token: None,
                expires_in: 3600,
            })
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, OAuthError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(TokenGrant {
                access_token: "refreshed-access".into(),
                refresh_token: None,
                expires_in: 3600,
            })
        }
    }

    #[derive(Default)]
    pub struct MemoryStates {
        pub states: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl OAuthStateStore for MemoryStates {
        async fn issue(&self, state: &str, user_id: &str) -> anyhow::Result<()> {
            self.states
                .lock()
                .unwrap()
                .insert(state.to_string(), user_id.to_string());
            Ok(())
        }

        async fn consume(&self, state: &str) -> anyhow::Result<Option<String>> {
            Ok(self.states.lock().unwrap().remove(state))
        }
    }

    /// All fakes plus the gateway wired to them.
    #[derive(Default)]
    pub struct Fakes {
        pub resumes: Arc<MemoryResumes>,
        pub blobs: Arc<MemoryBlobs>,
        pub credentials: Arc<MemoryCredentials>,
        pub drive: Arc<RecordingDrive>,
        pub oauth: Arc<FakeOAuth>,
        pub states: Arc<MemoryStates>,
    }

    impl Fakes {
        pub fn gateway(&self) -> PersistenceGateway {
            PersistenceGateway::new(
                self.resumes.clone(),
                self.blobs.clone(),
                self.credentials.clone(),
                self.drive.clone(),
                self.oauth.clone(),
                self.states.clone(),
            )
        }
    }
}
