use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How the resume content was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Pdf,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::Pdf => "pdf",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(FileType::Text),
            "pdf" => Some(FileType::Pdf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub owner_user_id: String,
    pub title: String,
    pub content: String,
    pub storage_path: Option<String>,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDocument {
    pub id: Uuid,
    pub owner_user_id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    pub file_type: FileType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ResumeRow> for ResumeDocument {
    type Error = anyhow::Error;

    fn try_from(row: ResumeRow) -> Result<Self, Self::Error> {
        let file_type = FileType::parse(&row.file_type)
            .ok_or_else(|| anyhow::anyhow!("resume {} has unknown file_type '{}'", row.id, row.file_type))?;
        Ok(ResumeDocument {
            id: row.id,
            owner_user_id: row.owner_user_id,
            title: row.title,
            content: row.content,
            storage_path: row.storage_path,
            file_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields supplied when a resume record is first written.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub owner_user_id: String,
    pub title: String,
    pub content: String,
    pub storage_path: Option<String>,
    pub file_type: FileType,
}
