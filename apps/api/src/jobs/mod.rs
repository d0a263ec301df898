//! Job search: external listing provider behind the `search-jobs` operation.
//!
//! The provider returns raw listings; they are mapped into `JobListing` and then
//! go through the same output-schema validation as LLM-backed operations.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const JSEARCH_DEFAULT_HOST: &str = "jsearch.p.rapidapi.com";
pub const SOURCE_NAME: &str = "jsearch";

#[derive(Debug, Error)]
pub enum JobSearchError {
    #[error("Job search is not configured (missing JSEARCH_API_KEY)")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// One job posting in the shape returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub id: String,
    pub source: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
}

/// External job-search capability. Carried in `AppState` as `Arc<dyn JobSearchProvider>`.
#[async_trait]
pub trait JobSearchProvider: Send + Sync {
    async fn search(&self, query: &str, location: &str) -> Result<Vec<JobListing>, JobSearchError>;
}

// ────────────────────────────────────────────────────────────────────────────
// JSearch (RapidAPI)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JSearchResponse {
    #[serde(default)]
    data: Vec<JSearchJob>,
}

#[derive(Debug, Deserialize)]
struct JSearchJob {
    job_id: String,
    job_title: Option<String>,
    employer_name: Option<String>,
    job_city: Option<String>,
    job_state: Option<String>,
    job_country: Option<String>,
    #[serde(default)]
    job_is_remote: bool,
    job_description: Option<String>,
    job_apply_link: Option<String>,
    job_google_link: Option<String>,
}

impl From<JSearchJob> for JobListing {
    fn from(job: JSearchJob) -> Self {
        let mut location: Vec<String> = [job.job_city, job.job_state, job.job_country]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect();
        if location.is_empty() && job.job_is_remote {
            location.push("Remote".to_string());
        }
        JobListing {
            id: job.job_id,
            source: SOURCE_NAME.to_string(),
            title: job.job_title.unwrap_or_default(),
            company: job.employer_name.unwrap_or_default(),
            location: location.join(", "),
            description: job.job_description.unwrap_or_default(),
            url: job
                .job_apply_link
                .or(job.job_google_link)
                .unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct JSearchClient {
    client: Client,
    api_key: Option<String>,
    host: String,
}

impl JSearchClient {
    pub fn new(api_key: Option<String>, host: Option<String>) -> Result<Self, JobSearchError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            api_key,
            host: host.unwrap_or_else(|| JSEARCH_DEFAULT_HOST.to_string()),
        })
    }
}

#[async_trait]
impl JobSearchProvider for JSearchClient {
    async fn search(&self, query: &str, location: &str) -> Result<Vec<JobListing>, JobSearchError> {
        let api_key = self.api_key.as_deref().ok_or(JobSearchError::NotConfigured)?;
        let full_query = search_query(query, location);

        let response = self
            .client
            .get(format!("https://{}/search", self.host))
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &self.host)
            .query(&[
                ("query", full_query.as_str()),
                ("page", "1"),
                ("num_pages", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Job search API returned {}: {}", status, message);
            return Err(JobSearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: JSearchResponse = response.json().await?;
        debug!("Job search returned {} listings for {:?}", body.data.len(), full_query);
        Ok(body.data.into_iter().map(JobListing::from).collect())
    }
}

fn search_query(query: &str, location: &str) -> String {
    let location = location.trim();
    if location.is_empty() {
        query.trim().to_string()
    } else {
        format!("{} in {}", query.trim(), location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_appends_location() {
        assert_eq!(search_query(" rust engineer ", "Berlin"), "rust engineer in Berlin");
        assert_eq!(search_query("rust engineer", "  "), "rust engineer");
    }

    #[test]
    fn test_jsearch_job_maps_to_listing() {
        let raw: JSearchResponse = serde_json::from_value(serde_json::json!({
            "status": "OK",
            "data": [{
                "job_id": "abc123",
                "job_title": "Backend Engineer",
                "employer_name": "Acme",
                "job_city": "Austin",
                "job_state": "TX",
                "job_country": "US",
                "job_description": "Build APIs",
                "job_apply_link": "https://acme.example/jobs/1"
            }]
        }))
        .unwrap();
        let listing = JobListing::from(raw.data.into_iter().next().unwrap());
        assert_eq!(
            listing,
            JobListing {
                id: "abc123".into(),
                source: "jsearch".into(),
                title: "Backend Engineer".into(),
                company: "Acme".into(),
                location: "Austin, TX, US".into(),
                description: "Build APIs".into(),
                url: "https://acme.example/jobs/1".into(),
            }
        );
    }

    #[test]
    fn test_remote_job_without_location() {
        let job: JSearchJob = serde_json::from_value(serde_json::json!({
            "job_id": "r1",
            "job_is_remote": true,
            "job_google_link": "https://google.example/r1"
        }))
        .unwrap();
        let listing = JobListing::from(job);
        assert_eq!(listing.location, "Remote");
        assert_eq!(listing.url, "https://google.example/r1");
        assert_eq!(listing.title, "");
    }

    #[test]
    fn test_missing_data_is_empty_list() {
        let raw: JSearchResponse = serde_json::from_value(serde_json::json!({"status": "OK"})).unwrap();
        assert!(raw.data.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_client_reports_not_configured() {
        let client = JSearchClient::new(None, None).unwrap();
        let err = client.search("rust", "remote").await.unwrap_err();
        assert!(matches!(err, JobSearchError::NotConfigured));
    }
}
