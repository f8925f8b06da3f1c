//! Roster service integration for badgelog.
//!
//! Resolves subject ids to display names against an institution roster
//! service. Name resolution is always a post-processing step: the
//! reconciliation engine itself never calls out here.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout for roster calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const LOOKUP_PATH: &str = "/v1/subjects/lookup";

/// Roster client errors.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The provided base URL was unusable.
    #[error("invalid roster URL: {reason}")]
    InvalidBaseUrl { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The roster service returned an error response.
    #[error("roster error: {message}")]
    Api { message: String },
    /// Failed to parse the roster response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Roster service client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client for the given roster base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty, not http(s), or if the HTTP
    /// client fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RosterError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();

        if base_url.is_empty() {
            return Err(RosterError::InvalidBaseUrl {
                reason: "URL cannot be empty",
            });
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RosterError::InvalidBaseUrl {
                reason: "URL must start with http:// or https://",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(RosterError::ClientBuild)?;

        Ok(Self { http, base_url })
    }

    /// Resolves display names for the given subject ids.
    ///
    /// Ids are deduplicated and blanks dropped before the request; subjects
    /// the roster does not know, and entries with blank names, are absent
    /// from the result.
    pub async fn display_names(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, String>, RosterError> {
        let ids = dedupe_ids(ids);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let request = LookupRequest { subject_ids: ids };
        let url = format!("{}{LOOKUP_PATH}", self.base_url);
        let response = self.http.post(&url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| RosterError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: LookupResponse = serde_json::from_str(&body)
            .map_err(|err| RosterError::InvalidResponse(err.to_string()))?;
        Ok(collect_names(payload))
    }
}

#[derive(Debug, Serialize)]
struct LookupRequest {
    subject_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    subjects: Vec<LookupSubject>,
}

#[derive(Debug, Deserialize)]
struct LookupSubject {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Deduplicates ids, dropping blanks and preserving first-seen order.
fn dedupe_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for id in ids {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            unique.push(trimmed.to_string());
        }
    }
    unique
}

fn collect_names(payload: LookupResponse) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for subject in payload.subjects {
        let Some(name) = subject.display_name else {
            continue;
        };
        let name = name.trim();
        if subject.id.is_empty() || name.is_empty() {
            continue;
        }
        names.insert(subject.id, name.to_string());
    }
    names
}

fn parse_api_error(body: &str) -> Option<RosterError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| RosterError::Api {
            message: payload.error.message,
        })
}
