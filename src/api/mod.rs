//! HTTP client for the Jules REST API.
//!
//! Thin request/response wrapper: no retry or backoff logic lives here.
//! Callers (the TUI refresh path and the background monitor) decide how to
//! react to failures; the next scheduled refresh naturally retries.

use crate::data::{Activity, Session, Source};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://jules.googleapis.com/v1alpha";

/// Upper bound on pagination follow-ups for a single listing call.
const MAX_PAGES: usize = 10;

/// Shared HTTP client for all API requests to enable connection pooling
pub static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(5)
        .build()
        .expect("Failed to create HTTP client")
});

/// Failure taxonomy for API calls.
///
/// `Network` and `Auth` are transport/credential problems; `Status` is any
/// other non-2xx response; `Decode` means the body did not match the
/// expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    #[error("API error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Parameters for creating a new session.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub prompt: String,
    /// Resource name of the source to run against.
    pub source: String,
    pub title: Option<String>,
    pub starting_branch: Option<String>,
}

/// Client for the Jules agent service.
#[derive(Debug, Clone)]
pub struct JulesClient {
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSourcesResponse {
    #[serde(default)]
    sources: Vec<Source>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSessionsResponse {
    #[serde(default)]
    sessions: Vec<Session>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListActivitiesResponse {
    #[serde(default)]
    activities: Vec<Activity>,
}

impl JulesClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// List all connected sources, following pagination.
    pub async fn list_sources(&self) -> Result<Vec<Source>, ApiError> {
        let mut sources = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut path = "/sources?pageSize=100".to_string();
            if let Some(token) = &page_token {
                path.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let page: ListSourcesResponse = self.get_json(&path).await?;
            sources.extend(page.sources);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(sources)
    }

    /// List sessions across all sources, following pagination.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let mut sessions = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut path = "/sessions?pageSize=100".to_string();
            if let Some(token) = &page_token {
                path.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let page: ListSessionsResponse = self.get_json(&path).await?;
            sessions.extend(page.sessions);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(sessions)
    }

    /// Create a new agent session against a source.
    pub async fn create_session(&self, req: &NewSession) -> Result<Session, ApiError> {
        let mut source_context = serde_json::json!({ "source": req.source });
        if let Some(branch) = &req.starting_branch {
            source_context["githubRepoContext"] = serde_json::json!({ "startingBranch": branch });
        }

        let mut body = serde_json::json!({
            "prompt": req.prompt,
            "sourceContext": source_context,
        });
        if let Some(title) = &req.title {
            body["title"] = serde_json::json!(title);
        }

        self.post_json("/sessions", &body).await
    }

    /// Fetch a session's activity timeline, most recent first.
    ///
    /// Index 0 is the newest activity; the change monitor relies on this
    /// ordering, so it is part of this method's contract with the server.
    pub async fn list_activities(&self, session_id: &str) -> Result<Vec<Activity>, ApiError> {
        let path = format!("/{}/activities?pageSize=50", session_resource(session_id));
        let page: ListActivitiesResponse = self.get_json(&path).await?;
        Ok(page.activities)
    }

    /// Send a chat message to the agent in an existing session.
    pub async fn send_message(&self, session_id: &str, prompt: &str) -> Result<(), ApiError> {
        let path = format!("/{}:sendMessage", session_resource(session_id));
        let body = serde_json::json!({ "prompt": prompt });
        self.post_empty(&path, &body).await
    }

    /// Approve the agent's generated plan for a session.
    pub async fn approve_plan(&self, session_id: &str) -> Result<(), ApiError> {
        let path = format!("/{}:approvePlan", session_resource(session_id));
        self.post_empty(&path, &serde_json::json!({})).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = HTTP_CLIENT
            .get(format!("{}{}", self.base_url, path))
            .header("X-Goog-Api-Key", &self.api_key)
            .send()
            .await?;

        decode_response(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = HTTP_CLIENT
            .post(format!("{}{}", self.base_url, path))
            .header("X-Goog-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        decode_response(response).await
    }

    /// POST where the caller does not care about the response body.
    async fn post_empty(&self, path: &str, body: &serde_json::Value) -> Result<(), ApiError> {
        let response = HTTP_CLIENT
            .post(format!("{}{}", self.base_url, path))
            .header("X-Goog-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        read_success_body(response).await?;
        Ok(())
    }
}

/// Normalize a short id or resource name to "sessions/{id}".
fn session_resource(session_id: &str) -> String {
    if session_id.starts_with("sessions/") {
        session_id.to_string()
    } else {
        format!("sessions/{}", urlencoding::encode(session_id))
    }
}

/// Check the status line and return the body of a successful response.
async fn read_success_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();

    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(ApiError::Auth {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(body)
}

async fn decode_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let body = read_success_body(response).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Pull a human-readable message out of a Google-style error body.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value["error"]["message"].as_str() {
            return msg.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_resource_accepts_both_forms() {
        assert_eq!(session_resource("31337"), "sessions/31337");
        assert_eq!(session_resource("sessions/31337"), "sessions/31337");
    }

    #[test]
    fn test_error_message_from_google_error_body() {
        let body = r#"{"error": {"code": 404, "message": "Session not found", "status": "NOT_FOUND"}}"#;
        assert_eq!(error_message(body), "Session not found");
    }

    #[test]
    fn test_error_message_fallback_truncates() {
        let body = "x".repeat(500);
        assert_eq!(error_message(&body).len(), 200);
        assert_eq!(error_message(""), "no error body");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = JulesClient::new("https://example.test/v1/", "key");
        assert_eq!(client.base_url, "https://example.test/v1");
    }
}
