pub mod auth;
pub mod documents;
pub mod qa;

use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::{Document, QaAnswer, QaRecord, UploadCandidate};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Status code when the backend answered with a rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Shared client state for the backend REST surface.
pub struct ApiClient {
    pub(crate) http: reqwest::Client,
    base_url: String,
    access_token: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            access_token: Mutex::new(None),
        }
    }

    /// Install or drop the bearer token sent on authenticated calls.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.lock().unwrap() = token;
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the Authorization header when a token is installed.
    pub(crate) fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.access_token.lock().unwrap().as_deref() {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    pub async fn health(&self) -> Result<bool, ApiError> {
        #[derive(Deserialize)]
        struct HealthResponse {
            status: String,
        }

        let resp = self.http.get(self.url("/health/")).send().await?;
        let data: HealthResponse = decode(resp).await?;
        Ok(data.status == "healthy")
    }
}

/// The slice of the backend the chat session depends on. `ApiClient` is the
/// real implementation; tests substitute an in-process one.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<Document>, ApiError>;
    async fn upload_document(
        &self,
        file: &UploadCandidate,
        title: &str,
    ) -> Result<Document, ApiError>;
    async fn delete_document(&self, document_id: &str) -> Result<(), ApiError>;
    async fn ask(&self, document_id: &str, question: &str) -> Result<QaAnswer, ApiError>;
    async fn history(&self, document_id: &str) -> Result<Vec<QaRecord>, ApiError>;
}

#[async_trait]
impl Backend for ApiClient {
    async fn list_documents(&self) -> Result<Vec<Document>, ApiError> {
        documents::list(self).await
    }

    async fn upload_document(
        &self,
        file: &UploadCandidate,
        title: &str,
    ) -> Result<Document, ApiError> {
        documents::upload(self, file, title).await
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), ApiError> {
        documents::remove(self, document_id).await
    }

    async fn ask(&self, document_id: &str, question: &str) -> Result<QaAnswer, ApiError> {
        qa::ask(self, document_id, question).await
    }

    async fn history(&self, document_id: &str) -> Result<Vec<QaRecord>, ApiError> {
        qa::history(self, document_id).await
    }
}

/// Listing endpoints return either a bare array or a pagination envelope.
/// Normalized here, once; call sites only ever see the items.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paginated { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            Listing::Paginated { results } => results,
            Listing::Plain(items) => items,
        }
    }
}

/// Check the status, then decode the typed body. Rejections carry the raw
/// body text as the message; endpoints with structured error bodies refine
/// it themselves.
pub(crate) async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: text,
        });
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    #[test]
    fn listing_decodes_bare_arrays_and_envelopes() {
        let doc = r#"{"id":"d1","title":"notes","file_type":"txt","file_size":12,
                      "processed":true,"created_at":"2024-01-01T00:00:00Z",
                      "updated_at":"2024-01-01T00:00:00Z"}"#;

        let bare: Listing<Document> = serde_json::from_str(&format!("[{}]", doc)).unwrap();
        assert_eq!(bare.into_items().len(), 1);

        let envelope: Listing<Document> = serde_json::from_str(&format!(
            r#"{{"count":1,"next":null,"previous":null,"results":[{}]}}"#,
            doc
        ))
        .unwrap();
        let items = envelope.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "d1");
    }

    #[test]
    fn empty_envelope_and_empty_array_both_normalize() {
        let bare: Listing<Document> = serde_json::from_str("[]").unwrap();
        assert!(bare.into_items().is_empty());

        let envelope: Listing<Document> = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert!(envelope.into_items().is_empty());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/api/");
        assert_eq!(client.url("/documents/"), "http://localhost:8000/api/documents/");
    }
}
