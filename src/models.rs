use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A document record owned by the backend registry. The client only ever
/// creates, lists and deletes these; nothing is mutated in place.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub file_type: String,
    pub file_size: u64,
    #[serde(default)]
    pub processed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the session's message log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub timestamp: String,
}

impl Message {
    /// Freshly authored user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            confidence: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Assistant message; confidence only when the backend scored the answer.
    pub fn assistant(
        content: impl Into<String>,
        confidence: Option<f64>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            confidence,
            timestamp: timestamp.into(),
        }
    }
}

/// One persisted question/answer exchange, as returned by the history
/// endpoint in reverse-chronological order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QaRecord {
    pub id: String,
    #[serde(default)]
    pub document_title: Option<String>,
    pub question: String,
    pub answer: String,
    pub confidence_score: Option<f64>,
    pub created_at: String,
}

/// Response body of the ask endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QaAnswer {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub response_time: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub date_joined: String,
}

/// The persisted credential pair.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

/// Body of a successful login or registration.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: AuthTokens,
}

/// A local file staged for upload.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadCandidate {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
