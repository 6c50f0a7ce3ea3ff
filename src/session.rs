use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};

use crate::api::documents::UPLOAD_FALLBACK;
use crate::api::{ApiError, Backend};
use crate::history;
use crate::models::{Document, Message, QaAnswer, UploadCandidate};
use crate::validation::{self, display_extension, format_file_size, title_from_filename};

/// Answer shown when the backend fails to produce one.
pub const FALLBACK_ANSWER: &str =
    "Sorry, I encountered an error processing your question. Please try again.";

/// An `ask` split in two: the optimistic half already applied, the resolution
/// half waiting on the backend. Carries the epoch that must still be current
/// for the answer to land.
struct AskTicket {
    document_id: String,
    question: String,
    epoch: u64,
}

/// Owns the message log, the selected document and the single in-flight
/// request slot. Every backend failure is absorbed here into either a stored
/// error string or a synthetic chat message; nothing propagates to callers.
pub struct ChatSession {
    backend: Arc<dyn Backend>,
    documents: Vec<Document>,
    selected: Option<Document>,
    messages: Vec<Message>,
    pending: bool,
    upload_error: Option<String>,
    /// Bumped on every selection change; an in-flight answer that resolves
    /// under an older epoch is stale and dropped.
    epoch: u64,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            documents: Vec::new(),
            selected: None,
            messages: Vec::new(),
            pending: false,
            upload_error: None,
            epoch: 0,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn selected(&self) -> Option<&Document> {
        self.selected.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    // ── Documents ──

    /// Re-fetch the document list. With nothing selected, the first document
    /// is selected automatically and its history hydrated.
    pub async fn refresh_documents(&mut self) -> Result<(), ApiError> {
        let backend = Arc::clone(&self.backend);
        self.documents = backend.list_documents().await?;
        if self.selected.is_none() {
            if let Some(first) = self.documents.first().cloned() {
                self.select_document(first).await;
            }
        }
        Ok(())
    }

    /// Switch the conversation to `doc`, replacing the log wholesale with
    /// its persisted history.
    pub async fn select_document(&mut self, doc: Document) {
        self.epoch += 1;
        let document_id = doc.id.clone();
        self.selected = Some(doc);
        let backend = Arc::clone(&self.backend);
        match backend.history(&document_id).await {
            Ok(records) => self.messages = history::reconstruct(&records),
            Err(err) => {
                // Never show another document's conversation.
                error!("Error fetching Q&A history: {}", err);
                self.messages.clear();
            }
        }
    }

    /// Validate and upload a local file, then make it the selected document.
    ///
    /// Validation failures never reach the network; the joined error text is
    /// stored for display and the current conversation is untouched. Ignored
    /// while another request is in flight.
    pub async fn upload_and_select(&mut self, file: UploadCandidate) {
        if self.pending {
            return;
        }

        let failures = validation::validate(&file.name, &file.media_type, file.size());
        if !failures.is_empty() {
            let text = failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(". ");
            self.upload_error = Some(text);
            return;
        }

        self.upload_error = None;
        self.pending = true;

        let title = title_from_filename(&file.name).to_string();
        let backend = Arc::clone(&self.backend);
        let result = backend.upload_document(&file, &title).await;
        self.pending = false;

        match result {
            Ok(doc) => {
                self.fetch_documents().await;
                self.epoch += 1;
                let welcome = format!(
                    "Document \"{}\" ({}, {}) has been uploaded and processed successfully! \
                     You can now ask questions about its content.",
                    doc.title,
                    display_extension(&file.name),
                    format_file_size(file.size()),
                );
                self.selected = Some(doc);
                self.messages = vec![Message::assistant(welcome, None, Utc::now().to_rfc3339())];
            }
            Err(err) => {
                error!("Error uploading file: {}", err);
                self.upload_error = Some(match &err {
                    ApiError::Api { message, .. } if !message.is_empty() => message.clone(),
                    _ => UPLOAD_FALLBACK.to_string(),
                });
            }
        }
    }

    /// Delete a document from the registry. When it was the selected one,
    /// the first remaining document takes its place and the log is cleared.
    /// The confirmation gate lives at the call site.
    pub async fn delete_document(&mut self, document_id: &str) {
        let backend = Arc::clone(&self.backend);
        if let Err(err) = backend.delete_document(document_id).await {
            error!("Error deleting document: {}", err);
            return;
        }
        self.fetch_documents().await;

        if self.selected.as_ref().is_some_and(|d| d.id == document_id) {
            self.epoch += 1;
            self.selected = self.documents.iter().find(|d| d.id != document_id).cloned();
            self.messages.clear();
        }
    }

    // ── Conversation ──

    /// Ask a question about the selected document.
    ///
    /// The user message is appended immediately; the answer (or the fallback
    /// when the backend errors) follows once the request resolves. Ignored
    /// while another request is in flight, without a selection, or when the
    /// trimmed question is empty.
    pub async fn ask(&mut self, question: &str) {
        let Some(ticket) = self.begin_ask(question) else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        let result = backend.ask(&ticket.document_id, &ticket.question).await;
        self.finish_ask(ticket, result);
    }

    /// Drop the on-screen conversation; selection and remote state stay.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn begin_ask(&mut self, question: &str) -> Option<AskTicket> {
        let question = question.trim();
        if question.is_empty() || self.pending {
            return None;
        }
        let document_id = self.selected.as_ref()?.id.clone();

        self.messages.push(Message::user(question));
        self.pending = true;
        Some(AskTicket {
            document_id,
            question: question.to_string(),
            epoch: self.epoch,
        })
    }

    fn finish_ask(&mut self, ticket: AskTicket, result: Result<QaAnswer, ApiError>) {
        self.pending = false;
        if ticket.epoch != self.epoch {
            warn!("Discarding answer that resolved after the selection changed");
            return;
        }
        match result {
            Ok(answer) => self.messages.push(Message::assistant(
                answer.answer,
                answer.confidence_score,
                answer.created_at,
            )),
            Err(err) => {
                error!("Error sending message: {}", err);
                self.messages.push(Message::assistant(
                    FALLBACK_ANSWER,
                    None,
                    Utc::now().to_rfc3339(),
                ));
            }
        }
    }

    async fn fetch_documents(&mut self) {
        let backend = Arc::clone(&self.backend);
        match backend.list_documents().await {
            Ok(docs) => self.documents = docs,
            Err(err) => error!("Error fetching documents: {}", err),
        }
    }
}
