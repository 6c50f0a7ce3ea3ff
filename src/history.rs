use crate::models::{Message, QaRecord, Role};

/// Expand persisted Q&A records into a chronological message sequence.
///
/// The backend returns records newest-first; the transcript reads
/// oldest-first, two messages per record. The confidence score belongs to
/// the answer only.
pub fn reconstruct(records: &[QaRecord]) -> Vec<Message> {
    records
        .iter()
        .rev()
        .flat_map(|record| {
            [
                Message {
                    id: format!("q-{}", record.id),
                    role: Role::User,
                    content: record.question.clone(),
                    confidence: None,
                    timestamp: record.created_at.clone(),
                },
                Message {
                    id: format!("a-{}", record.id),
                    role: Role::Assistant,
                    content: record.answer.clone(),
                    confidence: record.confidence_score,
                    timestamp: record.created_at.clone(),
                },
            ]
        })
        .collect()
}
