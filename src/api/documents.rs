use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{decode, ApiClient, ApiError, Listing};
use crate::models::{Document, UploadCandidate};

/// Shown when an upload fails without a more specific message.
pub const UPLOAD_FALLBACK: &str = "Failed to upload document. Please try again.";

pub async fn list(client: &ApiClient) -> Result<Vec<Document>, ApiError> {
    let resp = client
        .authed(client.http.get(client.url("/documents/")))
        .send()
        .await?;
    let listing: Listing<Document> = decode(resp).await?;
    Ok(listing.into_items())
}

pub async fn upload(
    client: &ApiClient,
    file: &UploadCandidate,
    title: &str,
) -> Result<Document, ApiError> {
    let part = Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(&file.media_type)?;
    let form = Form::new().part("file", part).text("title", title.to_string());

    let resp = client
        .authed(client.http.post(client.url("/documents/upload/")))
        .multipart(form)
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: upload_error_message(&text),
        });
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
}

pub async fn remove(client: &ApiClient, document_id: &str) -> Result<(), ApiError> {
    let resp = client
        .authed(
            client
                .http
                .delete(client.url(&format!("/documents/{}/", document_id))),
        )
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}

/// Most specific message available in an upload error body: the field-level
/// `file` error, then the general `error` key, then the generic fallback.
fn upload_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct UploadErrorBody {
        #[serde(default)]
        file: Vec<String>,
        #[serde(default)]
        error: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<UploadErrorBody>(body) {
        if let Some(message) = parsed.file.into_iter().next() {
            return message;
        }
        if let Some(message) = parsed.error {
            return message;
        }
    }
    UPLOAD_FALLBACK.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_level_file_error_wins() {
        let body = r#"{"error":"Failed to process document","file":["File size cannot exceed 50MB"]}"#;
        assert_eq!(upload_error_message(body), "File size cannot exceed 50MB");
    }

    #[test]
    fn general_error_key_is_second_choice() {
        let body = r#"{"error":"Failed to process document"}"#;
        assert_eq!(upload_error_message(body), "Failed to process document");
    }

    #[test]
    fn anything_else_falls_back_to_the_generic_message() {
        assert_eq!(upload_error_message("{}"), UPLOAD_FALLBACK);
        assert_eq!(upload_error_message("<html>502</html>"), UPLOAD_FALLBACK);
        assert_eq!(upload_error_message(r#"{"file":[]}"#), UPLOAD_FALLBACK);
    }
}
