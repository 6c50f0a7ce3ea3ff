use serde::Serialize;

use super::{decode, ApiClient, ApiError, Listing};
use crate::models::{QaAnswer, QaRecord};

#[derive(Serialize)]
struct AskRequest<'a> {
    document_id: &'a str,
    question: &'a str,
}

pub async fn ask(
    client: &ApiClient,
    document_id: &str,
    question: &str,
) -> Result<QaAnswer, ApiError> {
    let resp = client
        .authed(client.http.post(client.url("/qa/ask/")))
        .json(&AskRequest {
            document_id,
            question,
        })
        .send()
        .await?;
    decode(resp).await
}

pub async fn history(client: &ApiClient, document_id: &str) -> Result<Vec<QaRecord>, ApiError> {
    let resp = client
        .authed(client.http.get(client.url("/qa/history/")))
        .query(&[("document_id", document_id)])
        .send()
        .await?;
    let listing: Listing<QaRecord> = decode(resp).await?;
    Ok(listing.into_items())
}
