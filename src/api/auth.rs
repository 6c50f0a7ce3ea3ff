use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiError};
use crate::models::AuthResponse;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Registration payload. The backend enforces the password rules and echoes
/// field-level errors on rejection.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
}

pub async fn login(
    client: &ApiClient,
    username: &str,
    password: &str,
) -> Result<AuthResponse, ApiError> {
    let resp = client
        .http
        .post(client.url("/auth/login/"))
        .json(&LoginRequest { username, password })
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: error_key(&text, "Login failed"),
        });
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
}

pub async fn register(
    client: &ApiClient,
    request: &RegisterRequest,
) -> Result<AuthResponse, ApiError> {
    let resp = client
        .http
        .post(client.url("/auth/register/"))
        .json(request)
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: field_errors(&text, "Registration failed"),
        });
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
}

/// The `error` key of a JSON error body, or the fallback.
fn error_key(body: &str, fallback: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| fallback.to_string())
}

/// Registration errors come back as `{field: [msg, ...]}`. Flatten them to
/// one displayable line, or use the fallback when the body is not that shape.
fn field_errors(body: &str, fallback: &str) -> String {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback.to_string();
    };
    if map.is_empty() {
        return fallback.to_string();
    }
    map.iter()
        .map(|(field, messages)| {
            let text = match messages {
                serde_json::Value::Array(list) => list
                    .iter()
                    .filter_map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}: {}", field, text)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_error_body_yields_its_message() {
        assert_eq!(
            error_key(r#"{"error":"Invalid credentials"}"#, "Login failed"),
            "Invalid credentials"
        );
        assert_eq!(error_key("<html>gateway timeout</html>", "Login failed"), "Login failed");
    }

    #[test]
    fn registration_field_errors_flatten_to_one_line() {
        let body = r#"{"password":["This field is too short.","Too common."]}"#;
        assert_eq!(
            field_errors(body, "Registration failed"),
            "password: This field is too short. Too common."
        );

        let body = r#"{"non_field_errors":["Passwords don't match"]}"#;
        assert_eq!(
            field_errors(body, "Registration failed"),
            "non_field_errors: Passwords don't match"
        );

        assert_eq!(field_errors("[]", "Registration failed"), "Registration failed");
        assert_eq!(field_errors("{}", "Registration failed"), "Registration failed");
    }
}
