use thiserror::Error;
use tracing::warn;

use crate::api::auth::RegisterRequest;
use crate::api::{self, ApiClient, ApiError};
use crate::models::{AuthResponse, User};
use crate::store::CredentialStore;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Credentials or registration payload rejected, or the backend was
    /// unreachable; the message is what the console shows.
    #[error("{0}")]
    Rejected(String),
    #[error("credential store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Holds the signed-in identity and drives the login/register/logout
/// lifecycle against the credential store. Constructed once and passed
/// where needed; there is no ambient session state.
pub struct AuthSession {
    store: CredentialStore,
    user: Option<User>,
}

impl AuthSession {
    pub fn new(store: CredentialStore) -> Self {
        Self { store, user: None }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Reattach a previously stored token pair, if any. The token is not
    /// verified here; the first authenticated call proves or disproves it.
    pub fn resume(&mut self, client: &ApiClient) -> Result<bool, AuthError> {
        match self.store.tokens()? {
            Some(tokens) => {
                client.set_access_token(Some(tokens.access));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn login(
        &mut self,
        client: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        match api::auth::login(client, username, password).await {
            Ok(response) => self.install(client, response),
            Err(err) => Err(rejected(err, "Login failed")),
        }
    }

    pub async fn register(
        &mut self,
        client: &ApiClient,
        request: &RegisterRequest,
    ) -> Result<(), AuthError> {
        match api::auth::register(client, request).await {
            Ok(response) => self.install(client, response),
            Err(err) => Err(rejected(err, "Registration failed")),
        }
    }

    /// Drop the persisted tokens and the held identity.
    pub fn logout(&mut self, client: &ApiClient) -> Result<(), AuthError> {
        self.store.clear_tokens()?;
        client.set_access_token(None);
        self.user = None;
        Ok(())
    }

    /// A resumed token turned out to be stale (401 on first use).
    pub fn invalidate(&mut self, client: &ApiClient) -> Result<(), AuthError> {
        self.logout(client)
    }

    fn install(&mut self, client: &ApiClient, response: AuthResponse) -> Result<(), AuthError> {
        self.store.save_tokens(&response.tokens)?;
        client.set_access_token(Some(response.tokens.access.clone()));
        self.user = Some(response.user);
        Ok(())
    }
}

fn rejected(err: ApiError, fallback: &str) -> AuthError {
    match err {
        ApiError::Api { message, .. } if !message.is_empty() => AuthError::Rejected(message),
        other => {
            warn!("Auth request failed: {}", other);
            AuthError::Rejected(fallback.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthTokens;

    fn session() -> (tempfile::TempDir, AuthSession) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path()).unwrap();
        (dir, AuthSession::new(store))
    }

    fn response() -> AuthResponse {
        AuthResponse {
            user: User {
                id: 1,
                username: "alice".into(),
                email: "alice@example.com".into(),
                first_name: String::new(),
                last_name: String::new(),
                date_joined: "2024-01-01T00:00:00Z".into(),
            },
            tokens: AuthTokens {
                access: "acc".into(),
                refresh: "ref".into(),
            },
        }
    }

    #[test]
    fn install_persists_tokens_and_holds_the_user() {
        let (_dir, mut session) = session();
        let client = ApiClient::new("http://localhost:8000/api");

        session.install(&client, response()).unwrap();

        assert_eq!(session.user().unwrap().username, "alice");
        assert_eq!(session.store.tokens().unwrap().unwrap().access, "acc");
    }

    #[test]
    fn logout_clears_everything() {
        let (_dir, mut session) = session();
        let client = ApiClient::new("http://localhost:8000/api");
        session.install(&client, response()).unwrap();

        session.logout(&client).unwrap();

        assert!(session.user().is_none());
        assert!(session.store.tokens().unwrap().is_none());
    }

    #[test]
    fn resume_requires_a_stored_pair() {
        let (_dir, mut session) = session();
        let client = ApiClient::new("http://localhost:8000/api");

        assert!(!session.resume(&client).unwrap());

        session
            .store
            .save_tokens(&AuthTokens {
                access: "acc".into(),
                refresh: "ref".into(),
            })
            .unwrap();
        assert!(session.resume(&client).unwrap());
    }

    #[test]
    fn rejection_keeps_the_backend_message() {
        let err = rejected(
            ApiError::Api {
                status: 401,
                message: "Invalid credentials".into(),
            },
            "Login failed",
        );
        assert_eq!(err.to_string(), "Invalid credentials");

        let err = rejected(ApiError::Parse("bad json".into()), "Login failed");
        assert_eq!(err.to_string(), "Login failed");
    }
}
