use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who to talk to and how to authenticate. The password itself is never
/// stored, only the encoded basic-auth token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub username: String,
    pub target_host: String,
    basic_token: String,
    pub modified_at_utc: DateTime<Utc>,
}

impl StoredCredentials {
    pub fn from_password(
        username: impl Into<String>,
        target_host: impl Into<String>,
        password: &str,
    ) -> Self {
        let username = username.into();
        let basic_token = STANDARD.encode(format!("{username}:{password}"));
        Self {
            username,
            target_host: target_host.into(),
            basic_token,
            modified_at_utc: Utc::now(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn auth_header(&self) -> String {
        format!("Basic {}", self.basic_token)
    }
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("username", &self.username)
            .field("target_host", &self.target_host)
            .field("basic_token", &"<REDACTED>")
            .field("modified_at_utc", &self.modified_at_utc)
            .finish()
    }
}
