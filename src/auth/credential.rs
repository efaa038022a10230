use crate::auth::AuthError;
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::Path,
    time::UNIX_EPOCH,
};
use tokio::io::AsyncWriteExt;

pub const CREDENTIAL_VERSION: u32 = 1;

///seconds before the real expiry at which a token is already treated as expired
const EXPIRY_SKEW: u64 = 60;

pub fn now_secs() -> u64 {
    UNIX_EPOCH.elapsed().map(|x| x.as_secs()).unwrap_or_default()
}

/// The token cache, stored as pretty-printed JSON:
///
/// ```json
/// {
///   "version": 1,
///   "access_token": "ya29...",
///   "refresh_token": "1//0g...",
///   "expires_at": 1760000000,
///   "scope": "https://www.googleapis.com/auth/drive.file"
/// }
/// ```
///
/// `expires_at` is in seconds since the Unix epoch.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Credential {
    pub version: u32,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: u64,
    pub scope: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("version", &self.version)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

///Body of a successful token endpoint response
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl Credential {
    pub fn from_token_response(rsp: TokenResponse, requested_scope: &str, now: u64) -> Self {
        Self {
            version: CREDENTIAL_VERSION,
            access_token: rsp.access_token,
            refresh_token: rsp.refresh_token,
            expires_at: now + rsp.expires_in,
            scope: rsp.scope.unwrap_or_else(|| requested_scope.to_owned()),
        }
    }

    ///Takes a refresh grant's response, keeping the old refresh token if no new one came back
    pub fn apply_refresh(&mut self, rsp: TokenResponse, now: u64) {
        self.access_token = rsp.access_token;
        self.expires_at = now + rsp.expires_in;
        if let Some(refresh_token) = rsp.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = rsp.scope {
            self.scope = scope;
        }
    }

    pub fn is_valid_at(&self, now: u64) -> bool {
        !self.access_token.is_empty() && now + EXPIRY_SKEW < self.expires_at
    }

    pub fn grants(&self, scope: &str) -> bool {
        self.scope.split_whitespace().any(|x| x == scope)
    }

    ///A cache that is missing, unreadable or from another version counts as no credential
    pub async fn load(path: &Path) -> Option<Self> {
        let contents = match tokio::fs::read(path).await {
            Ok(x) => x,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(?path, "No cached credential");
                return None;
            }
            Err(e) => {
                warn!(?e, ?path, "Unable to read cached credential");
                return None;
            }
        };

        let credential: Self = match serde_json::from_slice(&contents) {
            Ok(x) => x,
            Err(e) => {
                warn!(?e, ?path, "Unable to parse cached credential, ignoring it");
                return None;
            }
        };

        if credential.version != CREDENTIAL_VERSION {
            warn!(
                found = credential.version,
                expected = CREDENTIAL_VERSION,
                "Cached credential has an unknown version, ignoring it"
            );
            return None;
        }

        Some(credential)
    }

    pub async fn save(&self, path: &Path) -> Result<(), AuthError> {
        let json = serde_json::to_vec_pretty(self)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await?;
        file.write_all(&json).await?;
        file.flush().await?;

        info!(?path, "Saved credential");
        Ok(())
    }
}
