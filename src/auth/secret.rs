use crate::auth::AuthError;
use serde::Deserialize;
use std::{io::ErrorKind, path::Path};

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_auth_uri() -> String {
    AUTH_URI.to_owned()
}

fn default_token_uri() -> String {
    TOKEN_URI.to_owned()
}

///The OAuth client downloaded from the Google Cloud console
#[derive(Deserialize, Clone)]
pub struct ClientSecret {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct SecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(x) => x,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AuthError::MissingClientSecret {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let secret = Self::from_json(&contents)?;
        debug!(?path, client_id = %secret.client_id, "Loaded client secret");
        Ok(secret)
    }

    pub fn from_json(contents: &str) -> Result<Self, AuthError> {
        let file: SecretFile = serde_json::from_str(contents)
            .map_err(|e| AuthError::InvalidClientSecret(e.to_string()))?;

        file.installed.or(file.web).ok_or_else(|| {
            AuthError::InvalidClientSecret("expected an `installed` or `web` client".into())
        })
    }
}
