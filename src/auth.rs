use crate::{
    auth::{
        credential::{now_secs, Credential},
        flow::PresentConsent,
        secret::ClientSecret,
    },
    config::{Config, Endpoints},
    drive::DriveClient,
};
use reqwest::Client;
use std::path::PathBuf;
use thiserror::Error;

mod callback;
mod credential;
mod flow;
mod secret;
mod token;

///Only files this app created or opened
pub const SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no client secret found at `{}`. You must create a credentials.json file.\n  See quickstart guide: https://developers.google.com/drive/api/quickstart/python", .path.display())]
    MissingClientSecret { path: PathBuf },
    #[error("invalid client secret file: {0}")]
    InvalidClientSecret(String),
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("authorization callback carried an unexpected state")]
    StateMismatch,
    #[error("authorization callback carried no code")]
    MissingCode,
    #[error("unable to run the local authorization listener: {0}")]
    Listener(#[source] std::io::Error),
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },
    #[error("unable to reach the token endpoint: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unable to generate random bytes: {0}")]
    Random(#[from] getrandom::Error),
}

/// Hands out an authenticated [`DriveClient`], caching the credential between runs.
pub struct CredentialManager {
    http: Client,
    client_secret_path: PathBuf,
    token_cache_path: PathBuf,
    endpoints: Endpoints,
    present: PresentConsent,
}

impl CredentialManager {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            client_secret_path: config.client_secret_path.clone(),
            token_cache_path: config.token_cache_path.clone(),
            endpoints: config.endpoints.clone(),
            present: flow::print_consent,
        }
    }

    pub async fn obtain_client(&self) -> Result<DriveClient, AuthError> {
        let credential = self.obtain_credential().await?;

        Ok(DriveClient::new(
            self.http.clone(),
            credential.access_token,
            self.endpoints.clone(),
        ))
    }

    #[instrument(skip(self))]
    async fn obtain_credential(&self) -> Result<Credential, AuthError> {
        let cached = Credential::load(&self.token_cache_path)
            .await
            .filter(|c| {
                let grants = c.grants(SCOPE);
                if !grants {
                    warn!(scope = %c.scope, "Cached credential lacks the drive.file scope");
                }
                grants
            });

        let credential = match cached {
            Some(credential) if credential.is_valid_at(now_secs()) => {
                debug!("Using cached credential");
                return Ok(credential);
            }
            Some(mut credential) => {
                let secret = ClientSecret::load(&self.client_secret_path).await?;
                match credential.refresh_token.clone() {
                    Some(refresh_token) => {
                        match token::refresh(&self.http, &secret, &refresh_token).await {
                            Ok(rsp) => {
                                credential.apply_refresh(rsp, now_secs());
                                credential
                            }
                            Err(AuthError::TokenEndpoint { status, body }) => {
                                warn!(%status, %body, "Refresh rejected, authorizing again");
                                self.authorize(&secret).await?
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    None => {
                        info!("Cached credential expired without a refresh token");
                        self.authorize(&secret).await?
                    }
                }
            }
            None => {
                let secret = ClientSecret::load(&self.client_secret_path).await?;
                self.authorize(&secret).await?
            }
        };

        credential.save(&self.token_cache_path).await?;
        Ok(credential)
    }

    async fn authorize(&self, secret: &ClientSecret) -> Result<Credential, AuthError> {
        flow::authorize(&self.http, secret, SCOPE, self.present).await
    }
}
