use crate::auth::{
    callback::Loopback,
    credential::{now_secs, Credential},
    secret::ClientSecret,
    token, AuthError,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use color_eyre::owo_colors::OwoColorize;
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};

fn random_token(len: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0_u8; len];
    getrandom::getrandom(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

///RFC 7636 S256 challenge for `verifier`
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

pub struct ConsentRequest {
    pub url: Url,
    pub redirect_uri: String,
    pub state: String,
    pub verifier: String,
}

impl ConsentRequest {
    pub fn new(secret: &ClientSecret, redirect_uri: &str, scope: &str) -> Result<Self, AuthError> {
        let state = random_token(16)?;
        let verifier = random_token(32)?;
        let challenge = pkce_challenge(&verifier);

        let url = Url::parse_with_params(
            &secret.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", secret.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope),
                ("state", state.as_str()),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::InvalidClientSecret(format!("bad auth_uri: {e}")))?;

        Ok(Self {
            url,
            redirect_uri: redirect_uri.to_owned(),
            state,
            verifier,
        })
    }
}

///How the consent URL reaches the user
pub type PresentConsent = fn(&ConsentRequest);

pub fn print_consent(consent: &ConsentRequest) {
    eprintln!();
    eprintln!(
        "{}",
        "Please visit this URL to authorize driveup:".bold()
    );
    eprintln!("{}", consent.url.as_str().underline());
    eprintln!();
}

/// Sends the user through the consent screen and trades the code for a fresh credential.
#[instrument(skip_all)]
pub async fn authorize(
    http: &Client,
    secret: &ClientSecret,
    scope: &str,
    present: PresentConsent,
) -> Result<Credential, AuthError> {
    let loopback = Loopback::bind().await?;
    let redirect_uri = loopback.redirect_uri();
    let consent = ConsentRequest::new(secret, &redirect_uri, scope)?;

    present(&consent);
    info!(%redirect_uri, "Waiting for authorization");

    let code = loopback.wait_for_code(&consent.state).await?;
    let rsp = token::exchange_code(http, secret, &code, &redirect_uri, &consent.verifier).await?;

    Ok(Credential::from_token_response(rsp, scope, now_secs()))
}
