use crate::auth::{credential::TokenResponse, secret::ClientSecret, AuthError};
use reqwest::Client;

async fn request_token(
    http: &Client,
    secret: &ClientSecret,
    grant: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let mut form: Vec<(&str, &str)> = vec![("client_id", secret.client_id.as_str())];
    if let Some(client_secret) = &secret.client_secret {
        form.push(("client_secret", client_secret.as_str()));
    }
    form.extend_from_slice(grant);

    let rsp = http.post(&secret.token_uri).form(&form).send().await?;

    let status = rsp.status();
    if !status.is_success() {
        let body = rsp.text().await.unwrap_or_default();
        return Err(AuthError::TokenEndpoint {
            status: status.as_u16(),
            body,
        });
    }

    Ok(rsp.json::<TokenResponse>().await?)
}

#[instrument(skip_all)]
pub async fn exchange_code(
    http: &Client,
    secret: &ClientSecret,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> Result<TokenResponse, AuthError> {
    let rsp = request_token(
        http,
        secret,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ],
    )
    .await?;

    info!(expires_in = rsp.expires_in, "Exchanged authorization code");
    Ok(rsp)
}

#[instrument(skip_all)]
pub async fn refresh(
    http: &Client,
    secret: &ClientSecret,
    refresh_token: &str,
) -> Result<TokenResponse, AuthError> {
    let rsp = request_token(
        http,
        secret,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await?;

    info!(expires_in = rsp.expires_in, "Refreshed access token");
    Ok(rsp)
}
