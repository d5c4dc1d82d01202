use std::fmt;

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const AUTHORIZE_PATH: &str = "login/oauth/authorize";
pub const ACCESS_TOKEN_PATH: &str = "login/oauth/access_token";

/// Longest provider error body kept in an error value.
const BODY_EXCERPT_LEN: usize = 512;

/// OAuth application secret. Never printed by `Debug`, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(<redacted>)")
    }
}

/// Bearer token returned by the token endpoint.
///
/// `Debug` and `Display` only show a short prefix so tokens can be logged
/// for correlation without leaking them.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    fn prefix(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(4)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({}…)", self.prefix())
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", self.prefix())
    }
}

/// Static credentials of the registered OAuth application.
#[derive(Debug, Clone)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: ClientSecret,
    pub redirect_uri: String,
    /// Space separated scopes; omitted from the authorize URL when `None`.
    pub scope: Option<String>,
    /// Origin hosting `/login/oauth/*`, `https://github.com` in production.
    pub base_url: Url,
}

#[derive(Debug, Error)]
pub enum AuthorizeUrlError {
    #[error("JoinPath: {source}")]
    JoinPath {
        #[from]
        source: url::ParseError,
    },
}

/// Builds the URL the browser is sent to in order to start the flow.
pub fn authorize_url(config: &OAuthAppConfig) -> Result<Url, AuthorizeUrlError> {
    let mut url = config.base_url.join(AUTHORIZE_PATH)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri);
        if let Some(scope) = config.scope.as_deref() {
            query.append_pair("scope", scope);
        }
    }
    Ok(url)
}

#[derive(Debug, Error)]
pub enum TokenExchangeError {
    #[error("CodeMissing: authorization code is empty")]
    CodeMissing,

    #[error("JoinPath: {source}")]
    JoinPath { source: url::ParseError },

    #[error("RequestSend: {source}")]
    RequestSend { source: reqwest::Error },

    #[error("ResponseRead: {source}")]
    ResponseRead { source: reqwest::Error },

    #[error("UnexpectedStatus: {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("DeserializeResponseBody: {source}")]
    DeserializeResponseBody { source: serde_json::Error },

    #[error("Provider: {error}: {description}")]
    Provider { error: String, description: String },

    #[error("AccessTokenMissing: response carried no access_token")]
    AccessTokenMissing,
}

/// GitHub answers token requests with HTTP 200 even when the code is
/// rejected, so the error fields are read alongside the token.
#[derive(Deserialize)]
struct TokenResponseBody {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Trades a single-use authorization code for an access token.
///
/// Exactly one POST is issued; the code cannot be replayed so there is no
/// retry.
#[instrument(skip_all, fields(client_id = %config.client_id))]
pub async fn exchange_code(
    client: &Client,
    config: &OAuthAppConfig,
    code: &str,
) -> Result<AccessToken, TokenExchangeError> {
    if code.trim().is_empty() {
        return Err(TokenExchangeError::CodeMissing);
    }

    let endpoint = config
        .base_url
        .join(ACCESS_TOKEN_PATH)
        .map_err(|source| TokenExchangeError::JoinPath { source })?;

    let form = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.expose()),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];

    let response = client
        .post(endpoint)
        .header(header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|source| TokenExchangeError::RequestSend { source })?;

    let status = response.status();

    let body = response
        .text()
        .await
        .map_err(|source| TokenExchangeError::ResponseRead { source })?;

    if !status.is_success() {
        return Err(TokenExchangeError::UnexpectedStatus {
            status,
            body: excerpt(&body),
        });
    }

    let parsed: TokenResponseBody = serde_json::from_str(&body)
        .map_err(|source| TokenExchangeError::DeserializeResponseBody { source })?;

    if let Some(error) = parsed.error {
        return Err(TokenExchangeError::Provider {
            error,
            description: parsed.error_description.unwrap_or_default(),
        });
    }

    match parsed.access_token {
        Some(token) if !token.is_empty() => {
            let token = AccessToken::new(token);
            debug!(token = %token, "exchanged authorization code");
            Ok(token)
        }
        _ => Err(TokenExchangeError::AccessTokenMissing),
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthAppConfig {
        OAuthAppConfig {
            client_id: "cid".to_string(),
            client_secret: ClientSecret::new("shh"),
            redirect_uri: "http://localhost:8000/github/callback".to_string(),
            scope: None,
            base_url: Url::parse("https://github.com").unwrap(),
        }
    }

    #[test]
    fn authorize_url_encodes_redirect_uri() {
        let url = authorize_url(&config()).unwrap();

        assert_eq!(url.path(), "/login/oauth/authorize");
        assert_eq!(
            url.query(),
            Some("client_id=cid&redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fgithub%2Fcallback")
        );
    }

    #[test]
    fn authorize_url_appends_scope_when_configured() {
        let mut config = config();
        config.scope = Some("read:user repo".to_string());

        let url = authorize_url(&config).unwrap();
        let scope = url
            .query_pairs()
            .find(|(key, _)| key == "scope")
            .map(|(_, value)| value.into_owned());

        assert_eq!(scope.as_deref(), Some("read:user repo"));
    }

    #[test]
    fn secrets_are_not_printed() {
        let config = config();
        let token = AccessToken::new("gho_abcdefghijkl");

        assert!(!format!("{config:?}").contains("shh"));
        assert_eq!(format!("{token:?}"), "AccessToken(gho_…)");
        assert_eq!(token.to_string(), "gho_…");
    }

    #[test]
    fn zeroize_clears_secret_values() {
        let mut secret = ClientSecret::new("shh");
        let mut token = AccessToken::new("gho_abcdefghijkl");

        secret.zeroize();
        token.zeroize();

        assert_eq!(secret.expose(), "");
        assert_eq!(token.expose(), "");
    }

    #[test]
    fn short_tokens_do_not_panic() {
        assert_eq!(AccessToken::new("ab").to_string(), "ab…");
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = "x".repeat(BODY_EXCERPT_LEN * 2);
        assert_eq!(excerpt(&body).len(), BODY_EXCERPT_LEN);
    }
}
