use std::fmt;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use interfaces_github_oauth::AccessToken;
use reqwest::{header, header::HeaderMap, Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

pub const USER_PATH: &str = "user";
pub const USER_REPOS_PATH: &str = "user/repos";

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: &str = "100";
const BODY_EXCERPT_LEN: usize = 512;

/// Backoff applied to the idempotent GETs. Only transient failures are
/// retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

#[derive(Debug, Clone)]
pub struct GitHubApiConfig {
    /// `https://api.github.com` in production.
    pub base_url: Url,
    /// Upper bound on followed `rel="next"` links.
    pub max_pages: usize,
    pub retry: RetryPolicy,
}

/// Which of the two reads failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchCall {
    Identity,
    Resources,
}

impl fmt::Display for FetchCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCall::Identity => f.write_str("identity"),
            FetchCall::Resources => f.write_str("resources"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchErrorKind {
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

    #[error("UnexpectedShape: expected a JSON {expected}")]
    UnexpectedShape { expected: &'static str },

    #[error("TooManyPages: more than {max_pages} pages")]
    TooManyPages { max_pages: usize },

    #[error("ForeignNextLink: next page on {origin}, expected {expected}")]
    ForeignNextLink { origin: String, expected: String },
}

#[derive(Debug, Error)]
#[error("Fetch {call}: {kind}")]
pub struct FetchError {
    pub call: FetchCall,
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    fn new(call: FetchCall, kind: FetchErrorKind) -> Self {
        Self { call, kind }
    }

    /// HTTP status returned by GitHub, when the failure got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            FetchErrorKind::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Raw provider payloads, still untyped.
#[derive(Debug, Clone)]
pub struct UserResources {
    pub identity: Value,
    pub repositories: Vec<Value>,
}

/// Fetches the identity, then the owned repositories. The second call is
/// skipped if the first one fails.
pub async fn fetch_user_resources(
    client: &Client,
    api: &GitHubApiConfig,
    token: &AccessToken,
) -> Result<UserResources, FetchError> {
    let identity = fetch_identity(client, api, token).await?;
    let repositories = fetch_owned_repositories(client, api, token).await?;

    Ok(UserResources {
        identity,
        repositories,
    })
}

#[instrument(skip_all)]
pub async fn fetch_identity(
    client: &Client,
    api: &GitHubApiConfig,
    token: &AccessToken,
) -> Result<Value, FetchError> {
    let call = FetchCall::Identity;
    let url = api
        .base_url
        .join(USER_PATH)
        .map_err(|source| FetchError::new(call, FetchErrorKind::JoinPath { source }))?;

    let page = get_page_with_retry(client, &url, token, &api.retry, call)
        .await
        .map_err(|kind| FetchError::new(call, kind))?;

    match page.body {
        body @ Value::Object(_) => Ok(body),
        _ => Err(FetchError::new(
            call,
            FetchErrorKind::UnexpectedShape { expected: "object" },
        )),
    }
}

/// Lists repositories owned by the authenticated user, following GitHub's
/// `Link` pagination. Provider order is preserved across pages.
#[instrument(skip_all)]
pub async fn fetch_owned_repositories(
    client: &Client,
    api: &GitHubApiConfig,
    token: &AccessToken,
) -> Result<Vec<Value>, FetchError> {
    let call = FetchCall::Resources;
    let mut first = api
        .base_url
        .join(USER_REPOS_PATH)
        .map_err(|source| FetchError::new(call, FetchErrorKind::JoinPath { source }))?;
    first
        .query_pairs_mut()
        .append_pair("affiliation", "owner")
        .append_pair("per_page", PER_PAGE);

    let mut repositories = Vec::new();
    let mut next = Some(first);
    let mut pages = 0;

    while let Some(url) = next.take() {
        if pages == api.max_pages {
            return Err(FetchError::new(
                call,
                FetchErrorKind::TooManyPages {
                    max_pages: api.max_pages,
                },
            ));
        }

        let page = get_page_with_retry(client, &url, token, &api.retry, call)
            .await
            .map_err(|kind| FetchError::new(call, kind))?;
        pages += 1;

        match page.body {
            Value::Array(items) => repositories.extend(items),
            _ => {
                return Err(FetchError::new(
                    call,
                    FetchErrorKind::UnexpectedShape { expected: "array" },
                ))
            }
        }

        next = page
            .next
            .map(|url| same_origin(url, &api.base_url))
            .transpose()
            .map_err(|kind| FetchError::new(call, kind))?;
    }

    debug!(pages, count = repositories.len(), "fetched owned repositories");
    Ok(repositories)
}

struct Page {
    body: Value,
    next: Option<Url>,
}

async fn get_page_with_retry(
    client: &Client,
    url: &Url,
    token: &AccessToken,
    retry: &RetryPolicy,
    call: FetchCall,
) -> Result<Page, FetchErrorKind> {
    (|| get_page(client, url.clone(), token))
        .retry(retry.backoff())
        .when(is_transient)
        .notify(|err, delay| warn!(%call, ?delay, "retrying GitHub request: {err}"))
        .await
}

async fn get_page(client: &Client, url: Url, token: &AccessToken) -> Result<Page, FetchErrorKind> {
    let response = client
        .get(url)
        .bearer_auth(token.expose())
        .header(header::ACCEPT, "application/vnd.github+json")
        .header("X-GitHub-Api-Version", API_VERSION)
        .send()
        .await
        .map_err(|source| FetchErrorKind::RequestSend { source })?;

    let status = response.status();
    let next = next_page_url(response.headers());

    let body = response
        .text()
        .await
        .map_err(|source| FetchErrorKind::ResponseRead { source })?;

    if !status.is_success() {
        return Err(FetchErrorKind::UnexpectedStatus {
            status,
            body: body.chars().take(BODY_EXCERPT_LEN).collect(),
        });
    }

    let body = serde_json::from_str(&body)
        .map_err(|source| FetchErrorKind::DeserializeResponseBody { source })?;

    Ok(Page { body, next })
}

/// Network failures, rate limiting and server errors are worth another try;
/// anything else will fail the same way again.
fn is_transient(err: &FetchErrorKind) -> bool {
    match err {
        FetchErrorKind::RequestSend { .. } | FetchErrorKind::ResponseRead { .. } => true,
        FetchErrorKind::UnexpectedStatus { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        _ => false,
    }
}

// The bearer token rides along on every page, so only the API origin may
// serve one.
fn same_origin(next: Url, base: &Url) -> Result<Url, FetchErrorKind> {
    if next.origin() == base.origin() {
        Ok(next)
    } else {
        Err(FetchErrorKind::ForeignNextLink {
            origin: next.origin().ascii_serialization(),
            expected: base.origin().ascii_serialization(),
        })
    }
}

fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    let link = headers.get(header::LINK)?.to_str().ok()?;
    parse_next_link(link)
}

// <https://api.github.com/user/repos?page=2>; rel="next", <...>; rel="last"
fn parse_next_link(link: &str) -> Option<Url> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;
        let is_next = parts.any(|param| {
            param
                .trim()
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });
        if is_next {
            Url::parse(target).ok()
        } else {
            None
        }
    })
}
