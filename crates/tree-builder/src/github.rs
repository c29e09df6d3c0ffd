//! GitHub REST client implementing [`RemoteSource`].

use log::debug;
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use repotree_common::{EngineConfig, TreeError};
use repotree_domain::{QuotaInfo, SourceRef};

use crate::source::{RemoteEntry, RemoteSource};

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateWindow,
}

#[derive(Debug, Deserialize)]
struct RateWindow {
    limit: u64,
    remaining: u64,
    reset: u64,
}

pub struct GithubClient {
    http: reqwest::Client,
    api_base: Url,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &EngineConfig, token: Option<String>) -> Result<Self, TreeError> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| TreeError::Config(format!("invalid API base {:?}: {}", config.api_base, e)))?;
        let http = reqwest::Client::builder()
            .timeout(config.call_timeout)
            .user_agent(concat!("repotree/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TreeError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_base,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn endpoint<'a, I>(&self, segments: I) -> Result<Url, TreeError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| TreeError::Config(format!("API base cannot hold a path: {}", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, source: &SourceRef, path: &str) -> Result<Url, TreeError> {
        let segments = ["repos", source.owner.as_str(), source.repo.as_str(), "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        let mut url = self.endpoint(segments)?;
        if let Some(branch) = &source.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        Ok(url)
    }

    /// The token only ever travels to the API host itself.
    fn sends_credential_to(&self, url: &Url) -> bool {
        url.host_str() == self.api_base.host_str() && url.port_or_known_default() == self.api_base.port_or_known_default()
    }

    async fn get(&self, url: Url, accept: &str) -> Result<reqwest::Response, TreeError> {
        let what = url.path().to_string();
        let mut request = self
            .http
            .get(url.clone())
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let (Some(token), true) = (&self.token, self.sends_credential_to(&url)) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(classify_status(status, response.headers(), &what, self.is_authenticated()))
        }
    }
}

impl RemoteSource for GithubClient {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn rate_limit(&self) -> Result<QuotaInfo, TreeError> {
        let url = self.endpoint(["rate_limit"])?;
        let body: RateLimitResponse = self
            .get(url, JSON_MEDIA_TYPE)
            .await?
            .json()
            .await
            .map_err(classify_transport)?;
        Ok(QuotaInfo {
            limit: body.rate.limit,
            remaining: body.rate.remaining,
            reset_at: body.rate.reset,
        })
    }

    async fn list_dir(&self, source: &SourceRef, path: &str) -> Result<Vec<RemoteEntry>, TreeError> {
        let mut url = self.contents_url(source, path)?;
        url.query_pairs_mut().append_pair("per_page", PAGE_SIZE);

        let mut entries = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            debug!("GET {}", url);
            let response = self.get(url, JSON_MEDIA_TYPE).await?;
            next = next_page_link(response.headers()).and_then(|l| Url::parse(&l).ok());

            let body: serde_json::Value = response.json().await.map_err(classify_transport)?;
            match body {
                serde_json::Value::Array(_) => {
                    let page: Vec<RemoteEntry> = serde_json::from_value(body).map_err(|e| {
                        TreeError::TransientNetwork(format!("malformed listing for {:?}: {}", path, e))
                    })?;
                    entries.extend(page);
                }
                _ => {
                    return Err(TreeError::InvalidInput(format!("{:?} is not a directory", path)));
                }
            }
        }
        Ok(entries)
    }

    async fn fetch_content(&self, source: &SourceRef, path: &str) -> Result<String, TreeError> {
        let url = self.contents_url(source, path)?;
        self.get(url, RAW_MEDIA_TYPE)
            .await?
            .text()
            .await
            .map_err(classify_transport)
    }
}

fn classify_transport(e: reqwest::Error) -> TreeError {
    if e.is_timeout() {
        TreeError::Timeout(e.to_string())
    } else {
        TreeError::TransientNetwork(e.to_string())
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Maps a non-success HTTP status onto the error taxonomy.
pub(crate) fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    what: &str,
    authenticated: bool,
) -> TreeError {
    let exhausted = header_u64(headers, "x-ratelimit-remaining") == Some(0);
    match status {
        StatusCode::NOT_FOUND => TreeError::NotFound(what.to_string()),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if exhausted => TreeError::QuotaExceeded {
            reset_at: header_u64(headers, "x-ratelimit-reset").unwrap_or(0),
            authenticated,
        },
        StatusCode::TOO_MANY_REQUESTS => TreeError::TransientNetwork(format!("{} throttled", what)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TreeError::PermissionDenied(what.to_string()),
        s if s.is_server_error() => TreeError::TransientNetwork(format!("{} returned {}", what, s)),
        s => TreeError::InvalidInput(format!("{} returned {}", what, s)),
    }
}

/// Extracts the `rel="next"` target of an RFC 5988 `Link` header.
pub(crate) fn next_page_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| matches!(p.trim(), "rel=\"next\"" | "rel=next"));
        if !is_next {
            return None;
        }
        let target = target.trim();
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
