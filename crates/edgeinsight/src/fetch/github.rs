//! GitHub-backed fetch adapter.
//!
//! Lists the default branch with one recursive tree request, applies the
//! [`FetchPolicy`], then downloads raw contents with a bounded number of
//! requests in flight. Individual file failures are skipped; only a failed
//! listing fails the fetch.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::policy::{FetchPolicy, FileCandidate};
use super::reference::RepoReference;
use super::{ContentFetcher, FetchError, FetchedFile};
use crate::config::schema::FetchSettings;
use crate::sanitize;

const USER_AGENT: &str = concat!("edgeinsight/", env!("CARGO_PKG_VERSION"));

/// Default connect timeout for repository host requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

pub struct GithubFetcher {
    client: Client,
    api_base: String,
    raw_base: Url,
    policy: FetchPolicy,
    concurrency: usize,
}

impl GithubFetcher {
    pub fn new(
        api_base: impl Into<String>,
        raw_base: impl Into<String>,
        policy: FetchPolicy,
        concurrency: usize,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let raw_base: String = raw_base.into();
        let raw_base = Url::parse(&raw_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| FetchError::Transport(format!("Invalid raw content URL: {}", raw_base)))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            raw_base,
            policy,
            concurrency: concurrency.max(1),
        })
    }

    pub fn from_settings(settings: &FetchSettings) -> Result<Self, FetchError> {
        Self::new(
            &settings.api_base_url,
            &settings.raw_base_url,
            settings.policy(),
            settings.concurrency,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    fn tree_url(&self, reference: &RepoReference) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/HEAD?recursive=1",
            self.api_base,
            reference.owner(),
            reference.name()
        )
    }

    fn raw_url(&self, reference: &RepoReference, path: &str) -> Url {
        let mut url = self.raw_base.clone();
        // `new` rejects bases that cannot carry path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([reference.owner(), reference.name(), "HEAD"])
                .extend(path.split('/'));
        }
        url
    }

    fn authorize(builder: RequestBuilder, credentials: Option<&SecretString>) -> RequestBuilder {
        match credentials {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn list_candidates(
        &self,
        reference: &RepoReference,
        credentials: Option<&SecretString>,
    ) -> Result<Vec<FileCandidate>, FetchError> {
        let request = self
            .client
            .get(self.tree_url(reference))
            .header("Accept", "application/vnd.github+json");
        let response = Self::authorize(request, credentials)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(map_status(reference, status, &body));
        }

        parse_tree(&body)
    }

    async fn fetch_file(
        &self,
        reference: &RepoReference,
        candidate: FileCandidate,
        credentials: Option<&SecretString>,
    ) -> Option<FetchedFile> {
        let request = self.client.get(self.raw_url(reference, &candidate.path));
        let response = match Self::authorize(request, credentials).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(path = %candidate.path, error = %e, "Skipping file: request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                path = %candidate.path,
                status = response.status().as_u16(),
                "Skipping file: unexpected status"
            );
            return None;
        }

        let content = match response.text().await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %candidate.path, error = %e, "Skipping file: unreadable body");
                return None;
            }
        };

        if content.contains('\0') {
            debug!(path = %candidate.path, "Skipping binary file");
            return None;
        }

        Some(FetchedFile {
            path: candidate.path,
            content: self.policy.clamp_content(content),
        })
    }
}

#[async_trait]
impl ContentFetcher for GithubFetcher {
    async fn fetch(
        &self,
        reference: &RepoReference,
        credentials: Option<&SecretString>,
    ) -> Result<Vec<FetchedFile>, FetchError> {
        let candidates = self.list_candidates(reference, credentials).await?;
        let listed = candidates.len();
        let selected = self.policy.select(candidates);

        info!(
            repo = %sanitize::redact_repo_url(&reference.to_string()),
            listed,
            selected = selected.len(),
            "Fetching repository files"
        );

        let files: Vec<FetchedFile> = stream::iter(selected)
            .map(|candidate| self.fetch_file(reference, candidate, credentials))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        Ok(files)
    }
}

fn parse_tree(body: &str) -> Result<Vec<FileCandidate>, FetchError> {
    let tree: TreeResponse = serde_json::from_str(body).map_err(|e| FetchError::Upstream {
        status: 502,
        message: format!("Unreadable tree listing: {}", e),
    })?;

    if tree.truncated {
        warn!("Repository tree listing was truncated by the host");
    }

    Ok(tree
        .tree
        .into_iter()
        .filter(|entry| entry.kind == "blob")
        .map(|entry| FileCandidate {
            path: entry.path,
            size: entry.size,
        })
        .collect())
}

fn map_status(reference: &RepoReference, status: StatusCode, body: &str) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound(reference.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Unauthorized {
            reference: reference.to_string(),
            status: status.as_u16(),
        },
        other => FetchError::Upstream {
            status: other.as_u16(),
            message: sanitize::preview(body, 200),
        },
    }
}
