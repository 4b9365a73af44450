//! Docker registry HTTP API v2 client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::LINK;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use imgsync_core::{ObservedState, ObservedStateSource, SourceError};

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    repositories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TagsPage {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Reads the catalog and tag lists of one registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    base: Url,
}

impl RegistryClient {
    /// `base` is `scheme://host[:port]`.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, SourceError> {
        let base = Url::parse(base)
            .map_err(|e| SourceError::Invalid(format!("invalid registry URL {base}: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, String> {
        self.base.join(path).map_err(|e| format!("invalid path {path}: {e}"))
    }

    /// Repository names in catalog order.
    pub async fn catalog(&self) -> Result<Vec<String>, SourceError> {
        let first = self
            .endpoint("/v2/_catalog")
            .map_err(SourceError::RegistryUnavailable)?;
        let pages: Vec<CatalogPage> = self
            .paged(first)
            .await
            .map_err(SourceError::RegistryUnavailable)?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.repositories.unwrap_or_default())
            .collect())
    }

    /// Tags of one repository. A `null` tag list is empty.
    pub async fn tags(&self, repository: &str) -> Result<Vec<String>, String> {
        let first = self.endpoint(&format!("/v2/{repository}/tags/list"))?;
        let pages: Vec<TagsPage> = self.paged(first).await?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.tags.unwrap_or_default())
            .collect())
    }

    /// GET `first` and every page its `Link: <...>; rel="next"` chain names.
    async fn paged<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>, String> {
        let mut pages = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            let response = self
                .http
                .get(url.clone())
                .send()
                .await
                .map_err(|e| format!("GET {url}: {e}"))?;
            let status = response.status();
            if !status.is_success() {
                return Err(format!("GET {url}: HTTP {status}"));
            }
            next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_link)
                .map(|link| url.join(&link))
                .transpose()
                .map_err(|e| format!("bad Link header from {url}: {e}"))?;
            let page = response
                .json::<T>()
                .await
                .map_err(|e| format!("GET {url}: malformed body: {e}"))?;
            pages.push(page);
        }
        Ok(pages)
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header value.
pub(crate) fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .map(str::trim)
            .any(|p| p == r#"rel="next""# || p == "rel=next");
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

#[async_trait]
impl ObservedStateSource for RegistryClient {
    async fn fetch_observed(&self) -> Result<ObservedState, SourceError> {
        let repositories = self.catalog().await?;
        tracing::info!(registry = %self.base, repositories = repositories.len(), "catalog listed");

        let mut state = ObservedState::default();
        for name in repositories {
            match self.tags(&name).await {
                Ok(tags) => {
                    tracing::debug!(repository = %name, tags = tags.len(), "tags listed");
                    state.insert(name, tags);
                }
                Err(reason) => {
                    tracing::warn!(
                        repository = %name,
                        %reason,
                        "tag list unreadable; skipping repository"
                    );
                    state.mark_unreadable(name, reason);
                }
            }
        }
        Ok(state)
    }

    async fn ping(&self) -> Result<(), SourceError> {
        let url = self
            .endpoint("/v2/")
            .map_err(SourceError::RegistryUnavailable)?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::RegistryUnavailable(format!("GET {url}: {e}")))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SourceError::RegistryUnavailable(format!("GET {url}: HTTP {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_next_link() {
        assert_eq!(
            next_link(r#"</v2/_catalog?last=b&n=2>; rel="next""#).as_deref(),
            Some("/v2/_catalog?last=b&n=2")
        );
        assert_eq!(
            next_link(r#"<https://x/prev>; rel="prev", <https://x/next>; rel="next""#).as_deref(),
            Some("https://x/next")
        );
        assert_eq!(next_link(r#"</v2/_catalog>; rel="prev""#), None);
        assert_eq!(next_link("garbage"), None);
    }
}
