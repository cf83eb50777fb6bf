//! Encyclopedia summary lookup.

use crate::clients::http::{build_client, ensure_success, request_error};
use crate::config::HttpConfig;
use crate::error::{Error, Result};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Short description of a species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesSummary {
    /// Page title the summary was found under.
    pub title: String,
    /// Plain-text extract, empty when the page has none.
    pub extract: String,
    /// Thumbnail image URL.
    pub thumbnail_url: Option<String>,
    /// Canonical page URL.
    pub page_url: Option<String>,
}

impl SpeciesSummary {
    /// First sentence of the extract.
    pub fn fun_fact(&self) -> Option<String> {
        let extract = self.extract.trim();
        if extract.is_empty() {
            return None;
        }
        let first = extract.split(". ").next().unwrap_or(extract);
        if first.ends_with('.') {
            Some(first.to_string())
        } else {
            Some(format!("{first}."))
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

/// Parse a summary document; `requested` is used when it carries no title.
pub fn parse_summary(body: &str, requested: &str) -> Result<SpeciesSummary> {
    let response: SummaryResponse = serde_json::from_str(body).map_err(|e| Error::RemoteRequest {
        url: requested.to_string(),
        source: Box::new(e),
    })?;
    Ok(SpeciesSummary {
        title: response.title.unwrap_or_else(|| requested.to_string()),
        extract: response.extract.unwrap_or_default(),
        thumbnail_url: response.thumbnail.and_then(|t| t.source),
        page_url: response
            .content_urls
            .and_then(|c| c.desktop)
            .and_then(|d| d.page),
    })
}

/// Build the lookup URL with `title` as its last path segment.
pub fn summary_url(base: &str, title: &str) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| Error::RemoteRequest {
        url: base.to_string(),
        source: Box::new(e),
    })?;
    url.path_segments_mut()
        .map_err(|()| Error::Internal {
            message: format!("summary URL cannot take path segments: {base}"),
        })?
        .pop_if_empty()
        .push(title);
    Ok(url)
}

/// Client for the summary endpoint.
#[derive(Debug, Clone)]
pub struct SummaryClient {
    client: Client,
    base_url: String,
}

impl SummaryClient {
    /// Create a client from HTTP settings.
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&http.user_agent, http.summary_timeout_secs)?,
            base_url: http.summary_url.clone(),
        })
    }

    /// Fetch the summary for `title`.
    ///
    /// Any transport error or non-success status yields `None`.
    pub async fn fetch(&self, title: &str) -> Option<SpeciesSummary> {
        match self.try_fetch(title).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summary lookup for '{title}' unavailable: {e}");
                None
            }
        }
    }

    async fn try_fetch(&self, title: &str) -> Result<Option<SpeciesSummary>> {
        let url = summary_url(&self.base_url, title)?;
        debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(url.as_str(), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No summary page for '{title}'");
            return Ok(None);
        }
        let response = ensure_success("summary GET", response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| request_error(url.as_str(), e))?;
        parse_summary(&body, title).map(Some)
    }
}
