use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub published_at: String,
    pub thumbnail: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<SearchResultItem>,
    pub next_page_token: Option<String>,
    pub prev_page_token: Option<String>,
}

#[derive(Debug)]
pub enum SearchError {
    MissingCredentials,
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },
    Transport(reqwest::Error),
    InvalidResponse,
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::MissingCredentials => {
                write!(f, "search provider credentials are not configured")
            }
            SearchError::Upstream { status, .. } => {
                write!(f, "search provider returned status {}", status)
            }
            SearchError::Transport(err) => write!(f, "search request failed: {}", err),
            SearchError::InvalidResponse => {
                write!(f, "search provider returned an undecodable response")
            }
        }
    }
}

impl std::error::Error for SearchError {}

pub struct SearchClientConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub page_size: u32,
    pub timeout: Duration,
}

/// Forwarder for the upstream video search API. Enforces the provider-side
/// safe-content flag on every request as defense in depth, independent of
/// the moderation gate.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    page_size: u32,
}

impl SearchClient {
    pub fn new(config: SearchClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
            api_key: config.api_key,
            page_size: config.page_size,
        })
    }

    pub async fn search(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<SearchPage, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SearchError::MissingCredentials);
        };

        let page_size = self.page_size.to_string();
        let mut params = vec![
            ("key", api_key),
            ("q", query),
            ("type", "video"),
            ("part", "snippet"),
            ("maxResults", page_size.as_str()),
            ("safeSearch", "strict"),
        ];
        if let Some(token) = page_token.filter(|token| !token.is_empty()) {
            params.push(("pageToken", token));
        }

        let response = self
            .http
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(SearchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Upstream { status, body });
        }

        let body = response
            .json::<RawSearchResponse>()
            .await
            .map_err(|_| SearchError::InvalidResponse)?;
        Ok(normalize_page(body))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSearchResponse {
    #[serde(default)]
    items: Vec<RawSearchItem>,
    next_page_token: Option<String>,
    prev_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSearchItem {
    #[serde(default)]
    id: RawItemId,
    #[serde(default)]
    snippet: RawSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItemId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: RawThumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct RawThumbnails {
    medium: Option<RawThumbnail>,
    default: Option<RawThumbnail>,
}

#[derive(Debug, Default, Deserialize)]
struct RawThumbnail {
    #[serde(default)]
    url: String,
}

/// Map upstream items to the normalized shape, dropping items without a
/// video id. Thumbnail preference: medium, then default, then empty.
fn normalize_page(raw: RawSearchResponse) -> SearchPage {
    let items = raw
        .items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.video_id.filter(|id| !id.is_empty())?;
            let snippet = item.snippet;
            let thumbnail = [snippet.thumbnails.medium, snippet.thumbnails.default]
                .into_iter()
                .flatten()
                .map(|thumb| thumb.url)
                .find(|url| !url.is_empty())
                .unwrap_or_default();

            Some(SearchResultItem {
                id,
                title: snippet.title,
                channel_title: snippet.channel_title,
                published_at: snippet.published_at,
                thumbnail,
            })
        })
        .collect();

    SearchPage {
        items,
        next_page_token: raw.next_page_token,
        prev_page_token: raw.prev_page_token,
    }
}
