//! Client for the Iprox JSON feed.
//!
//! Three query flavours exist: full single pages (`AppIdt`), article
//! listings (`new_json`) and the paged project index (`new_json` +
//! `pager_rows`). Stored source urls already carry their query string,
//! those go through `fetch` untouched.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

pub const FEED_DOMAIN: &str = "https://www.amsterdam.nl";
pub const PROJECTS_PATH: &str = "/projecten/alle-projecten-amsterdam-app";
pub const CONTACT_URL: &str = "https://www.amsterdam.nl/contact/";

const PAGE_QUERY: &str = "?AppIdt=app-pagetype&reload=true";
const LISTING_QUERY: &str = "?new_json=true";
const INDEX_QUERY: &str = "?new_json=true&pager_rows=1000";

#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
}

impl FeedClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed building feed http client")?;
        Ok(Self { http })
    }

    /// GET a url as-is and parse the JSON body.
    pub async fn fetch(&self, url: &str) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed fetching {url}"))?;
        response
            .json()
            .await
            .with_context(|| format!("unreadable response from {url}"))
    }

    /// Single page with full content.
    pub async fn page(&self, url: &str) -> Result<Value> {
        self.fetch(&format!("{url}{PAGE_QUERY}")).await
    }

    /// Article listing behind a project link.
    pub async fn listing(&self, url: &str) -> Result<Value> {
        self.fetch(&format!("{url}{LISTING_QUERY}")).await
    }

    /// Paged project index for a feed path.
    pub async fn project_index(&self, path: &str) -> Result<Value> {
        let url = format!("{FEED_DOMAIN}{path}{INDEX_QUERY}");
        info!("fetching project index from {url}");
        self.fetch(&url).await
    }
}
