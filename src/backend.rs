//! Client for the construction-work backend's ingestion API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tracing::info;

use crate::config::Settings;
use crate::models::{
    CityOffice, ContactSection, JobKind, NewsItem, OfficeLink, Project, ProjectDetail,
};

const AUTH_HEADER: &str = "IngestAuthorization";
const REACHABLE_ATTEMPTS: u32 = 60;

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl BackendClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed building backend http client")?;
        Ok(Self {
            http,
            base: format!(
                "http://{}:{}{}",
                settings.backend_host, settings.backend_port, settings.base_path
            ),
            token: settings.ingest_token.clone(),
        })
    }

    async fn get(&self, route: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{route}", self.base);
        let response = self
            .http
            .get(&url)
            .header(AUTH_HEADER, &self.token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        if !response.status().is_success() {
            bail!("GET {url} returned {}", response.status());
        }
        response
            .json()
            .await
            .with_context(|| format!("unreadable response from {url}"))
    }

    async fn post<T: Serialize + ?Sized>(&self, route: &str, payload: &T) -> Result<()> {
        let url = format!("{}/{route}", self.base);
        let response = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.token)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("POST {url} returned {status}: {body}");
        }
        Ok(())
    }

    /// True when the backend already knows this project.
    pub async fn project_exists(&self, identifier: &str) -> Result<bool> {
        let body = self.get("projects", &[("identifier", identifier)]).await?;
        Ok(body.get("result").is_some_and(|result| !result.is_null()))
    }

    pub async fn upsert_project(&self, project: &Project) -> Result<()> {
        self.post("projects", project).await
    }

    pub async fn upsert_project_detail(&self, detail: &ProjectDetail) -> Result<()> {
        self.post("project", detail).await
    }

    pub async fn delete_project(&self, identifier: &str) -> Result<()> {
        let url = format!("{}/projects", self.base);
        let response = self
            .http
            .delete(&url)
            .header(AUTH_HEADER, &self.token)
            .json(&serde_json::json!({ "identifier": identifier }))
            .send()
            .await
            .with_context(|| format!("DELETE {url} failed"))?;
        if !response.status().is_success() {
            bail!("DELETE {url} returned {}", response.status());
        }
        Ok(())
    }

    pub async fn save_news(&self, item: &NewsItem) -> Result<()> {
        self.post("news", item).await
    }

    pub async fn save_city_contact(&self, sections: &[ContactSection]) -> Result<()> {
        self.post("citycontact", &serde_json::json!({ "sections": sections }))
            .await
    }

    pub async fn save_city_offices(&self, offices: &[OfficeLink]) -> Result<()> {
        self.post("cityoffices", offices).await
    }

    pub async fn save_city_office(&self, office: &CityOffice) -> Result<()> {
        self.post("cityoffice", office).await
    }

    /// True when a previously transferred image or asset is already stored.
    pub async fn media_present(&self, kind: JobKind, identifier: &str) -> Result<bool> {
        let body = self
            .get(media_route(kind), &[("identifier", identifier)])
            .await?;
        Ok(body
            .get("status")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    pub async fn upload_media(&self, kind: JobKind, payload: &Value) -> Result<()> {
        self.post(media_route(kind), payload).await
    }

    pub async fn garbage_collect(&self, project_type: &str) -> Result<()> {
        info!("garbage collecting stale records for {project_type}");
        self.get("garbagecollector", &[("project_type", project_type)])
            .await?;
        Ok(())
    }
}

fn media_route(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Image => "image",
        JobKind::Asset => "asset",
    }
}

/// Wait for the backend to accept TCP connections, one probe per second.
pub async fn wait_until_reachable(host: &str, port: u16) -> bool {
    for attempt in 0..REACHABLE_ATTEMPTS {
        let probe = tokio::time::timeout(Duration::from_secs(1), TcpStream::connect((host, port)));
        if matches!(probe.await, Ok(Ok(_))) {
            return true;
        }
        if attempt + 1 < REACHABLE_ATTEMPTS {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
    false
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one request on a loopback port and hand back what the
    /// client sent.
    async fn one_shot_backend() -> (Settings, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0u8; 4096];
            let read = socket.read(&mut buffer).await.unwrap();
            let request = String::from_utf8_lossy(&buffer[..read]).to_string();
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
                )
                .await
                .unwrap();
            request
        });

        let settings = Settings {
            backend_host: "127.0.0.1".to_string(),
            backend_port: port,
            base_path: "/api/v1/ingest".to_string(),
            garbage_collect: true,
            ingest_token: "token".to_string(),
        };
        (settings, handle)
    }

    #[tokio::test]
    async fn garbage_collector_query_carries_project_type() {
        let (settings, handle) = one_shot_backend().await;
        let client = BackendClient::new(&settings).unwrap();

        client.garbage_collect("stadsloket").await.unwrap();

        let request = handle.await.unwrap().to_lowercase();
        assert!(request
            .starts_with("get /api/v1/ingest/garbagecollector?project_type=stadsloket http/1.1"));
        assert!(request.contains("ingestauthorization: token"));
    }

    #[tokio::test]
    async fn reachability_probe_sees_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(wait_until_reachable("127.0.0.1", port).await);
    }
}
