//! Bounded download pool for image renditions and file assets.
//!
//! Every job is checked against the backend first, bytes already stored
//! are not fetched again. Fresh bytes are base64-encoded and posted to
//! the matching media route.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::backend::BackendClient;
use crate::models::{DownloadJob, JobKind};

const CONCURRENCY: usize = 10;

#[derive(Debug, Default)]
pub struct DownloadStats {
    pub total: usize,
    pub transferred: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Transferred,
    Skipped,
    Failed,
}

/// Drain `jobs` through a pool of `CONCURRENCY` workers.
pub async fn run(
    jobs: Vec<DownloadJob>,
    backend: Arc<BackendClient>,
    module: &str,
) -> Result<DownloadStats> {
    let mut stats = DownloadStats {
        total: jobs.len(),
        ..Default::default()
    };
    if jobs.is_empty() {
        return Ok(stats);
    }
    info!("processing {} downloads for {module}", stats.total);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed building download http client")?;

    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let (tx, mut rx) = mpsc::channel::<Outcome>(CONCURRENCY * 2);

    let pb = ProgressBar::new(stats.total as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})",
        )
        .context("bad progress bar template")?
        .progress_chars("=> "),
    );

    for job in jobs {
        let http = http.clone();
        let backend = Arc::clone(&backend);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = semaphore.acquire().await.unwrap();
            let outcome = match transfer(&http, &backend, &job).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!("download failed for {}: {error:#}", job.url);
                    Outcome::Failed
                }
            };
            let _ = tx.send(outcome).await;
        });
    }
    drop(tx);

    while let Some(outcome) = rx.recv().await {
        match outcome {
            Outcome::Transferred => stats.transferred += 1,
            Outcome::Skipped => stats.skipped += 1,
            Outcome::Failed => stats.failed += 1,
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "{module}: {} transferred, {} skipped, {} failed",
        stats.transferred, stats.skipped, stats.failed
    );
    Ok(stats)
}

async fn transfer(http: &reqwest::Client, backend: &BackendClient, job: &DownloadJob) -> Result<Outcome> {
    if backend.media_present(job.kind, &job.identifier).await? {
        return Ok(Outcome::Skipped);
    }

    let response = http
        .get(&job.url)
        .send()
        .await
        .with_context(|| format!("failed fetching {}", job.url))?;
    if !response.status().is_success() {
        bail!("{} returned {}", job.url, response.status());
    }
    let bytes = response.bytes().await.context("failed reading body")?;

    backend.upload_media(job.kind, &payload(job, &bytes)).await?;
    Ok(Outcome::Transferred)
}

fn payload(job: &DownloadJob, data: &[u8]) -> Value {
    match job.kind {
        JobKind::Image => json!({
            "identifier": job.identifier,
            "size": job.size,
            "url": job.url,
            "filename": job.filename,
            "description": job.description,
            "mime_type": mime_type(job.kind, &job.filename),
            "data": BASE64.encode(data),
        }),
        JobKind::Asset => json!({
            "identifier": job.identifier,
            "url": job.url,
            "mime_type": mime_type(job.kind, &job.filename),
            "data": BASE64.encode(data),
        }),
    }
}

fn mime_type(kind: JobKind, filename: &str) -> String {
    let extension = filename.rsplit('.').next().unwrap_or("");
    match kind {
        JobKind::Image => format!("image/{extension}"),
        JobKind::Asset => format!("application/{extension}"),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn job(kind: JobKind) -> DownloadJob {
        DownloadJob {
            kind,
            url: "https://www.amsterdam.nl/1/2/3/460px/mock.jpg".to_string(),
            identifier: "e51353040e4c049559c975ce6a650947".to_string(),
            filename: "mock.jpg".to_string(),
            description: "mock".to_string(),
            size: "460px".to_string(),
        }
    }

    #[test]
    fn image_mime_type_follows_extension() {
        assert_eq!(mime_type(JobKind::Image, "mock.jpg"), "image/jpg");
        assert_eq!(mime_type(JobKind::Asset, "rapport.pdf"), "application/pdf");
        assert_eq!(mime_type(JobKind::Image, "bare"), "image/bare");
    }

    #[test]
    fn image_payload_carries_rendition_fields() {
        let payload = payload(&job(JobKind::Image), b"bytes");
        assert_eq!(payload["size"], "460px");
        assert_eq!(payload["filename"], "mock.jpg");
        assert_eq!(payload["mime_type"], "image/jpg");
        assert_eq!(payload["data"], "Ynl0ZXM=");
    }

    #[test]
    fn asset_payload_is_minimal() {
        let payload = payload(&job(JobKind::Asset), b"bytes");
        assert_eq!(payload["mime_type"], "application/jpg");
        assert!(payload.get("size").is_none());
        assert!(payload.get("filename").is_none());
    }
}
