//! End-to-end ingestion runs: projects plus the city-office pages.
//!
//! A run walks the index feed, re-parses every project page, resolves the
//! timeline and article links behind it, posts the records to the backend
//! and finally drains one download pool for all referenced media.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::assets;
use crate::backend::BackendClient;
use crate::config::Settings;
use crate::feed::{FeedClient, CONTACT_URL, PROJECTS_PATH};
use crate::models::{ArticleLink, DownloadJob, Image, JobKind, ProjectDetail};
use crate::parser::extract::{news, office, project, timeline};

pub struct Ingestion {
    feed: FeedClient,
    backend: Arc<BackendClient>,
    settings: Settings,
}

/// Counts of one project run.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub new: usize,
    pub updated: usize,
    pub failed: usize,
    pub deleted: usize,
    pub total: i64,
    pub date: String,
}

impl RunReport {
    pub fn print(&self) {
        println!(
            "Projects: {} new, {} updated, {} failed, {} deleted ({} total).",
            self.new, self.updated, self.failed, self.deleted, self.total
        );
    }
}

/// Per-project scrape outcomes, keyed by project identifier.
#[derive(Debug, Default, Serialize)]
pub struct ScraperReport {
    #[serde(flatten)]
    entries: BTreeMap<String, ProjectReport>,
}

#[derive(Debug, Serialize)]
pub struct ProjectReport {
    pub url: String,
    pub title: String,
    pub news: Vec<String>,
    pub images: Option<usize>,
    pub contacts: Option<usize>,
    pub coordinates: Option<bool>,
    pub what: Option<bool>,
    pub when: Option<bool>,
    #[serde(rename = "where")]
    pub location: Option<bool>,
    pub work: Option<bool>,
    #[serde(rename = "more-info")]
    pub more_info: Option<bool>,
    pub timeline: Option<bool>,
    pub history: String,
}

impl ScraperReport {
    fn record_success(&mut self, detail: &ProjectDetail, existing: bool) {
        let body = &detail.body;
        self.entries.insert(
            detail.identifier.clone(),
            ProjectReport {
                url: format!("https://amsterdam.nl/@{}/page/", detail.identifier),
                title: detail.title.clone(),
                news: Vec::new(),
                images: Some(detail.images.len()),
                contacts: Some(detail.contacts.len()),
                coordinates: Some(detail.coordinates.lon.is_some()),
                what: Some(!body.what.is_empty()),
                when: Some(!body.when.is_empty()),
                location: Some(!body.location.is_empty()),
                work: Some(!body.work.is_empty()),
                more_info: Some(!body.more_info.is_empty()),
                timeline: Some(body.timeline.is_some()),
                history: format!(
                    "project is: {}",
                    if existing { "updated" } else { "new" }
                ),
            },
        );
    }

    fn record_unreachable(&mut self, identifier: &str, title: &str) {
        self.entries.insert(
            identifier.to_string(),
            ProjectReport {
                url: format!("https://amsterdam.nl/@{identifier}/page/"),
                title: title.to_string(),
                news: Vec::new(),
                images: None,
                contacts: None,
                coordinates: None,
                what: None,
                when: None,
                location: None,
                work: None,
                more_info: None,
                timeline: None,
                history: "project is: unreachable/offline".to_string(),
            },
        );
    }

    fn record_news(&mut self, project_identifier: &str, news_identifier: &str) {
        if let Some(entry) = self.entries.get_mut(project_identifier) {
            entry.news.push(news_identifier.to_string());
        }
    }
}

enum Ingested {
    Saved { existing: bool },
    Deleted,
}

impl Ingestion {
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self {
            feed: FeedClient::new()?,
            backend: Arc::new(BackendClient::new(&settings)?),
            settings,
        })
    }

    /// Scrape the index feed and every project behind it.
    pub async fn run_projects(&self, project_type: &str) -> Result<RunReport> {
        let index = self.feed.project_index(PROJECTS_PATH).await?;
        let rows = project::parse_index(&index, project_type);
        info!("found {} projects", rows.len());

        let mut counts = RunReport::default();
        let mut report = ScraperReport::default();
        let mut jobs: Vec<DownloadJob> = Vec::new();
        let mut article_queue: Vec<ArticleLink> = Vec::new();

        for row in rows {
            info!("parsing {} title: {}", row.source_url, row.title);
            let title = row.title.clone();
            match self
                .ingest_project(row, &mut report, &mut jobs, &mut article_queue)
                .await
            {
                Ok(Ingested::Saved { existing: true }) => counts.updated += 1,
                Ok(Ingested::Saved { existing: false }) => counts.new += 1,
                Ok(Ingested::Deleted) => counts.deleted += 1,
                Err(error) => {
                    error!("failed ingesting {title}: {error:#}");
                    counts.failed += 1;
                }
            }
        }

        info!("fetching {} news items", article_queue.len());
        for link in &article_queue {
            self.ingest_article(link, project_type, &mut report, &mut jobs)
                .await;
        }

        assets::run(jobs, Arc::clone(&self.backend), "Iprox projects").await?;

        if self.settings.garbage_collect {
            if let Err(error) = self.backend.garbage_collect(project_type).await {
                error!("garbage collection failed: {error:#}");
            }
        }

        counts.total = (counts.new + counts.updated) as i64 - counts.deleted as i64;
        counts.date = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        if let Ok(rendered) = serde_json::to_string_pretty(&report) {
            info!("scraper report:\n{rendered}");
        }
        Ok(counts)
    }

    async fn ingest_project(
        &self,
        mut row: crate::models::Project,
        report: &mut ScraperReport,
        jobs: &mut Vec<DownloadJob>,
        article_queue: &mut Vec<ArticleLink>,
    ) -> Result<Ingested> {
        let existing = self.backend.project_exists(&row.identifier).await?;

        // source_url already carries the single-page query string
        let raw = self.feed.fetch(&row.source_url).await?;
        if crate::parser::page_type(&raw) != "subhome" {
            report.record_unreachable(&row.identifier, &row.title);
            self.backend.delete_project(&row.identifier).await?;
            info!("project {} deleted", row.identifier);
            return Ok(Ingested::Deleted);
        }

        let page = project::parse(&row.identifier, &row.source_url, &raw);
        let mut detail = page.detail;
        detail.project_type = row.project_type.clone();

        if let Some(url) = &page.timeline_url {
            info!("found timeline: {url}");
            match self.feed.page(url).await {
                Ok(raw) => {
                    if let Some(clusters) = crate::parser::clusters(&raw) {
                        detail.body.timeline = Some(timeline::parse(clusters));
                    }
                }
                Err(error) => warn!("failed fetching timeline {url}: {error:#}"),
            }
        }

        for feed_link in &page.article_feeds {
            match self.feed.listing(&feed_link.url).await {
                Ok(listing) => {
                    let articles = listing.as_array().cloned().unwrap_or_default();
                    info!("found {} article item(s): {}", articles.len(), feed_link.url);
                    for article in &articles {
                        let Some(itmidt) = article.get("itmidt").and_then(|v| v.as_str()) else {
                            continue;
                        };
                        let link = ArticleLink {
                            identifier: itmidt.to_string(),
                            project_identifier: row.identifier.clone(),
                            url: format!(
                                "https://amsterdam.nl/@{itmidt}/page/?AppIdt=app-pagetype&reload=true"
                            ),
                            project_title: row.title.clone(),
                            kind: feed_link.kind.clone(),
                        };
                        detail.news.push(link.clone());
                        article_queue.push(link);
                    }
                }
                Err(error) => {
                    warn!("failed fetching article feed {}: {error:#}", feed_link.url)
                }
            }
        }

        // the index row mirrors a few detail fields for the overview endpoint
        row.images = detail.images.clone();
        row.district_id = detail.district_id;
        row.district_name = detail.district_name.clone();

        self.backend.upsert_project(&row).await?;
        self.backend.upsert_project_detail(&detail).await?;

        queue_image_jobs(jobs, &detail.images);
        report.record_success(&detail, existing);
        Ok(Ingested::Saved { existing })
    }

    /// A failed article only costs its own record, the run keeps going.
    async fn ingest_article(
        &self,
        link: &ArticleLink,
        project_type: &str,
        report: &mut ScraperReport,
        jobs: &mut Vec<DownloadJob>,
    ) {
        info!("parsing news: {}", link.url);
        let raw = match self.feed.fetch(&link.url).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!("failed fetching article {}: {error:#}", link.url);
                return;
            }
        };
        let Some(item) = news::parse(
            &link.identifier,
            &link.project_identifier,
            project_type,
            &link.url,
            &raw,
        ) else {
            warn!("empty article page: {}", link.url);
            return;
        };

        if let Err(error) = self.backend.save_news(&item).await {
            error!("failed saving article {}: {error:#}", link.identifier);
            return;
        }
        report.record_news(&link.project_identifier, &link.identifier);

        queue_image_jobs(jobs, &item.images);
        for asset in &item.assets {
            jobs.push(DownloadJob {
                kind: JobKind::Asset,
                url: asset.url.clone(),
                identifier: asset.identifier.clone(),
                filename: asset.filename.clone(),
                description: asset.title.clone(),
                size: "orig".to_string(),
            });
        }
    }

    /// Scrape the contact page and every city office behind it.
    pub async fn run_offices(&self) -> Result<()> {
        let raw = self.feed.page(CONTACT_URL).await?;
        let directory = office::parse_directory(&raw);
        info!(
            "found {} contact sections and {} offices",
            directory.sections.len(),
            directory.offices.len()
        );

        if let Err(error) = self.backend.save_city_contact(&directory.sections).await {
            error!("failed saving contact sections: {error:#}");
        }
        if let Err(error) = self.backend.save_city_offices(&directory.offices).await {
            error!("failed saving office list: {error:#}");
        }

        let mut jobs: Vec<DownloadJob> = Vec::new();
        for link in &directory.offices {
            info!("parsing office: {}", link.title);
            match self.feed.page(&link.url).await {
                Ok(raw) => {
                    let office = office::parse_office(&link.identifier, &raw);
                    if let Some(image) = &office.images {
                        queue_image_jobs(&mut jobs, std::slice::from_ref(image));
                    }
                    if let Err(error) = self.backend.save_city_office(&office).await {
                        error!("failed saving office {}: {error:#}", link.title);
                    }
                }
                Err(error) => warn!("failed fetching office {}: {error:#}", link.url),
            }
        }

        assets::run(jobs, Arc::clone(&self.backend), "Stadsloketten").await?;

        if self.settings.garbage_collect {
            if let Err(error) = self.backend.garbage_collect("stadsloket").await {
                error!("garbage collection failed: {error:#}");
            }
        }
        Ok(())
    }

    pub async fn garbage_collect(&self, project_type: &str) -> Result<()> {
        self.backend.garbage_collect(project_type).await
    }
}

/// Every rendition of every gallery becomes one download job.
fn queue_image_jobs(jobs: &mut Vec<DownloadJob>, images: &[Image]) {
    for image in images {
        for (size, source) in &image.sources {
            jobs.push(DownloadJob {
                kind: JobKind::Image,
                url: source.url.clone(),
                identifier: source.image_id.clone(),
                filename: source.filename.clone(),
                description: source.description.clone(),
                size: size.clone(),
            });
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodySection, Contact, ImageSource};

    fn detail() -> ProjectDetail {
        let mut detail = ProjectDetail {
            identifier: "123456".to_string(),
            title: "Hoofdtitel".to_string(),
            ..Default::default()
        };
        detail.body.what.push(BodySection::default());
        detail.contacts.push(Contact::default());
        detail.coordinates.lon = Some(4.9);
        detail.coordinates.lat = Some(52.3);
        detail
    }

    #[test]
    fn report_entry_for_scraped_project() {
        let mut report = ScraperReport::default();
        report.record_success(&detail(), false);
        report.record_news("123456", "654321");

        let entry = &report.entries["123456"];
        assert_eq!(entry.url, "https://amsterdam.nl/@123456/page/");
        assert_eq!(entry.history, "project is: new");
        assert_eq!(entry.what, Some(true));
        assert_eq!(entry.when, Some(false));
        assert_eq!(entry.coordinates, Some(true));
        assert_eq!(entry.contacts, Some(1));
        assert_eq!(entry.timeline, Some(false));
        assert_eq!(entry.news, vec!["654321".to_string()]);
    }

    #[test]
    fn report_entry_for_unreachable_project() {
        let mut report = ScraperReport::default();
        report.record_unreachable("123456", "Hoofdtitel");

        let entry = &report.entries["123456"];
        assert_eq!(entry.history, "project is: unreachable/offline");
        assert_eq!(entry.images, None);
        assert_eq!(entry.what, None);
    }

    #[test]
    fn updated_project_history() {
        let mut report = ScraperReport::default();
        report.record_success(&detail(), true);
        assert_eq!(report.entries["123456"].history, "project is: updated");
    }

    #[test]
    fn gallery_renditions_become_jobs() {
        let mut image = Image::default();
        image.sources.insert(
            "orig".to_string(),
            ImageSource {
                url: "https://www.amsterdam.nl/1/2/3/mock.jpg".to_string(),
                image_id: "e51353040e4c049559c975ce6a650947".to_string(),
                filename: "mock.jpg".to_string(),
                description: String::new(),
            },
        );
        image.sources.insert(
            "220px".to_string(),
            ImageSource {
                url: "https://www.amsterdam.nl/1/2/3/220px/mock.jpg".to_string(),
                image_id: "0".repeat(32),
                filename: "mock.jpg".to_string(),
                description: String::new(),
            },
        );

        let mut jobs = Vec::new();
        queue_image_jobs(&mut jobs, &[image]);

        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|job| job.kind == JobKind::Image));
        assert_eq!(jobs[0].size, "220px");
        assert_eq!(jobs[1].size, "orig");
    }
}
