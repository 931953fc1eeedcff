//! Output records posted to the ingestion backend.
//!
//! Field names are the backend wire schema, so serde renames cover the few
//! places where the schema uses reserved or dashed names.

use std::collections::BTreeMap;

use serde::Serialize;

/// A sanitized HTML fragment together with its plain-text rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextBlock {
    pub html: String,
    pub text: String,
}

/// A titled body fragment inside one of the project body buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BodySection {
    pub title: String,
    pub html: String,
    pub text: String,
}

/// One downloadable rendition of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageSource {
    pub url: String,
    pub image_id: String,
    pub filename: String,
    pub description: String,
}

/// An image gallery: renditions keyed by size label ("orig", "220px", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Image {
    #[serde(rename = "type")]
    pub kind: String,
    pub sources: BTreeMap<String, ImageSource>,
}

/// A downloadable file reference (PDF and friends).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Asset {
    pub identifier: String,
    pub mime_type: String,
    pub url: String,
    pub title: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Contact {
    pub name: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Coordinates {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

/// Body buckets of a project detail page. Editors can introduce categories
/// beyond the known set, those land in `extra` under their own name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectBody {
    pub contact: Vec<BodySection>,
    pub what: Vec<BodySection>,
    pub when: Vec<BodySection>,
    #[serde(rename = "where")]
    pub location: Vec<BodySection>,
    pub work: Vec<BodySection>,
    #[serde(rename = "more-info")]
    pub more_info: Vec<BodySection>,
    pub timeline: Option<Timeline>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Vec<BodySection>>,
}

impl ProjectBody {
    pub fn bucket_mut(&mut self, category: &str) -> &mut Vec<BodySection> {
        match category {
            "contact" => &mut self.contact,
            "what" => &mut self.what,
            "when" => &mut self.when,
            "where" => &mut self.location,
            "work" => &mut self.work,
            "more-info" => &mut self.more_info,
            other => self.extra.entry(other.to_string()).or_default(),
        }
    }
}

/// Cross-link from a project to one of its news or work articles.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArticleLink {
    pub identifier: String,
    pub project_identifier: String,
    pub url: String,
    pub project_title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Full detail record of one project subhome page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectDetail {
    pub identifier: String,
    pub project_type: String,
    pub body: ProjectBody,
    pub coordinates: Coordinates,
    pub contacts: Vec<Contact>,
    pub district_id: i64,
    pub district_name: String,
    pub images: Vec<Image>,
    pub news: Vec<ArticleLink>,
    pub page_id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub rel_url: String,
    pub url: String,
}

/// One row of the paged project index feed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Project {
    pub project_type: String,
    pub identifier: String,
    pub district_id: i64,
    pub district_name: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub content_html: String,
    pub content_text: String,
    pub images: Vec<Image>,
    pub publication_date: String,
    pub modification_date: String,
    pub source_url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewsBody {
    pub summary: TextBlock,
    pub preface: TextBlock,
    pub content: TextBlock,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewsItem {
    pub identifier: String,
    pub project_identifier: String,
    pub project_type: String,
    pub url: String,
    pub title: String,
    pub publication_date: String,
    pub body: NewsBody,
    pub images: Vec<Image>,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub title: TextBlock,
    pub intro: TextBlock,
    pub items: Vec<TimelineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineItem {
    pub title: String,
    pub progress: String,
    pub collapsed: bool,
    pub content: Vec<TimelineContent>,
}

impl Default for TimelineItem {
    fn default() -> Self {
        Self {
            title: String::new(),
            progress: String::new(),
            // entries start folded unless the editor opts out
            collapsed: true,
            content: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineContent {
    pub title: Option<String>,
    pub body: TextBlock,
}

/// Contact-page section shown above the office list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactSection {
    pub title: String,
    pub html: String,
    pub text: String,
}

/// Link from the office directory to one office detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OfficeLink {
    pub title: String,
    pub url: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Default)]
pub struct CityOfficeDirectory {
    pub sections: Vec<ContactSection>,
    pub offices: Vec<OfficeLink>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CityOffice {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<TextBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<TextBlock>,
    pub contact: BTreeMap<String, TextBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Image>,
}

/// What a download job uploads to, which also fixes the mime-type family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Image,
    Asset,
}

/// One unit of work for the asset download pool.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub kind: JobKind,
    pub url: String,
    pub identifier: String,
    pub filename: String,
    pub description: String,
    pub size: String,
}
