//! Project pages: the index feed rows and the "subhome" detail pages.

use serde_json::Value;
use tracing::warn;

use super::{gallery, int_field, name_of, src_location, str_field, IPROX_DOMAIN};
use crate::models::{BodySection, Contact, Coordinates, Project, ProjectBody, ProjectDetail};
use crate::parser::filter::{filter, one_or_many};
use crate::sanitize::{rewrite_html, split_title, strip_html};

pub const PAGE_TARGETS: &[&str] = &[
    "Afbeelding",
    "Afbeeldingen",
    "App categorie",
    "Auteur",
    "Basis afbeelding",
    "Blok",
    "Brondatum",
    "Coordinaten",
    "Contacten",
    "Contact",
    "Titel",
    "Fotoshow",
    "Gegevens",
    "Inhoud",
    "Kenmerk",
    "Kenmerken",
    "Koppeling",
    "Lijst",
    "Meta",
    "Nieuws",
    "Omschrijving",
    "Samenvatting",
];

/// A linked article feed still to be fetched, with the app category that
/// linked it ("news" or "work").
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleFeed {
    pub url: String,
    pub kind: String,
}

/// Parse result of one detail page: the record itself plus the follow-up
/// fetches left for the caller to resolve.
#[derive(Debug, Default)]
pub struct ProjectPage {
    pub detail: ProjectDetail,
    pub timeline_url: Option<String>,
    pub article_feeds: Vec<ArticleFeed>,
}

/// Map the paged index feed to project rows. Rows without an `itmidt` are
/// unusable and skipped.
pub fn parse_index(rows: &Value, project_type: &str) -> Vec<Project> {
    let mut projects = Vec::new();
    let Some(rows) = rows.as_array() else {
        warn!("project index is not a list");
        return projects;
    };

    for row in rows {
        let Some(identifier) = str_field(row, "itmidt") else {
            warn!("project row without itmidt, skipped");
            continue;
        };
        let (title, subtitle) = split_title(str_field(row, "title").unwrap_or(""));
        let content = str_field(row, "content").unwrap_or("");
        projects.push(Project {
            project_type: project_type.to_string(),
            identifier: identifier.to_string(),
            district_id: -1,
            district_name: String::new(),
            title,
            subtitle,
            content_html: rewrite_html(content),
            content_text: strip_html(content),
            images: Vec::new(),
            publication_date: str_field(row, "publication_date").unwrap_or("").to_string(),
            modification_date: str_field(row, "modification_date").unwrap_or("").to_string(),
            source_url: format!(
                "https://amsterdam.nl/@{identifier}/page/?AppIdt=app-pagetype&reload=true"
            ),
        });
    }
    projects
}

/// Parse a raw detail page. Only "subhome" pages carry content, but url,
/// page id and title are taken from the envelope regardless.
pub fn parse(identifier: &str, request_url: &str, raw: &Value) -> ProjectPage {
    let mut out = ProjectPage::default();
    out.detail.identifier = identifier.to_string();
    out.detail.district_id = -1;
    out.detail.page_id = -1;

    let item = raw.get("item").unwrap_or(&Value::Null);
    let page = item.get("page").unwrap_or(&Value::Null);

    if str_field(page, "pagetype") == Some("subhome") {
        if let Some(clusters) = page.get("cluster") {
            for node in filter(clusters, PAGE_TARGETS) {
                match node.name.as_str() {
                    "Afbeelding" => {
                        for entry in one_or_many(&node.value) {
                            if name_of(entry) == "Afbeelding" {
                                out.detail.images.push(gallery(entry, "", true));
                            }
                        }
                    }
                    "Omschrijving" => {
                        apply_text_section(&node.value, "Tekst", &mut out.detail.body)
                    }
                    // Bare Titel clusters carry their text under Toelichting
                    "Titel" if node.value.is_array() => {
                        apply_text_section(&node.value, "Toelichting", &mut out.detail.body)
                    }
                    "Koppeling" => apply_links(&node.value, &mut out),
                    "Coordinaten" => apply_coordinates(&node.value, &mut out.detail.coordinates),
                    "Kenmerken" => apply_district(&node.value, &mut out.detail),
                    "Contact" => out.detail.contacts.push(contact_from(&node.value)),
                    _ => {}
                }
            }
        }
    }

    out.detail.url = str_field(item, "Url").unwrap_or(request_url).to_string();
    out.detail.rel_url = str_field(item, "relUrl")
        .map(str::to_string)
        .unwrap_or_else(|| derive_rel_url(request_url));
    if let Some(page_id) = int_field(page, "PagIdt") {
        out.detail.page_id = page_id;
    }
    let (title, subtitle) = split_title(str_field(page, "title").unwrap_or(""));
    out.detail.title = title;
    out.detail.subtitle = subtitle;

    out
}

/// Titled html/text fragment routed to a body bucket by app category.
/// Fragments without a category or without text are editorial noise.
fn apply_text_section(value: &Value, text_field: &str, body: &mut ProjectBody) {
    let mut section = BodySection::default();
    let mut category = None;

    for field in one_or_many(value) {
        let name = name_of(field);
        if name == "App categorie" {
            category = str_field(field, "SelAka").map(str::to_string);
        } else if name == "Titel" {
            section.title = str_field(field, "Wrd").unwrap_or("").to_string();
        } else if name == text_field {
            let html = str_field(field, "Txt").unwrap_or("");
            section.html = rewrite_html(html);
            section.text = strip_html(html);
        }
    }

    if let Some(category) = category {
        if !section.html.is_empty() {
            body.bucket_mut(&category).push(section);
        }
    }
}

fn apply_links(value: &Value, out: &mut ProjectPage) {
    let mut timeline = false;
    let mut news = false;
    let mut work = false;
    let mut url = String::new();

    for field in one_or_many(value) {
        match name_of(field) {
            "App categorie" => match str_field(field, "SelAka").unwrap_or("") {
                "when-timeline" | "when" => timeline = true,
                "news" => news = true,
                "work" => work = true,
                _ => {}
            },
            "Link" => {
                url = field
                    .get("link")
                    .and_then(|link| link.get("Url"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
            }
            _ => {}
        }
    }

    if url.is_empty() {
        return;
    }
    if timeline {
        out.timeline_url = Some(url.clone());
    }
    if news {
        out.article_feeds.push(ArticleFeed {
            url: url.clone(),
            kind: "news".to_string(),
        });
    }
    if work {
        out.article_feeds.push(ArticleFeed {
            url,
            kind: "work".to_string(),
        });
    }
}

fn apply_coordinates(value: &Value, coordinates: &mut Coordinates) {
    match value {
        Value::Array(entries) => {
            for entry in entries {
                if name_of(entry) == "Coordinaten" {
                    set_geo(entry, coordinates);
                }
            }
        }
        Value::Object(_) => set_geo(value, coordinates),
        _ => {}
    }
}

/// The geo payload lists projections; WGS84 carries a GeoJSON feature
/// collection as an embedded JSON string.
fn set_geo(entry: &Value, coordinates: &mut Coordinates) {
    let Some(candidates) = entry
        .get("Txt")
        .and_then(|t| t.get("geo"))
        .and_then(|g| g.get("json"))
        .and_then(Value::as_array)
    else {
        warn!("coordinate block without geo json");
        return;
    };
    let Some(wgs84) = candidates
        .iter()
        .find(|c| str_field(c, "type") == Some("EPSG:4326"))
    else {
        warn!("coordinate block without EPSG:4326 projection");
        return;
    };
    let embedded = str_field(wgs84, "_").unwrap_or("");
    let parsed: Value = match serde_json::from_str(embedded) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(%error, "unreadable geo data");
            return;
        }
    };
    let Some(pair) = parsed
        .get("features")
        .and_then(|f| f.get(0))
        .and_then(|f| f.get("geometry"))
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array)
    else {
        warn!("geo data without coordinates");
        return;
    };
    coordinates.lon = pair.first().and_then(Value::as_f64);
    coordinates.lat = pair.get(1).and_then(Value::as_f64);
}

fn apply_district(value: &Value, detail: &mut ProjectDetail) {
    if str_field(value, "Src") != Some("Stadsdeel") {
        return;
    }
    if let Some(item) = value.get("item") {
        if let Some(district_id) = int_field(item, "SelItmIdt") {
            detail.district_id = district_id;
        }
    }
    detail.district_name = str_field(value, "Wrd").unwrap_or("").to_string();
}

fn contact_from(value: &Value) -> Contact {
    let mut contact = Contact::default();
    for field in one_or_many(value) {
        let word = || str_field(field, "Wrd").map(str::to_string);
        match name_of(field) {
            "Naam" => contact.name = word(),
            "Functie" => contact.position = word(),
            "E-mail" => contact.email = src_location(field).map(str::to_string),
            "Telefoon" => contact.phone = word(),
            "Adres" => contact.address = word(),
            _ => {}
        }
    }
    contact
}

fn derive_rel_url(url: &str) -> String {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() > 4 {
        parts[3..parts.len() - 1].join("/")
    } else {
        String::new()
    }
}

// ── Tests ──
