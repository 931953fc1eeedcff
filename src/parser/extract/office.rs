//! The city-office directory ("contact" page) and its office detail pages.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use super::{name_of, src_location, str_field, IPROX_DOMAIN};
use crate::hashing::content_id;
use crate::models::{
    CityOffice, CityOfficeDirectory, ContactSection, Image, ImageSource, OfficeLink, TextBlock,
};
use crate::parser::filter::{filter, one_or_many};
use crate::sanitize::{rewrite_html, strip_html};

pub const DIRECTORY_TARGETS: &[&str] = &[
    "Meta",
    "Gegevens",
    "Samenvatting",
    "Blok",
    "Superlink",
    "Verwijzing",
    "Intern",
    "Link",
    "Lijst",
    "Omschrijving",
    "Titel",
    "Tekst",
    "Afbeelding",
];

pub const OFFICE_TARGETS: &[&str] = &[
    "Meta",
    "Gegevens",
    "Afbeelding",
    "Blok",
    "Leestekst",
    "Lijst",
    "Omschrijving",
];

/// Parse the directory page: contact sections plus links to each office.
/// Office identifiers are derived from the linked URL.
pub fn parse_directory(raw: &Value) -> CityOfficeDirectory {
    let mut directory = CityOfficeDirectory::default();
    if crate::parser::page_type(raw) != "subhome" {
        return directory;
    }
    let Some(clusters) = crate::parser::clusters(raw) else {
        return directory;
    };

    for node in filter(clusters, DIRECTORY_TARGETS) {
        match node.name.as_str() {
            "Omschrijving" => {
                let mut title = None;
                let mut html = None;
                for field in one_or_many(&node.value) {
                    match name_of(field) {
                        "Titel" => title = str_field(field, "Wrd").map(str::to_string),
                        "Tekst" => {
                            html = Some(rewrite_html(str_field(field, "Txt").unwrap_or("")))
                        }
                        _ => {}
                    }
                }
                // both parts or nothing, half-filled blocks are noise
                if let (Some(title), Some(html)) = (title, html) {
                    directory.sections.push(ContactSection {
                        title,
                        text: strip_html(&html),
                        html,
                    });
                }
            }
            "Verwijzing" => {
                let Some(fields) = node.value.get("veld") else {
                    continue;
                };
                for field in one_or_many(fields) {
                    if name_of(field) != "Link" {
                        continue;
                    }
                    let Some(url) = field
                        .get("link")
                        .and_then(|link| link.get("Url"))
                        .and_then(Value::as_str)
                    else {
                        warn!("office link without url, skipped");
                        continue;
                    };
                    directory.offices.push(OfficeLink {
                        title: str_field(field, "Wrd").unwrap_or("").to_string(),
                        url: url.to_string(),
                        identifier: content_id(url),
                    });
                }
            }
            _ => {}
        }
    }

    directory
}

/// Parse one office detail page.
pub fn parse_office(identifier: &str, raw: &Value) -> CityOffice {
    let mut office = CityOffice {
        identifier: identifier.to_string(),
        ..Default::default()
    };
    if crate::parser::page_type(raw) != "subhome" {
        return office;
    }
    let Some(clusters) = crate::parser::clusters(raw) else {
        return office;
    };

    for node in filter(clusters, OFFICE_TARGETS) {
        match node.name.as_str() {
            "Gegevens" => {
                for field in one_or_many(&node.value) {
                    if name_of(field) == "Samenvatting" {
                        office.info = Some(text_block(str_field(field, "Txt").unwrap_or("")));
                    }
                }
            }
            "Leestekst" => {
                for field in one_or_many(&node.value) {
                    match name_of(field) {
                        "Titel" => office.title = str_field(field, "Wrd").map(str::to_string),
                        "Tekst" => {
                            office.address =
                                Some(text_block(str_field(field, "Txt").unwrap_or("")))
                        }
                        _ => {}
                    }
                }
            }
            "Omschrijving" => {
                let mut title = None;
                let mut block = None;
                for field in one_or_many(&node.value) {
                    match name_of(field) {
                        "Titel" => title = str_field(field, "Wrd").map(str::to_string),
                        "Tekst" => block = str_field(field, "Txt").map(text_block),
                        _ => {}
                    }
                }
                if let (Some(title), Some(block)) = (title, block) {
                    office.contact.insert(title, block);
                }
            }
            "Afbeelding" => {
                for entry in one_or_many(&node.value) {
                    if name_of(entry) == "Afbeelding" {
                        office.images = Some(office_gallery(entry));
                    }
                }
            }
            _ => {}
        }
    }

    office
}

fn text_block(html: &str) -> TextBlock {
    TextBlock {
        html: rewrite_html(html),
        text: strip_html(html),
    }
}

/// Office galleries name their renditions after the path, not FilNam, and
/// never promote: the original always comes from the node's own source.
fn office_gallery(node: &Value) -> Image {
    let mut sources = BTreeMap::new();

    let location = src_location(node).unwrap_or("");
    let url = format!("{IPROX_DOMAIN}{location}");
    sources.insert(
        "orig".to_string(),
        ImageSource {
            image_id: content_id(&url),
            url,
            filename: str_field(node, "FilNam").unwrap_or("").to_string(),
            description: String::new(),
        },
    );

    if let Some(assets) = node.get("asset") {
        for asset in one_or_many(assets) {
            let Some(location) = src_location(asset) else {
                warn!("office image rendition without source location, skipped");
                continue;
            };
            let Some(size) = super::rendition_size(location) else {
                warn!(location, "office image rendition with unusable path, skipped");
                continue;
            };
            let url = format!("{IPROX_DOMAIN}{location}");
            sources.insert(
                size.to_string(),
                ImageSource {
                    image_id: content_id(&url),
                    url,
                    filename: location.rsplit('/').next().unwrap_or("").to_string(),
                    description: String::new(),
                },
            );
        }
    }

    Image {
        kind: String::new(),
        sources,
    }
}

// ── Tests ──
