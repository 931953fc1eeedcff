//! News and work articles linked from a project page.

use serde_json::Value;

use super::{gallery, iso_date, name_of, rendition_size, src_location, str_field, IPROX_DOMAIN};
use crate::hashing::content_id;
use crate::models::{Asset, Image, ImageSource, NewsItem, TextBlock};
use crate::parser::filter::{filter, one_or_many};
use crate::sanitize::{rewrite_html, strip_html};

pub const PAGE_TARGETS: &[&str] = &["Meta", "Gegevens", "Inhoud", "Verwijzing", "Download"];

/// Parse a raw article page into a news record. An empty response means the
/// article is gone, the caller decides what that implies for the project.
pub fn parse(
    identifier: &str,
    project_identifier: &str,
    project_type: &str,
    url: &str,
    raw: &Value,
) -> Option<NewsItem> {
    let page = crate::parser::page(raw)?;

    let mut item = NewsItem {
        identifier: identifier.to_string(),
        project_identifier: project_identifier.to_string(),
        project_type: project_type.to_string(),
        url: url.to_string(),
        title: str_field(page, "title").unwrap_or("").to_string(),
        ..Default::default()
    };

    // CorDtm is the page's correction date; an explicit Brondatum wins below.
    if let Some(date) = str_field(page, "CorDtm").and_then(iso_date) {
        item.publication_date = date;
    }

    let clusters = page.get("cluster").unwrap_or(&Value::Null);
    for node in filter(clusters, PAGE_TARGETS) {
        match node.name.as_str() {
            "Gegevens" => {
                for field in one_or_many(&node.value) {
                    match name_of(field) {
                        "Samenvatting" => {
                            item.body.summary = text_block(str_field(field, "Txt").unwrap_or(""));
                        }
                        "Brondatum" => {
                            if let Some(date) = str_field(field, "Dtm").and_then(iso_date) {
                                item.publication_date = date;
                            }
                        }
                        "Hero afbeelding" => {
                            item.images.push(gallery(field, "banner", false));
                        }
                        _ => {}
                    }
                }
            }
            "Inhoud" => {
                for field in one_or_many(&node.value) {
                    match name_of(field) {
                        "Inleiding" => {
                            item.body.preface = text_block(str_field(field, "Txt").unwrap_or(""));
                        }
                        "Tekst" => {
                            item.body.content = text_block(str_field(field, "Txt").unwrap_or(""));
                            if let Some(assets) = field.get("asset") {
                                for asset in one_or_many(assets) {
                                    if let Some(image) = inline_image(asset) {
                                        item.images.push(image);
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            "Verwijzing" => {
                if let Some(fields) = node.value.get("veld") {
                    for field in one_or_many(fields) {
                        if name_of(field) == "Bestand" {
                            if let Some(asset) = file_asset(field) {
                                item.assets.push(asset);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Some(item)
}

fn text_block(html: &str) -> TextBlock {
    TextBlock {
        html: rewrite_html(html),
        text: strip_html(html),
    }
}

/// Image embedded in the article text, one rendition only.
fn inline_image(asset: &Value) -> Option<Image> {
    let location = src_location(asset)?;
    let size = rendition_size(location)?;
    let url = format!("{IPROX_DOMAIN}{location}");
    let filename = location.rsplit('/').next().unwrap_or("").to_string();

    let mut image = Image {
        kind: "additional".to_string(),
        ..Default::default()
    };
    image.sources.insert(
        size.to_string(),
        ImageSource {
            image_id: content_id(&url),
            url,
            filename,
            description: String::new(),
        },
    );
    Some(image)
}

fn file_asset(field: &Value) -> Option<Asset> {
    let location = src_location(field)?;
    let url = format!("{IPROX_DOMAIN}{location}");
    let filename = str_field(field, "FilNam").unwrap_or("");
    let extension = filename.rsplit('.').next().unwrap_or("");
    Some(Asset {
        identifier: content_id(&url),
        mime_type: format!("application/{extension}"),
        url,
        title: str_field(field, "Wrd").unwrap_or("").to_string(),
        filename: filename.to_string(),
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Value {
        let raw = std::fs::read_to_string("tests/fixtures/news_page.json").unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn parse_fixture() -> NewsItem {
        parse(
            "000000-news",
            "identifier",
            "projects",
            "https://amsterdam.nl/@000000-news/page/?AppIdt=app-pagetype&reload=true",
            &fixture(),
        )
        .unwrap()
    }

    #[test]
    fn empty_response_is_none() {
        assert!(parse("id", "pid", "projects", "url", &json!({})).is_none());
        assert!(parse("id", "pid", "projects", "url", &json!({"item": {}})).is_none());
    }

    #[test]
    fn body_and_title() {
        let item = parse_fixture();

        assert_eq!(item.title, "Nieuwsbericht");
        assert_eq!(item.body.summary.text, "samenvatting");
        assert_eq!(item.body.preface.html, "<div>inleiding</div>");
        assert_eq!(item.body.content.text, "tekst");
        assert_eq!(item.identifier, "000000-news");
        assert_eq!(item.project_identifier, "identifier");
        assert_eq!(item.project_type, "projects");
    }

    #[test]
    fn brondatum_overrides_page_date() {
        let item = parse_fixture();
        // page CorDtm says 20210504, Brondatum wins
        assert_eq!(item.publication_date, "2021-06-15");
    }

    #[test]
    fn page_date_without_brondatum() {
        let raw = json!({
            "item": {"page": {"pagetype": "nieuwsartikel", "title": "x", "CorDtm": "20210504"}}
        });
        let item = parse("id", "pid", "projects", "url", &raw).unwrap();
        assert_eq!(item.publication_date, "2021-05-04");
    }

    #[test]
    fn hero_and_inline_images() {
        let item = parse_fixture();

        assert_eq!(item.images.len(), 2);
        let banner = &item.images[0];
        assert_eq!(banner.kind, "banner");
        assert_eq!(
            banner.sources["orig"].url,
            "https://www.amsterdam.nl/publish/pages/111111/hero.jpg"
        );
        assert!(banner.sources.contains_key("220px"));

        let additional = &item.images[1];
        assert_eq!(additional.kind, "additional");
        assert_eq!(additional.sources.len(), 1);
        let source = &additional.sources["460px"];
        assert_eq!(
            source.url,
            "https://www.amsterdam.nl/publish/pages/222222/460px/inline.jpg"
        );
        assert_eq!(source.filename, "inline.jpg");
        assert_eq!(source.image_id, content_id(&source.url));
    }

    #[test]
    fn file_assets() {
        let item = parse_fixture();

        assert_eq!(item.assets.len(), 1);
        let asset = &item.assets[0];
        assert_eq!(asset.mime_type, "application/pdf");
        assert_eq!(asset.filename, "rapport.pdf");
        assert_eq!(asset.title, "Het rapport");
        assert_eq!(
            asset.url,
            "https://www.amsterdam.nl/publish/pages/333333/rapport.pdf"
        );
        assert_eq!(asset.identifier, content_id(&asset.url));
    }
}
