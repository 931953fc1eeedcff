//! Project timelines, published as their own "tijdlijn" page.
//!
//! The filtered stream is flat: `Eigenschappen` markers open a new entry,
//! and any `Instellingen`/`Subitem` markers that follow belong to the open
//! entry until the next `Eigenschappen` closes it.

use serde_json::Value;

use super::{name_of, str_field};
use crate::models::{TextBlock, Timeline, TimelineContent, TimelineItem};
use crate::parser::filter::{filter, one_or_many};
use crate::sanitize::{rewrite_html, strip_html};

pub const PAGE_TARGETS: &[&str] = &[
    "Meta",
    "Gegevens",
    "Inhoud",
    "Eigenschappen",
    "Instellingen",
    "Tijdlijn",
    "Hoofditem",
    "Subitems",
    "Subitem",
];

#[derive(Debug, Default)]
struct RawEntry {
    properties: Option<Value>,
    settings: Option<Value>,
    subitems: Vec<Value>,
}

/// Build a timeline from the content clusters of a timeline page.
pub fn parse(clusters: &Value) -> Timeline {
    let mut gegevens = Value::Null;
    let mut inhoud = Value::Null;
    let mut entries: Vec<RawEntry> = Vec::new();
    let mut current = RawEntry::default();

    for node in filter(clusters, PAGE_TARGETS) {
        match node.name.as_str() {
            "Gegevens" => gegevens = node.value,
            "Inhoud" => inhoud = node.value,
            "Eigenschappen" => {
                if current.properties.is_some() {
                    entries.push(std::mem::take(&mut current));
                }
                current.properties = Some(node.value);
            }
            "Instellingen" => current.settings = Some(node.value),
            "Subitem" => {
                // Subitems usually arrive cluster-wrapped; the payload is
                // the wrap's veld. An empty veld still counts as one blank
                // content line.
                let payload = match &node.value {
                    Value::Object(_) => node
                        .value
                        .get("veld")
                        .cloned()
                        .unwrap_or_else(|| Value::Array(Vec::new())),
                    other => other.clone(),
                };
                current.subitems.push(payload);
            }
            _ => {}
        }
    }
    if current.properties.is_some() {
        entries.push(current);
    }

    Timeline {
        title: intro_block(&gegevens),
        intro: intro_block(&inhoud),
        items: entries.iter().map(build_item).collect(),
    }
}

fn intro_block(node: &Value) -> TextBlock {
    let html = str_field(node, "Txt").unwrap_or("");
    TextBlock {
        html: rewrite_html(html),
        text: strip_html(html),
    }
}

fn build_item(entry: &RawEntry) -> TimelineItem {
    let mut item = TimelineItem::default();

    if let Some(properties) = &entry.properties {
        for field in one_or_many(properties) {
            if name_of(field) == "Titel" {
                item.title = str_field(field, "Wrd").unwrap_or("").to_string();
            }
        }
    }

    if let Some(settings) = &entry.settings {
        for field in one_or_many(settings) {
            match name_of(field) {
                "Status" => {
                    item.progress = str_field(field, "SelWrd").unwrap_or("").to_string();
                }
                "Hoofditem initieel ingeklapt" => {
                    item.collapsed = str_field(field, "Wrd")
                        .and_then(|w| w.trim().parse::<i64>().ok())
                        .map(|w| w != 0)
                        .unwrap_or(true);
                }
                _ => {}
            }
        }
    }

    item.content = build_content(entry);
    item
}

/// Entries whose properties arrive as a single object carry their content
/// in collected subitem payloads; list-shaped properties carry one body
/// inline instead.
fn build_content(entry: &RawEntry) -> Vec<TimelineContent> {
    match &entry.properties {
        Some(Value::Array(fields)) => {
            let mut content = TimelineContent::default();
            apply_body(fields.iter(), &mut content);
            vec![content]
        }
        _ => entry
            .subitems
            .iter()
            .filter(|payload| payload.is_object() || payload.is_array())
            .map(|payload| {
                let mut content = TimelineContent {
                    title: Some(String::new()),
                    ..Default::default()
                };
                for field in one_or_many(payload) {
                    if name_of(field) == "Titel" {
                        content.title = Some(str_field(field, "Wrd").unwrap_or("").to_string());
                    }
                }
                apply_body(one_or_many(payload).into_iter(), &mut content);
                content
            })
            .collect(),
    }
}

fn apply_body<'a>(fields: impl Iterator<Item = &'a Value>, content: &mut TimelineContent) {
    for field in fields {
        if matches!(name_of(field), "Beschrijving" | "Inleiding") {
            let html = str_field(field, "Txt").unwrap_or("");
            content.body.html = rewrite_html(html);
            content.body.text = strip_html(html);
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture_clusters() -> Value {
        let raw = std::fs::read_to_string("tests/fixtures/timeline_page.json").unwrap();
        let page: Value = serde_json::from_str(&raw).unwrap();
        crate::parser::clusters(&page).unwrap().clone()
    }

    #[test]
    fn floating_blocks_and_single_entry() {
        let timeline = parse(&fixture_clusters());

        assert_eq!(timeline.title.html, "<div>mock</div>");
        assert_eq!(timeline.title.text, "mock");
        assert_eq!(timeline.intro.text, "mock");

        assert_eq!(timeline.items.len(), 1);
        let item = &timeline.items[0];
        assert_eq!(item.title, "mock");
        assert_eq!(item.progress, "");
        assert!(item.collapsed);
        assert!(item.content.is_empty());
    }

    #[test]
    fn entries_are_bounded_by_properties_markers() {
        let clusters = json!([
            {"Nam": "Hoofditem", "cluster": [
                {"Nam": "Eigenschappen", "veld": {"Nam": "Titel", "Wrd": "2021"}},
                {"Nam": "Instellingen", "veld": [
                    {"Nam": "Status", "SelWrd": "Afgelopen"},
                    {"Nam": "Hoofditem initieel ingeklapt", "Wrd": "0"}
                ]},
                {"Nam": "Subitem", "veld": [
                    {"Nam": "Titel", "Wrd": "december"},
                    {"Nam": "Beschrijving", "Txt": "<p>klaar</p>"}
                ]}
            ]},
            {"Nam": "Hoofditem", "cluster": [
                {"Nam": "Eigenschappen", "veld": {"Nam": "Titel", "Wrd": "2022"}}
            ]}
        ]);

        let timeline = parse(&clusters);
        assert_eq!(timeline.items.len(), 2);

        let first = &timeline.items[0];
        assert_eq!(first.title, "2021");
        assert_eq!(first.progress, "Afgelopen");
        assert!(!first.collapsed);
        assert_eq!(first.content.len(), 1);
        assert_eq!(first.content[0].title.as_deref(), Some("december"));
        assert_eq!(first.content[0].body.text, "klaar");

        let second = &timeline.items[1];
        assert_eq!(second.title, "2022");
        assert_eq!(second.progress, "");
        assert!(second.collapsed);
        assert!(second.content.is_empty());
    }

    #[test]
    fn list_properties_carry_inline_body() {
        let clusters = json!([
            {"Nam": "Eigenschappen", "veld": [
                {"Nam": "Titel", "Wrd": "fase"},
                {"Nam": "Inleiding", "Txt": "<p>intro</p>"}
            ]}
        ]);

        let timeline = parse(&clusters);
        assert_eq!(timeline.items.len(), 1);
        let item = &timeline.items[0];
        assert_eq!(item.title, "fase");
        assert_eq!(item.content.len(), 1);
        assert_eq!(item.content[0].title, None);
        assert_eq!(item.content[0].body.text, "intro");
    }

    #[test]
    fn subitem_without_fields_yields_blank_content() {
        let clusters = json!([
            {"Nam": "Eigenschappen", "veld": {"Nam": "Titel", "Wrd": "fase"}},
            {"Nam": "Subitem", "cluster": {"Nam": "Subitem", "veld": []}}
        ]);

        let timeline = parse(&clusters);
        assert_eq!(timeline.items.len(), 1);
        let item = &timeline.items[0];
        assert_eq!(item.content.len(), 1);
        assert_eq!(item.content[0].title.as_deref(), Some(""));
        assert_eq!(item.content[0].body, TextBlock::default());
    }

    #[test]
    fn settings_before_any_entry_attach_to_the_first() {
        let clusters = json!([
            {"Nam": "Instellingen", "veld": {"Nam": "Status", "SelWrd": "Huidig"}},
            {"Nam": "Eigenschappen", "veld": {"Nam": "Titel", "Wrd": "nu"}}
        ]);

        let timeline = parse(&clusters);
        assert_eq!(timeline.items.len(), 1);
        assert_eq!(timeline.items[0].progress, "Huidig");
    }
}
