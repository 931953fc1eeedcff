//! Text cleanup for CMS-delivered HTML fragments.
//!
//! The feed serves editor-produced markup with a handful of recurring
//! artifacts: mojibake apostrophes, a glued "Zie ook" fragment, periods with
//! the following space swallowed, root-relative image links and a
//! "click to enlarge" caption baked into the markup. Everything user-facing
//! passes through here before it is stored.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

static SEE_ALSO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.Zie ook").unwrap());
static GLUED_PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])\.([A-Z])").unwrap());
static ENLARGE_CAPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^<]*?>Klik op de \S+ om te vergroten.+?>").unwrap());

const PUBLISH_PREFIX: &str = "\"/publish/pages/";
const PUBLISH_ABSOLUTE: &str = "\"https://www.amsterdam.nl/publish/pages/";

/// Remove all markup and return readable plain text. Text chunks from
/// separate elements are joined with a blank line, whitespace-only chunks
/// are dropped.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    cleanup(&text)
}

fn cleanup(text: &str) -> String {
    let text = SEE_ALSO_RE.replace_all(text, ". Zie ook: ");
    let text = text.replace('â', "'");
    GLUED_PERIOD_RE.replace_all(&text, "$1. $2").into_owned()
}

/// Keep the markup but make it renderable outside the CMS: image links
/// become absolute and the editor's "click to enlarge" caption is removed.
pub fn rewrite_html(html: &str) -> String {
    let html = html.replace(PUBLISH_PREFIX, PUBLISH_ABSOLUTE);
    ENLARGE_CAPTION_RE.replace_all(&html, "").into_owned()
}

/// Uppercase the first character. With `strip_spaces` the input is trimmed
/// first. Empty input yields `None`, callers decide what that means.
pub fn sentence_case(text: &str, strip_spaces: bool) -> Option<String> {
    let text = if strip_spaces {
        text.trim_matches(' ')
    } else {
        text
    };
    let mut chars = text.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Page titles arrive as "Title: subtitle: more". The part before the first
/// colon is the title, the rest becomes a sentence-cased subtitle.
pub fn split_title(full: &str) -> (String, Option<String>) {
    match full.split_once(':') {
        Some((head, rest)) => (head.to_string(), sentence_case(rest, true)),
        None => (full.to_string(), None),
    }
}

// ── Tests ──
