//! # Content Normalizer Module
//!
//! This module turns raw fetched content into the canonical text form used
//! as extraction input. It is pure content transformation: no network I/O,
//! fully deterministic for a given input.
//!
//! ## Key Components
//!
//! - `NormalizedContent`: canonical text body plus structured side-lists
//! - `LinkRef` / `MediaRef`: link and media references kept out of the body
//! - `normalize`: the transformation entry point
//!
//! ## Features
//!
//! - Strips script/style/navigation boilerplate
//! - Classifies link targets as internal or external to the page host
//! - Markdown-like headings and list items in the text body
//! - Flags tables and enumerated data for the quality structure bonus

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::Error as CrateError;

/// Error type for normalization
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The page URL could not be parsed
    #[error("Invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A selector failed to parse
    #[error("Selector error: {0}")]
    Selector(String),
}

impl From<NormalizeError> for CrateError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::InvalidUrl(e) => CrateError::UrlParse(e),
            _ => CrateError::Normalize(err.to_string()),
        }
    }
}

/// Whether a link points at the page's own host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkScope {
    Internal,
    External,
}

/// A link target preserved as a structured side-list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    /// Absolute URL of the target
    pub href: String,
    pub scope: LinkScope,
}

/// Kind of media reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// A media reference preserved as a structured side-list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub src: String,
    pub kind: MediaKind,
}

/// Canonical text representation of fetched content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedContent {
    /// Plain/markdown-like text body used as extraction input
    pub text: String,

    /// Word count of the text body
    pub word_count: usize,

    /// Link targets found in the content
    pub links: Vec<LinkRef>,

    /// Media references found in the content
    pub media: Vec<MediaRef>,

    /// Tables were present in the content
    pub has_tables: bool,

    /// Enumerated data (ordered lists, or unordered lists of three or more
    /// items) was present in the content
    pub has_lists: bool,
}

/// Tags whose entire subtree is boilerplate
const EXCLUDED_TAGS: &[&str] = &[
    "head", "script", "style", "nav", "header", "footer", "aside", "noscript", "form", "iframe",
    "svg",
];

/// id/class tokens marking boilerplate containers
const EXCLUDED_MARKERS: &[&str] = &["nav", "navigation", "menu", "sidebar", "ads", "comments"];

fn selector(s: &str) -> Result<Selector, NormalizeError> {
    Selector::parse(s).map_err(|e| NormalizeError::Selector(format!("{s}: {e:?}")))
}

fn is_excluded(element: &ElementRef) -> bool {
    let value = element.value();
    if EXCLUDED_TAGS.contains(&value.name()) {
        return true;
    }
    if let Some(id) = value.attr("id") {
        if EXCLUDED_MARKERS.contains(&id.to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    value
        .classes()
        .any(|c| EXCLUDED_MARKERS.contains(&c.to_ascii_lowercase().as_str()))
}

/// Inline text of an element with whitespace collapsed
fn inline_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Block-level walk: emit headings, paragraphs, and list items as discrete
/// blocks; skip boilerplate subtrees entirely.
fn collect_blocks(element: ElementRef, blocks: &mut Vec<String>) {
    if is_excluded(&element) {
        return;
    }

    let tag = element.value().name();

    if let Some(level) = heading_level(tag) {
        let text = inline_text(&element);
        if !text.is_empty() {
            blocks.push(format!("{} {}", "#".repeat(level), text));
        }
        return;
    }

    match tag {
        "p" | "blockquote" | "pre" | "figcaption" | "dt" | "dd" | "td" | "th" => {
            let text = inline_text(&element);
            if !text.is_empty() {
                blocks.push(text);
            }
        }
        "li" => {
            let text = inline_text(&element);
            if !text.is_empty() {
                blocks.push(format!("- {text}"));
            }
        }
        _ => {
            // Container: recurse into child elements, keeping any stray text
            // nodes (plain-text input, bare text in divs) in document order.
            let mut stray = String::new();
            let mut flush = |stray: &mut String, blocks: &mut Vec<String>| {
                let text = stray.split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    blocks.push(text);
                }
                stray.clear();
            };
            for child in element.children() {
                if let Some(child_el) = ElementRef::wrap(child) {
                    flush(&mut stray, blocks);
                    collect_blocks(child_el, blocks);
                } else if let Some(text) = child.value().as_text() {
                    stray.push_str(text);
                }
            }
            flush(&mut stray, blocks);
        }
    }
}

fn link_scope(base: &Url, target: &Url) -> LinkScope {
    if base.host_str() == target.host_str() {
        LinkScope::Internal
    } else {
        LinkScope::External
    }
}

/// Normalize raw fetched content into its canonical form.
///
/// `page_url` anchors relative links and decides internal/external scope.
/// Non-HTML input degrades gracefully: the body text is whatever text the
/// parser finds, with empty side-lists.
pub fn normalize(page_url: &str, raw: &str) -> Result<NormalizedContent, NormalizeError> {
    let base = Url::parse(page_url)?;
    let document = Html::parse_document(raw);

    let mut blocks = Vec::new();
    let root = document.root_element();
    collect_blocks(root, &mut blocks);
    let text = blocks.join("\n\n");
    let word_count = text.split_whitespace().count();

    // Links, deduplicated by resolved target, in document order.
    let anchor = selector("a[href]")?;
    let mut links: Vec<LinkRef> = Vec::new();
    for element in document.select(&anchor) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        let link = LinkRef {
            scope: link_scope(&base, &resolved),
            href: resolved.into(),
        };
        if !links.contains(&link) {
            links.push(link);
        }
    }

    // Media references.
    let mut media: Vec<MediaRef> = Vec::new();
    for (sel, kind) in [
        ("img[src]", MediaKind::Image),
        ("video[src], video source[src]", MediaKind::Video),
        ("audio[src], audio source[src]", MediaKind::Audio),
    ] {
        let parsed = selector(sel)?;
        for element in document.select(&parsed) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };
            let Ok(resolved) = base.join(src) else {
                continue;
            };
            let reference = MediaRef {
                src: resolved.into(),
                kind,
            };
            if !media.contains(&reference) {
                media.push(reference);
            }
        }
    }

    let has_tables = document.select(&selector("table")?).next().is_some();
    let ordered = document.select(&selector("ol")?).next().is_some();
    let unordered = selector("ul")?;
    let li = selector("li")?;
    let has_big_list = document
        .select(&unordered)
        .any(|ul| ul.select(&li).count() >= 3);

    Ok(NormalizedContent {
        text,
        word_count,
        links,
        media,
        has_tables,
        has_lists: ordered || has_big_list,
    })
}
