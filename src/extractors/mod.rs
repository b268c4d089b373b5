//! HTML extraction modules
//!
//! Each module reads one fixed region of a target page. Every extractor takes
//! a parsed [`PageDocument`](crate::document::PageDocument) and returns an
//! empty result when its region is absent.

mod description_extractor;
mod image_extractor;
mod meta_extractor;
mod shipping_extractor;
mod spec_extractor;

pub use description_extractor::*;
pub use image_extractor::*;
pub use meta_extractor::*;
pub use shipping_extractor::*;
pub use spec_extractor::*;

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Node};
use serde::{Deserialize, Serialize};

/// Selectors for the Rakuten item page regions.
///
/// These track the site's current markup and will need updating when it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailLayout {
    pub meta_table: String,
    pub description_container: String,
    pub spec_table: String,
    pub spec_key_cell: String,
    pub spec_value_cell: String,
    pub image_region: String,
}

impl Default for DetailLayout {
    fn default() -> Self {
        Self {
            meta_table: r#"table[style="margin-bottom:12px;"]"#.to_string(),
            description_container: ".item_desc".to_string(),
            spec_table: "table.container--3EIWt".to_string(),
            spec_key_cell: "td:first-child div.text-display--1Iony".to_string(),
            spec_value_cell: "td:nth-child(2) div.text-display--1Iony".to_string(),
            image_region: "span.sale_desc img".to_string(),
        }
    }
}

/// Text content of an element, trimmed.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text content with `<br>` and block starts turned into line breaks.
pub(crate) fn element_text_lines(element: &ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => match el.name() {
                "br" | "div" | "p" | "li" => out.push('\n'),
                _ => {}
            },
            _ => {}
        }
    }
    out
}

/// Collapse runs of whitespace into a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn br_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("br pattern is valid"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

/// Turn cell markup into plain text: line breaks become `\n`, every other
/// tag is dropped and the common entities are decoded.
pub fn markup_to_text(markup: &str) -> String {
    let with_breaks = br_re().replace_all(markup.trim(), "\n");
    let stripped = tag_re().replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_markup_to_text() {
        assert_eq!(
            markup_to_text(" <b>Cotton</b> 100%<br>Made in <span>Japan</span><BR/>Fit &amp; feel "),
            "Cotton 100%\nMade in Japan\nFit & feel"
        );
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  1\n   個 \t "), "1 個");
        assert_eq!(normalize_ws(""), "");
    }

    #[test]
    fn test_element_text_lines_breaks_on_br() {
        let html = Html::parse_fragment("<div id=c>東京都<br>港区 1-1<br/>TEL：03</div>");
        let sel = Selector::parse("#c").unwrap();
        let el = html.select(&sel).next().unwrap();
        let lines: Vec<String> = element_text_lines(&el)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(lines, vec!["東京都", "港区 1-1", "TEL：03"]);
    }
}
