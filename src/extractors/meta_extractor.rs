//! Meta-contents extraction
//!
//! Microdata `<meta itemprop>` tags inside the item page's summary table.

use crate::document::{selector, PageDocument};

use super::DetailLayout;

/// Collect `(itemprop, content)` pairs from the meta table, in document order.
pub fn extract_meta_contents(doc: &PageDocument, layout: &DetailLayout) -> Vec<(String, String)> {
    let (Some(table_sel), Some(meta_sel)) = (selector(&layout.meta_table), selector("meta[itemprop]"))
    else {
        return vec![];
    };

    let Some(table) = doc.html().select(&table_sel).next() else {
        return vec![];
    };

    table
        .select(&meta_sel)
        .filter_map(|meta| {
            let prop = meta.value().attr("itemprop")?;
            let content = meta.value().attr("content").unwrap_or("");
            Some((prop.to_string(), content.trim().to_string()))
        })
        .collect()
}
