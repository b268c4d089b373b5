//! Merged item details and their clipboard renderings.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::PageDocument;
use crate::error::Result;
use crate::extractors::{
    extract_item_details, extract_meta_contents, extract_product_specs, DetailLayout,
};

/// Clipboard rendering of a [`DetailRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailFormat {
    /// Pretty-printed JSON object with the three sections.
    #[default]
    Json,
    /// `=== Section ===` headers followed by `key: value` lines.
    Lines,
}

/// Item details grouped into the three page sections. Keys keep page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetailRecord {
    pub meta_contents: Map<String, Value>,
    /// Every value is an array; repeated keys accumulate.
    pub item_details: Map<String, Value>,
    pub product_specs: Map<String, Value>,
}

impl DetailRecord {
    /// Merge the raw rule outputs.
    pub fn from_parts(
        meta_contents: Vec<(String, String)>,
        item_details: Vec<(String, String)>,
        product_specs: Vec<(String, String)>,
    ) -> Self {
        let mut record = Self::default();

        for (key, value) in meta_contents {
            record.meta_contents.insert(key, Value::String(value));
        }

        for (key, value) in item_details {
            match record.item_details.get_mut(&key) {
                Some(Value::Array(values)) => values.push(Value::String(value)),
                _ => {
                    record
                        .item_details
                        .insert(key, Value::Array(vec![Value::String(value)]));
                }
            }
        }

        for (key, value) in product_specs {
            record.product_specs.insert(key, Value::String(value));
        }

        record
    }

    pub fn is_empty(&self) -> bool {
        self.meta_contents.is_empty() && self.item_details.is_empty() && self.product_specs.is_empty()
    }

    /// Number of keys across all sections.
    pub fn len(&self) -> usize {
        self.meta_contents.len() + self.item_details.len() + self.product_specs.len()
    }

    /// JSON with four-space indentation.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// One `key: value` line per entry under a header per non-empty section.
    pub fn to_lines(&self) -> String {
        let sections = [
            ("Meta Contents", &self.meta_contents),
            ("Item Details", &self.item_details),
            ("Product Specs", &self.product_specs),
        ];

        let mut lines = Vec::new();
        for (title, section) in sections {
            if section.is_empty() {
                continue;
            }
            lines.push(format!("=== {title} ==="));
            for (key, value) in section {
                match value {
                    Value::Array(values) => {
                        for v in values {
                            lines.push(format!("{key}: {}", value_text(v)));
                        }
                    }
                    other => lines.push(format!("{key}: {}", value_text(other))),
                }
            }
        }
        lines.join("\n")
    }

    pub fn render(&self, format: DetailFormat) -> Result<String> {
        match format {
            DetailFormat::Json => self.to_json(),
            DetailFormat::Lines => Ok(self.to_lines()),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Run the three detail rules in order and merge their output.
pub fn combine_details(doc: &PageDocument, layout: &DetailLayout) -> DetailRecord {
    let meta = extract_meta_contents(doc, layout);
    let items = extract_item_details(doc, layout);
    let specs = extract_product_specs(doc, layout);
    tracing::debug!(
        meta = meta.len(),
        items = items.len(),
        specs = specs.len(),
        "detail rules finished"
    );
    DetailRecord::from_parts(meta, items, specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_item_details_accumulate_in_order() {
        let record = DetailRecord::from_parts(
            vec![],
            pairs(&[("Care", "Hand wash"), ("Material", "Cotton"), ("Care", "Dry flat")]),
            vec![],
        );
        assert_eq!(
            serde_json::to_value(&record.item_details).unwrap(),
            serde_json::json!({"Care": ["Hand wash", "Dry flat"], "Material": ["Cotton"]})
        );
        let keys: Vec<&String> = record.item_details.keys().collect();
        assert_eq!(keys, vec!["Care", "Material"]);
    }

    #[test]
    fn test_meta_and_specs_last_write_wins() {
        let record = DetailRecord::from_parts(
            pairs(&[("price", "100"), ("name", "Shirt"), ("price", "120")]),
            vec![],
            pairs(&[("Color", "Red"), ("Color", "Blue")]),
        );
        assert_eq!(record.meta_contents["price"], "120");
        assert_eq!(record.meta_contents.keys().next().unwrap(), "price");
        assert_eq!(record.product_specs["Color"], "Blue");
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_to_json_sections() {
        let record = DetailRecord::from_parts(pairs(&[("sku", "A1")]), vec![], vec![]);
        let json = record.to_json().unwrap();
        assert!(json.starts_with("{\n    \"MetaContents\": {\n        \"sku\": \"A1\""));
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["ItemDetails"], serde_json::json!({}));
        assert_eq!(parsed["ProductSpecs"], serde_json::json!({}));
    }

    #[test]
    fn test_to_lines() {
        let record = DetailRecord::from_parts(
            pairs(&[("sku", "A1")]),
            pairs(&[("Care", "Hand wash"), ("Care", "Dry flat")]),
            vec![],
        );
        assert_eq!(
            record.to_lines(),
            "=== Meta Contents ===\nsku: A1\n=== Item Details ===\nCare: Hand wash\nCare: Dry flat"
        );
    }

    #[test]
    fn test_combine_details_end_to_end() {
        let html = r#"
        <table style="margin-bottom:12px;"><tr><td>
            <meta itemprop="sku" content="A1">
        </td></tr></table>
        <div class="item_desc"><table>
            <tr><th>Material</th><td>Cotton</td></tr>
            <tr><th>Care</th></tr>
            <tr><td>Hand wash</td></tr>
        </table></div>
        "#;
        let doc = PageDocument::parse(html, None);
        let record = combine_details(&doc, &DetailLayout::default());
        assert_eq!(record.meta_contents["sku"], "A1");
        assert_eq!(
            serde_json::to_value(&record.item_details).unwrap(),
            serde_json::json!({"Material": ["Cotton"], "Care": ["Hand wash"]})
        );
        assert!(record.product_specs.is_empty());
    }

    #[test]
    fn test_empty_page_is_empty_record() {
        let doc = PageDocument::parse("<p>nothing</p>", None);
        assert!(combine_details(&doc, &DetailLayout::default()).is_empty());
    }
}
