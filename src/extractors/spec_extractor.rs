//! Product-spec table extraction

use crate::document::{selector, PageDocument};

use super::{element_text, DetailLayout};

/// Read `(key, value)` pairs from the two-column spec table.
pub fn extract_product_specs(doc: &PageDocument, layout: &DetailLayout) -> Vec<(String, String)> {
    let (Some(table_sel), Some(row_sel), Some(key_sel), Some(value_sel)) = (
        selector(&layout.spec_table),
        selector("tbody tr"),
        selector(&layout.spec_key_cell),
        selector(&layout.spec_value_cell),
    ) else {
        return vec![];
    };

    let Some(table) = doc.html().select(&table_sel).next() else {
        return vec![];
    };

    table
        .select(&row_sel)
        .filter_map(|row| {
            let key = row.select(&key_sel).next()?;
            let value = row.select(&value_sel).next()?;
            Some((element_text(&key), element_text(&value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_product_specs() {
        let html = r#"
        <table class="container--3EIWt"><tbody>
            <tr>
                <td><div class="text-display--1Iony"> Brand </div></td>
                <td><div class="text-display--1Iony">J Unit</div></td>
            </tr>
            <tr>
                <td><div class="text-display--1Iony">Weight</div></td>
                <td><span>no value div</span></td>
            </tr>
            <tr>
                <td><div class="text-display--1Iony">Color</div></td>
                <td><div class="text-display--1Iony">
                    Navy
                </div></td>
            </tr>
        </tbody></table>
        "#;
        let doc = PageDocument::parse(html, None);
        assert_eq!(
            extract_product_specs(&doc, &DetailLayout::default()),
            vec![
                ("Brand".to_string(), "J Unit".to_string()),
                ("Color".to_string(), "Navy".to_string()),
            ]
        );
    }

    #[test]
    fn test_other_tables_ignored() {
        let html = r#"
        <table class="other"><tbody><tr>
            <td><div class="text-display--1Iony">a</div></td>
            <td><div class="text-display--1Iony">b</div></td>
        </tr></tbody></table>
        "#;
        let doc = PageDocument::parse(html, None);
        assert!(extract_product_specs(&doc, &DetailLayout::default()).is_empty());
    }
}
