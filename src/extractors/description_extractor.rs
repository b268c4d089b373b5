//! Description-table extraction
//!
//! Item pages describe the product in free-form tables inside `.item_desc`
//! containers. A row holding only a `th` is a section heading; rows that
//! follow without their own `th` are filed under it.

use scraper::ElementRef;

use crate::document::{selector, PageDocument};

use super::{element_text, markup_to_text, DetailLayout};

/// Walk every description table and return `(key, value)` rows in document order.
pub fn extract_item_details(doc: &PageDocument, layout: &DetailLayout) -> Vec<(String, String)> {
    let (Some(container_sel), Some(table_sel), Some(row_sel), Some(img_sel)) = (
        selector(&layout.description_container),
        selector("table"),
        selector("tr"),
        selector("img"),
    ) else {
        return vec![];
    };

    let mut details = Vec::new();

    for container in doc.html().select(&container_sel) {
        // Headings carry across the tables of one container.
        let mut current_heading = String::new();

        for table in container.select(&table_sel) {
            let rows = table
                .select(&row_sel)
                .filter(|row| owning_table(row) == Some(table));

            for row in rows {
                let (th, td) = row_cells(&row);

                match (th, td) {
                    (Some(th), None) => {
                        current_heading = element_text(&th);
                    }
                    (th, Some(td)) => {
                        let key = match th {
                            Some(th) => element_text(&th),
                            None => current_heading.clone(),
                        };

                        let images: Vec<String> = td
                            .select(&img_sel)
                            .filter_map(|img| img.value().attr("src"))
                            .filter(|src| !src.trim().is_empty())
                            .map(|src| doc.resolve(src))
                            .collect();

                        let value = if images.is_empty() {
                            markup_to_text(&td.inner_html())
                        } else {
                            images.join(", ")
                        };

                        if !key.is_empty() && !value.is_empty() {
                            details.push((key, value));
                        }
                    }
                    (None, None) => {}
                }
            }
        }
    }

    tracing::debug!(rows = details.len(), "item details extracted");
    details
}

/// First `th` and first `td` that are direct cells of the row.
fn row_cells<'a>(row: &ElementRef<'a>) -> (Option<ElementRef<'a>>, Option<ElementRef<'a>>) {
    let mut th = None;
    let mut td = None;
    for cell in row.children().filter_map(ElementRef::wrap) {
        match cell.value().name() {
            "th" if th.is_none() => th = Some(cell),
            "td" if td.is_none() => td = Some(cell),
            _ => {}
        }
    }
    (th, td)
}

fn owning_table<'a>(row: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn details(html: &str) -> Vec<(String, String)> {
        let doc = PageDocument::parse(html, None);
        extract_item_details(&doc, &DetailLayout::default())
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_heading_carry_forward() {
        let html = r#"
        <div class="item_desc"><table>
            <tr><th>Material</th><td>Cotton</td></tr>
            <tr><th>Care</th></tr>
            <tr><td>Hand wash</td></tr>
        </table></div>
        "#;
        assert_eq!(
            details(html),
            vec![pair("Material", "Cotton"), pair("Care", "Hand wash")]
        );
    }

    #[test]
    fn test_heading_applies_to_every_following_row() {
        let html = r#"
        <div class="item_desc"><table>
            <tr><th>Notes</th></tr>
            <tr><td>one</td></tr>
            <tr><td>two</td></tr>
            <tr><td>three</td></tr>
        </table></div>
        "#;
        let rows = details(html);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(k, _)| k == "Notes"));
    }

    #[test]
    fn test_heading_carries_across_tables_in_one_container() {
        let html = r#"
        <div class="item_desc">
            <table><tr><th>Size</th></tr></table>
            <table><tr><td>M</td></tr></table>
        </div>
        <div class="item_desc">
            <table><tr><td>orphan</td></tr></table>
        </div>
        "#;
        assert_eq!(details(html), vec![pair("Size", "M")]);
    }

    #[test]
    fn test_image_cell_joins_sources() {
        let html = r#"
        <div class="item_desc"><table>
            <tr><th>Photos</th><td><img src="/a.jpg"><img src="https://cdn.example.com/b.png"></td></tr>
        </table></div>
        "#;
        let url = Url::parse("https://item.rakuten.co.jp/shop/item/").unwrap();
        let doc = PageDocument::parse(html, Some(url));
        assert_eq!(
            extract_item_details(&doc, &DetailLayout::default()),
            vec![pair(
                "Photos",
                "https://item.rakuten.co.jp/a.jpg, https://cdn.example.com/b.png"
            )]
        );
    }

    #[test]
    fn test_markup_is_flattened() {
        let html = r#"
        <div class="item_desc"><table>
            <tr><th>Spec</th><td><b>W</b> 30cm<br>H 20cm</td></tr>
        </table></div>
        "#;
        assert_eq!(details(html), vec![pair("Spec", "W 30cm\nH 20cm")]);
    }

    #[test]
    fn test_row_without_key_is_dropped() {
        let html = r#"
        <div class="item_desc"><table>
            <tr><td>no heading yet</td></tr>
            <tr><th>Empty</th><td>   </td></tr>
        </table></div>
        "#;
        assert!(details(html).is_empty());
    }

    #[test]
    fn test_nested_table_rows_counted_once() {
        let html = r#"
        <div class="item_desc"><table>
            <tr><th>Outer</th><td>
                <table><tr><th>Inner</th><td>x</td></tr></table>
            </td></tr>
            <tr><th>After</th><td>y</td></tr>
        </table></div>
        "#;
        let rows = details(html);
        assert_eq!(rows.iter().filter(|(k, _)| k == "Inner").count(), 1);
        assert_eq!(rows.iter().filter(|(k, _)| k == "Outer").count(), 1);
        // A nested table is walked after every row of the table holding it.
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Outer", "After", "Inner"]);
    }

    #[test]
    fn test_missing_container_is_empty() {
        assert!(details("<table><tr><th>a</th><td>b</td></tr></table>").is_empty());
    }
}
