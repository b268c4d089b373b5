//! Product image discovery and target filenames

use std::collections::BTreeSet;

use serde::Serialize;

use crate::document::{selector, PageDocument};
use crate::error::{ParserError, Result};

const DEFAULT_EXTENSION: &str = "jpg";

/// One image found in the image region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub source_url: String,
    /// 0-based position among all matched images.
    pub ordinal_index: usize,
    pub selected: bool,
}

/// All images matching the region selector, in document order, all selected.
pub fn collect_images(doc: &PageDocument, region: &str) -> Vec<ImageRef> {
    let Some(sel) = selector(region) else {
        return vec![];
    };

    doc.html()
        .select(&sel)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .enumerate()
        .map(|(ordinal_index, src)| ImageRef {
            source_url: doc.resolve(src),
            ordinal_index,
            selected: true,
        })
        .collect()
}

/// Extension after the last `.` of the URL path, ignoring query and fragment.
pub fn image_extension(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    match last_segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// `{prefix}-{ordinal}.{extension}` with a 1-based ordinal.
pub fn image_filename(prefix: &str, image: &ImageRef) -> String {
    format!(
        "{}-{}.{}",
        prefix,
        image.ordinal_index + 1,
        image_extension(&image.source_url)
    )
}

/// A user choice of images by 1-based ordinal, e.g. `1,3-5`.
///
/// Kept as inclusive ranges, so a large range costs no more than a small one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ranges: BTreeSet<(usize, usize)>,
}

impl Selection {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| ParserError::InvalidSelection {
            input: input.to_string(),
            reason,
        };
        let number = |part: &str| -> Result<usize> {
            let n: usize = part
                .trim()
                .parse()
                .map_err(|e| invalid(format!("\"{}\": {e}", part.trim())))?;
            if n == 0 {
                return Err(invalid("ordinals start at 1".to_string()));
            }
            Ok(n)
        };

        let mut ranges = BTreeSet::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some((a, b)) = part.split_once('-') {
                let (a, b) = (number(a)?, number(b)?);
                if a > b {
                    return Err(invalid(format!("range {part} is reversed")));
                }
                ranges.insert((a, b));
            } else {
                let n = number(part)?;
                ranges.insert((n, n));
            }
        }
        Ok(Self { ranges })
    }

    pub fn contains(&self, ordinal: usize) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| (start..=end).contains(&ordinal))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Mark only the chosen images as selected; ordinals keep their positions.
pub fn apply_selection(images: &mut [ImageRef], selection: &Selection) {
    for image in images.iter_mut() {
        image.selected = selection.contains(image.ordinal_index + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_collect_images_in_region() {
        let html = r#"
        <img src="/logo.png">
        <span class="sale_desc">
            <img src="/p/1.jpg">
            <img src="">
            <img src="https://cdn.example.com/2.png?w=300">
        </span>
        "#;
        let url = Url::parse("https://item.rakuten.co.jp/shop/item-9/").unwrap();
        let doc = PageDocument::parse(html, Some(url));
        let images = collect_images(&doc, "span.sale_desc img");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].source_url, "https://item.rakuten.co.jp/p/1.jpg");
        assert_eq!(images[0].ordinal_index, 0);
        assert_eq!(images[1].ordinal_index, 1);
        assert!(images.iter().all(|i| i.selected));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("https://a.example/x/photo.jpeg"), "jpeg");
        assert_eq!(image_extension("https://a.example/x/photo.png?ver=1.2"), "png");
        assert_eq!(image_extension("https://a.example/x/photo.gif#top"), "gif");
        assert_eq!(image_extension("https://a.example/x/photo"), "jpg");
        assert_eq!(image_extension("https://a.example/x.dir/photo"), "jpg");
    }

    #[test]
    fn test_image_filename_is_one_based() {
        let image = ImageRef {
            source_url: "https://a.example/x.webp?x=1".to_string(),
            ordinal_index: 0,
            selected: true,
        };
        assert_eq!(image_filename("item-9", &image), "item-9-1.webp");
    }

    #[test]
    fn test_selection_parse() {
        let sel = Selection::parse("1, 3-5,,5").unwrap();
        assert!(sel.contains(1));
        assert!(!sel.contains(2));
        assert!(sel.contains(4));
        assert!(sel.contains(5));
        assert!(Selection::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_selection_rejects_bad_input() {
        assert!(Selection::parse("0").is_err());
        assert!(Selection::parse("5-2").is_err());
        assert!(Selection::parse("a").is_err());
    }

    #[test]
    fn test_selection_huge_range_is_not_expanded() {
        let started = std::time::Instant::now();
        let sel = Selection::parse("2-100000000000").unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert!(!sel.contains(1));
        assert!(sel.contains(2));
        assert!(sel.contains(99_999_999_999));
        assert!(!sel.contains(100_000_000_001));
    }

    #[test]
    fn test_apply_selection_keeps_ordinals() {
        let mut images: Vec<ImageRef> = (0..4)
            .map(|i| ImageRef {
                source_url: format!("https://a.example/{i}.jpg"),
                ordinal_index: i,
                selected: true,
            })
            .collect();
        apply_selection(&mut images, &Selection::parse("2,4").unwrap());
        let chosen: Vec<usize> = images
            .iter()
            .filter(|i| i.selected)
            .map(|i| i.ordinal_index + 1)
            .collect();
        assert_eq!(chosen, vec![2, 4]);
    }
}
