//! Target page detection and filename prefixes.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// The page layouts this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// `https://item.rakuten.co.jp/<shop>/<item>/`
    RakutenItem,
    /// `https://net-n.seino.co.jp/km2/shukkaList.do`
    SeinoShipmentList,
}

fn rakuten_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://item\.rakuten\.co\.jp/[\w-]+/[\w-]+/?(\?.*)?$")
            .expect("rakuten item pattern is valid")
    })
}

fn seino_list_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://net-n\.seino\.co\.jp/km2/shukkaList\.do")
            .expect("seino list pattern is valid")
    })
}

impl PageKind {
    pub fn detect(url: &Url) -> Option<Self> {
        let href = url.as_str();
        if rakuten_item_re().is_match(href) {
            Some(Self::RakutenItem)
        } else if seino_list_re().is_match(href) {
            Some(Self::SeinoShipmentList)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RakutenItem => "rakuten-item",
            Self::SeinoShipmentList => "seino-shipment-list",
        }
    }
}

/// Filename stem for a page: the last non-empty path segment, which on item
/// pages is the item code. Falls back to `image` when the path is empty.
pub fn file_prefix(url: Option<&Url>) -> String {
    url.and_then(|u| {
        u.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(String::from)
    })
    .unwrap_or_else(|| "image".to_string())
}
