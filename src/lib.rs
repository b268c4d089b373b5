//! Item and shipment page parser for two e-commerce back offices:
//! - Rakuten item pages: product images, meta contents, description tables
//!   and the product spec table
//! - Seino shipment lists: shipment dates, tracking numbers, IDs and
//!   destinations, exported as CSV or JSON
//!
//! Pages are read through a [`DocumentSource`] and handled through a
//! [`Panel`] that exposes the same actions a page overlay would.

pub mod clipboard;
pub mod config;
pub mod details;
pub mod document;
pub mod error;
pub mod export;
pub mod extractors;
pub mod harvest;
pub mod page;
pub mod panel;

pub use clipboard::{ClipboardBackend, ClipboardChain, CommandClipboard, FileClipboard};
pub use config::{load_config, AppConfig};
pub use details::{combine_details, DetailFormat, DetailRecord};
pub use document::{decode_page, DocumentSource, FileSource, HttpSource, PageDocument, PageSnapshot};
pub use error::{ParserError, Result};
pub use export::{default_csv_filename, parse_csv, to_csv, to_json_pretty};
pub use extractors::*;
pub use harvest::{DownloadMode, HarvestOutcome, HarvestReport, ImageFailure, ImageHarvester};
pub use page::{file_prefix, PageKind};
pub use panel::{
    inject_panel, ActionStatus, Panel, PanelSettings, PanelState, PollConfig, TargetProbe,
};
