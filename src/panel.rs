//! Control panel
//!
//! [`inject_panel`] waits for the target content to appear, then hands back a
//! [`Panel`] that owns the page source. Each panel action re-reads the page,
//! runs one extraction and reports an [`ActionStatus`] instead of failing.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clipboard::ClipboardChain;
use crate::config::AppConfig;
use crate::details::{combine_details, DetailFormat, DetailRecord};
use crate::document::{DocumentSource, PageDocument};
use crate::error::{ParserError, Result};
use crate::export::{to_csv, to_json_pretty};
use crate::extractors::{
    apply_selection, collect_images, extract_shipping_records, DetailLayout, ImageRef, Selection,
    ShippingRecord,
};
use crate::harvest::{HarvestOutcome, ImageHarvester};
use crate::page::{file_prefix, PageKind};

/// Lifecycle of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Polling { attempt: u32 },
    Ready,
    Closed,
}

/// Bounded polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_attempts: config.poll_max_attempts,
        }
    }
}

/// What has to be on the page before the panel appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetProbe {
    Always,
    /// At least one element must match.
    Selector(String),
}

impl TargetProbe {
    pub fn for_page(kind: Option<PageKind>, layout: &DetailLayout) -> Self {
        match kind {
            Some(PageKind::RakutenItem) => Self::Selector(format!(
                "{}, {}, {}, {}",
                layout.description_container, layout.image_region, layout.spec_table, layout.meta_table
            )),
            Some(PageKind::SeinoShipmentList) => Self::Selector("table tr".to_string()),
            None => Self::Always,
        }
    }

    pub fn matches(&self, doc: &PageDocument) -> bool {
        match self {
            Self::Always => true,
            Self::Selector(sel) => doc.has_match(sel),
        }
    }
}

/// Extraction settings carried by a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSettings {
    pub layout: DetailLayout,
    pub company_marker: String,
}

impl PanelSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            layout: DetailLayout::default(),
            company_marker: config.company_marker.clone(),
        }
    }
}

/// User-visible result of one panel action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Copied { count: usize, backend: String },
    Saved { count: usize, path: PathBuf },
    Downloaded { saved: usize, failed: usize },
    Shown { count: usize },
    NothingFound(&'static str),
    Failed(String),
}

impl ActionStatus {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Copied { .. } | Self::Saved { .. } | Self::Shown { .. }
        ) || matches!(self, Self::Downloaded { saved, .. } if *saved > 0)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copied { count, backend } => {
                write!(f, "Copied {count} records to clipboard (via {backend})")
            }
            Self::Saved { count, path } => {
                write!(f, "Downloaded {count} records to {}", path.display())
            }
            Self::Downloaded { saved, failed: 0 } => write!(f, "Downloaded {saved} images"),
            Self::Downloaded { saved, failed } => {
                write!(f, "Downloaded {saved} images, {failed} failed (see log)")
            }
            Self::Shown { count } => write!(f, "Found {count} records"),
            Self::NothingFound(msg) => f.write_str(msg),
            Self::Failed(msg) => write!(f, "Failed: {msg}"),
        }
    }
}

const NO_DETAILS: &str = "No details found to copy.";
const NO_DETAILS_SHOWN: &str = "No details found";
const NO_SHIPPING: &str = "No shipping data found";
const NO_IMAGES: &str = "No images to download";

/// Poll `source` until `probe` matches, then return a ready panel.
///
/// Fetch errors while polling count as a miss. After `poll.max_attempts`
/// misses no panel is created and [`ParserError::TargetNotFound`] is returned.
pub async fn inject_panel<S: DocumentSource>(
    source: S,
    probe: &TargetProbe,
    poll: &PollConfig,
    settings: PanelSettings,
) -> Result<Panel<S>> {
    let max_attempts = poll.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let state = PanelState::Polling { attempt };
        tracing::debug!(source = %source.describe(), ?state, "checking for target content");

        let found = match source.fetch().await {
            Ok(snapshot) => probe.matches(&PageDocument::from_snapshot(&snapshot)),
            Err(e) => {
                tracing::debug!(attempt, error = %e, "page read failed while polling");
                false
            }
        };

        if found {
            tracing::info!(source = %source.describe(), attempt, "target content present, panel ready");
            return Ok(Panel {
                source,
                settings,
                attempts: attempt,
            });
        }

        if attempt < max_attempts {
            tokio::time::sleep(poll.interval).await;
        }
    }

    tracing::warn!(
        source = %source.describe(),
        attempts = max_attempts,
        "target content never appeared, panel not injected"
    );
    Err(ParserError::TargetNotFound {
        attempts: max_attempts,
    })
}

/// A ready control panel. Owns its page source until [`Panel::close`].
pub struct Panel<S> {
    source: S,
    settings: PanelSettings,
    attempts: u32,
}

impl<S: DocumentSource> Panel<S> {
    pub fn state(&self) -> PanelState {
        PanelState::Ready
    }

    /// Polling attempts it took to find the target content.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    /// Tear the panel down and give the source back.
    pub fn close(self) -> S {
        tracing::debug!(source = %self.source.describe(), state = ?PanelState::Closed, "panel closed");
        self.source
    }

    async fn read(&self) -> Result<PageDocument> {
        let snapshot = self.source.fetch().await?;
        Ok(PageDocument::from_snapshot(&snapshot))
    }

    /// Current item details of the page.
    pub async fn extract_details(&self) -> Result<DetailRecord> {
        let doc = self.read().await?;
        Ok(combine_details(&doc, &self.settings.layout))
    }

    /// Current shipping records of the page.
    pub async fn shipping_records(&self) -> Result<Vec<ShippingRecord>> {
        let doc = self.read().await?;
        Ok(extract_shipping_records(&doc, &self.settings.company_marker))
    }

    /// Print the item details in `format`.
    pub async fn show_details(&self, out: &mut impl Write, format: DetailFormat) -> ActionStatus {
        let record = match self.extract_details().await {
            Ok(record) => record,
            Err(e) => return failed("reading page", e),
        };
        if record.is_empty() {
            return ActionStatus::NothingFound(NO_DETAILS_SHOWN);
        }
        let text = match record.render(format) {
            Ok(text) => text,
            Err(e) => return failed("rendering details", e),
        };
        if let Err(e) = writeln!(out, "{text}") {
            return ActionStatus::Failed(format!("writing details: {e}"));
        }
        ActionStatus::Shown {
            count: record.len(),
        }
    }

    pub async fn copy_details(&self, clipboard: &ClipboardChain, format: DetailFormat) -> ActionStatus {
        let record = match self.extract_details().await {
            Ok(record) => record,
            Err(e) => return failed("reading page", e),
        };
        if record.is_empty() {
            return ActionStatus::NothingFound(NO_DETAILS);
        }
        let text = match record.render(format) {
            Ok(text) => text,
            Err(e) => return failed("rendering details", e),
        };
        copy(clipboard, &text, record.len())
    }

    pub async fn copy_shipping(&self, clipboard: &ClipboardChain) -> ActionStatus {
        let records = match self.shipping_records().await {
            Ok(records) => records,
            Err(e) => return failed("reading page", e),
        };
        if records.is_empty() {
            return ActionStatus::NothingFound(NO_SHIPPING);
        }
        let text = match to_json_pretty(&records) {
            Ok(text) => text,
            Err(e) => return failed("rendering records", e),
        };
        copy(clipboard, &text, records.len())
    }

    /// Write the shipping records as CSV. No file is created when there are none.
    pub async fn download_csv(&self, path: &Path) -> ActionStatus {
        let records = match self.shipping_records().await {
            Ok(records) => records,
            Err(e) => return failed("reading page", e),
        };
        let csv = match to_csv(&records) {
            Ok(Some(csv)) => csv,
            Ok(None) => return ActionStatus::NothingFound(NO_SHIPPING),
            Err(e) => return failed("rendering CSV", e),
        };
        if let Err(e) = tokio::fs::write(path, csv).await {
            return failed("writing CSV", ParserError::io(path, e));
        }
        tracing::info!(records = records.len(), path = %path.display(), "CSV written");
        ActionStatus::Saved {
            count: records.len(),
            path: path.to_path_buf(),
        }
    }

    /// Print the shipping records as a tab-separated table.
    pub async fn show_shipping(&self, out: &mut impl Write) -> ActionStatus {
        let records = match self.shipping_records().await {
            Ok(records) => records,
            Err(e) => return failed("reading page", e),
        };
        if records.is_empty() {
            return ActionStatus::NothingFound(NO_SHIPPING);
        }
        if let Err(e) = write_shipping_table(out, &records) {
            return ActionStatus::Failed(format!("writing table: {e}"));
        }
        ActionStatus::Shown {
            count: records.len(),
        }
    }

    /// Current images of the page with `selection` applied, and the filename
    /// prefix derived from the page URL.
    pub async fn images(&self, selection: Option<&Selection>) -> Result<(Vec<ImageRef>, String)> {
        let doc = self.read().await?;
        let mut images = collect_images(&doc, &self.settings.layout.image_region);
        if let Some(selection) = selection {
            apply_selection(&mut images, selection);
        }
        Ok((images, file_prefix(doc.url())))
    }

    /// Download the page's images, optionally restricted to `selection`.
    /// `prefix` overrides the one derived from the page URL.
    pub async fn download_images(
        &self,
        harvester: &ImageHarvester,
        selection: Option<&Selection>,
        prefix: Option<&str>,
    ) -> ActionStatus {
        let (images, page_prefix) = match self.images(selection).await {
            Ok(found) => found,
            Err(e) => return failed("reading page", e),
        };
        let prefix = prefix.unwrap_or(&page_prefix);

        match harvester.harvest(&images, prefix).await {
            Ok(HarvestOutcome::NothingToDo) => ActionStatus::NothingFound(NO_IMAGES),
            Ok(HarvestOutcome::Finished(report)) => ActionStatus::Downloaded {
                saved: report.saved.len(),
                failed: report.failed.len(),
            },
            Err(e) => failed("downloading images", e),
        }
    }
}

fn copy(clipboard: &ClipboardChain, text: &str, count: usize) -> ActionStatus {
    match clipboard.copy(text) {
        Ok(backend) => ActionStatus::Copied { count, backend },
        Err(e) => failed("copying to clipboard", e),
    }
}

fn failed(context: &str, e: ParserError) -> ActionStatus {
    tracing::warn!(error = %e, "{context} failed");
    ActionStatus::Failed(format!("{context}: {e}"))
}

fn write_shipping_table(out: &mut impl Write, records: &[ShippingRecord]) -> std::io::Result<()> {
    writeln!(
        out,
        "row\tdate\ttracking\tid\tname\ttelephone\tquantity\taddress"
    )?;
    for r in records {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.row_index,
            r.shipment_date.as_deref().unwrap_or("-"),
            r.tracking_number.as_deref().unwrap_or("-"),
            r.id.as_deref().unwrap_or("-"),
            r.name,
            r.telephone,
            r.quantity,
            r.address
        )?;
        if !r.flags.is_clean() {
            tracing::warn!(row_index = r.row_index, flags = ?r.flags, "destination split needs review");
        }
    }
    Ok(())
}
