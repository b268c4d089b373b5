//! Shipment list extraction
//!
//! Reads the Seino KM2 shipment list. Each shipment is one table row with at
//! least six cells: cell 2 carries the date, tracking number and order id,
//! cell 3 the free-form destination block, cell 4 the quantity.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::document::{selector, PageDocument};

use super::{element_text_lines, normalize_ws};

const MIN_CELLS: usize = 6;
const TEL_LABELS: [&str; 2] = ["TEL：", "TEL:"];

/// One shipment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRecord {
    pub shipment_date: Option<String>,
    pub tracking_number: Option<String>,
    pub id: Option<String>,
    pub address: String,
    pub name: String,
    pub telephone: String,
    pub quantity: String,
    pub row_index: usize,
    #[serde(skip)]
    pub flags: DestinationFlags,
}

/// How the destination block was split. Set flags mark guesses worth a look.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationFlags {
    pub line_count: usize,
    /// Fewer than three non-blank lines; the address/name/telephone layout
    /// could not be confirmed.
    pub few_lines: bool,
    pub missing_name: bool,
    pub missing_telephone: bool,
    /// The second line was taken as an address continuation.
    pub second_line_merged: bool,
}

impl DestinationFlags {
    pub fn is_clean(&self) -> bool {
        !self.few_lines && !self.missing_name && !self.missing_telephone
    }
}

/// Result of splitting a destination cell. Always carries whatever could be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub address: String,
    pub name: String,
    pub telephone: String,
    pub flags: DestinationFlags,
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]{4}/[0-9]{2}/[0-9]{2}").expect("date pattern is valid"))
}

fn tracking_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]{10}").expect("tracking pattern is valid"))
}

fn order_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9]{8}-[0-9]{10}|JP[0-9]{4}").expect("order id pattern is valid")
    })
}

fn first_match(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().to_string())
}

fn is_telephone_line(line: &str) -> bool {
    TEL_LABELS.iter().any(|label| line.starts_with(label))
}

fn is_name_line(line: &str, company_marker: &str) -> bool {
    !company_marker.is_empty() && line.contains(company_marker)
}

/// Split a destination block into address, name and telephone.
pub fn parse_destination(text: &str, company_marker: &str) -> Destination {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut dest = Destination::default();
    dest.flags.line_count = lines.len();
    dest.flags.few_lines = lines.len() < 3;

    if let Some(first) = lines.first() {
        dest.address = (*first).to_string();
    }

    if let Some(second) = lines.get(1) {
        if !is_name_line(second, company_marker) && !is_telephone_line(second) {
            dest.address.push(' ');
            dest.address.push_str(second);
            dest.flags.second_line_merged = true;
        }
    }

    match lines.iter().find(|line| is_name_line(line, company_marker)) {
        Some(line) => dest.name = line.replacen(company_marker, "", 1).trim().to_string(),
        None => dest.flags.missing_name = true,
    }

    let telephone = lines.iter().find_map(|line| {
        TEL_LABELS
            .iter()
            .find_map(|label| line.strip_prefix(label))
            .map(|rest| rest.trim().to_string())
    });
    match telephone {
        Some(tel) => dest.telephone = tel,
        None => dest.flags.missing_telephone = true,
    }

    dest
}

/// Scan every table row of the page and return one record per shipment.
///
/// Rows repeating an already seen tracking number are dropped.
pub fn extract_shipping_records(doc: &PageDocument, company_marker: &str) -> Vec<ShippingRecord> {
    let (Some(row_sel), Some(cell_sel)) = (selector("table tr"), selector("td")) else {
        return vec![];
    };

    let mut records = Vec::new();
    let mut seen_tracking: HashSet<String> = HashSet::new();

    for (row_index, row) in doc.html().select(&row_sel).enumerate() {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < MIN_CELLS {
            continue;
        }

        let shipping_text = element_text_lines(&cells[1]);
        let shipment_date = first_match(date_re(), &shipping_text);
        let tracking_number = first_match(tracking_re(), &shipping_text);
        let id = first_match(order_id_re(), &shipping_text);

        if let Some(tracking) = &tracking_number {
            if !seen_tracking.insert(tracking.clone()) {
                tracing::debug!(row_index, tracking = %tracking, "duplicate tracking number skipped");
                continue;
            }
        }

        if shipment_date.is_none() && tracking_number.is_none() && id.is_none() {
            continue;
        }

        let destination = parse_destination(&element_text_lines(&cells[2]), company_marker);
        let quantity = normalize_ws(&cells[3].text().collect::<String>());

        records.push(ShippingRecord {
            shipment_date,
            tracking_number,
            id,
            address: destination.address,
            name: destination.name,
            telephone: destination.telephone,
            quantity,
            row_index,
            flags: destination.flags,
        });
    }

    tracing::debug!(records = records.len(), "shipping rows extracted");
    records
}
