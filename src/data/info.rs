//! Metadata tables for display.

use std::fmt::Write as _;

use super::model::{Metadata, MetadataValue};

pub const TABLE_HEADERS: [&str; 2] = ["Key", "Value"];

/// Rows shown for a metadata dump.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoSections<'a> {
    /// Everything except timestamps and the tile list.
    pub main: Vec<(&'a str, &'a MetadataValue)>,
    /// Timestamp or tile rows, when requested.
    pub extra: Option<Vec<(&'a str, &'a MetadataValue)>>,
}

/// Split metadata into the main table and at most one supplementary table.
///
/// Timestamps win over tiles when both are requested.
pub fn info_sections(
    info: &Metadata,
    suppress_timestamps: bool,
    suppress_tiles: bool,
) -> InfoSections<'_> {
    let main = info
        .iter()
        .filter(|(k, _)| !k.starts_with("timestamp") && *k != "tile")
        .collect();

    let extra = if !suppress_timestamps {
        Some(info.with_prefix("timestamp").collect())
    } else if !suppress_tiles {
        Some(info.with_prefix("tile").collect())
    } else {
        None
    };

    InfoSections { main, extra }
}

/// Left-aligned two-column text table with a dashed rule under the headers.
pub fn format_table(rows: &[(&str, &MetadataValue)], headers: [&str; 2]) -> String {
    let cells: Vec<(String, String)> = rows
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string().replace('\n', " ")))
        .collect();

    let key_w = cells
        .iter()
        .map(|(k, _)| k.chars().count())
        .chain(std::iter::once(headers[0].chars().count()))
        .max()
        .unwrap_or(0);
    let val_w = cells
        .iter()
        .map(|(_, v)| v.chars().count())
        .chain(std::iter::once(headers[1].chars().count()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "{:<key_w$}  {}", headers[0], headers[1]);
    let _ = writeln!(out, "{}  {}", "-".repeat(key_w), "-".repeat(val_w));
    for (k, v) in &cells {
        let _ = writeln!(out, "{k:<key_w$}  {v}");
    }
    out
}
