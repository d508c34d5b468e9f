//! Plain-text rendering of the fact card and error listings.
//!
//! This is the terminal side of the presentation boundary; everything here
//! formats already-normalized data and performs no I/O.

use crate::client::ApiError;
use crate::humanize::ByteSize;
use crate::normalize::{ConfidenceBand, NormalizedAsset};
use crate::upload::ImageBlob;

/// One line describing the pending selection, e.g.
/// `photo.jpg (1.2MB, image/jpeg)`
pub fn render_selection(blob: &ImageBlob) -> String {
    format!(
        "{} ({}, {})",
        blob.file_name,
        ByteSize(blob.len() as u64),
        blob.mime
    )
}

/// Render the normalized asset as a fact card
pub fn render_fact_card(asset: &NormalizedAsset) -> String {
    let mut out = String::new();

    out.push_str(&asset.title);
    out.push('\n');

    match (asset.confidence_band, asset.confidence_percent) {
        (ConfidenceBand::Unknown, _) | (_, None) => {
            out.push_str("Confidence: Unknown\n");
        }
        (band, Some(percent)) => {
            out.push_str(&format!("Confidence: {} ({}%)\n", band, percent));
        }
    }

    if !asset.facts.is_empty() {
        out.push('\n');
        let width = asset
            .facts
            .iter()
            .map(|f| f.label.len())
            .max()
            .unwrap_or(0);
        for fact in &asset.facts {
            out.push_str(&format!("  {:<width$}  {}\n", fact.label, fact.value));
        }
    }

    if let Some(analysis) = &asset.analysis_text {
        out.push('\n');
        out.push_str(analysis);
        out.push('\n');
    }

    out
}

/// Render the uniform error contract as a listing, one line per detail entry
pub fn render_error(error: &ApiError) -> String {
    let mut out = String::from("Identification failed:\n");
    for detail in &error.detail {
        if detail.loc.is_empty() {
            out.push_str(&format!("  - {} ({})\n", detail.msg, detail.kind));
        } else {
            let loc: Vec<String> = detail
                .loc
                .iter()
                .map(|part| match part {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            out.push_str(&format!(
                "  - {}: {} ({})\n",
                loc.join("."),
                detail.msg,
                detail.kind
            ));
        }
    }
    out
}
