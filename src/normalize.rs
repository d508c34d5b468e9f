//! Normalization of service responses into a displayable fact card.
//!
//! [`normalize`] is a pure function from a [`RawResponse`] to a
//! [`NormalizedAsset`]: no I/O, no side effects, same input always yields the
//! same output. Malformed or absent optional fields degrade to a sentinel
//! title and an empty fact list; nothing in here panics on service data.
//!
//! The merged view is an ordered association list so fact display order is
//! explicit: top-level fields in arrival order, with `additional_details`
//! entries overlaid in place. On key collisions the nested entry wins —
//! preserved from the original service contract (see DESIGN.md).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::client::RawResponse;

/// Title shown when the response carries no manufacturer/brand/model
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Keys never shown as facts: identity and metadata fields that feed the
/// title, confidence fields, long-form analysis fields, and image references.
const EXCLUDED_KEYS: &[&str] = &[
    "request_id",
    "manufacturer",
    "brand",
    "model",
    "confidence",
    "confidence_score",
    "detailed_analysis",
    "design_features",
    "analysis",
    "description",
    "image",
    "image_url",
    "thumbnail",
    "thumbnail_url",
];

/// Long-form text candidates, highest priority first; at most one is shown
const ANALYSIS_KEYS: &[&str] = &[
    "detailed_analysis",
    "design_features",
    "analysis",
    "description",
];

/// Keys whose display label is not derivable by title-casing
const KNOWN_LABELS: &[(&str, &str)] = &[
    ("sku", "SKU"),
    ("upc", "UPC"),
    ("mpn", "MPN"),
    ("oem", "OEM"),
    ("msrp", "MSRP"),
    ("url", "URL"),
];

/// Classification of the service-reported confidence score.
///
/// The 0.90/0.70 thresholds drive severity-style coloring downstream and
/// must match the service's calibration exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
    Unknown,
}

impl ConfidenceBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.90 {
            ConfidenceBand::High
        } else if score >= 0.70 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfidenceBand::High => "High",
            ConfidenceBand::Medium => "Medium",
            ConfidenceBand::Low => "Low",
            ConfidenceBand::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One labeled attribute extracted from the response, e.g. `Color: Red`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// View model derived fresh from each [`RawResponse`]; never mutated in place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAsset {
    pub title: String,
    pub confidence_band: ConfidenceBand,
    pub confidence_percent: Option<u8>,
    pub facts: Vec<Fact>,
    pub analysis_text: Option<String>,
}

/// Normalize a raw service response into the displayable view model
pub fn normalize(raw: &RawResponse) -> NormalizedAsset {
    let merged = merged_entries(raw);

    let title = compose_title(&merged);
    let (confidence_band, confidence_percent) = read_confidence(&merged);
    let analysis_text = analysis_text(&merged);
    let facts = collect_facts(&merged);

    NormalizedAsset {
        title,
        confidence_band,
        confidence_percent,
        facts,
        analysis_text,
    }
}

/// Flatten the response into an ordered association list: known fields
/// first, then unknown top-level fields in arrival order, then the
/// `additional_details` entries overlaid (in place on collision, appended
/// otherwise). Non-object `additional_details` values are dropped.
fn merged_entries(raw: &RawResponse) -> Vec<(String, Value)> {
    let mut entries: Vec<(String, Value)> = Vec::new();

    let known: [(&str, Option<Value>); 6] = [
        ("request_id", raw.request_id.clone().map(Value::String)),
        ("manufacturer", raw.manufacturer.clone().map(Value::String)),
        ("brand", raw.brand.clone().map(Value::String)),
        ("model", raw.model.clone().map(Value::String)),
        ("confidence_score", raw.confidence_score.clone()),
        ("confidence", raw.confidence.clone()),
    ];
    for (key, value) in known {
        if let Some(value) = value {
            entries.push((key.to_string(), value));
        }
    }

    for (key, value) in &raw.extra {
        entries.push((key.clone(), value.clone()));
    }

    if let Some(Value::Object(details)) = &raw.additional_details {
        for (key, value) in details {
            overlay(&mut entries, key, value.clone());
        }
    }

    entries
}

fn overlay(entries: &mut Vec<(String, Value)>, key: &str, value: Value) {
    match entries.iter_mut().find(|(existing, _)| existing == key) {
        Some((_, slot)) => *slot = value,
        None => entries.push((key.to_string(), value)),
    }
}

/// Non-empty trimmed string value for a key, if present
fn str_entry<'a>(entries: &'a [(String, Value)], key: &str) -> Option<&'a str> {
    entries.iter().find_map(|(k, v)| {
        if k != key {
            return None;
        }
        match v {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    })
}

fn compose_title(entries: &[(String, Value)]) -> String {
    let maker = str_entry(entries, "manufacturer").or_else(|| str_entry(entries, "brand"));
    let model = str_entry(entries, "model");

    let title: Vec<&str> = [maker, model].into_iter().flatten().collect();
    if title.is_empty() {
        UNKNOWN_PRODUCT.to_string()
    } else {
        title.join(" ")
    }
}

/// Read the confidence score once, in one place.
///
/// `confidence_score` is consulted first, then `confidence`; whichever key
/// is present is the one parsed — a present-but-invalid value yields
/// `Unknown` rather than falling through to the other key. Both plain
/// numbers and numeric strings are accepted.
fn read_confidence(entries: &[(String, Value)]) -> (ConfidenceBand, Option<u8>) {
    let value = entries
        .iter()
        .find(|(k, _)| k == "confidence_score")
        .or_else(|| entries.iter().find(|(k, _)| k == "confidence"))
        .map(|(_, v)| v);

    let score = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite());

    match score {
        Some(score) => {
            let percent = (score * 100.0).round().clamp(0.0, 100.0) as u8;
            (ConfidenceBand::from_score(score), Some(percent))
        }
        None => (ConfidenceBand::Unknown, None),
    }
}

fn analysis_text(entries: &[(String, Value)]) -> Option<String> {
    ANALYSIS_KEYS
        .iter()
        .find_map(|key| str_entry(entries, key))
        .map(str::to_string)
}

fn collect_facts(entries: &[(String, Value)]) -> Vec<Fact> {
    entries
        .iter()
        .filter(|(key, _)| !EXCLUDED_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let Value::String(s) = value else { return None };
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(Fact {
                key: key.clone(),
                label: label_for(key),
                value: trimmed.to_string(),
            })
        })
        .collect()
}

fn label_for(key: &str) -> String {
    let lower = key.to_ascii_lowercase();
    if let Some((_, label)) = KNOWN_LABELS.iter().find(|(k, _)| *k == lower) {
        return (*label).to_string();
    }

    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn band_thresholds_are_exact() {
        assert_eq!(ConfidenceBand::from_score(1.0), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.90), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.89), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.70), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.69), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_score(0.0), ConfidenceBand::Low);
    }

    #[test]
    fn percent_is_rounded() {
        let asset = normalize(&raw(json!({"confidence_score": 0.756})));
        assert_eq!(asset.confidence_percent, Some(76));

        let asset = normalize(&raw(json!({"confidence_score": 0.9})));
        assert_eq!(asset.confidence_percent, Some(90));
        assert_eq!(asset.confidence_band, ConfidenceBand::High);
    }

    #[test]
    fn numeric_string_confidence_is_accepted() {
        let asset = normalize(&raw(json!({"confidence": "0.85"})));
        assert_eq!(asset.confidence_band, ConfidenceBand::Medium);
        assert_eq!(asset.confidence_percent, Some(85));
    }

    #[test]
    fn invalid_confidence_yields_unknown() {
        for value in [json!("very sure"), json!(null), json!({}), json!([0.9])] {
            let asset = normalize(&raw(json!({"confidence_score": value})));
            assert_eq!(asset.confidence_band, ConfidenceBand::Unknown);
            assert_eq!(asset.confidence_percent, None);
        }

        let asset = normalize(&raw(json!({})));
        assert_eq!(asset.confidence_band, ConfidenceBand::Unknown);
        assert_eq!(asset.confidence_percent, None);
    }

    #[test]
    fn confidence_score_shadows_confidence_even_when_invalid() {
        let asset = normalize(&raw(json!({
            "confidence_score": "n/a",
            "confidence": 0.95
        })));
        assert_eq!(asset.confidence_band, ConfidenceBand::Unknown);
    }

    #[test]
    fn additional_details_win_on_collision() {
        let asset = normalize(&raw(json!({
            "manufacturer": "A",
            "additional_details": {"manufacturer": "B"}
        })));
        assert_eq!(asset.title, "B");
    }

    #[test]
    fn exclusion_set_keeps_only_detail_facts() {
        let asset = normalize(&raw(json!({
            "manufacturer": "Acme",
            "model": "X1",
            "confidence_score": 0.95,
            "additional_details": {"color": "red", "sku": "123"}
        })));

        assert_eq!(
            asset.facts,
            vec![
                Fact {
                    key: "color".to_string(),
                    label: "Color".to_string(),
                    value: "red".to_string(),
                },
                Fact {
                    key: "sku".to_string(),
                    label: "SKU".to_string(),
                    value: "123".to_string(),
                },
            ]
        );
    }

    #[test]
    fn facts_preserve_arrival_order() {
        let asset = normalize(&raw(json!({
            "model": "X1",
            "color": "red",
            "material": "steel",
            "additional_details": {"color": "blue", "finish": "matte"}
        })));

        let keys: Vec<&str> = asset.facts.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["color", "material", "finish"]);
        assert_eq!(asset.facts[0].value, "blue");
    }

    #[test]
    fn non_string_and_blank_values_are_not_facts() {
        let asset = normalize(&raw(json!({
            "weight_kg": 12.5,
            "in_stock": true,
            "color": "   ",
            "material": "steel"
        })));

        let keys: Vec<&str> = asset.facts.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["material"]);
    }

    #[test]
    fn title_composition() {
        let asset = normalize(&raw(json!({"manufacturer": "Acme", "model": "X1"})));
        assert_eq!(asset.title, "Acme X1");

        let asset = normalize(&raw(json!({"brand": "Acme"})));
        assert_eq!(asset.title, "Acme");

        let asset = normalize(&raw(json!({"model": "  X1  "})));
        assert_eq!(asset.title, "X1");

        let asset = normalize(&raw(json!({})));
        assert_eq!(asset.title, UNKNOWN_PRODUCT);
    }

    #[test]
    fn brand_is_fallback_not_override() {
        let asset = normalize(&raw(json!({
            "manufacturer": "Acme",
            "brand": "OtherBrand",
            "model": "X1"
        })));
        assert_eq!(asset.title, "Acme X1");
    }

    #[test]
    fn analysis_text_priority_order() {
        let asset = normalize(&raw(json!({
            "description": "generic words",
            "detailed_analysis": "long form analysis"
        })));
        assert_eq!(asset.analysis_text.as_deref(), Some("long form analysis"));

        let asset = normalize(&raw(json!({
            "description": "generic words",
            "design_features": "brushed finish"
        })));
        assert_eq!(asset.analysis_text.as_deref(), Some("brushed finish"));

        let asset = normalize(&raw(json!({"description": "generic words"})));
        assert_eq!(asset.analysis_text.as_deref(), Some("generic words"));

        let asset = normalize(&raw(json!({"description": "   "})));
        assert_eq!(asset.analysis_text, None);
    }

    #[test]
    fn analysis_fields_never_appear_as_facts() {
        let asset = normalize(&raw(json!({
            "description": "generic words",
            "image_url": "https://cdn.example.com/x.jpg",
            "color": "red"
        })));
        let keys: Vec<&str> = asset.facts.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["color"]);
    }

    #[test]
    fn non_object_additional_details_is_ignored() {
        for details in [json!("n/a"), json!(42), json!([1, 2]), json!(null)] {
            let asset = normalize(&raw(json!({
                "manufacturer": "Acme",
                "additional_details": details
            })));
            assert_eq!(asset.title, "Acme");
            assert!(asset.facts.is_empty());
        }
    }

    #[test]
    fn malformed_input_degrades_gracefully() {
        let asset = normalize(&raw(json!({
            "manufacturer": 42,
            "model": null,
            "confidence_score": [],
            "additional_details": "broken"
        })));
        assert_eq!(asset.title, UNKNOWN_PRODUCT);
        assert_eq!(asset.confidence_band, ConfidenceBand::Unknown);
        assert!(asset.facts.is_empty());
        assert_eq!(asset.analysis_text, None);
    }

    #[test]
    fn label_derivation() {
        assert_eq!(label_for("color"), "Color");
        assert_eq!(label_for("serial_number"), "Serial Number");
        assert_eq!(label_for("sku"), "SKU");
        assert_eq!(label_for("SKU"), "SKU");
        assert_eq!(label_for("country_of_origin"), "Country Of Origin");
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = raw(json!({
            "request_id": "r-1",
            "manufacturer": "Acme",
            "model": "X1",
            "confidence_score": "0.92",
            "additional_details": {"color": "red", "sku": "123"},
            "material": "steel"
        }));

        assert_eq!(normalize(&raw), normalize(&raw));
    }
}
