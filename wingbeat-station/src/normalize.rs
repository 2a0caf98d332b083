//! Identification result normalization
//!
//! The inference service's response shape varies between deployments: the
//! species guess and its score may appear under several alternate field
//! names, or only inside a ranked `top_k` candidate list. This module maps
//! any of those shapes into one canonical record.
//!
//! Each output field has an explicit ordered rule list, applied
//! first-match-wins. Rules are presence-checked, not truthiness-checked: a
//! literal `0` or `false` confidence is a match and survives as that
//! literal value, while JSON `null` and absent fields fall through to the
//! next rule. Normalization never fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel species name when no recognizable field is present
pub const UNKNOWN_SPECIES: &str = "Unknown";

/// Confidence as reported by the inference service.
///
/// Some deployments report a probability, others a boolean verdict. Both
/// are preserved literally; neither is coerced to the other or to "absent".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfidenceValue {
    Number(f64),
    Flag(bool),
}

/// Species identifier, numeric or string depending on the deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpeciesId {
    Numeric(i64),
    Code(String),
}

/// Canonical identification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationResult {
    pub species_name: String,
    pub confidence: Option<ConfidenceValue>,
    pub species_id: Option<SpeciesId>,
}

/// A single extraction rule: pure function from raw response to candidate
type Rule<T> = fn(&Value) -> Option<T>;

/// Species name rules, in priority order
const SPECIES_NAME_RULES: &[Rule<String>] = &[
    |raw| string_field(raw, "species_name"),
    |raw| string_field(raw, "bird_name"),
    |raw| string_field(raw, "bird"),
    |raw| string_field(raw, "name"),
];

/// Confidence rules, in priority order
const CONFIDENCE_RULES: &[Rule<ConfidenceValue>] = &[
    |raw| present(raw, "confidence").and_then(as_confidence),
    |raw| present(raw, "score").and_then(as_confidence),
    |raw| present(raw, "probability").and_then(as_confidence),
    |raw| top_k_first(raw).and_then(|c| present(c, "confidence")).and_then(as_confidence),
];

/// Species id rules, in priority order
const SPECIES_ID_RULES: &[Rule<SpeciesId>] = &[
    |raw| present(raw, "species_id").and_then(as_species_id),
    |raw| present(raw, "class_id").and_then(as_species_id),
    |raw| top_k_first(raw).and_then(|c| present(c, "species_id")).and_then(as_species_id),
];

/// Normalize an arbitrary inference response into the canonical result.
pub fn normalize(raw: &Value) -> IdentificationResult {
    IdentificationResult {
        species_name: first_match(raw, SPECIES_NAME_RULES)
            .unwrap_or_else(|| UNKNOWN_SPECIES.to_string()),
        confidence: first_match(raw, CONFIDENCE_RULES),
        species_id: first_match(raw, SPECIES_ID_RULES),
    }
}

fn first_match<T>(raw: &Value, rules: &[Rule<T>]) -> Option<T> {
    rules.iter().find_map(|rule| rule(raw))
}

/// Field presence check: absent and JSON null are both "not present"
fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v),
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    present(value, key)?.as_str().map(str::to_owned)
}

fn as_confidence(value: &Value) -> Option<ConfidenceValue> {
    match value {
        Value::Number(n) => n.as_f64().map(ConfidenceValue::Number),
        Value::Bool(b) => Some(ConfidenceValue::Flag(*b)),
        _ => None,
    }
}

fn as_species_id(value: &Value) -> Option<SpeciesId> {
    match value {
        Value::Number(n) => n.as_i64().map(SpeciesId::Numeric),
        Value::String(s) => Some(SpeciesId::Code(s.clone())),
        _ => None,
    }
}

/// First element of the optional ranked-candidates list
fn top_k_first(value: &Value) -> Option<&Value> {
    match value.get("top_k") {
        Some(Value::Array(candidates)) => candidates.first(),
        _ => None,
    }
}
