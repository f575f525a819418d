//! Identifier screening for anonymised deployments.
//!
//! Ingested rows must be pseudonymous. Column names and cell values that
//! look like personal identifiers are rejected before anything is persisted.

use once_cell::sync::Lazy;
use regex::Regex;

/// Column names (case-insensitive) that are never accepted on ingest.
pub const BANNED_COLUMNS: &[&str] = &[
    "nhs_number",
    "nhs_no",
    "nhs",
    "chi_number",
    "mrn",
    "hospital_number",
    "patient_id",
    "name",
    "first_name",
    "last_name",
    "surname",
    "forename",
    "dob",
    "date_of_birth",
    "birth_date",
    "address",
    "postcode",
    "zip",
    "phone",
    "telephone",
    "mobile",
    "email",
    "notes",
    "comment",
    "free_text",
];

static IDENTIFIER_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("nhs_number", r"\b\d{10}\b"),
        ("dob", r"\b\d{2}[/-]\d{2}[/-]\d{4}\b"),
        ("email", r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
        ("phone", r"\b(?:\+44|0)\d{9,10}\b"),
        ("postcode", r"(?i)\b[A-Z]{1,2}\d{1,2}[A-Z]?\s?\d[A-Z]{2}\b"),
        ("mrn", r"(?i)\bMRN[0-9A-Za-z]{4,}\b"),
    ]
    .iter()
    .map(|(name, pattern)| {
        (
            *name,
            Regex::new(pattern).unwrap_or_else(|e| panic!("identifier pattern {name}: {e}")),
        )
    })
    .collect()
});

/// Columns from `columns` whose lowered name is banned.
pub fn banned_columns_found<'a, I>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    columns
        .into_iter()
        .filter(|col| BANNED_COLUMNS.contains(&col.to_lowercase().as_str()))
        .map(|col| col.to_string())
        .collect()
}

/// Names of identifier patterns matching anywhere in `value`.
pub fn find_identifier_matches(value: &str) -> Vec<&'static str> {
    if value.is_empty() {
        return Vec::new();
    }
    IDENTIFIER_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(value))
        .map(|(name, _)| *name)
        .collect()
}

/// Walk a JSON payload and report every string leaf that matches an
/// identifier pattern, with a dotted path to the offending field.
pub fn scan_payload_for_identifiers(payload: &serde_json::Value) -> Vec<(String, &'static str)> {
    let mut risks = Vec::new();
    scan_value(payload, String::new(), &mut risks);
    risks
}

fn scan_value(value: &serde_json::Value, path: String, risks: &mut Vec<(String, &'static str)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                scan_value(child, child_path, risks);
            }
        }
        serde_json::Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                scan_value(child, format!("{path}[{idx}]"), risks);
            }
        }
        serde_json::Value::String(s) => {
            for name in find_identifier_matches(s) {
                risks.push((path.clone(), name));
            }
        }
        _ => {}
    }
}

/// Replace identifier-like substrings with `[REDACTED]` and report which
/// patterns fired.
pub fn redact_identifiers(text: &str) -> (String, Vec<&'static str>) {
    if text.is_empty() {
        return (text.to_string(), Vec::new());
    }
    let mut redacted = text.to_string();
    let mut hits = Vec::new();
    for (name, pattern) in IDENTIFIER_PATTERNS.iter() {
        if pattern.is_match(&redacted) {
            hits.push(*name);
            redacted = pattern.replace_all(&redacted, "[REDACTED]").into_owned();
        }
    }
    (redacted, hits)
}
