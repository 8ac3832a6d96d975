// SKU encoding for configurable timber products
//
// A SKU is derived purely from a configuration tuple. The encoder never touches
// storage, so the same configuration always maps to the same string.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

/// Fixed brand prefix of every SKU
pub const SKU_PREFIX: &str = "YW";

const UNKNOWN: &str = "UNKNOWN";
const NO_PROFILE: &str = "NOPROFILE";
const NO_COLOR: &str = "NOCOLOR";
const NO_SIZE: &str = "NOSIZE";

/// Configuration tuple a SKU is derived from.
///
/// Every field is optional; missing values collapse to fixed placeholder
/// segments instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuConfig {
    pub usage_type: Option<String>,
    pub wood_type: Option<String>,
    pub profile: Option<String>,
    pub color: Option<String>,
    pub width_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub thickness_mm: Option<f64>,
}

fn non_alphanumeric_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"))
}

/// Canonicalizes a free-text attribute into a lowercase slug.
///
/// Trims, lower-cases, decomposes and drops combining diacritics, collapses
/// every run of non-alphanumeric characters into one `-` and strips hyphens
/// at both ends. `"  Šviesus Ąžuolas "` becomes `"sviesus-azuolas"`.
pub fn canonicalize(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let stripped: String = lowered
        .nfkd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect();

    non_alphanumeric_runs()
        .replace_all(&stripped, "-")
        .trim_matches('-')
        .to_string()
}

fn chunk(slug: &str) -> String {
    if slug.is_empty() {
        UNKNOWN.to_string()
    } else {
        slug.to_uppercase()
    }
}

/// FAC / TER / INT / FEN for the four known usages, uppercased slug otherwise
pub fn usage_code(usage: Option<&str>) -> String {
    let slug = canonicalize(usage.unwrap_or_default());
    match slug.as_str() {
        "facade" => "FAC".to_string(),
        "terrace" => "TER".to_string(),
        "interior" => "INT".to_string(),
        "fence" => "FEN".to_string(),
        _ => chunk(&slug),
    }
}

pub fn wood_code(wood: Option<&str>) -> String {
    let slug = canonicalize(wood.unwrap_or_default());
    match slug.as_str() {
        "spruce" => "SP".to_string(),
        "larch" => "LA".to_string(),
        _ => chunk(&slug),
    }
}

/// Maps a profile code or label onto its SKU segment.
///
/// Keyword matching runs on the canonical slug, so localized labels such as
/// "Stačiakampis" resolve to the same code as "rectangular".
pub fn profile_code(profile: Option<&str>) -> String {
    let slug = canonicalize(profile.unwrap_or_default());
    if slug.is_empty() {
        return NO_PROFILE.to_string();
    }

    if slug.contains("rect") || slug.contains("staciakamp") {
        return "RECT".to_string();
    }
    if slug.contains("rhomb") || slug.contains("romb") {
        return "RHOM".to_string();
    }

    let half_lap = ["half", "taper", "spunto", "pus"]
        .iter()
        .any(|keyword| slug.contains(keyword));
    if half_lap {
        return if slug.contains("45") {
            "HALF45".to_string()
        } else {
            "HALF".to_string()
        };
    }

    chunk(&slug)
}

pub fn color_code(color: Option<&str>) -> String {
    let slug = canonicalize(color.unwrap_or_default());
    if slug.is_empty() {
        NO_COLOR.to_string()
    } else {
        chunk(&slug)
    }
}

/// Rounds a dimension when it is a positive finite number
fn dimension(value: Option<f64>) -> Option<i64> {
    value
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as i64)
}

/// Encodes a configuration into `YW-usage-wood-profile-color-size[-Tt]`.
///
/// # Example
/// ```
/// use timber_inventory::inventory::sku::{encode, SkuConfig};
///
/// let sku = encode(&SkuConfig {
///     usage_type: Some("terrace".into()),
///     wood_type: Some("larch".into()),
///     profile: Some("rectangular".into()),
///     color: Some("natural".into()),
///     width_mm: Some(140.0),
///     length_mm: Some(3000.0),
///     thickness_mm: Some(28.0),
/// });
/// assert_eq!(sku, "YW-TER-LA-RECT-NATURAL-140X3000-T28");
/// ```
pub fn encode(config: &SkuConfig) -> String {
    let size = match (dimension(config.width_mm), dimension(config.length_mm)) {
        (Some(width), Some(length)) => format!("{}X{}", width, length),
        _ => NO_SIZE.to_string(),
    };

    let mut segments = vec![
        SKU_PREFIX.to_string(),
        usage_code(config.usage_type.as_deref()),
        wood_code(config.wood_type.as_deref()),
        profile_code(config.profile.as_deref()),
        color_code(config.color.as_deref()),
        size,
    ];

    if let Some(thickness) = dimension(config.thickness_mm) {
        segments.push(format!("T{}", thickness));
    }

    segments.join("-")
}

/// Cheap shape check used before hitting storage.
///
/// Accepts anything with the brand prefix and five or six further segments.
/// It does not attempt to decode the segments, since free-text fallbacks can
/// themselves contain hyphens.
pub fn is_valid_sku(sku: &str) -> bool {
    let mut parts = sku.split('-');
    if parts.next() != Some(SKU_PREFIX) {
        return false;
    }
    let rest: Vec<&str> = parts.collect();
    rest.len() >= 5 && rest.iter().all(|segment| !segment.is_empty())
}
