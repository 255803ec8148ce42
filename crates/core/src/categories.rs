//! Trade categories and UK regions.
//!
//! Category slugs are stored verbatim in `quote_requests.category` and in the
//! `provider_profiles.categories` array. Regions are derived from the
//! postcode area and drive the FairPrice regional multiplier.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub const CATEGORY_PLUMBING: &str = "plumbing";
pub const CATEGORY_ELECTRICAL: &str = "electrical";
pub const CATEGORY_HEATING: &str = "heating";
pub const CATEGORY_CARPENTRY: &str = "carpentry";
pub const CATEGORY_PAINTING: &str = "painting";
pub const CATEGORY_ROOFING: &str = "roofing";
pub const CATEGORY_GARDENING: &str = "gardening";
pub const CATEGORY_CLEANING: &str = "cleaning";
pub const CATEGORY_LOCKSMITH: &str = "locksmith";
pub const CATEGORY_HANDYMAN: &str = "handyman";
pub const CATEGORY_APPLIANCE_REPAIR: &str = "appliance_repair";
pub const CATEGORY_PEST_CONTROL: &str = "pest_control";

/// All valid category slugs.
pub const VALID_CATEGORIES: &[&str] = &[
    CATEGORY_PLUMBING,
    CATEGORY_ELECTRICAL,
    CATEGORY_HEATING,
    CATEGORY_CARPENTRY,
    CATEGORY_PAINTING,
    CATEGORY_ROOFING,
    CATEGORY_GARDENING,
    CATEGORY_CLEANING,
    CATEGORY_LOCKSMITH,
    CATEGORY_HANDYMAN,
    CATEGORY_APPLIANCE_REPAIR,
    CATEGORY_PEST_CONTROL,
];

/// Validate that a category slug is one of the known trades.
pub fn validate_category(category: &str) -> Result<(), CoreError> {
    if VALID_CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown category: '{category}'. Valid categories: {}",
            VALID_CATEGORIES.join(", ")
        )))
    }
}

/// Validate a provider's category list: non-empty, known, no duplicates.
pub fn validate_category_list(categories: &[String]) -> Result<(), CoreError> {
    if categories.is_empty() {
        return Err(CoreError::Validation(
            "At least one service category is required".into(),
        ));
    }
    for (i, c) in categories.iter().enumerate() {
        validate_category(c)?;
        if categories[..i].contains(c) {
            return Err(CoreError::Validation(format!("Duplicate category: '{c}'")));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

pub const REGION_LONDON: &str = "london";
pub const REGION_SOUTH_EAST: &str = "south_east";
pub const REGION_SOUTH_WEST: &str = "south_west";
pub const REGION_MIDLANDS: &str = "midlands";
pub const REGION_NORTH_WEST: &str = "north_west";
pub const REGION_NORTH_EAST: &str = "north_east";
pub const REGION_SCOTLAND: &str = "scotland";
pub const REGION_WALES: &str = "wales";
pub const REGION_NORTHERN_IRELAND: &str = "northern_ireland";
pub const REGION_OTHER: &str = "other";

pub const VALID_REGIONS: &[&str] = &[
    REGION_LONDON,
    REGION_SOUTH_EAST,
    REGION_SOUTH_WEST,
    REGION_MIDLANDS,
    REGION_NORTH_WEST,
    REGION_NORTH_EAST,
    REGION_SCOTLAND,
    REGION_WALES,
    REGION_NORTHERN_IRELAND,
    REGION_OTHER,
];

const LONDON_AREAS: &[&str] = &["E", "EC", "N", "NW", "SE", "SW", "W", "WC"];
const SOUTH_EAST_AREAS: &[&str] = &[
    "BN", "BR", "CR", "CT", "DA", "EN", "GU", "HA", "HP", "IG", "KT", "ME", "MK", "OX", "PO", "RG",
    "RH", "RM", "SL", "SM", "SO", "TN", "TW", "UB",
];
const SOUTH_WEST_AREAS: &[&str] = &[
    "BA", "BH", "BS", "DT", "EX", "GL", "PL", "SN", "SP", "TA", "TQ", "TR",
];
const MIDLANDS_AREAS: &[&str] = &[
    "B", "CV", "DE", "DY", "LE", "LN", "NG", "NN", "ST", "TF", "WR", "WS", "WV", "HR",
];
const NORTH_WEST_AREAS: &[&str] = &[
    "BB", "BL", "CA", "CH", "CW", "FY", "L", "LA", "M", "OL", "PR", "SK", "WA", "WN",
];
const NORTH_EAST_AREAS: &[&str] = &[
    "BD", "DH", "DL", "DN", "HD", "HG", "HU", "HX", "LS", "NE", "S", "SR", "TS", "WF", "YO",
];
const SCOTLAND_AREAS: &[&str] = &[
    "AB", "DD", "DG", "EH", "FK", "G", "HS", "IV", "KA", "KW", "KY", "ML", "PA", "PH", "TD", "ZE",
];
const WALES_AREAS: &[&str] = &["CF", "LD", "LL", "NP", "SA", "SY"];

static POSTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{1,2})[0-9][A-Z0-9]? ?[0-9][A-Z]{2}$").expect("valid regex")
});

/// Normalise a UK postcode to upper case with a single space before the
/// inward code. Returns a validation error if it does not look like a postcode.
pub fn normalize_postcode(raw: &str) -> Result<String, CoreError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if !POSTCODE_RE.is_match(&compact) {
        return Err(CoreError::Validation(format!("Invalid UK postcode: '{raw}'")));
    }
    let split = compact.len() - 3;
    Ok(format!("{} {}", &compact[..split], &compact[split..]))
}

/// Derive the pricing region from a postcode (normalised or not).
pub fn region_for_postcode(postcode: &str) -> &'static str {
    let compact = postcode.trim().to_uppercase().replace(' ', "");
    let Some(caps) = POSTCODE_RE.captures(&compact) else {
        return REGION_OTHER;
    };
    let area = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

    let tables: [(&[&str], &'static str); 8] = [
        (LONDON_AREAS, REGION_LONDON),
        (SOUTH_EAST_AREAS, REGION_SOUTH_EAST),
        (SOUTH_WEST_AREAS, REGION_SOUTH_WEST),
        (MIDLANDS_AREAS, REGION_MIDLANDS),
        (NORTH_WEST_AREAS, REGION_NORTH_WEST),
        (NORTH_EAST_AREAS, REGION_NORTH_EAST),
        (SCOTLAND_AREAS, REGION_SCOTLAND),
        (WALES_AREAS, REGION_WALES),
    ];
    if area == "BT" {
        return REGION_NORTHERN_IRELAND;
    }
    tables
        .iter()
        .find(|(areas, _)| areas.contains(&area))
        .map(|(_, region)| *region)
        .unwrap_or(REGION_OTHER)
}

/// Validate an explicit region slug.
pub fn validate_region(region: &str) -> Result<(), CoreError> {
    if VALID_REGIONS.contains(&region) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown region: '{region}'. Valid regions: {}",
            VALID_REGIONS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_category_passes() {
        assert!(validate_category("plumbing").is_ok());
        assert!(validate_category("Plumbing").is_err());
        assert!(validate_category("astrology").is_err());
    }

    #[test]
    fn category_list_rules() {
        assert!(validate_category_list(&[]).is_err());
        assert!(validate_category_list(&["plumbing".into(), "heating".into()]).is_ok());
        assert!(validate_category_list(&["plumbing".into(), "plumbing".into()]).is_err());
    }

    #[test]
    fn postcode_normalisation() {
        assert_eq!(normalize_postcode("sw1a1aa").unwrap(), "SW1A 1AA");
        assert_eq!(normalize_postcode(" M1  1AE ").unwrap(), "M1 1AE");
        assert_eq!(normalize_postcode("EH8 9YL").unwrap(), "EH8 9YL");
        assert!(normalize_postcode("12345").is_err());
        assert!(normalize_postcode("").is_err());
    }

    #[test]
    fn regions_from_postcodes() {
        assert_eq!(region_for_postcode("SW1A 1AA"), REGION_LONDON);
        assert_eq!(region_for_postcode("ec1a 1bb"), REGION_LONDON);
        assert_eq!(region_for_postcode("M1 1AE"), REGION_NORTH_WEST);
        assert_eq!(region_for_postcode("EH8 9YL"), REGION_SCOTLAND);
        assert_eq!(region_for_postcode("CF10 1AA"), REGION_WALES);
        assert_eq!(region_for_postcode("BT1 1AA"), REGION_NORTHERN_IRELAND);
        assert_eq!(region_for_postcode("B1 1AA"), REGION_MIDLANDS);
        assert_eq!(region_for_postcode("not a postcode"), REGION_OTHER);
    }
}
