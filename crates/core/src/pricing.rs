//! FairPrice: job price estimates and quote assessment.
//!
//! When an LLM is configured its estimate is validated with
//! [`parse_ai_estimate`] and used directly. Otherwise (or when the call
//! fails) [`fallback_estimate`] derives a range from a static per-category
//! table scaled by regional and seasonal multipliers.

use serde::{Deserialize, Serialize};

use crate::categories::{
    CATEGORY_APPLIANCE_REPAIR, CATEGORY_CARPENTRY, CATEGORY_CLEANING, CATEGORY_ELECTRICAL,
    CATEGORY_GARDENING, CATEGORY_HANDYMAN, CATEGORY_HEATING, CATEGORY_LOCKSMITH,
    CATEGORY_PAINTING, CATEGORY_PEST_CONTROL, CATEGORY_PLUMBING, CATEGORY_ROOFING, REGION_LONDON,
    REGION_MIDLANDS, REGION_NORTHERN_IRELAND, REGION_NORTH_EAST, REGION_NORTH_WEST,
    REGION_SCOTLAND, REGION_SOUTH_EAST, REGION_SOUTH_WEST, REGION_WALES,
};
use crate::error::CoreError;
use crate::types::Cents;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Quotes below this fraction of the typical price are flagged as unusually low.
pub const UNUSUALLY_LOW_RATIO: f64 = 0.80;
/// Quotes up to this fraction of the typical price are fair.
pub const FAIR_UPPER_RATIO: f64 = 1.15;
/// Quotes up to this fraction are above average; beyond it, overpriced.
pub const ABOVE_AVERAGE_UPPER_RATIO: f64 = 1.40;

/// Where an estimate came from.
pub const SOURCE_AI: &str = "ai";
pub const SOURCE_FALLBACK: &str = "fallback";

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Baseline national prices in pence: (category, low, typical, high).
const BASE_PRICES: &[(&str, Cents, Cents, Cents)] = &[
    (CATEGORY_PLUMBING, 8_000, 15_000, 35_000),
    (CATEGORY_ELECTRICAL, 9_000, 18_000, 40_000),
    (CATEGORY_HEATING, 10_000, 25_000, 60_000),
    (CATEGORY_CARPENTRY, 12_000, 25_000, 60_000),
    (CATEGORY_PAINTING, 15_000, 40_000, 120_000),
    (CATEGORY_ROOFING, 20_000, 60_000, 250_000),
    (CATEGORY_GARDENING, 5_000, 12_000, 40_000),
    (CATEGORY_CLEANING, 4_000, 9_000, 25_000),
    (CATEGORY_LOCKSMITH, 7_000, 12_000, 25_000),
    (CATEGORY_HANDYMAN, 5_000, 10_000, 30_000),
    (CATEGORY_APPLIANCE_REPAIR, 6_000, 11_000, 25_000),
    (CATEGORY_PEST_CONTROL, 8_000, 15_000, 35_000),
];

/// Regional cost-of-labour multipliers.
const REGIONAL_MULTIPLIERS: &[(&str, f64)] = &[
    (REGION_LONDON, 1.25),
    (REGION_SOUTH_EAST, 1.12),
    (REGION_SOUTH_WEST, 1.02),
    (REGION_MIDLANDS, 0.97),
    (REGION_NORTH_WEST, 0.95),
    (REGION_NORTH_EAST, 0.92),
    (REGION_SCOTLAND, 0.96),
    (REGION_WALES, 0.93),
    (REGION_NORTHERN_IRELAND, 0.90),
];

/// Seasonal demand multipliers: (category, months, multiplier). Months are 1-12.
const SEASONAL_MULTIPLIERS: &[(&str, &[u32], f64)] = &[
    (CATEGORY_HEATING, &[11, 12, 1, 2], 1.15),
    (CATEGORY_HEATING, &[6, 7, 8], 0.92),
    (CATEGORY_PLUMBING, &[12, 1, 2], 1.08),
    (CATEGORY_ROOFING, &[4, 5, 6, 7, 8, 9], 1.10),
    (CATEGORY_ROOFING, &[12, 1, 2], 0.95),
    (CATEGORY_GARDENING, &[4, 5, 6, 7], 1.12),
    (CATEGORY_GARDENING, &[11, 12, 1, 2], 0.88),
    (CATEGORY_PAINTING, &[5, 6, 7, 8], 1.05),
    (CATEGORY_PEST_CONTROL, &[6, 7, 8, 9], 1.10),
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A price range for a job, in pence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub low: Cents,
    pub typical: Cents,
    pub high: Cents,
    /// [`SOURCE_AI`] or [`SOURCE_FALLBACK`].
    pub source: String,
    /// Short explanation of what drives the price.
    pub rationale: String,
}

/// How a quoted price compares with the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceVerdict {
    UnusuallyLow,
    Fair,
    AboveAverage,
    Overpriced,
}

impl PriceVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnusuallyLow => "UNUSUALLY_LOW",
            Self::Fair => "FAIR",
            Self::AboveAverage => "ABOVE_AVERAGE",
            Self::Overpriced => "OVERPRICED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UnusuallyLow => "Unusually low - check what is included",
            Self::Fair => "Fair price",
            Self::AboveAverage => "Above average",
            Self::Overpriced => "Overpriced",
        }
    }
}

/// Result of comparing a quote against an estimate.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteAssessment {
    pub verdict: PriceVerdict,
    /// Quoted amount as a percentage of the typical price, rounded.
    pub percent_of_typical: i64,
    pub difference_from_typical: Cents,
}

// ---------------------------------------------------------------------------
// Logic
// ---------------------------------------------------------------------------

/// Regional multiplier; unknown regions get 1.0.
pub fn regional_multiplier(region: &str) -> f64 {
    REGIONAL_MULTIPLIERS
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, m)| *m)
        .unwrap_or(1.0)
}

/// Seasonal multiplier for a category in a month (1-12); 1.0 when no rule applies.
pub fn seasonal_multiplier(category: &str, month: u32) -> f64 {
    SEASONAL_MULTIPLIERS
        .iter()
        .find(|(c, months, _)| *c == category && months.contains(&month))
        .map(|(_, _, m)| *m)
        .unwrap_or(1.0)
}

fn scale(amount: Cents, factor: f64) -> Cents {
    (amount as f64 * factor).round() as Cents
}

/// Deterministic estimate from the static tables.
pub fn fallback_estimate(
    category: &str,
    region: &str,
    month: u32,
) -> Result<PriceEstimate, CoreError> {
    let (_, low, typical, high) = BASE_PRICES
        .iter()
        .find(|(c, ..)| *c == category)
        .ok_or_else(|| CoreError::Validation(format!("No pricing data for category '{category}'")))?;

    if !(1..=12).contains(&month) {
        return Err(CoreError::Validation(format!("Invalid month: {month}")));
    }

    let regional = regional_multiplier(region);
    let seasonal = seasonal_multiplier(category, month);
    let factor = regional * seasonal;

    Ok(PriceEstimate {
        low: scale(*low, factor),
        typical: scale(*typical, factor),
        high: scale(*high, factor),
        source: SOURCE_FALLBACK.to_string(),
        rationale: format!(
            "National {category} prices adjusted x{regional:.2} for region and x{seasonal:.2} for season"
        ),
    })
}

/// Compare a quoted amount with an estimate.
pub fn assess_quote(amount: Cents, estimate: &PriceEstimate) -> Result<QuoteAssessment, CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(
            "Quoted amount must be greater than zero".into(),
        ));
    }
    if estimate.typical <= 0 {
        return Err(CoreError::Internal("Estimate has no typical price".into()));
    }

    let ratio = amount as f64 / estimate.typical as f64;
    let verdict = if ratio < UNUSUALLY_LOW_RATIO {
        PriceVerdict::UnusuallyLow
    } else if ratio <= FAIR_UPPER_RATIO {
        PriceVerdict::Fair
    } else if ratio <= ABOVE_AVERAGE_UPPER_RATIO {
        PriceVerdict::AboveAverage
    } else {
        PriceVerdict::Overpriced
    };

    Ok(QuoteAssessment {
        verdict,
        percent_of_typical: (ratio * 100.0).round() as i64,
        difference_from_typical: amount - estimate.typical,
    })
}

/// Shape the LLM is asked to answer with.
#[derive(Debug, Deserialize)]
struct AiEstimate {
    low: f64,
    typical: f64,
    high: f64,
    #[serde(default)]
    rationale: Option<String>,
}

/// Parse and sanity-check an LLM estimate given in pounds.
///
/// Returns `None` if the JSON is malformed or the range is implausible, in
/// which case the caller falls back to the static tables.
pub fn parse_ai_estimate(json: &serde_json::Value) -> Option<PriceEstimate> {
    let raw: AiEstimate = serde_json::from_value(json.clone()).ok()?;
    let to_pence = |pounds: f64| -> Option<Cents> {
        (pounds.is_finite() && pounds > 0.0).then(|| (pounds * 100.0).round() as Cents)
    };
    let low = to_pence(raw.low)?;
    let typical = to_pence(raw.typical)?;
    let high = to_pence(raw.high)?;
    if !(low <= typical && typical <= high) {
        return None;
    }
    Some(PriceEstimate {
        low,
        typical,
        high,
        source: SOURCE_AI.to_string(),
        rationale: raw
            .rationale
            .unwrap_or_else(|| "Estimated from similar jobs".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(typical: Cents) -> PriceEstimate {
        PriceEstimate {
            low: typical / 2,
            typical,
            high: typical * 2,
            source: SOURCE_FALLBACK.into(),
            rationale: String::new(),
        }
    }

    #[test]
    fn every_category_has_a_base_price() {
        for c in crate::categories::VALID_CATEGORIES {
            assert!(fallback_estimate(c, "other", 3).is_ok(), "missing {c}");
        }
    }

    #[test]
    fn neutral_region_and_season_return_base_prices() {
        let e = fallback_estimate(CATEGORY_PLUMBING, "other", 4).unwrap();
        assert_eq!((e.low, e.typical, e.high), (8_000, 15_000, 35_000));
        assert_eq!(e.source, SOURCE_FALLBACK);
    }

    #[test]
    fn london_costs_more() {
        let e = fallback_estimate(CATEGORY_PLUMBING, REGION_LONDON, 4).unwrap();
        assert_eq!(e.typical, 18_750);
    }

    #[test]
    fn heating_peaks_in_winter() {
        let winter = fallback_estimate(CATEGORY_HEATING, "other", 1).unwrap();
        let summer = fallback_estimate(CATEGORY_HEATING, "other", 7).unwrap();
        assert_eq!(winter.typical, 28_750);
        assert_eq!(summer.typical, 23_000);
    }

    #[test]
    fn multipliers_compound() {
        let e = fallback_estimate(CATEGORY_GARDENING, REGION_LONDON, 5).unwrap();
        assert_eq!(e.typical, (12_000_f64 * 1.25 * 1.12).round() as Cents);
    }

    #[test]
    fn unknown_category_or_month_is_rejected() {
        assert!(fallback_estimate("astrology", "other", 1).is_err());
        assert!(fallback_estimate(CATEGORY_PLUMBING, "other", 13).is_err());
        assert!(fallback_estimate(CATEGORY_PLUMBING, "other", 0).is_err());
    }

    #[test]
    fn verdict_thresholds() {
        let e = estimate(10_000);
        assert_eq!(assess_quote(7_999, &e).unwrap().verdict, PriceVerdict::UnusuallyLow);
        assert_eq!(assess_quote(8_000, &e).unwrap().verdict, PriceVerdict::Fair);
        assert_eq!(assess_quote(11_500, &e).unwrap().verdict, PriceVerdict::Fair);
        assert_eq!(assess_quote(11_501, &e).unwrap().verdict, PriceVerdict::AboveAverage);
        assert_eq!(assess_quote(14_000, &e).unwrap().verdict, PriceVerdict::AboveAverage);
        assert_eq!(assess_quote(14_001, &e).unwrap().verdict, PriceVerdict::Overpriced);
    }

    #[test]
    fn assessment_numbers() {
        let a = assess_quote(12_000, &estimate(10_000)).unwrap();
        assert_eq!(a.percent_of_typical, 120);
        assert_eq!(a.difference_from_typical, 2_000);
        assert!(assess_quote(0, &estimate(10_000)).is_err());
    }

    #[test]
    fn ai_estimate_in_pounds_is_converted() {
        let json = serde_json::json!({"low": 90.0, "typical": 140.5, "high": 300, "rationale": "Tap swap"});
        let e = parse_ai_estimate(&json).unwrap();
        assert_eq!((e.low, e.typical, e.high), (9_000, 14_050, 30_000));
        assert_eq!(e.source, SOURCE_AI);
        assert_eq!(e.rationale, "Tap swap");
    }

    #[test]
    fn implausible_ai_estimates_are_dropped() {
        assert!(parse_ai_estimate(&serde_json::json!({"low": 200, "typical": 100, "high": 300})).is_none());
        assert!(parse_ai_estimate(&serde_json::json!({"low": -5, "typical": 100, "high": 300})).is_none());
        assert!(parse_ai_estimate(&serde_json::json!({"price": 100})).is_none());
    }

    #[test]
    fn verdict_labels() {
        assert_eq!(PriceVerdict::Fair.label(), "Fair price");
        assert_eq!(PriceVerdict::Overpriced.as_str(), "OVERPRICED");
    }
}
