//! SnapFix: first-pass diagnosis of a household problem.
//!
//! The LLM path sends the customer's description (and photo URL) to the
//! vision model and validates its JSON with [`parse_ai_diagnosis`]. Without
//! a key, or when that fails, [`fallback_diagnosis`] matches symptom keywords
//! against a static table.

use serde::{Deserialize, Serialize};

use crate::categories::{
    validate_category, CATEGORY_APPLIANCE_REPAIR, CATEGORY_CARPENTRY, CATEGORY_ELECTRICAL,
    CATEGORY_GARDENING, CATEGORY_HANDYMAN, CATEGORY_HEATING, CATEGORY_LOCKSMITH,
    CATEGORY_PAINTING, CATEGORY_PEST_CONTROL, CATEGORY_PLUMBING, CATEGORY_ROOFING,
};
use crate::error::CoreError;
use crate::pricing::{SOURCE_AI, SOURCE_FALLBACK};
use crate::types::Cents;

/// Longest description accepted for diagnosis.
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
/// Shortest description that carries enough signal.
pub const MIN_DESCRIPTION_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Emergency,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Emergency => "EMERGENCY",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Can wait",
            Self::Medium => "Book within a week",
            Self::High => "Book within 48 hours",
            Self::Emergency => "Get help now",
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub likely_issue: String,
    pub category: String,
    pub urgency: Urgency,
    pub diy_possible: bool,
    pub estimated_low: Cents,
    pub estimated_high: Cents,
    pub advice: String,
    /// [`SOURCE_AI`] or [`SOURCE_FALLBACK`].
    pub source: String,
}

struct Rule {
    keywords: &'static [&'static str],
    issue: &'static str,
    category: &'static str,
    urgency: Urgency,
    diy: bool,
    low: Cents,
    high: Cents,
    advice: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        keywords: &["gas", "smell of gas", "carbon monoxide"],
        issue: "Possible gas leak",
        category: CATEGORY_HEATING,
        urgency: Urgency::Emergency,
        diy: false,
        low: 0,
        high: 30_000,
        advice: "Leave the property, do not use switches, and call the gas emergency line",
    },
    Rule {
        keywords: &["burst", "flooding", "water everywhere", "pipe leak"],
        issue: "Burst or leaking pipe",
        category: CATEGORY_PLUMBING,
        urgency: Urgency::Emergency,
        diy: false,
        low: 12_000,
        high: 40_000,
        advice: "Turn off the stopcock and isolate electrics near the water",
    },
    Rule {
        keywords: &["drip", "dripping", "tap", "faucet"],
        issue: "Dripping tap (worn washer or cartridge)",
        category: CATEGORY_PLUMBING,
        urgency: Urgency::Low,
        diy: true,
        low: 6_000,
        high: 15_000,
        advice: "Replacing the washer or cartridge is a common DIY fix",
    },
    Rule {
        keywords: &["blocked", "clogged", "drain", "toilet"],
        issue: "Blocked drain or toilet",
        category: CATEGORY_PLUMBING,
        urgency: Urgency::Medium,
        diy: true,
        low: 7_000,
        high: 20_000,
        advice: "Try a plunger first; avoid chemical cleaners on old pipes",
    },
    Rule {
        keywords: &["boiler", "no hot water", "radiator", "pressure"],
        issue: "Boiler or heating fault",
        category: CATEGORY_HEATING,
        urgency: Urgency::High,
        diy: false,
        low: 9_000,
        high: 45_000,
        advice: "Check the boiler pressure gauge; repressurise only if the manual allows it",
    },
    Rule {
        keywords: &["spark", "burning smell", "scorch", "shock"],
        issue: "Electrical fault with fire risk",
        category: CATEGORY_ELECTRICAL,
        urgency: Urgency::Emergency,
        diy: false,
        low: 10_000,
        high: 40_000,
        advice: "Switch off at the consumer unit and do not use the circuit",
    },
    Rule {
        keywords: &["socket", "switch", "tripping", "fuse", "light fitting"],
        issue: "Faulty socket, switch or circuit",
        category: CATEGORY_ELECTRICAL,
        urgency: Urgency::Medium,
        diy: false,
        low: 8_000,
        high: 25_000,
        advice: "Electrical work should be done by a registered electrician",
    },
    Rule {
        keywords: &["roof", "slate", "tile", "gutter", "ceiling stain"],
        issue: "Roof or gutter leak",
        category: CATEGORY_ROOFING,
        urgency: Urgency::High,
        diy: false,
        low: 15_000,
        high: 80_000,
        advice: "Catch drips and photograph damage for insurance",
    },
    Rule {
        keywords: &["locked out", "lock", "key"],
        issue: "Lock failure or lockout",
        category: CATEGORY_LOCKSMITH,
        urgency: Urgency::High,
        diy: false,
        low: 7_000,
        high: 20_000,
        advice: "Use a locksmith who quotes a fixed call-out price",
    },
    Rule {
        keywords: &["washing machine", "dishwasher", "fridge", "oven", "dryer"],
        issue: "Domestic appliance fault",
        category: CATEGORY_APPLIANCE_REPAIR,
        urgency: Urgency::Medium,
        diy: false,
        low: 6_000,
        high: 18_000,
        advice: "Note the model number and any error code before booking",
    },
    Rule {
        keywords: &["mice", "rats", "wasps", "ants", "bed bugs", "droppings"],
        issue: "Pest infestation",
        category: CATEGORY_PEST_CONTROL,
        urgency: Urgency::Medium,
        diy: false,
        low: 8_000,
        high: 30_000,
        advice: "Seal food away and note where activity is seen",
    },
    Rule {
        keywords: &["door", "hinge", "cupboard", "skirting", "floorboard"],
        issue: "Joinery repair",
        category: CATEGORY_CARPENTRY,
        urgency: Urgency::Low,
        diy: true,
        low: 6_000,
        high: 25_000,
        advice: "Small hinge and fixing jobs are often DIY-friendly",
    },
    Rule {
        keywords: &["peeling", "damp patch", "mould", "flaking paint"],
        issue: "Damp or failing paintwork",
        category: CATEGORY_PAINTING,
        urgency: Urgency::Low,
        diy: true,
        low: 10_000,
        high: 40_000,
        advice: "Find and fix the moisture source before repainting",
    },
    Rule {
        keywords: &["fence", "hedge", "lawn", "tree"],
        issue: "Garden maintenance",
        category: CATEGORY_GARDENING,
        urgency: Urgency::Low,
        diy: true,
        low: 5_000,
        high: 30_000,
        advice: "Check for nesting birds before cutting hedges in spring",
    },
];

/// Generic entry for a category when no symptom keyword matches.
fn generic_for(category: &str) -> Diagnosis {
    Diagnosis {
        likely_issue: format!("General {} issue", category.replace('_', " ")),
        category: category.to_string(),
        urgency: Urgency::Medium,
        diy_possible: false,
        estimated_low: 6_000,
        estimated_high: 25_000,
        advice: "A tradesperson will confirm the cause on inspection".to_string(),
        source: SOURCE_FALLBACK.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Logic
// ---------------------------------------------------------------------------

/// Validate the free-text description.
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    let len = description.trim().chars().count();
    if len < MIN_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Describe the problem in at least {MIN_DESCRIPTION_LEN} characters"
        )));
    }
    if len > MAX_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// Keyword diagnosis. The rule with the most keyword hits wins; ties go to
/// the more urgent rule so that safety issues are never under-reported.
pub fn fallback_diagnosis(
    description: &str,
    category_hint: Option<&str>,
) -> Result<Diagnosis, CoreError> {
    validate_description(description)?;
    if let Some(c) = category_hint {
        validate_category(c)?;
    }

    let text = description.to_lowercase();
    let best = RULES
        .iter()
        .map(|rule| {
            let hits = rule.keywords.iter().filter(|k| text.contains(*k)).count();
            (rule, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .max_by(|(a, ah), (b, bh)| ah.cmp(bh).then(a.urgency.cmp(&b.urgency)));

    let diagnosis = match best {
        Some((rule, _)) => Diagnosis {
            likely_issue: rule.issue.to_string(),
            category: rule.category.to_string(),
            urgency: rule.urgency,
            diy_possible: rule.diy,
            estimated_low: rule.low,
            estimated_high: rule.high,
            advice: rule.advice.to_string(),
            source: SOURCE_FALLBACK.to_string(),
        },
        None => generic_for(category_hint.unwrap_or(CATEGORY_HANDYMAN)),
    };
    Ok(diagnosis)
}

#[derive(Debug, Deserialize)]
struct AiDiagnosis {
    likely_issue: String,
    category: String,
    urgency: Urgency,
    diy_possible: bool,
    estimated_low: f64,
    estimated_high: f64,
    #[serde(default)]
    advice: Option<String>,
}

/// Parse and sanity-check an LLM diagnosis (costs in pounds).
pub fn parse_ai_diagnosis(json: &serde_json::Value) -> Option<Diagnosis> {
    let raw: AiDiagnosis = serde_json::from_value(json.clone()).ok()?;
    validate_category(&raw.category).ok()?;
    if raw.likely_issue.trim().is_empty()
        || !raw.estimated_low.is_finite()
        || !raw.estimated_high.is_finite()
        || raw.estimated_low < 0.0
        || raw.estimated_low > raw.estimated_high
    {
        return None;
    }
    Some(Diagnosis {
        likely_issue: raw.likely_issue,
        category: raw.category,
        urgency: raw.urgency,
        diy_possible: raw.diy_possible,
        estimated_low: (raw.estimated_low * 100.0).round() as Cents,
        estimated_high: (raw.estimated_high * 100.0).round() as Cents,
        advice: raw
            .advice
            .unwrap_or_else(|| "A tradesperson will confirm on inspection".to_string()),
        source: SOURCE_AI.to_string(),
    })
}
