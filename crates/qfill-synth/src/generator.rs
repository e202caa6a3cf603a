//! Value pools and per-family value generation.

use chrono::{Days, NaiveDate};
use qfill_model::{GeneratorSpec, Polarity, ResponseType, ValueFamily};
use rand::Rng;
use rand::rngs::StdRng;

/// Mark written into the checkbox column matching a row's response.
pub const MARK: &str = "✓";
/// Written into non-matching checkbox columns only when blanks are forbidden.
pub const NO_MARK: &str = "✗";
/// Filled into a blank explanation next to a positive status.
pub const POSITIVE_FILL: &str = "Fully compliant";
/// Date format used for generated dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Candidate values per polarity plus the chance of leaving a cell blank.
#[derive(Debug, Clone, Copy)]
pub struct ValuePool {
    pub positive: &'static [&'static str],
    pub negative: &'static [&'static str],
    pub partial: &'static [&'static str],
    /// Only applied when the column's generator allows blank cells.
    pub empty_probability: f64,
}

impl ValuePool {
    pub fn values(&self, polarity: Polarity) -> &'static [&'static str] {
        match polarity {
            Polarity::Positive => self.positive,
            Polarity::Negative => self.negative,
            Polarity::Partial => self.partial,
        }
    }

    /// Which list a value belongs to, compared case-insensitively.
    pub fn polarity_of(&self, value: &str) -> Option<Polarity> {
        let value = value.trim();
        [Polarity::Positive, Polarity::Negative, Polarity::Partial]
            .into_iter()
            .find(|p| self.values(*p).iter().any(|v| v.eq_ignore_ascii_case(value)))
    }
}

pub const STATUS_POOL: ValuePool = ValuePool {
    positive: &["Yes", "Compliant", "Supported", "✓"],
    negative: &["No", "Not Compliant", "Not Supported", "✗"],
    partial: &["Partial", "Limited", "With Conditions"],
    empty_probability: 0.05,
};

pub const COMMENTS_POOL: ValuePool = ValuePool {
    positive: &[
        "Fully supported with standard configuration",
        "Available out-of-the-box",
        "Standard feature",
    ],
    negative: &[
        "Not available in current version",
        "Would require custom development",
        "Not supported",
    ],
    partial: &[
        "Available with customization",
        "Requires additional configuration",
        "Limited support available",
    ],
    empty_probability: 0.15,
};

pub const EVIDENCE_POOL: ValuePool = ValuePool {
    positive: &[
        "See product documentation",
        "Refer to the security whitepaper",
        "Certificate available on request",
    ],
    negative: &["Not applicable", "No documentation available"],
    partial: &[
        "Configuration guide available on request",
        "Roadmap document available under NDA",
    ],
    empty_probability: 0.1,
};

pub const COST_POOL: ValuePool = ValuePool {
    positive: &["Included in base cost", "No additional charge", "Standard pricing"],
    negative: &["Additional licensing required", "Custom pricing", "Not available"],
    partial: &["Additional cost may apply", "Depends on configuration", "Quote required"],
    empty_probability: 0.3,
};

pub const GENERIC_POOL: ValuePool = ValuePool {
    positive: &["Available", "Supported", "Yes"],
    negative: &["Not Available", "Not Supported", "No"],
    partial: &["Limited", "Partial", "Conditional"],
    empty_probability: 0.2,
};

const NEGATIVE_JUSTIFICATIONS: &[&str] = &[
    "Not available in the current release; meeting this would require custom development",
    "Not supported by the current product architecture",
    "Outside the scope of the standard offering",
];

const PARTIAL_JUSTIFICATIONS: &[&str] = &[
    "Supported for standard scenarios with documented limitations",
    "Available with additional configuration or services",
    "Partially supported today; full support is on the product roadmap",
];

/// Text pool backing a family, if it draws from one.
pub fn pool(family: ValueFamily) -> Option<&'static ValuePool> {
    match family {
        ValueFamily::Status => Some(&STATUS_POOL),
        ValueFamily::Explanation => Some(&COMMENTS_POOL),
        ValueFamily::Evidence => Some(&EVIDENCE_POOL),
        ValueFamily::Cost => Some(&COST_POOL),
        ValueFamily::Generic => Some(&GENERIC_POOL),
        ValueFamily::Date | ValueFamily::Numeric | ValueFamily::Mark(_) => None,
    }
}

fn pick(values: &[&str], rng: &mut StdRng) -> String {
    if values.is_empty() {
        return String::new();
    }
    values[rng.random_range(0..values.len())].to_string()
}

/// Non-empty justification for a status of the given polarity.
pub fn justification(polarity: Polarity, rng: &mut StdRng) -> String {
    match polarity {
        Polarity::Negative => pick(NEGATIVE_JUSTIFICATIONS, rng),
        Polarity::Partial => pick(PARTIAL_JUSTIFICATIONS, rng),
        Polarity::Positive => pick(COMMENTS_POOL.positive, rng),
    }
}

/// Generates cell values for a column family.
#[derive(Debug, Clone, Copy)]
pub struct ValueGenerator {
    reference_date: NaiveDate,
}

impl ValueGenerator {
    /// `reference_date` anchors generated dates so runs stay reproducible.
    pub fn new(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn generate(
        &self,
        spec: &GeneratorSpec,
        response: ResponseType,
        rng: &mut StdRng,
    ) -> String {
        let polarity = response.polarity();
        match spec.family {
            ValueFamily::Mark(own) => {
                if own == polarity {
                    MARK.to_string()
                } else {
                    String::new()
                }
            }
            ValueFamily::Date => self.date(polarity, rng),
            ValueFamily::Numeric => match polarity {
                Polarity::Positive => rng.random_range(1..=100u32).to_string(),
                Polarity::Partial => rng.random_range(1..=50u32).to_string(),
                Polarity::Negative => "0".to_string(),
            },
            family => {
                let pool = pool(family).unwrap_or(&GENERIC_POOL);
                if spec.allow_blank && rng.random::<f64>() < pool.empty_probability {
                    return String::new();
                }
                pick(pool.values(polarity), rng)
            }
        }
    }

    /// Deterministic non-blank value for a column that must not stay empty.
    pub fn fallback(&self, spec: &GeneratorSpec, response: ResponseType) -> String {
        let polarity = response.polarity();
        match spec.family {
            ValueFamily::Mark(own) if own == polarity => MARK.to_string(),
            ValueFamily::Mark(_) => NO_MARK.to_string(),
            ValueFamily::Date => self.reference_date.format(DATE_FORMAT).to_string(),
            ValueFamily::Numeric => "0".to_string(),
            family => pool(family)
                .unwrap_or(&GENERIC_POOL)
                .values(polarity)
                .first()
                .map_or_else(String::new, |v| (*v).to_string()),
        }
    }

    fn date(&self, polarity: Polarity, rng: &mut StdRng) -> String {
        let date = match polarity {
            // Available since some point in the past three years.
            Polarity::Positive => self
                .reference_date
                .checked_sub_days(Days::new(rng.random_range(30..=1095))),
            // Planned within the next year.
            Polarity::Partial => self
                .reference_date
                .checked_add_days(Days::new(rng.random_range(30..=365))),
            Polarity::Negative => return "Not scheduled".to_string(),
        };
        date.unwrap_or(self.reference_date)
            .format(DATE_FORMAT)
            .to_string()
    }
}
