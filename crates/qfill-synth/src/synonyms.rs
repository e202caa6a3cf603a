//! Header vocabulary used to pick a value family for an answer column.

use qfill_ingest::header_tokens;
use qfill_model::{Polarity, ValueFamily};
use rapidfuzz::distance::jaro_winkler;

/// Minimum Jaro-Winkler similarity for a fuzzy token match.
pub const FUZZY_THRESHOLD: f64 = 0.92;
/// Tokens shorter than this only match exactly.
const FUZZY_MIN_LEN: usize = 4;

const EXPLANATION: &[&str] = &[
    "comment",
    "comments",
    "remark",
    "remarks",
    "note",
    "notes",
    "explanation",
    "explain",
    "justification",
    "details",
    "clarification",
    "rationale",
];

const EVIDENCE: &[&str] = &[
    "evidence",
    "reference",
    "references",
    "documentation",
    "attachment",
    "attachments",
    "proof",
    "link",
    "certification",
];

const COST: &[&str] = &["cost", "costs", "price", "pricing", "fee", "fees", "charge", "charges"];

const DATE: &[&str] = &["date", "deadline", "timeline", "due", "eta", "when"];

const NUMERIC: &[&str] = &[
    "quantity", "qty", "count", "amount", "score", "percentage", "percent", "volume", "rating",
];

const STATUS: &[&str] = &[
    "status",
    "compliance",
    "compliant",
    "comply",
    "complies",
    "response",
    "answer",
    "yes",
    "no",
    "supported",
    "availability",
    "available",
    "conformance",
    "meets",
];

/// Families in match priority: a header naming both a status and a comment
/// ("Compliance Comments") is a comment column.
const FAMILY_TABLE: &[(ValueFamily, &[&str])] = &[
    (ValueFamily::Explanation, EXPLANATION),
    (ValueFamily::Evidence, EVIDENCE),
    (ValueFamily::Cost, COST),
    (ValueFamily::Date, DATE),
    (ValueFamily::Numeric, NUMERIC),
    (ValueFamily::Status, STATUS),
];

const MARK_POSITIVE: &[&str] = &[
    "compliant",
    "fully compliant",
    "complies",
    "comply",
    "yes",
    "supported",
    "fully supported",
    "meets",
    "c",
    "fc",
];

const MARK_NEGATIVE: &[&str] = &[
    "not compliant",
    "non compliant",
    "noncompliant",
    "does not comply",
    "no",
    "not supported",
    "unsupported",
    "nc",
];

const MARK_PARTIAL: &[&str] = &[
    "partial",
    "partially",
    "partially compliant",
    "partly compliant",
    "partially supported",
    "pc",
];

fn token_matches(token: &str, synonym: &str) -> bool {
    if token == synonym {
        return true;
    }
    token.chars().count() >= FUZZY_MIN_LEN
        && synonym.chars().count() >= FUZZY_MIN_LEN
        && jaro_winkler::similarity(token.chars(), synonym.chars()) >= FUZZY_THRESHOLD
}

/// Value family named by a header, if any token matches the table.
pub fn family_for_header(header: &str) -> Option<ValueFamily> {
    let tokens = header_tokens(header);
    FAMILY_TABLE
        .iter()
        .find(|(_, synonyms)| {
            tokens
                .iter()
                .any(|token| synonyms.iter().any(|s| token_matches(token, s)))
        })
        .map(|(family, _)| *family)
}

/// Polarity of a checkbox-matrix header such as `Not Compliant`.
///
/// Only whole-header matches count; `Compliance Status` is not a mark
/// column.
pub fn mark_polarity(header: &str) -> Option<Polarity> {
    let phrase = header_tokens(header).join(" ");
    if phrase.is_empty() {
        return None;
    }
    [
        (Polarity::Negative, MARK_NEGATIVE),
        (Polarity::Partial, MARK_PARTIAL),
        (Polarity::Positive, MARK_POSITIVE),
    ]
    .into_iter()
    .find(|(_, phrases)| phrases.contains(&phrase.as_str()))
    .map(|(polarity, _)| polarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_map_to_families() {
        assert_eq!(family_for_header("Compliance (Y/N)"), Some(ValueFamily::Status));
        assert_eq!(family_for_header("Vendor Comments"), Some(ValueFamily::Explanation));
        assert_eq!(family_for_header("Compliance Comments"), Some(ValueFamily::Explanation));
        assert_eq!(family_for_header("Supporting Evidence"), Some(ValueFamily::Evidence));
        assert_eq!(family_for_header("Additional Costs"), Some(ValueFamily::Cost));
        assert_eq!(family_for_header("Availability Date"), Some(ValueFamily::Date));
        assert_eq!(family_for_header("Misc"), None);
    }

    #[test]
    fn misspelled_headers_match_fuzzily() {
        assert_eq!(family_for_header("Commments"), Some(ValueFamily::Explanation));
        assert_eq!(family_for_header("Compliancy"), Some(ValueFamily::Status));
    }

    #[test]
    fn mark_headers_need_whole_phrase() {
        assert_eq!(mark_polarity("Non-Compliant"), Some(Polarity::Negative));
        assert_eq!(mark_polarity("Partially Compliant"), Some(Polarity::Partial));
        assert_eq!(mark_polarity("Compliant"), Some(Polarity::Positive));
        assert_eq!(mark_polarity("Compliance Status"), None);
    }
}
