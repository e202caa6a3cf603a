//! Column statistics and sheet keyword profiles.
//!
//! Everything here is a pure function of a [`SheetSnapshot`].

use std::collections::BTreeSet;

use qfill_model::{CellValue, ColumnStats, SheetSnapshot, TypeHint};

/// Values at least this long count as long text.
pub const LONG_TEXT_THRESHOLD: usize = 100;
/// Values shorter than this count as short labels.
pub const SHORT_TEXT_THRESHOLD: usize = 20;
/// Average length under which a column reads as short labels.
pub const SHORT_LABEL_MAX_AVG: f64 = 40.0;
/// Share of long values that marks a column as long text.
pub const LONG_TEXT_RATIO: f64 = 0.3;
/// Share of numeric values that marks a column as numeric.
pub const NUMERIC_RATIO: f64 = 0.9;
/// Rows and columns scanned for sheet keyword profiles.
pub const PROFILE_ROWS: usize = 10;
pub const PROFILE_COLUMNS: usize = 5;

/// Header words suggesting a question column.
pub const QUESTION_HEADER_KEYWORDS: &[&str] = &[
    "requirement",
    "question",
    "description",
    "item",
    "criteria",
    "criterion",
    "feature",
    "capability",
    "specification",
    "functionality",
    "control",
];

/// Header words suggesting an answer column.
pub const ANSWER_HEADER_KEYWORDS: &[&str] = &[
    "status",
    "response",
    "answer",
    "comment",
    "compliance",
    "compliant",
    "remark",
    "yes",
    "no",
    "explanation",
    "evidence",
    "notes",
    "vendor",
    "reply",
];

/// Phrases typical of instruction or guideline text.
pub const CONTENT_INDICATORS: &[&str] = &[
    "instruction",
    "guideline",
    "overview",
    "introduction",
    "please fill",
    "complete the",
    "provide information",
    "note:",
    "important:",
    "how to",
    "please ensure",
    "this document",
    "the purpose",
    "background",
    "context",
    "explanation",
];

/// Phrases typical of requirement or question text.
pub const QUESTION_INDICATORS: &[&str] = &[
    "requirement",
    "compliance",
    "must",
    "shall",
    "provide",
    "describe your",
    "list all",
    "specify",
    "detail",
    "yes/no",
    "supported",
    "available",
    "capability",
];

/// Lowercase alphanumeric tokens of a header.
pub fn header_tokens(header: &str) -> Vec<String> {
    header
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count how many keywords appear among the header's tokens.
///
/// Short keywords (three letters or fewer) must match a whole token; longer
/// keywords also match as a token prefix so plurals count.
pub fn keyword_hits(header: &str, keywords: &[&str]) -> usize {
    let tokens = header_tokens(header);
    keywords
        .iter()
        .filter(|kw| {
            tokens.iter().any(|t| {
                if kw.len() <= 3 {
                    t == *kw
                } else {
                    t.starts_with(*kw)
                }
            })
        })
        .count()
}

fn is_numeric_text(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse::<f64>().is_ok()
}

/// Statistics for one column of a sheet's data rows.
pub fn column_stats(sheet: &SheetSnapshot, column: usize) -> ColumnStats {
    let header = sheet.header_text(column);
    let values = sheet.column_values(column);
    let total = values.len();

    let mut non_empty = 0usize;
    let mut length_sum = 0usize;
    let mut long = 0usize;
    let mut short = 0usize;
    let mut numeric = 0usize;
    let mut distinct: BTreeSet<String> = BTreeSet::new();

    for value in &values {
        if value.is_empty() {
            continue;
        }
        let text = value.as_text();
        let len = text.chars().count();
        non_empty += 1;
        length_sum += len;
        if len >= LONG_TEXT_THRESHOLD {
            long += 1;
        }
        if len < SHORT_TEXT_THRESHOLD {
            short += 1;
        }
        if matches!(value, CellValue::Number(_)) || is_numeric_text(&text) {
            numeric += 1;
        }
        distinct.insert(text);
    }

    let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 };
    let avg_length = ratio(length_sum, non_empty);
    let long_text_ratio = ratio(long, non_empty);
    let numeric_ratio = ratio(numeric, non_empty);

    let type_hint = if non_empty == 0 {
        // Fresh questionnaires leave answer columns empty; only the header speaks.
        if !header.is_empty() && header.chars().count() as f64 <= SHORT_LABEL_MAX_AVG {
            TypeHint::ShortLabel
        } else {
            TypeHint::Mixed
        }
    } else if numeric_ratio > NUMERIC_RATIO {
        TypeHint::Numeric
    } else if avg_length >= LONG_TEXT_THRESHOLD as f64 || long_text_ratio > LONG_TEXT_RATIO {
        TypeHint::LongText
    } else if avg_length < SHORT_LABEL_MAX_AVG {
        TypeHint::ShortLabel
    } else {
        TypeHint::Mixed
    };

    ColumnStats {
        index: column,
        question_keyword_hits: keyword_hits(&header, QUESTION_HEADER_KEYWORDS),
        answer_keyword_hits: keyword_hits(&header, ANSWER_HEADER_KEYWORDS),
        header,
        avg_length,
        fill_ratio: ratio(non_empty, total),
        distinct_ratio: ratio(distinct.len(), non_empty),
        long_text_ratio,
        short_text_ratio: ratio(short, non_empty),
        numeric_ratio,
        type_hint,
        non_empty,
        total,
    }
}

/// Statistics for every populated column of a sheet, left to right.
pub fn sheet_column_stats(sheet: &SheetSnapshot) -> Vec<ColumnStats> {
    sheet
        .populated_columns()
        .into_iter()
        .map(|column| column_stats(sheet, column))
        .collect()
}

/// Up to `limit` distinct non-empty values of a column, in row order.
pub fn sample_values(sheet: &SheetSnapshot, column: usize, limit: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut samples = Vec::new();
    for value in sheet.column_values(column) {
        if samples.len() >= limit {
            break;
        }
        let text = value.as_text();
        if !text.is_empty() && seen.insert(text.clone()) {
            samples.push(text);
        }
    }
    samples
}

/// Keyword and shape evidence used to classify a whole sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetProfile {
    pub data_rows: usize,
    pub content_hits: usize,
    pub question_hits: usize,
    /// Populated columns whose values average at least a short sentence.
    pub long_text_columns: usize,
    pub short_label_columns: usize,
    /// Total characters across all cells; used to find the smallest sheet.
    pub text_volume: usize,
}

/// Profile the top-left corner of a sheet together with its column stats.
pub fn sheet_profile(sheet: &SheetSnapshot, stats: &[ColumnStats]) -> SheetProfile {
    let mut content_hits = 0;
    let mut question_hits = 0;
    for row in sheet.rows.iter().take(PROFILE_ROWS) {
        for (_, value) in row.cells.iter().take(PROFILE_COLUMNS) {
            let text = value.as_text().to_lowercase();
            content_hits += CONTENT_INDICATORS
                .iter()
                .filter(|kw| text.contains(*kw))
                .count();
            question_hits += QUESTION_INDICATORS
                .iter()
                .filter(|kw| text.contains(*kw))
                .count();
        }
    }
    let text_volume = sheet
        .rows
        .iter()
        .flat_map(|row| row.cells.values())
        .map(|value| value.as_text().chars().count())
        .sum();
    SheetProfile {
        data_rows: sheet.data_row_count(),
        content_hits,
        question_hits,
        long_text_columns: stats
            .iter()
            .filter(|s| {
                s.non_empty > 0 && matches!(s.type_hint, TypeHint::LongText | TypeHint::Mixed)
            })
            .count(),
        short_label_columns: stats
            .iter()
            .filter(|s| s.type_hint == TypeHint::ShortLabel)
            .count(),
        text_volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(n: usize) -> String {
        "x".repeat(n)
    }

    #[test]
    fn long_text_column_is_detected() {
        let a = long(150);
        let grid = vec![
            vec!["Description".to_string(), "Status".to_string()],
            vec![a.clone(), String::new()],
            vec![a, String::new()],
        ];
        let sheet = SheetSnapshot::from_text_grid("Reqs", &grid);
        let stats = sheet_column_stats(&sheet);
        assert_eq!(stats[0].type_hint, TypeHint::LongText);
        assert!((stats[0].avg_length - 150.0).abs() < f64::EPSILON);
        assert_eq!(stats[0].question_keyword_hits, 1);
        // Empty column with a short header still reads as a label column.
        assert_eq!(stats[1].type_hint, TypeHint::ShortLabel);
        assert_eq!(stats[1].answer_keyword_hits, 1);
        assert_eq!(stats[1].fill_ratio, 0.0);
    }

    #[test]
    fn numeric_detection_strips_thousands_separators() {
        let grid = vec![
            vec!["Amount"],
            vec!["1,200"],
            vec!["3,400.50"],
            vec!["12"],
        ];
        let sheet = SheetSnapshot::from_text_grid("Costs", &grid);
        let stats = column_stats(&sheet, 0);
        assert_eq!(stats.type_hint, TypeHint::Numeric);
        assert!((stats.distinct_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_keywords_need_whole_tokens() {
        assert_eq!(keyword_hits("Notes", &["no"]), 0);
        assert_eq!(keyword_hits("Yes / No", &["no"]), 1);
        assert_eq!(keyword_hits("Vendor Comments", ANSWER_HEADER_KEYWORDS), 2);
    }

    #[test]
    fn profile_counts_instruction_phrases() {
        let grid = vec![
            vec!["Introduction"],
            vec!["Please fill the response columns. Note: this document is confidential."],
        ];
        let sheet = SheetSnapshot::from_text_grid("Intro", &grid);
        let stats = sheet_column_stats(&sheet);
        let profile = sheet_profile(&sheet, &stats);
        assert!(profile.content_hits >= 4);
        assert_eq!(profile.data_rows, 1);
    }

    #[test]
    fn samples_are_distinct_and_bounded() {
        let grid = vec![vec!["H"], vec!["a"], vec!["a"], vec!["b"], vec!["c"]];
        let sheet = SheetSnapshot::from_text_grid("S", &grid);
        assert_eq!(sample_values(&sheet, 0, 2), vec!["a", "b"]);
    }
}
