//! Splits one question cell into ordered, levelled fragments.
//!
//! Markers are recognised in priority order: numbering, lettering, roman
//! numerals, bullets, then indentation. Levels are relative to the cell:
//! a leading unmarked line sits at level 0 and every marker family gets the
//! next level in order of first appearance.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3}(?:\.\d{1,3})*)([.)])?(?:\s+|$)").expect("valid dotted number pattern")
});
// A unit right after an unterminated `3.5` makes it a quantity, not a marker.
static QUANTITY_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:[kmgt]?(?:hz|b|bps|bit)|%|ms|sec|seconds?|mins?|minutes?|hrs?|hours?",
        r"|days?|weeks?|months?|years?|x|v|w|kw|mm|cm|km|kg|usd|eur|gbp)(?:[\s,.;:)]|$)",
    ))
    .expect("valid quantity unit pattern")
});
static PAREN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((\d{1,3})\)(?:\s+|$)").expect("valid number pattern"));
static LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\(([a-z])\)|([a-z])[.)])(?:\s+|$)").expect("valid letter pattern")
});
static UPPER_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\(([A-Z])\)|([A-Z])[.)])(?:\s+|$)").expect("valid letter pattern")
});
static ROMAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\(([ivx]{1,5})\)|([ivx]{1,5})[.)])(?:\s+|$)").expect("valid roman pattern")
});
static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([•\-\*–▪◦·●○■])(?:\s+|$)").expect("valid bullet pattern")
});

// Inline sequences: `a) ... b) ...` and `1) ... 2) ...` on one line.
static INLINE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\(?([a-z])\))\s").expect("valid inline letter pattern"));
static INLINE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\(?(\d{1,2})\))\s").expect("valid inline number pattern")
});
static INLINE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(•)\s").expect("valid inline bullet pattern"));

const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum MarkerFamily {
    /// `1.`, `1.2`, `1.2.3.`; depth is the number of components.
    Numbered { depth: usize },
    /// `1)`, `(1)`.
    NumberedParen,
    Lettered,
    UpperLettered,
    Roman,
    Bullet,
    /// No marker, only deeper indentation than the cell's first line.
    Indented { width: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub family: MarkerFamily,
    /// Marker as written, e.g. `a)` or `1.2.`.
    pub token: String,
    /// Position in its sequence (`b)` is 2), when it has one.
    pub ordinal: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub level: usize,
    pub marker: Option<Marker>,
}

impl Fragment {
    /// The whole cell as one unmarked level-0 fragment.
    pub fn flat(text: &str) -> Self {
        Self {
            text: text.trim().to_string(),
            level: 0,
            marker: None,
        }
    }
}

fn roman_value(token: &str) -> Option<usize> {
    let digit = |c: char| match c {
        'i' => Some(1),
        'v' => Some(5),
        'x' => Some(10),
        _ => None,
    };
    let values: Option<Vec<usize>> = token.chars().map(digit).collect();
    let values = values?;
    let mut total = 0;
    for (i, v) in values.iter().enumerate() {
        if values.get(i + 1).is_some_and(|next| next > v) {
            total -= *v as isize;
        } else {
            total += *v as isize;
        }
    }
    usize::try_from(total).ok().filter(|t| *t > 0)
}

fn first_group<'t>(caps: &regex::Captures<'t>) -> &'t str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map_or("", |m| m.as_str())
}

/// Detect a marker at the start of `line` (already left-trimmed).
///
/// `prev_letter` is the ordinal of the last lettered marker in the cell and
/// decides whether `i)`, `v)` or `x)` continue a letter sequence or start a
/// roman one.
pub fn detect_marker(line: &str, prev_letter: Option<usize>) -> Option<Marker> {
    let token_of = |caps: &regex::Captures<'_>| {
        caps.get(0)
            .map_or(String::new(), |m| m.as_str().trim_end().to_string())
    };

    if let Some(caps) = DOTTED.captures(line) {
        let number = caps.get(1).map_or("", |m| m.as_str());
        let terminator = caps.get(2).map(|m| m.as_str());
        let depth = number.split('.').count();
        let rest = caps.get(0).map_or("", |m| &line[m.end()..]);
        let quantity = depth == 2 && terminator.is_none() && QUANTITY_UNIT.is_match(rest);
        if (depth > 1 && !quantity) || terminator.is_some() {
            let family = if depth == 1 && terminator == Some(")") {
                MarkerFamily::NumberedParen
            } else {
                MarkerFamily::Numbered { depth }
            };
            let ordinal = number.rsplit('.').next().and_then(|n| n.parse().ok());
            return Some(Marker {
                family,
                token: token_of(&caps),
                ordinal,
            });
        }
    }
    if let Some(caps) = PAREN_NUMBER.captures(line) {
        return Some(Marker {
            family: MarkerFamily::NumberedParen,
            token: token_of(&caps),
            ordinal: caps.get(1).and_then(|m| m.as_str().parse().ok()),
        });
    }
    if let Some(caps) = LETTER.captures(line) {
        let letter = first_group(&caps).chars().next().unwrap_or('a');
        let ordinal = letter as usize - 'a' as usize + 1;
        let continues_letters = prev_letter.is_some_and(|p| p + 1 == ordinal);
        if continues_letters || !matches!(letter, 'i' | 'v' | 'x') {
            return Some(Marker {
                family: MarkerFamily::Lettered,
                token: token_of(&caps),
                ordinal: Some(ordinal),
            });
        }
    }
    if let Some(caps) = ROMAN.captures(line)
        && let Some(value) = roman_value(first_group(&caps))
    {
        return Some(Marker {
            family: MarkerFamily::Roman,
            token: token_of(&caps),
            ordinal: Some(value),
        });
    }
    if let Some(caps) = UPPER_LETTER.captures(line) {
        let letter = first_group(&caps).chars().next().unwrap_or('A');
        return Some(Marker {
            family: MarkerFamily::UpperLettered,
            token: token_of(&caps),
            ordinal: Some(letter as usize - 'A' as usize + 1),
        });
    }
    if let Some(caps) = BULLET.captures(line) {
        return Some(Marker {
            family: MarkerFamily::Bullet,
            token: token_of(&caps),
            ordinal: None,
        });
    }
    None
}

/// Byte offsets where an inline sequence starting at the first element
/// begins, when at least two consecutive elements appear in order.
fn inline_sequence(
    line: &str,
    pattern: &Regex,
    ordinal_of: fn(&str) -> Option<usize>,
) -> Vec<usize> {
    let mut expected = 1;
    let mut starts = Vec::new();
    for caps in pattern.captures_iter(line) {
        let (Some(marker), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if ordinal_of(value.as_str()) == Some(expected) {
            starts.push(marker.start());
            expected += 1;
        }
    }
    if starts.len() >= 2 { starts } else { Vec::new() }
}

fn letter_ordinal(s: &str) -> Option<usize> {
    s.chars().next().map(|c| c as usize - 'a' as usize + 1)
}

fn number_ordinal(s: &str) -> Option<usize> {
    s.parse().ok()
}

/// Split one physical line at inline markers. Returns the line unchanged
/// when it holds no inline sequence.
fn split_inline(line: &str) -> Vec<&str> {
    let mut starts = inline_sequence(line, &INLINE_NUMBER, number_ordinal);
    if starts.is_empty() {
        starts = inline_sequence(line, &INLINE_LETTER, letter_ordinal);
    }
    if starts.is_empty() {
        let bullets: Vec<usize> = INLINE_BULLET
            .captures_iter(line)
            .filter_map(|caps| caps.get(1).map(|m| m.start()))
            .collect();
        if bullets.len() >= 2 {
            starts = bullets;
        }
    }
    if starts.is_empty() {
        return vec![line];
    }
    let mut pieces = Vec::with_capacity(starts.len() + 1);
    let mut cursor = 0;
    for start in starts {
        pieces.push(&line[cursor..start]);
        cursor = start;
    }
    pieces.push(&line[cursor..]);
    pieces
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

struct RawItem {
    text: String,
    marker: Option<Marker>,
}

fn collect_items(text: &str) -> Vec<RawItem> {
    let mut items: Vec<RawItem> = Vec::new();
    let mut first_indent: Option<usize> = None;
    let mut prev_letter: Option<usize> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indent_width(line);
        let base_indent = *first_indent.get_or_insert(indent);
        for piece in split_inline(line) {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            if let Some(marker) = detect_marker(piece, prev_letter) {
                if marker.family == MarkerFamily::Lettered {
                    prev_letter = marker.ordinal;
                }
                items.push(RawItem {
                    text: piece.to_string(),
                    marker: Some(marker),
                });
                continue;
            }
            let last_is_marked = items.last().is_some_and(|item| {
                item.marker
                    .as_ref()
                    .is_some_and(|m| !matches!(m.family, MarkerFamily::Indented { .. }))
            });
            match items.last_mut() {
                None => items.push(RawItem {
                    text: piece.to_string(),
                    marker: None,
                }),
                Some(last) if last_is_marked || indent <= base_indent => {
                    last.text.push('\n');
                    last.text.push_str(piece);
                }
                Some(_) => items.push(RawItem {
                    text: piece.to_string(),
                    marker: Some(Marker {
                        family: MarkerFamily::Indented { width: indent },
                        token: String::new(),
                        ordinal: None,
                    }),
                }),
            }
        }
    }
    items
}

/// Parse a cell into fragments. Never fails: input without any marker
/// yields one level-0 fragment holding the trimmed text.
pub fn parse_cell(text: &str) -> Vec<Fragment> {
    let items = collect_items(text);
    if items.iter().all(|item| item.marker.is_none()) {
        return if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![Fragment::flat(text)]
        };
    }

    let has_header = items.first().is_some_and(|item| item.marker.is_none());
    let mut families: Vec<MarkerFamily> = Vec::new();
    items
        .into_iter()
        .filter(|item| !item.text.trim().is_empty())
        .map(|item| {
            let level = match &item.marker {
                None => 0,
                Some(marker) => {
                    let rank = families
                        .iter()
                        .position(|f| *f == marker.family)
                        .unwrap_or_else(|| {
                            families.push(marker.family);
                            families.len() - 1
                        });
                    rank + usize::from(has_header)
                }
            };
            Fragment {
                text: item.text,
                level,
                marker: item.marker,
            }
        })
        .collect()
}

/// Like [`parse_cell`], but also reports why a cell looks malformed.
///
/// A cell is malformed when it holds control characters other than line
/// breaks and tabs, or a marker with no text after it. Callers usually fall
/// back to [`Fragment::flat`] in that case.
pub fn parse_cell_checked(text: &str) -> (Vec<Fragment>, Option<String>) {
    if text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return (parse_cell(text), Some("control characters in cell".to_string()));
    }
    let fragments = parse_cell(text);
    let bare = fragments.iter().find(|f| {
        f.marker
            .as_ref()
            .is_some_and(|m| !m.token.is_empty() && f.text.trim() == m.token)
    });
    let problem = bare.map(|f| format!("marker '{}' without text", f.text.trim()));
    (fragments, problem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(text: &str) -> Vec<(usize, String)> {
        parse_cell(text)
            .into_iter()
            .map(|f| (f.level, f.text))
            .collect()
    }

    #[test]
    fn inline_letters_split_under_header() {
        assert_eq!(
            levels("Requirements: a) Must support SSL b) Must log access"),
            vec![
                (0, "Requirements:".to_string()),
                (1, "a) Must support SSL".to_string()),
                (1, "b) Must log access".to_string()),
            ]
        );
    }

    #[test]
    fn marker_free_text_is_one_fragment() {
        assert_eq!(
            levels("  Do you support single sign-on?\n"),
            vec![(0, "Do you support single sign-on?".to_string())]
        );
        assert!(parse_cell("   \n  ").is_empty());
    }

    #[test]
    fn nested_numbering_and_letters() {
        let text = "1. Security\n1.1 Encryption\na) at rest\nb) in transit\n2. Availability";
        assert_eq!(
            levels(text),
            vec![
                (0, "1. Security".to_string()),
                (1, "1.1 Encryption".to_string()),
                (2, "a) at rest".to_string()),
                (2, "b) in transit".to_string()),
                (0, "2. Availability".to_string()),
            ]
        );
    }

    #[test]
    fn unmarked_lines_continue_the_previous_item() {
        assert_eq!(
            levels("The vendor shall:\n- keep logs\n  for one year\n- rotate keys"),
            vec![
                (0, "The vendor shall:".to_string()),
                (1, "- keep logs\nfor one year".to_string()),
                (1, "- rotate keys".to_string()),
            ]
        );
    }

    #[test]
    fn roman_numerals_follow_letters() {
        let text = "a) Backups\ni) daily\nii) weekly\nb) Restore";
        let parsed = parse_cell(text);
        let families: Vec<MarkerFamily> = parsed
            .iter()
            .filter_map(|f| f.marker.as_ref().map(|m| m.family))
            .collect();
        assert_eq!(
            families,
            vec![
                MarkerFamily::Lettered,
                MarkerFamily::Roman,
                MarkerFamily::Roman,
                MarkerFamily::Lettered
            ]
        );
        assert_eq!(parsed[1].level, 1);
        assert_eq!(parsed[3].level, 0);
    }

    #[test]
    fn letter_i_continues_a_letter_sequence() {
        let text = "g) seven\nh) eight\ni) nine";
        let parsed = parse_cell(text);
        assert!(parsed.iter().all(|f| f.level == 0));
        assert_eq!(
            parsed[2].marker.as_ref().map(|m| m.family),
            Some(MarkerFamily::Lettered)
        );
    }

    #[test]
    fn indentation_creates_levels_without_markers() {
        assert_eq!(
            levels("Access control\n    Role based\n    Attribute based"),
            vec![
                (0, "Access control".to_string()),
                (1, "Role based".to_string()),
                (1, "Attribute based".to_string()),
            ]
        );
    }

    #[test]
    fn single_inline_marker_does_not_split() {
        assert_eq!(
            levels("Support for plan b) is optional"),
            vec![(0, "Support for plan b) is optional".to_string())]
        );
    }

    #[test]
    fn bare_markers_are_malformed() {
        let (_, problem) = parse_cell_checked("Options:\na)\nb) Second");
        assert_eq!(problem.as_deref(), Some("marker 'a)' without text"));
        let (_, problem) = parse_cell_checked("bad\u{0007}bell");
        assert!(problem.is_some());
        let (_, problem) = parse_cell_checked("a) fine\nb) also fine");
        assert!(problem.is_none());
    }

    #[test]
    fn decimal_quantities_are_not_numbering() {
        assert!(detect_marker("3.5 GHz CPU required", None).is_none());
        assert!(detect_marker("2.5 hours maximum response time", None).is_none());
        assert_eq!(
            detect_marker("1.1 Encryption", None).map(|m| m.family),
            Some(MarkerFamily::Numbered { depth: 2 })
        );
        assert_eq!(
            detect_marker("3.5. GHz class processors", None).map(|m| m.family),
            Some(MarkerFamily::Numbered { depth: 2 })
        );
        assert_eq!(
            levels("3.5 GHz CPU required"),
            vec![(0, "3.5 GHz CPU required".to_string())]
        );
    }

    #[test]
    fn roman_values() {
        assert_eq!(roman_value("iv"), Some(4));
        assert_eq!(roman_value("xii"), Some(12));
        assert_eq!(roman_value("q"), None);
    }
}
