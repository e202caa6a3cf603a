//! Document-wide context read from the content sheet.

use qfill_model::{AuditEvent, AuditScope, Condition, GlobalContext, SheetSnapshot};
use qfill_oracle::{ContextRequest, Oracle, OracleReply};
use qfill_structure::detect_marker;
use tracing::{debug, info};

/// Lines sent to the oracle at most.
const ORACLE_MAX_LINES: usize = 200;

/// Phrases naming the kind of document, most specific first.
const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("request for proposal", "RFP Document"),
    ("rfp", "RFP Document"),
    ("request for information", "RFI Document"),
    ("rfi", "RFI Document"),
    ("request for quotation", "RFQ Document"),
    ("rfq", "RFQ Document"),
    ("security questionnaire", "Security Questionnaire"),
    ("due diligence", "Due Diligence Questionnaire"),
    ("compliance", "Compliance Checklist"),
    ("questionnaire", "Questionnaire"),
    ("survey", "Survey"),
];

const PURPOSE_CUES: &[&str] = &["purpose", "objective", "aim of", "intended to", "goal"];

const INSTRUCTION_CUES: &[&str] = &[
    "please",
    "fill",
    "complete",
    "respond",
    "provide",
    "enter",
    "select",
    "indicate",
    "should",
    "must",
];

const GUIDELINE_CUES: &[&str] = &["note:", "important:", "guideline", "ensure", "do not"];

/// Recognised answer vocabulary, longest phrases first so that
/// "Partially Compliant" is not also read as "Compliant".
const RESPONSE_VOCABULARY: &[&str] = &[
    "Partially Compliant",
    "Not Compliant",
    "Non-Compliant",
    "Fully Compliant",
    "Not Applicable",
    "Compliant",
    "Partial",
    "Yes",
    "No",
    "N/A",
];

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack
        .match_indices(needle)
        .any(|(start, matched)| {
            let before = haystack[..start].chars().next_back();
            let after = haystack[start + matched.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
}

/// Non-empty rows of a sheet rendered as one line each.
pub fn sheet_lines(sheet: &SheetSnapshot) -> Vec<String> {
    sheet
        .rows
        .iter()
        .map(|row| {
            row.cells
                .values()
                .map(qfill_model::CellValue::as_text)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Keyword extraction used when no oracle answers. Returns `None` when the
/// lines say nothing recognisable.
pub fn context_from_lines(sheet: &str, lines: &[String]) -> Option<GlobalContext> {
    let lower: Vec<String> = lines.iter().map(|l| l.to_lowercase()).collect();
    let all = lower.join("\n");

    let document_type = DOCUMENT_TYPES
        .iter()
        .find(|(cue, _)| contains_word(&all, cue))
        .map(|(_, label)| (*label).to_string());

    let document_purpose = lines
        .iter()
        .zip(&lower)
        .find(|(_, l)| PURPOSE_CUES.iter().any(|cue| l.contains(cue)))
        .map(|(line, _)| strip_label(line));

    let instructions: Vec<&str> = lines
        .iter()
        .zip(&lower)
        .filter(|(_, l)| INSTRUCTION_CUES.iter().any(|cue| contains_word(l, cue)))
        .map(|(line, _)| line.as_str())
        .collect();

    let guidelines: Vec<String> = lines
        .iter()
        .zip(&lower)
        .filter(|(line, l)| {
            detect_marker(line.trim_start(), None).is_some()
                || GUIDELINE_CUES.iter().any(|cue| l.contains(cue))
        })
        .map(|(line, _)| line.trim().to_string())
        .collect();

    let mut responses: Vec<String> = Vec::new();
    let mut remaining = all.clone();
    for phrase in RESPONSE_VOCABULARY {
        let needle = phrase.to_lowercase();
        if contains_word(&remaining, &needle) {
            responses.push((*phrase).to_string());
            // Blank the phrase out so shorter phrases inside it do not match.
            remaining = remaining.replace(&needle, &" ".repeat(needle.len()));
        }
    }

    if document_type.is_none() && instructions.is_empty() && responses.is_empty() {
        return None;
    }
    // Generic wording only stands in when the sheet names no document type,
    // so a survey is not read as a compliance document through the defaults.
    let generic = GlobalContext::generic();
    let typed = document_type.is_some();
    let fallback = |text: String| if typed { String::new() } else { text };
    Some(GlobalContext {
        document_type: document_type.unwrap_or(generic.document_type),
        document_purpose: document_purpose.unwrap_or_else(|| fallback(generic.document_purpose)),
        instructions: if instructions.is_empty() {
            fallback(generic.instructions)
        } else {
            instructions.join(" ")
        },
        guidelines: if guidelines.is_empty() {
            generic.guidelines
        } else {
            guidelines
        },
        compliance_responses: responses,
        source_sheet: Some(sheet.to_string()),
    })
}

/// `"Purpose: to assess vendors"` becomes `"to assess vendors"`.
fn strip_label(line: &str) -> String {
    match line.split_once(':') {
        Some((label, rest)) if label.split_whitespace().count() <= 3 && !rest.trim().is_empty() => {
            rest.trim().to_string()
        }
        _ => line.trim().to_string(),
    }
}

/// Builds the [`GlobalContext`]: oracle first, keyword rules second,
/// generic defaults last.
pub struct ContextBuilder<'o> {
    oracle: &'o dyn Oracle,
}

impl<'o> ContextBuilder<'o> {
    pub fn new(oracle: &'o dyn Oracle) -> Self {
        Self { oracle }
    }

    pub fn build(&self, content: Option<&SheetSnapshot>) -> (GlobalContext, Vec<AuditEvent>) {
        let Some(sheet) = content else {
            info!("No content sheet; using generic document context");
            return (GlobalContext::generic(), Vec::new());
        };
        let lines = sheet_lines(sheet);
        let mut events = Vec::new();

        let request = ContextRequest {
            sheet: sheet.name.clone(),
            lines: lines.iter().take(ORACLE_MAX_LINES).cloned().collect(),
        };
        let detail = match self.oracle.context(&request) {
            Ok(OracleReply::Answer(mut context)) if !context.document_type.trim().is_empty() => {
                context.source_sheet = Some(sheet.name.clone());
                info!(
                    sheet = %sheet.name,
                    document_type = %context.document_type,
                    "Document context from oracle"
                );
                return (context, events);
            }
            Ok(OracleReply::Answer(_)) => "context without a document type".to_string(),
            Ok(OracleReply::Unable(reason)) => reason,
            Err(error) => error.to_string(),
        };
        events.push(AuditEvent::new(
            &sheet.name,
            AuditScope::Document,
            Condition::oracle(detail),
            "document context extracted by keyword rules",
        ));

        let context = context_from_lines(&sheet.name, &lines).unwrap_or_else(|| {
            debug!(sheet = %sheet.name, "Content sheet had no recognisable context");
            GlobalContext {
                source_sheet: Some(sheet.name.clone()),
                ..GlobalContext::generic()
            }
        });
        info!(
            sheet = %sheet.name,
            document_type = %context.document_type,
            "Document context from rules"
        );
        (context, events)
    }
}
