use serde::{Deserialize, Serialize};

/// Document-wide context read from the content sheet.
///
/// Built once per document before question sheets are processed and shared
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalContext {
    pub document_type: String,
    pub document_purpose: String,
    pub instructions: String,
    pub guidelines: Vec<String>,
    /// Accepted answers for compliance-style columns, e.g. `Yes`, `No`.
    pub compliance_responses: Vec<String>,
    /// Sheet the context was read from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sheet: Option<String>,
}

impl GlobalContext {
    /// Context used when no content sheet exists or nothing could be read.
    pub fn generic() -> Self {
        Self {
            document_type: "Business/Technical RFI Document".to_string(),
            document_purpose: "Vendor capability and compliance assessment".to_string(),
            instructions: "Provide accurate and detailed responses to all requirements \
                           based on actual capabilities"
                .to_string(),
            guidelines: vec![
                "Provide explanations for all responses, especially negative or partial ones"
                    .to_string(),
            ],
            compliance_responses: ["Yes", "No", "Partial", "N/A"]
                .into_iter()
                .map(String::from)
                .collect(),
            source_sheet: None,
        }
    }

    /// True when answers are expected in a compliant / non-compliant form.
    ///
    /// The document type decides first, then purpose and instructions. A
    /// response vocabulary only counts when it carries a partial or
    /// compliance-specific answer.
    pub fn is_compliance(&self) -> bool {
        let document_type = self.document_type.to_lowercase();
        if let Some(verdict) = compliance_verdict(&document_type) {
            return verdict;
        }
        let text = format!("{} {}", self.document_purpose, self.instructions).to_lowercase();
        if let Some(verdict) = compliance_verdict(&text) {
            return verdict;
        }
        self.compliance_responses.iter().any(|response| {
            let response = response.trim().to_lowercase();
            response.contains("complian") || response == "partial"
        })
    }
}

const SURVEY_CUES: &[&str] = &["survey", "feedback", "satisfaction", "poll"];

const COMPLIANCE_CUES: &[&str] = &[
    "complian",
    "requirement",
    "rfp",
    "rfi",
    "rfq",
    "tender",
    "security",
    "due diligence",
    "checklist",
];

fn compliance_verdict(text: &str) -> Option<bool> {
    if SURVEY_CUES.iter().any(|cue| text.contains(cue)) {
        Some(false)
    } else if COMPLIANCE_CUES.iter().any(|cue| text.contains(cue)) {
        Some(true)
    } else {
        None
    }
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::generic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_context_is_compliance_style() {
        assert!(GlobalContext::generic().is_compliance());
    }

    #[test]
    fn survey_without_responses_is_not_compliance() {
        let context = GlobalContext {
            document_type: "Customer survey".into(),
            document_purpose: "Collect feedback".into(),
            instructions: String::new(),
            guidelines: vec![],
            compliance_responses: vec![],
            source_sheet: None,
        };
        assert!(!context.is_compliance());
    }

    #[test]
    fn survey_type_outweighs_response_vocabulary() {
        let context = GlobalContext {
            document_type: "Survey".into(),
            document_purpose: String::new(),
            instructions: "Please fill in every question".into(),
            guidelines: vec![],
            compliance_responses: vec!["Yes".into(), "No".into(), "Partial".into()],
            source_sheet: None,
        };
        assert!(!context.is_compliance());
    }

    #[test]
    fn partial_response_marks_untyped_context_as_compliance() {
        let context = GlobalContext {
            document_type: "Questionnaire".into(),
            document_purpose: String::new(),
            instructions: String::new(),
            guidelines: vec![],
            compliance_responses: vec!["Yes".into(), "Partial".into()],
            source_sheet: None,
        };
        assert!(context.is_compliance());
        let plain = GlobalContext {
            compliance_responses: vec!["Yes".into(), "No".into()],
            ..context
        };
        assert!(!plain.is_compliance());
    }
}
