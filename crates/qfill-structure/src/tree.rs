//! Builds the question forest of one sheet from its question column.

use std::collections::{BTreeMap, HashMap};

use qfill_model::{
    AuditEvent, AuditScope, CellValue, ColumnLayout, Condition, NewNode, NodeId, QuestionForest,
    QuestionKind, RowSample, SheetSnapshot,
};
use qfill_oracle::{HierarchyItem, HierarchyRequest, Oracle, OracleReply};
use tracing::{debug, warn};

use crate::hierarchy::{Fragment, MarkerFamily, parse_cell_checked};

/// Rows per hierarchy oracle request.
pub const ORACLE_CHUNK_ROWS: usize = 50;
/// Levels deeper than this in an oracle reply reject the whole chunk.
const MAX_ORACLE_LEVEL: usize = 12;
/// Characters of question text sent to the oracle per row.
const ORACLE_TEXT_CHARS: usize = 500;

/// Forest plus the conditions raised while building it.
#[derive(Debug, Clone)]
pub struct TreeOutput {
    pub forest: QuestionForest,
    pub events: Vec<AuditEvent>,
}

#[derive(Debug, Clone)]
struct OpenNode {
    id: NodeId,
    level: usize,
    family: Option<MarkerFamily>,
    /// Unmarked section headers adopt the unmarked rows below them.
    header: bool,
}

fn is_section_header(text: &str) -> bool {
    text.trim_end().ends_with(':')
}

fn kind_of(fragment: &Fragment) -> QuestionKind {
    match fragment.marker.as_ref().map(|m| m.family) {
        Some(MarkerFamily::Numbered { .. } | MarkerFamily::NumberedParen) => QuestionKind::Numbered,
        Some(MarkerFamily::Lettered | MarkerFamily::UpperLettered) => QuestionKind::Lettered,
        Some(MarkerFamily::Roman) => QuestionKind::Roman,
        Some(MarkerFamily::Bullet) => QuestionKind::Bullet,
        Some(MarkerFamily::Indented { .. }) => QuestionKind::Indented,
        None if is_section_header(&fragment.text) => QuestionKind::SectionHeader,
        None => QuestionKind::General,
    }
}

/// Builds a [`QuestionForest`] per sheet.
#[derive(Default)]
pub struct QuestionTreeBuilder<'o> {
    oracle: Option<&'o dyn Oracle>,
}

impl<'o> QuestionTreeBuilder<'o> {
    pub fn new() -> Self {
        Self { oracle: None }
    }

    /// Ask `oracle` for row levels before falling back to marker rules.
    #[must_use]
    pub fn with_oracle(mut self, oracle: &'o dyn Oracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn build(&self, sheet: &SheetSnapshot, layout: &ColumnLayout) -> TreeOutput {
        let mut events = Vec::new();
        let rows: Vec<&RowSample> = sheet.data_rows().collect();

        let parsed: Vec<(usize, Vec<Fragment>)> = rows
            .iter()
            .map(|row| (row.index, question_fragments(sheet, row, layout, &mut events)))
            .collect();

        let oracle_levels = match self.oracle {
            Some(oracle) => oracle_levels(oracle, &sheet.name, &parsed, &mut events),
            None => HashMap::new(),
        };

        let mut forest = QuestionForest::new(&sheet.name);
        let mut stack: Vec<OpenNode> = Vec::new();
        for (row, (index, fragments)) in rows.iter().zip(parsed) {
            let existing = existing_answers(row, layout);
            if fragments.is_empty() {
                if existing.is_empty() {
                    continue;
                }
                let parent = stack.last().map(|open| (open.id, open.level));
                let node = NewNode {
                    row: index,
                    text: String::new(),
                    level: parent.map_or(0, |(_, level)| level + 1),
                    kind: QuestionKind::Continuation,
                    marker: None,
                    answer_columns: layout.answer_columns.clone(),
                    existing_answers: existing,
                };
                insert(&mut forest, parent.map(|(id, _)| id), node, &sheet.name, &mut events);
                continue;
            }

            let base = oracle_levels
                .get(&index)
                .copied()
                .unwrap_or_else(|| rule_base_level(&fragments[0], &stack));
            let first_level = fragments[0].level;
            for fragment in &fragments {
                let wanted = base + fragment.level.saturating_sub(first_level);
                while stack.last().is_some_and(|open| open.level >= wanted) {
                    stack.pop();
                }
                // Gaps in the numbering collapse onto the nearest open node.
                let (parent, level) = match stack.last() {
                    Some(open) => (Some(open.id), open.level + 1),
                    None => (None, 0),
                };
                let kind = kind_of(fragment);
                let node = NewNode {
                    row: index,
                    text: fragment.text.clone(),
                    level,
                    kind,
                    marker: fragment
                        .marker
                        .as_ref()
                        .map(|m| m.token.clone())
                        .filter(|token| !token.is_empty()),
                    answer_columns: layout.answer_columns.clone(),
                    existing_answers: existing.clone(),
                };
                if let Some(id) = insert(&mut forest, parent, node, &sheet.name, &mut events) {
                    stack.push(OpenNode {
                        id,
                        level,
                        family: fragment.marker.as_ref().map(|m| m.family),
                        header: kind == QuestionKind::SectionHeader,
                    });
                }
            }
        }

        let stats = forest.stats();
        debug!(
            sheet = %sheet.name,
            nodes = stats.total,
            fillable = stats.fillable,
            max_depth = stats.max_depth,
            "Built question forest"
        );
        TreeOutput { forest, events }
    }
}

fn insert(
    forest: &mut QuestionForest,
    parent: Option<NodeId>,
    node: NewNode,
    sheet: &str,
    events: &mut Vec<AuditEvent>,
) -> Option<NodeId> {
    let row = node.row;
    match forest.insert(parent, node) {
        Ok(id) => Some(id),
        Err(error) => {
            warn!(sheet, row, %error, "Dropped question node");
            events.push(AuditEvent::new(
                sheet,
                AuditScope::Row { index: row },
                Condition::MalformedCell {
                    row,
                    detail: error.to_string(),
                },
                "row skipped",
            ));
            None
        }
    }
}

/// Parse the question cell of a row, falling back to the whole cell as one
/// item when it is malformed.
fn question_fragments(
    sheet: &SheetSnapshot,
    row: &RowSample,
    layout: &ColumnLayout,
    events: &mut Vec<AuditEvent>,
) -> Vec<Fragment> {
    let Some(cell) = row.cell(layout.question_column) else {
        return Vec::new();
    };
    if cell.is_empty() {
        return Vec::new();
    }
    let malformed = |detail: String, events: &mut Vec<AuditEvent>| {
        events.push(AuditEvent::new(
            &sheet.name,
            AuditScope::Row { index: row.index },
            Condition::MalformedCell {
                row: row.index,
                detail,
            },
            "question text kept as a single item",
        ));
    };
    match cell {
        CellValue::Text(text) => {
            let (fragments, problem) = parse_cell_checked(text);
            match problem {
                Some(detail) => {
                    malformed(detail, events);
                    vec![Fragment::flat(text)]
                }
                None => fragments,
            }
        }
        CellValue::Error(code) => {
            malformed(format!("error value {code}"), events);
            vec![Fragment::flat(code)]
        }
        other => vec![Fragment::flat(&other.as_text())],
    }
}

fn existing_answers(row: &RowSample, layout: &ColumnLayout) -> BTreeMap<usize, String> {
    layout
        .answer_columns
        .iter()
        .filter_map(|&column| {
            let value = row.cell(column)?;
            (!value.is_empty()).then(|| (column, value.as_text()))
        })
        .collect()
}

/// Level of a row's first fragment from the open-ancestor stack.
fn rule_base_level(first: &Fragment, stack: &[OpenNode]) -> usize {
    match &first.marker {
        None if is_section_header(&first.text) => 0,
        None => stack
            .iter()
            .rposition(|open| open.header)
            .map_or(0, |pos| stack[pos].level + 1),
        Some(marker) => stack
            .iter()
            .rposition(|open| open.family == Some(marker.family))
            .map(|pos| stack[pos].level)
            .or_else(|| stack.last().map(|open| open.level + 1))
            .unwrap_or(0),
    }
}

/// Row levels from the hierarchy oracle. Chunks it cannot answer in full
/// are left to the marker rules.
fn oracle_levels(
    oracle: &dyn Oracle,
    sheet: &str,
    parsed: &[(usize, Vec<Fragment>)],
    events: &mut Vec<AuditEvent>,
) -> HashMap<usize, usize> {
    let items: Vec<HierarchyItem> = parsed
        .iter()
        .filter_map(|(row, fragments)| {
            let first = fragments.first()?;
            Some(HierarchyItem {
                row: *row,
                text: first.text.chars().take(ORACLE_TEXT_CHARS).collect(),
            })
        })
        .collect();

    let mut levels = HashMap::new();
    for chunk in items.chunks(ORACLE_CHUNK_ROWS) {
        let request = HierarchyRequest {
            sheet: sheet.to_string(),
            items: chunk.to_vec(),
        };
        let failure = match oracle.hierarchy(&request) {
            Ok(OracleReply::Answer(verdict)) => {
                let answered: HashMap<usize, usize> = verdict
                    .items
                    .iter()
                    .map(|item| (item.row, item.level))
                    .collect();
                let complete = chunk.iter().all(|item| {
                    answered
                        .get(&item.row)
                        .is_some_and(|level| *level <= MAX_ORACLE_LEVEL)
                });
                if complete {
                    levels.extend(chunk.iter().map(|item| (item.row, answered[&item.row])));
                    None
                } else {
                    Some("reply did not cover every row".to_string())
                }
            }
            Ok(OracleReply::Unable(reason)) => Some(reason),
            Err(error) => Some(error.to_string()),
        };
        if let Some(detail) = failure {
            let (first, last) = (chunk[0].row, chunk[chunk.len() - 1].row);
            debug!(sheet, first, last, %detail, "Hierarchy oracle chunk fell back to rules");
            events.push(AuditEvent::new(
                sheet,
                AuditScope::Sheet,
                Condition::oracle(detail),
                format!("rule-based levels used for rows {first}-{last}"),
            ));
        }
    }
    levels
}
