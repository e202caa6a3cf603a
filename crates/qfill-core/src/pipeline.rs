//! Document pipeline: classify, structure, resolve, synthesize.
//!
//! # Stages
//!
//! 1. **Profile**: column statistics and keyword profile per sheet
//! 2. **Classify sheets**: role cascade and content sheet selection
//! 3. **Context**: [`GlobalContext`] from the content sheet
//! 4. **Analyse**: column roles, layout, question forest and fill strategy
//!    for each question sheet
//! 5. **Synthesize**: seeded responses for each question sheet
//!
//! Stages 2 and 3 run once per document. Stages 4 and 5 run on the sheet
//! worker pool; their outcomes are merged back in sheet order.

use std::path::Path;

use anyhow::{Context, Result};
use qfill_classify::{
    ColumnClassifier, SheetClassifier, SheetTarget, deferral_events, resolve_layout,
    select_content_sheet,
};
use qfill_ingest::{SheetProfile, read_workbook, sheet_column_stats, sheet_profile};
use qfill_model::{
    AuditEvent, AuditScope, ColumnClassification, ColumnLayout, ColumnStats, Condition,
    DocumentReport, FillStrategy, GlobalContext, QuestionForest, SheetReport, SheetRole,
    SheetSnapshot,
};
use qfill_structure::QuestionTreeBuilder;
use qfill_synth::{ContextBuilder, FillStrategyResolver, ResponseSynthesizer, SynthesisOutput};
use tracing::{debug, info, info_span};

use crate::pipeline_context::PipelineContext;

/// Statistics computed once per sheet and reused by every stage.
struct SheetEvidence<'s> {
    sheet: &'s SheetSnapshot,
    stats: Vec<ColumnStats>,
    profile: SheetProfile,
}

impl<'s> SheetEvidence<'s> {
    fn collect(sheet: &'s SheetSnapshot) -> Self {
        let stats = sheet_column_stats(sheet);
        let profile = sheet_profile(sheet, &stats);
        Self {
            sheet,
            stats,
            profile,
        }
    }
}

/// Structure inferred for one question sheet.
#[derive(Debug, Clone)]
pub struct SheetOutcome {
    pub columns: Vec<ColumnClassification>,
    pub layout: ColumnLayout,
    pub forest: QuestionForest,
    pub strategy: FillStrategy,
    pub audit: Vec<AuditEvent>,
}

impl SheetOutcome {
    fn merge_into(self, report: &mut SheetReport) {
        report.columns = self.columns;
        report.layout = Some(self.layout);
        report.forest = Some(self.forest);
        report.strategy = Some(self.strategy);
        report.audit.extend(self.audit);
    }
}

/// Columns, layout, forest and strategy of a single question sheet.
pub fn analyse_sheet(
    ctx: &PipelineContext,
    sheet: &SheetSnapshot,
    stats: &[ColumnStats],
    context: &GlobalContext,
) -> SheetOutcome {
    let oracle = ctx.oracle();
    let mut audit = Vec::new();

    let columns = ColumnClassifier::new(oracle).classify(sheet, stats);
    for column in &columns {
        audit.extend(deferral_events(
            &sheet.name,
            &AuditScope::Column {
                index: column.index,
            },
            &column.trail,
        ));
    }
    let (layout, layout_events) = resolve_layout(sheet, &columns);
    audit.extend(layout_events);

    let mut builder = QuestionTreeBuilder::new();
    if ctx.options.hierarchy_oracle {
        builder = builder.with_oracle(oracle);
    }
    let tree = builder.build(sheet, &layout);
    audit.extend(tree.events);

    let (strategy, strategy_events) = FillStrategyResolver::new(oracle)
        .with_distribution(ctx.options.distribution.clone())
        .resolve(sheet, &layout, &tree.forest, context);
    audit.extend(strategy_events);

    info!(
        question_column = layout.question_column,
        answer_columns = layout.answer_columns.len(),
        nodes = tree.forest.len(),
        fillable = tree.forest.fillable().len(),
        distribution = %strategy.distribution_source,
        "Analysed sheet"
    );
    SheetOutcome {
        columns,
        layout,
        forest: tree.forest,
        strategy,
        audit,
    }
}

/// Hand sheet-scoped events to their sheet; return the rest.
fn attach_events(reports: &mut [SheetReport], events: Vec<AuditEvent>) -> Vec<AuditEvent> {
    let mut unattached = Vec::new();
    for event in events {
        match reports.iter_mut().find(|r| r.sheet == event.sheet) {
            Some(report) => report.audit.push(event),
            None => unattached.push(event),
        }
    }
    unattached
}

/// Classify a document and infer the structure and fill strategy of every
/// question sheet. No responses are synthesized.
pub fn extract_document(
    ctx: &PipelineContext,
    source: &str,
    sheets: &[SheetSnapshot],
) -> DocumentReport {
    let document = info_span!("document", source, oracle = ctx.oracle_name());
    let _guard = document.enter();

    let evidence: Vec<SheetEvidence<'_>> = sheets.iter().map(SheetEvidence::collect).collect();
    let targets: Vec<SheetTarget<'_>> = evidence
        .iter()
        .map(|e| SheetTarget {
            sheet: e.sheet,
            stats: &e.stats,
            profile: &e.profile,
        })
        .collect();

    let oracle = ctx.oracle();
    let (classifications, events) = SheetClassifier::new(oracle)
        .with_content_override(ctx.options.content_sheet.clone())
        .classify(&targets);
    let profiles: Vec<&SheetProfile> = evidence.iter().map(|e| &e.profile).collect();
    let content_sheet =
        select_content_sheet(&classifications, &profiles, ctx.options.content_sheet.as_deref());
    let content = content_sheet
        .as_deref()
        .and_then(|name| sheets.iter().find(|s| s.name == name));
    let (global_context, context_events) = ContextBuilder::new(oracle).build(content);

    let mut reports: Vec<SheetReport> = classifications.into_iter().map(SheetReport::new).collect();
    let mut audit = attach_events(&mut reports, events);
    audit.extend(context_events);

    let questions: Vec<(usize, &SheetEvidence<'_>)> = reports
        .iter()
        .zip(&evidence)
        .enumerate()
        .filter(|(_, (report, _))| report.role() == SheetRole::Question)
        .map(|(index, (_, evidence))| (index, evidence))
        .collect();
    info!(
        sheets = sheets.len(),
        question_sheets = questions.len(),
        content_sheet = content_sheet.as_deref().unwrap_or("-"),
        document_type = %global_context.document_type,
        "Classified sheets"
    );

    let outcomes = ctx.map_sheets(questions, |(index, evidence)| {
        let span = info_span!(parent: &document, "sheet", sheet = %evidence.sheet.name);
        let _guard = span.enter();
        (
            index,
            analyse_sheet(ctx, evidence.sheet, &evidence.stats, &global_context),
        )
    });
    for (index, outcome) in outcomes {
        outcome.merge_into(&mut reports[index]);
    }

    DocumentReport {
        source: source.to_string(),
        global_context,
        content_sheet,
        sheets: reports,
        audit,
    }
}

/// Synthesize responses for every question sheet of a report, replacing
/// any previous assignments. Sheets without a forest or strategy are left
/// alone.
pub fn fill_document(ctx: &PipelineContext, report: &mut DocumentReport) {
    let document = info_span!("document", source = %report.source);
    let _guard = document.enter();

    let synthesizer = ResponseSynthesizer::new(ctx.options.seed_salt, ctx.reference_date)
        .with_force_non_empty(ctx.options.force_non_empty);
    let work: Vec<(usize, &QuestionForest, &FillStrategy)> = report
        .sheets
        .iter()
        .enumerate()
        .filter_map(|(index, sheet)| {
            Some((index, sheet.forest.as_ref()?, sheet.strategy.as_ref()?))
        })
        .collect();

    let outputs = ctx.map_sheets(work, |(index, forest, strategy)| {
        let span = info_span!(parent: &document, "sheet", sheet = %forest.sheet);
        let _guard = span.enter();
        (index, synthesizer.synthesize(forest, strategy))
    });

    let mut filled = 0;
    for (index, output) in outputs {
        let SynthesisOutput {
            assignments,
            grid,
            preserved_rows,
            preserved_cells,
            audit,
        } = output;
        let sheet = &mut report.sheets[index];
        debug!(
            sheet = %sheet.sheet,
            cells = grid.len(),
            preserved = preserved_cells.len(),
            "Merged sheet values"
        );
        filled += assignments.iter().filter(|a| a.committed).count();
        sheet.assignments = assignments;
        sheet.grid = Some(grid);
        sheet.preserved_rows = preserved_rows;
        sheet.preserved_cells = preserved_cells;
        sheet
            .audit
            .retain(|event| !matches!(event.condition, Condition::ExistingAnswers { .. }));
        sheet.audit.extend(audit);
    }
    info!(rows = filled, seed_salt = ctx.options.seed_salt, "Synthesized responses");
}

/// Extract and fill in one go.
pub fn process_document(
    ctx: &PipelineContext,
    source: &str,
    sheets: &[SheetSnapshot],
) -> DocumentReport {
    let mut report = extract_document(ctx, source, sheets);
    fill_document(ctx, &mut report);
    report
}

/// Read a workbook from disk and run [`extract_document`] on it.
pub fn extract_file(
    ctx: &PipelineContext,
    path: &Path,
) -> Result<(Vec<SheetSnapshot>, DocumentReport)> {
    let sheets =
        read_workbook(path).with_context(|| format!("read workbook {}", path.display()))?;
    let source = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    let report = extract_document(ctx, &source, &sheets);
    Ok((sheets, report))
}
