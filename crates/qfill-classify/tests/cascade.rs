use std::time::Duration;

use proptest::prelude::*;
use qfill_classify::{Cascade, ColumnClassifier, SheetClassifier, SheetTarget};
use qfill_ingest::{sheet_column_stats, sheet_profile};
use qfill_model::{
    ColumnRole, Condition, OracleSettings, SheetRole, SheetSnapshot, Source, TierOutcome,
};
use qfill_oracle::{OracleReply, ResilientOracle, ScriptedOracle, Verdict};

fn requirements_sheet() -> SheetSnapshot {
    let long = "The platform must encrypt all customer data at rest using AES-256 \
                and manage keys in a hardware security module with audited rotation.";
    let mut grid = vec![vec!["Requirement".to_string(), "Status".to_string()]];
    for _ in 0..6 {
        grid.push(vec![long.to_string(), String::new()]);
    }
    SheetSnapshot::from_text_grid("Security", &grid)
}

#[test]
fn oracle_timeout_falls_back_to_statistical_tier() {
    let slow = ScriptedOracle::new()
        .with_delay(Duration::from_millis(250))
        .on_classify(|_| {
            Ok(OracleReply::Answer(Verdict {
                role: "ignored".to_string(),
                confidence: 0.99,
                rationale: None,
            }))
        });
    let settings = OracleSettings::immediate()
        .with_timeout(Duration::from_millis(10))
        .with_max_retries(1);
    let oracle = ResilientOracle::new(slow, settings);

    let sheet = requirements_sheet();
    let stats = sheet_column_stats(&sheet);
    let columns = ColumnClassifier::new(&oracle).classify(&sheet, &stats);

    assert_eq!(columns[0].classified.role, ColumnRole::Question);
    assert_eq!(columns[1].classified.role, ColumnRole::Answer);
    for column in &columns {
        assert_eq!(column.classified.source, Source::Statistical);
        let first = &column.trail[0];
        assert_eq!(first.source, Source::Oracle);
        assert!(!first.resolved);
        assert!(matches!(
            first.condition,
            Some(Condition::OracleUnavailable { .. })
        ));
    }
}

#[test]
fn oracle_verdicts_win_when_well_formed() {
    let oracle = ScriptedOracle::new().on_classify(|request| {
        let role = if request.header == "Status" {
            "answer"
        } else {
            "question"
        };
        Ok(OracleReply::Answer(Verdict {
            role: role.to_string(),
            confidence: 0.97,
            rationale: Some("header".to_string()),
        }))
    });
    let sheet = requirements_sheet();
    let stats = sheet_column_stats(&sheet);
    let columns = ColumnClassifier::new(&oracle).classify(&sheet, &stats);
    assert!(columns.iter().all(|c| c.classified.source == Source::Oracle));
    assert_eq!(columns[1].classified.role, ColumnRole::Answer);
    assert_eq!(columns[1].trail.len(), 1);
}

#[test]
fn sheets_classify_offline_with_override() {
    let intro = SheetSnapshot::from_text_grid(
        "Instructions",
        &[
            vec!["Introduction and guidelines"],
            vec!["Please fill in every response. Note: this document is confidential."],
            vec!["Important: please ensure answers reflect the current release."],
        ],
    );
    let reqs = requirements_sheet();
    let empty = SheetSnapshot::from_text_grid("Notes", &[vec!["Only a title"]]);
    let sheets = [intro, reqs, empty];
    let stats: Vec<_> = sheets.iter().map(sheet_column_stats).collect();
    let profiles: Vec<_> = sheets
        .iter()
        .zip(&stats)
        .map(|(s, st)| sheet_profile(s, st))
        .collect();
    let targets: Vec<SheetTarget<'_>> = sheets
        .iter()
        .zip(&stats)
        .zip(&profiles)
        .map(|((sheet, stats), profile)| SheetTarget {
            sheet,
            stats,
            profile,
        })
        .collect();

    let oracle = qfill_oracle::NoOracle;
    let (classified, events) = SheetClassifier::new(&oracle).classify(&targets);
    let roles: Vec<SheetRole> = classified.iter().map(|c| c.classified.role).collect();
    assert_eq!(
        roles,
        vec![SheetRole::Content, SheetRole::Question, SheetRole::Reference]
    );
    assert!(
        events
            .iter()
            .any(|e| e.sheet == "Notes" && e.condition == Condition::EmptySheet)
    );

    let (classified, _) = SheetClassifier::new(&oracle)
        .with_content_override(Some("Security".to_string()))
        .classify(&targets);
    assert_eq!(classified[1].classified.source, Source::Override);
    assert_eq!(classified[1].classified.role, SheetRole::Content);
}

proptest! {
    #[test]
    fn default_source_iff_every_tier_deferred(
        oracle_resolves in any::<bool>(),
        statistical_resolves in any::<bool>(),
        confidence in 0.0f32..=1.0,
    ) {
        let cascade: Cascade<'_, (), ColumnRole> = Cascade::new(|_| (ColumnRole::Ignored, 0.2))
            .tier(Source::Oracle, move |_| {
                if oracle_resolves {
                    TierOutcome::resolved(ColumnRole::Answer, confidence)
                } else {
                    TierOutcome::Deferred(Condition::oracle("timeout"))
                }
            })
            .tier(Source::Statistical, move |_| {
                if statistical_resolves {
                    TierOutcome::resolved(ColumnRole::Question, confidence)
                } else {
                    TierOutcome::Deferred(Condition::AmbiguousClassification {
                        margin: 0.05,
                        threshold: 0.15,
                    })
                }
            });
        let result = cascade.run(&());
        let all_deferred = !oracle_resolves && !statistical_resolves;
        prop_assert_eq!(result.classified.source == Source::Default, all_deferred);
        prop_assert!((0.0..=1.0).contains(&result.classified.confidence));
        prop_assert_eq!(result.trail.iter().filter(|t| t.resolved).count(), 1);
        if oracle_resolves {
            prop_assert_eq!(result.classified.source, Source::Oracle);
        }
    }
}
