//! Property tests for column statistics.

use proptest::prelude::*;
use qfill_ingest::{column_stats, sheet_column_stats};
use qfill_model::SheetSnapshot;

fn grid() -> impl Strategy<Value = Vec<Vec<String>>> {
    (1usize..5).prop_flat_map(|width| {
        prop::collection::vec(
            prop::collection::vec("([a-z0-9 ,.]{0,40})|([0-9]{1,4})|", width),
            1..12,
        )
    })
}

proptest! {
    #[test]
    fn ratios_stay_in_range(rows in grid()) {
        let sheet = SheetSnapshot::from_text_grid("Reqs", &rows);
        for stats in sheet_column_stats(&sheet) {
            prop_assert!(stats.non_empty <= stats.total);
            for ratio in [
                stats.fill_ratio,
                stats.distinct_ratio,
                stats.long_text_ratio,
                stats.short_text_ratio,
                stats.numeric_ratio,
            ] {
                prop_assert!((0.0..=1.0).contains(&ratio), "ratio {} out of range", ratio);
            }
            prop_assert_eq!(stats.non_empty == 0, stats.distinct_ratio == 0.0);
        }
    }

    #[test]
    fn empty_columns_have_no_fill(rows in grid(), column in 5usize..8) {
        let sheet = SheetSnapshot::from_text_grid("Reqs", &rows);
        let stats = column_stats(&sheet, column);
        prop_assert_eq!(stats.non_empty, 0);
        prop_assert_eq!(stats.fill_ratio, 0.0);
    }
}
