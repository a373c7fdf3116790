//! Property-based tests for style label handling

use super::test_utils::ScriptedAdapter;
use flashui::config::StylesConfig;
use flashui::generation::{next_variation_count, parse_style_labels, RetryPolicy, StylePlanner};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

proptest! {
    #[test]
    fn labels_embedded_in_prose_are_recovered(
        labels in prop::collection::vec("[A-Za-z][A-Za-z -]{0,15}", 0..6),
        before in "[A-Za-z ,.:!]{0,30}",
        after in "[A-Za-z ,.:!]{0,30}",
    ) {
        let text = format!("{}{}{}", before, serde_json::to_string(&labels).unwrap(), after);
        let expected: Vec<String> = labels.iter().map(|l| l.trim().to_string()).collect();
        prop_assert_eq!(parse_style_labels(&text), Some(expected));
    }

    #[test]
    fn bracket_free_text_has_no_labels(text in "[^\\[]{0,60}") {
        prop_assert_eq!(parse_style_labels(&text), None);
    }

    #[test]
    fn fallback_always_fits_count(count in 0usize..10) {
        let planner = StylePlanner::new(
            Arc::new(ScriptedAdapter::new("")),
            RetryPolicy::new(1, Duration::from_millis(1)),
            &StylesConfig::default(),
        );
        let labels = planner.fallback(count);
        prop_assert_eq!(labels.len(), count);
        prop_assert!(labels.iter().all(|l| !l.trim().is_empty()));
    }

    #[test]
    fn variation_count_cycles_within_bounds(current in 0usize..8, max in 1usize..6) {
        let next = next_variation_count(current, max);
        prop_assert!((1..=max).contains(&next));
        if current < max {
            prop_assert_eq!(next, current + 1);
        }
    }
}
