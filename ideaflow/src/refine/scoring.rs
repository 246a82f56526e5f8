//! Decision and selection rules for the refinement loop

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BusinessIdea, IdeaEvaluation};

/// A candidate with its evaluation and the iteration that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredIdea {
    pub idea: BusinessIdea,
    pub evaluation: IdeaEvaluation,
    pub iteration: u32,
}

/// Whether another generate/evaluate cycle should run
///
/// True only when nothing in this iteration passed and the iteration budget
/// is not spent.
pub fn should_iterate(evaluations: &[IdeaEvaluation], iteration: u32, max_iterations: u32) -> bool {
    let any_passed = evaluations.iter().any(|e| e.passed);
    let result = !any_passed && iteration < max_iterations;
    debug!(any_passed, iteration, max_iterations, result, "should_iterate: called");
    result
}

/// Highest total across all candidates; the earliest candidate wins ties
pub fn select_best(candidates: &[ScoredIdea]) -> Option<&ScoredIdea> {
    debug!(count = candidates.len(), "select_best: called");
    let mut best: Option<&ScoredIdea> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.evaluation.total <= current.evaluation.total => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::traits::mock::scores_for_total;
    use proptest::prelude::*;
    use serde_json::Value;

    fn scored(title: &str, total: u32, iteration: u32) -> ScoredIdea {
        let idea = BusinessIdea::new(title, Value::Null);
        let evaluation = IdeaEvaluation::new(idea.id.clone(), scores_for_total(total), 70).unwrap();
        ScoredIdea {
            idea,
            evaluation,
            iteration,
        }
    }

    fn evals(totals: &[u32]) -> Vec<IdeaEvaluation> {
        totals.iter().map(|t| scored("x", *t, 1).evaluation).collect()
    }

    #[test]
    fn test_should_iterate_when_nothing_passes() {
        assert!(should_iterate(&evals(&[60, 55, 50]), 1, 2));
    }

    #[test]
    fn test_stop_when_any_passes() {
        assert!(!should_iterate(&evals(&[40, 70, 50]), 1, 2));
    }

    #[test]
    fn test_stop_at_iteration_bound() {
        assert!(!should_iterate(&evals(&[60, 65]), 2, 2));
        assert!(!should_iterate(&evals(&[10]), 1, 1));
    }

    #[test]
    fn test_select_best_across_iterations() {
        let candidates = vec![
            scored("a", 60, 1),
            scored("b", 55, 1),
            scored("c", 72, 2),
            scored("d", 65, 2),
        ];
        let best = select_best(&candidates).unwrap();
        assert_eq!(best.idea.title, "c");
        assert_eq!(best.iteration, 2);
    }

    #[test]
    fn test_select_best_earliest_wins_ties() {
        let candidates = vec![scored("first", 65, 1), scored("second", 65, 2)];
        assert_eq!(select_best(&candidates).unwrap().idea.title, "first");
    }

    #[test]
    fn test_select_best_empty() {
        assert!(select_best(&[]).is_none());
    }

    proptest! {
        #[test]
        fn prop_select_best_is_first_maximum(totals in proptest::collection::vec(0u32..=100, 1..12)) {
            let candidates: Vec<ScoredIdea> = totals
                .iter()
                .enumerate()
                .map(|(i, t)| scored(&format!("idea-{}", i), *t, 1))
                .collect();
            let best = select_best(&candidates).unwrap();
            let max = *totals.iter().max().unwrap();
            let first_max = totals.iter().position(|t| *t == max).unwrap();
            prop_assert_eq!(best.evaluation.total, max);
            prop_assert_eq!(&best.idea.title, &format!("idea-{}", first_max));
        }

        #[test]
        fn prop_iteration_bound_is_respected(
            totals in proptest::collection::vec(0u32..=100, 1..6),
            iteration in 1u32..10,
            max_iterations in 1u32..10,
        ) {
            let evaluations = evals(&totals);
            if should_iterate(&evaluations, iteration, max_iterations) {
                prop_assert!(iteration < max_iterations);
                prop_assert!(evaluations.iter().all(|e| !e.passed));
            }
        }
    }
}
