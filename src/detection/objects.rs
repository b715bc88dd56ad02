use std::collections::BTreeMap;

use crate::settings::WatchedClass;

/// Pick the watched class to report for one detection frame.
///
/// The highest score above its class threshold wins, ties going to the lowest
/// class id. When nothing clears its threshold the best watched score is still
/// returned so the frame counts as a negative; `None` means no watched class
/// was scored at all.
pub fn select_object(scores: &BTreeMap<u32, f32>, watched: &[WatchedClass]) -> Option<(u32, f32)> {
    let mut above: Option<(u32, f32)> = None;
    let mut best: Option<(u32, f32)> = None;

    // BTreeMap iteration is ascending by class id, so strict `>` keeps the lowest id on ties.
    for (&class_id, &score) in scores {
        if !score.is_finite() {
            continue;
        }
        let Some(class) = watched.iter().find(|w| w.class_id == class_id) else {
            continue;
        };

        if best.map_or(true, |(_, s)| score > s) {
            best = Some((class_id, score));
        }
        if score > class.min_confidence && above.map_or(true, |(_, s)| score > s) {
            above = Some((class_id, score));
        }
    }

    above.or(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watched() -> Vec<WatchedClass> {
        vec![
            WatchedClass {
                class_id: 67,
                label: "cell phone".into(),
                min_confidence: 0.55,
            },
            WatchedClass {
                class_id: 73,
                label: "book".into(),
                min_confidence: 0.80,
            },
        ]
    }

    fn scores(pairs: &[(u32, f32)]) -> BTreeMap<u32, f32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn highest_above_threshold_wins() {
        let picked = select_object(&scores(&[(0, 0.99), (67, 0.6), (73, 0.9)]), &watched());
        assert_eq!(picked, Some((73, 0.9)));
    }

    #[test]
    fn per_class_threshold_beats_raw_score() {
        // The book scores higher but is under its own cutoff.
        let picked = select_object(&scores(&[(67, 0.6), (73, 0.7)]), &watched());
        assert_eq!(picked, Some((67, 0.6)));
    }

    #[test]
    fn ties_go_to_lowest_class_id() {
        let picked = select_object(&scores(&[(73, 0.9), (67, 0.9)]), &watched());
        assert_eq!(picked, Some((67, 0.9)));
    }

    #[test]
    fn below_threshold_still_reports_best_candidate() {
        let picked = select_object(&scores(&[(67, 0.3), (73, 0.5)]), &watched());
        assert_eq!(picked, Some((73, 0.5)));
    }

    #[test]
    fn unwatched_or_invalid_scores_are_ignored() {
        assert_eq!(select_object(&scores(&[(0, 0.99)]), &watched()), None);
        assert_eq!(select_object(&scores(&[(67, f32::NAN)]), &watched()), None);
    }
}
