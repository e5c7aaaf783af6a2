use std::sync::Arc;

use rand::Rng;
use regen_protocol::{CategoryKind, OutcomeView};
use serde::Serialize;

use crate::catalog::InterventionCatalog;
use crate::selection::SelectionSnapshot;

/// Probability and sampled result of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub probability: f64,
    pub success: bool,
}

impl OutcomeRecord {
    pub fn view(&self) -> OutcomeView {
        OutcomeView {
            probability: self.probability,
            success: self.success,
        }
    }
}

/// Full account of one evaluation, including the pre-clamp sum.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeBreakdown {
    pub baseline: f64,
    pub contributions: Vec<(CategoryKind, f64)>,
    pub unclamped: f64,
    pub record: OutcomeRecord,
}

/// Illustrative heuristic turning a selection into a success chance.
///
/// Every active category adds an independent draw from its catalog band; the
/// sum is clamped to the catalog's floor and ceiling and a single uniform draw
/// decides success.
#[derive(Debug, Clone)]
pub struct OutcomeModel {
    catalog: Arc<InterventionCatalog>,
}

impl OutcomeModel {
    pub fn new(catalog: Arc<InterventionCatalog>) -> Self {
        Self { catalog }
    }

    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        snapshot: &SelectionSnapshot,
        rng: &mut R,
    ) -> OutcomeRecord {
        self.evaluate_detailed(snapshot, rng).record
    }

    pub fn evaluate_detailed<R: Rng + ?Sized>(
        &self,
        snapshot: &SelectionSnapshot,
        rng: &mut R,
    ) -> OutcomeBreakdown {
        let bounds = self.catalog.outcome_bounds();
        let mut unclamped = bounds.baseline;
        let mut contributions = Vec::new();

        // Catalog order keeps the draw sequence stable for seeded sessions.
        for category in self.catalog.categories() {
            if !snapshot.is_active(category.kind()) {
                continue;
            }
            let delta = category.effect().sample(rng);
            unclamped += delta;
            contributions.push((category.kind(), delta));
        }

        let probability = bounds.clamp(unclamped);
        let success = rng.gen::<f64>() < probability;

        tracing::debug!(
            target: "regen_sim::outcome",
            revision = snapshot.revision(),
            active_categories = contributions.len(),
            unclamped,
            probability,
            success,
            "outcome.evaluated"
        );

        OutcomeBreakdown {
            baseline: bounds.baseline,
            contributions,
            unclamped,
            record: OutcomeRecord {
                probability,
                success,
            },
        }
    }
}
