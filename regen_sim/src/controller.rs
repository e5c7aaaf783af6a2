//! Per-session orchestration of selection, outcome, and presentation.

use std::sync::Arc;

use image::RgbaImage;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regen_protocol::{AssetId, CategoryKind, FrameSource, FrameView, InterventionId, StatusView};

use crate::animation::AnimationSequencer;
use crate::assets::{AssetLoadError, AssetResolver};
use crate::catalog::InterventionCatalog;
use crate::compositor::Compositor;
use crate::hashing::frame_digest_hex;
use crate::metrics::SessionMetrics;
use crate::outcome::{OutcomeModel, OutcomeRecord};
use crate::selection::{
    ActivationError, ActivationOutcome, SelectionSnapshot, SelectionStore,
};

/// Whether the session has produced an outcome since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Fresh,
    Evaluated,
}

impl ControllerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ControllerPhase::Fresh => "fresh",
            ControllerPhase::Evaluated => "evaluated",
        }
    }
}

/// Accepted activation, as reported back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub category: CategoryKind,
    pub intervention: InterventionId,
    pub outcome: ActivationOutcome,
    /// Clip queued by this activation, if any.
    pub animation: Option<AssetId>,
}

/// Image the canvas should show right now.
#[derive(Debug, Clone)]
pub struct Frame {
    pub source: FrameSource,
    pub asset: Option<AssetId>,
    pub layers: Vec<AssetId>,
    pub image: Arc<RgbaImage>,
}

impl Frame {
    pub fn view(&self) -> FrameView {
        FrameView {
            source: self.source,
            asset: self.asset.clone(),
            layers: self.layers.clone(),
            width: self.image.width(),
            height: self.image.height(),
            digest: frame_digest_hex(&self.image),
            dwell_ms: None,
        }
    }
}

/// One simulation session.
///
/// Owns its selection, last outcome, pending animation and RNG; nothing here
/// is shared with other sessions except the immutable catalog and the asset
/// resolver.
pub struct SimulationController {
    catalog: Arc<InterventionCatalog>,
    assets: Arc<dyn AssetResolver>,
    selection: SelectionStore,
    compositor: Compositor,
    outcome_model: OutcomeModel,
    animations: AnimationSequencer,
    last_outcome: Option<OutcomeRecord>,
    rng: ChaCha8Rng,
    metrics: SessionMetrics,
    terminal_cache: Option<(AssetId, Arc<RgbaImage>)>,
}

impl SimulationController {
    pub fn new(catalog: Arc<InterventionCatalog>, assets: Arc<dyn AssetResolver>) -> Self {
        Self::with_rng(catalog, assets, ChaCha8Rng::from_entropy())
    }

    /// Builds a session whose outcome draws are reproducible.
    pub fn with_seed(
        catalog: Arc<InterventionCatalog>,
        assets: Arc<dyn AssetResolver>,
        seed: u64,
    ) -> Self {
        Self::with_rng(catalog, assets, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(
        catalog: Arc<InterventionCatalog>,
        assets: Arc<dyn AssetResolver>,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            selection: SelectionStore::new(Arc::clone(&catalog)),
            compositor: Compositor::new(Arc::clone(&catalog), Arc::clone(&assets)),
            outcome_model: OutcomeModel::new(Arc::clone(&catalog)),
            animations: AnimationSequencer::new(),
            last_outcome: None,
            rng,
            metrics: SessionMetrics::default(),
            terminal_cache: None,
            catalog,
            assets,
        }
    }

    pub fn catalog(&self) -> &Arc<InterventionCatalog> {
        &self.catalog
    }

    pub fn phase(&self) -> ControllerPhase {
        if self.last_outcome.is_some() {
            ControllerPhase::Evaluated
        } else {
            ControllerPhase::Fresh
        }
    }

    pub fn last_outcome(&self) -> Option<&OutcomeRecord> {
        self.last_outcome.as_ref()
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        self.selection.snapshot()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn pending_animation(&self) -> Option<&AssetId> {
        self.animations.pending()
    }

    /// Activates an intervention and queues its transient clip.
    ///
    /// Multi-select activations always queue the clip. Reconfirming the locked
    /// choice of an exclusive category only does so when the catalog enables
    /// `replay_on_reconfirm`. A rejected activation changes nothing.
    pub fn activate(
        &mut self,
        category: CategoryKind,
        intervention: &InterventionId,
    ) -> Result<Activation, ActivationError> {
        let outcome = match self.selection.activate(category, intervention) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.metrics.record_activation(false);
                tracing::info!(
                    target: "regen_sim::selection",
                    %category,
                    %intervention,
                    error = %err,
                    "selection.rejected"
                );
                return Err(err);
            }
        };
        self.metrics.record_activation(true);

        let definition = self
            .catalog
            .category(category)
            .ok_or(ActivationError::UnknownCategory(category))?;
        let replay = match outcome {
            ActivationOutcome::Inserted => true,
            ActivationOutcome::Reconfirmed => {
                !definition.is_exclusive() || self.catalog.replay_on_reconfirm()
            }
        };
        let animation = if replay {
            definition
                .intervention(intervention)
                .map(|entry| entry.animation.clone())
        } else {
            None
        };
        if let Some(asset) = &animation {
            self.animations.enqueue(asset.clone());
        }

        tracing::info!(
            target: "regen_sim::selection",
            %category,
            %intervention,
            reconfirmed = outcome == ActivationOutcome::Reconfirmed,
            animation = animation.as_ref().map(AssetId::as_str).unwrap_or("none"),
            "selection.activated"
        );

        Ok(Activation {
            category,
            intervention: intervention.clone(),
            outcome,
            animation,
        })
    }

    /// Evaluates the current selection, replacing any previous outcome.
    pub fn run(&mut self) -> OutcomeRecord {
        let snapshot = self.selection.snapshot();
        let record = self.outcome_model.evaluate(&snapshot, &mut self.rng);
        self.last_outcome = Some(record);
        self.metrics.record_run(record.success);
        tracing::info!(
            target: "regen_sim::outcome",
            probability = record.probability,
            success = record.success,
            runs = self.metrics.runs,
            "simulation.run"
        );
        record
    }

    /// Clears selection, outcome and pending clip. Session metrics are kept.
    pub fn reset(&mut self) {
        self.selection.reset();
        self.animations.clear();
        self.last_outcome = None;
        self.metrics.record_reset();
        tracing::info!(
            target: "regen_sim::selection",
            resets = self.metrics.resets,
            "simulation.reset"
        );
    }

    pub fn drain_pending_animation(&mut self) -> Option<AssetId> {
        self.animations.drain()
    }

    /// Terminal asset for the last outcome, if the session has been evaluated.
    pub fn terminal_asset(&self) -> Option<&AssetId> {
        self.last_outcome.map(|record| {
            if record.success {
                self.catalog.success_asset()
            } else {
                self.catalog.failure_asset()
            }
        })
    }

    pub fn current_image(&mut self) -> Result<Arc<RgbaImage>, AssetLoadError> {
        self.current_frame().map(|frame| frame.image)
    }

    /// Steady-state canvas while fresh, the success or failure asset once evaluated.
    pub fn current_frame(&mut self) -> Result<Frame, AssetLoadError> {
        let Some(record) = self.last_outcome else {
            let rendered = self.compositor.render(&self.selection.snapshot())?;
            return Ok(Frame {
                source: FrameSource::Steady,
                asset: None,
                layers: rendered.layers,
                image: rendered.image,
            });
        };

        let (source, asset) = if record.success {
            (FrameSource::Success, self.catalog.success_asset().clone())
        } else {
            (FrameSource::Failure, self.catalog.failure_asset().clone())
        };
        let cached = self
            .terminal_cache
            .as_ref()
            .filter(|(cached, _)| *cached == asset)
            .map(|(_, image)| Arc::clone(image));
        let image = match cached {
            Some(image) => image,
            None => {
                let image = Arc::new(self.assets.load(&asset)?);
                self.terminal_cache = Some((asset.clone(), Arc::clone(&image)));
                image
            }
        };
        Ok(Frame {
            source,
            asset: Some(asset),
            layers: Vec::new(),
            image,
        })
    }

    /// Loads a transient clip for display, alongside its dwell.
    pub fn animation_frame(&self, asset: &AssetId) -> Result<Frame, AssetLoadError> {
        let image = Arc::new(self.assets.load(asset)?);
        Ok(Frame {
            source: FrameSource::Animation,
            asset: Some(asset.clone()),
            layers: Vec::new(),
            image,
        })
    }

    pub fn status(&self) -> StatusView {
        StatusView {
            phase: self.phase().as_str().to_string(),
            selections: self.selection.snapshot().to_map(),
            last_outcome: self.last_outcome.map(|record| record.view()),
            pending_animation: self.animations.pending().cloned(),
            metrics: self.metrics.view(),
        }
    }
}
