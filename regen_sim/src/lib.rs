//! Simulation engine for the axon regeneration lab.
//!
//! A session picks interventions from a fixed catalog, sees them layered over
//! an injured-axon image, and runs a stochastic heuristic that reports a
//! success probability and a sampled outcome. [`SimulationController`] is the
//! per-session entry point; hosts supply the catalog and an [`AssetResolver`].

pub mod animation;
pub mod assets;
pub mod catalog;
pub mod compositor;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod dwell;
pub mod hashing;
mod metrics;
pub mod outcome;
pub mod selection;
pub mod server;
pub mod sessions;

pub use animation::AnimationSequencer;
pub use assets::{AssetLoadError, AssetResolver, FileAssetResolver, InMemoryAssets};
pub use catalog::{
    load_catalog_from_env, CatalogError, CatalogMetadata, CatalogVariant, CategoryDefinition,
    Cardinality, EffectBand, EffectDirection, Intervention, InterventionCatalog, OutcomeBounds,
};
pub use compositor::{composite, overlay_layers, Compositor, Rendered, OVERLAY_ORDER};
pub use config::RegenServerConfig;
pub use controller::{Activation, ControllerPhase, Frame, SimulationController};
pub use dispatch::{dispatch, settle, Reply};
pub use dwell::DwellScheduler;
pub use hashing::{frame_digest, frame_digest_hex, FnvHasher};
pub use metrics::SessionMetrics;
pub use outcome::{OutcomeBreakdown, OutcomeModel, OutcomeRecord};
pub use selection::{
    ActivationError, ActivationOutcome, ExclusivityViolation, SelectionSnapshot, SelectionStore,
};
pub use server::{Inbound, SessionServer};
pub use sessions::{SessionId, SessionRegistry};
