use std::{
    collections::{HashMap, HashSet},
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use rand::Rng;
use regen_protocol::{
    AssetId, CatalogView, CategoryKind, CategoryView, InterventionId, InterventionView,
};
use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_CATALOG: &str = include_str!("data/catalog_standard.json");
pub const CLASSIC_CATALOG: &str = include_str!("data/catalog_classic.json");
pub const ASTROCYTE_PENALTY_CATALOG: &str = include_str!("data/catalog_astrocyte_penalty.json");
pub const ASTROCYTE_FOLDED_CATALOG: &str = include_str!("data/catalog_astrocyte_folded.json");

/// Selection rule applied to every intervention of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one active intervention; the first choice locks the category until reset.
    Exclusive,
    /// Any number of active interventions.
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectDirection {
    #[default]
    Bonus,
    Penalty,
}

/// Uniform band a category draws its probability contribution from.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EffectBand {
    #[serde(default)]
    direction: EffectDirection,
    min: f64,
    max: f64,
}

impl EffectBand {
    pub fn new(direction: EffectDirection, min: f64, max: f64) -> Self {
        Self {
            direction,
            min,
            max,
        }
    }

    pub fn direction(&self) -> EffectDirection {
        self.direction
    }

    /// Magnitude bounds with `min <= max`.
    pub fn bounds(&self) -> (f64, f64) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }

    /// Draws a signed contribution: positive for bonuses, negative for penalties.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (min, max) = self.bounds();
        let magnitude = if min == max {
            min
        } else {
            rng.gen_range(min..=max)
        };
        match self.direction {
            EffectDirection::Bonus => magnitude,
            EffectDirection::Penalty => -magnitude,
        }
    }
}

/// Baseline and clamp applied by the outcome model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutcomeBounds {
    pub baseline: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for OutcomeBounds {
    fn default() -> Self {
        Self {
            baseline: 0.05,
            floor: 0.01,
            ceiling: 0.95,
        }
    }
}

impl OutcomeBounds {
    pub fn clamp(&self, probability: f64) -> f64 {
        probability.clamp(self.floor, self.ceiling)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intervention {
    pub id: InterventionId,
    pub label: String,
    pub icon: AssetId,
    pub overlay: Option<AssetId>,
    pub animation: AssetId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDefinition {
    kind: CategoryKind,
    label: String,
    cardinality: Cardinality,
    effect: EffectBand,
    interventions: Vec<Intervention>,
}

impl CategoryDefinition {
    pub fn kind(&self) -> CategoryKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_exclusive(&self) -> bool {
        self.cardinality == Cardinality::Exclusive
    }

    pub fn effect(&self) -> &EffectBand {
        &self.effect
    }

    pub fn interventions(&self) -> &[Intervention] {
        &self.interventions
    }

    pub fn intervention(&self, id: &InterventionId) -> Option<&Intervention> {
        self.interventions.iter().find(|entry| &entry.id == id)
    }
}

/// Immutable reference data describing the toolbox.
///
/// Both astrocyte layouts (own category, or folded into the support-cell
/// exclusive set) are plain catalog data; nothing in the engine branches on
/// which one is loaded.
#[derive(Debug, Clone)]
pub struct InterventionCatalog {
    base_image: AssetId,
    success_asset: AssetId,
    failure_asset: AssetId,
    dwell: Duration,
    outcome: OutcomeBounds,
    replay_on_reconfirm: bool,
    categories: Vec<CategoryDefinition>,
    owners: HashMap<InterventionId, CategoryKind>,
}

impl InterventionCatalog {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            InterventionCatalog::from_json_str(BUILTIN_CATALOG)
                .expect("builtin intervention catalog should parse"),
        )
    }

    pub fn variant(variant: CatalogVariant) -> Arc<Self> {
        Arc::new(
            InterventionCatalog::from_json_str(variant.source())
                .expect("builtin catalog variant should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        InterventionCatalog::from_document(document)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        InterventionCatalog::from_json_str(&contents)
    }

    fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        let outcome = document.outcome;
        if !(0.0..=1.0).contains(&outcome.floor)
            || !(0.0..=1.0).contains(&outcome.ceiling)
            || outcome.floor > outcome.ceiling
            || !(outcome.floor..=outcome.ceiling).contains(&outcome.baseline)
        {
            return Err(CatalogError::InvalidBounds {
                baseline: outcome.baseline,
                floor: outcome.floor,
                ceiling: outcome.ceiling,
            });
        }

        let mut seen_kinds = HashSet::new();
        let mut owners = HashMap::new();
        let mut categories = Vec::with_capacity(document.categories.len());

        for entry in document.categories {
            if !seen_kinds.insert(entry.kind) {
                return Err(CatalogError::DuplicateCategory(entry.kind));
            }
            if entry.interventions.is_empty() {
                return Err(CatalogError::EmptyCategory(entry.kind));
            }
            let effect = entry.effect;
            if !effect.min.is_finite()
                || !effect.max.is_finite()
                || effect.min < 0.0
                || effect.max < 0.0
            {
                return Err(CatalogError::InvalidEffect {
                    category: entry.kind,
                    min: effect.min,
                    max: effect.max,
                });
            }

            let mut overlay_members = 0usize;
            let mut interventions = Vec::with_capacity(entry.interventions.len());
            for raw in entry.interventions {
                let id = InterventionId::new(raw.id);
                if owners.insert(id.clone(), entry.kind).is_some() {
                    return Err(CatalogError::DuplicateIntervention(id));
                }
                if raw.overlay.is_some() {
                    if !entry.kind.carries_overlay() {
                        return Err(CatalogError::OverlayNotSupported {
                            category: entry.kind,
                            intervention: id,
                        });
                    }
                    overlay_members += 1;
                }
                interventions.push(Intervention {
                    label: raw.label.unwrap_or_else(|| id.to_string()),
                    id,
                    icon: AssetId::new(raw.icon),
                    overlay: raw.overlay.map(AssetId::new),
                    animation: AssetId::new(raw.animation),
                });
            }

            // A multi-select category can only map to a single canvas layer.
            if entry.cardinality == Cardinality::Multi && overlay_members > 1 {
                return Err(CatalogError::MultipleOverlays(entry.kind));
            }

            categories.push(CategoryDefinition {
                kind: entry.kind,
                label: entry.label.unwrap_or_else(|| entry.kind.to_string()),
                cardinality: entry.cardinality,
                effect,
                interventions,
            });
        }

        Ok(Self {
            base_image: AssetId::new(document.base_image),
            success_asset: AssetId::new(document.success_asset),
            failure_asset: AssetId::new(document.failure_asset),
            dwell: Duration::from_millis(document.dwell_ms),
            outcome,
            replay_on_reconfirm: document.replay_on_reconfirm,
            categories,
            owners,
        })
    }

    pub fn base_image(&self) -> &AssetId {
        &self.base_image
    }

    pub fn success_asset(&self) -> &AssetId {
        &self.success_asset
    }

    pub fn failure_asset(&self) -> &AssetId {
        &self.failure_asset
    }

    /// How long hosts keep a transient animation on screen.
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    pub fn outcome_bounds(&self) -> &OutcomeBounds {
        &self.outcome
    }

    /// Whether re-activating the locked choice of an exclusive category
    /// replays its animation.
    pub fn replay_on_reconfirm(&self) -> bool {
        self.replay_on_reconfirm
    }

    pub fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    pub fn category(&self, kind: CategoryKind) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|category| category.kind == kind)
    }

    pub fn category_of(&self, id: &InterventionId) -> Option<CategoryKind> {
        self.owners.get(id).copied()
    }

    pub fn intervention(&self, kind: CategoryKind, id: &InterventionId) -> Option<&Intervention> {
        self.category(kind)?.intervention(id)
    }

    /// Every asset the catalog can ask a resolver for, deduplicated and sorted.
    pub fn referenced_assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = vec![
            self.base_image.clone(),
            self.success_asset.clone(),
            self.failure_asset.clone(),
        ];
        for category in &self.categories {
            for intervention in &category.interventions {
                assets.push(intervention.icon.clone());
                assets.push(intervention.animation.clone());
                if let Some(overlay) = &intervention.overlay {
                    assets.push(overlay.clone());
                }
            }
        }
        assets.sort();
        assets.dedup();
        assets
    }

    pub fn view(&self) -> CatalogView {
        CatalogView {
            categories: self
                .categories
                .iter()
                .map(|category| CategoryView {
                    kind: category.kind,
                    label: category.label.clone(),
                    exclusive: category.is_exclusive(),
                    interventions: category
                        .interventions
                        .iter()
                        .map(|intervention| InterventionView {
                            id: intervention.id.clone(),
                            label: intervention.label.clone(),
                            icon: intervention.icon.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Builtin toolbox layouts shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogVariant {
    /// Full toolbox; astrocytes are their own category and improve the odds.
    Standard,
    /// The four original categories, no astrocytes.
    Classic,
    /// Astrocytes are their own category and reduce the odds.
    AstrocytePenalty,
    /// Astrocytes share the support-cell lock; reconfirming replays animations.
    AstrocyteFolded,
}

impl CatalogVariant {
    pub const ALL: [CatalogVariant; 4] = [
        CatalogVariant::Standard,
        CatalogVariant::Classic,
        CatalogVariant::AstrocytePenalty,
        CatalogVariant::AstrocyteFolded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CatalogVariant::Standard => "standard",
            CatalogVariant::Classic => "classic",
            CatalogVariant::AstrocytePenalty => "astrocyte_penalty",
            CatalogVariant::AstrocyteFolded => "astrocyte_folded",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.to_ascii_lowercase().replace('-', "_");
        CatalogVariant::ALL
            .into_iter()
            .find(|variant| variant.name() == normalized)
    }

    fn source(self) -> &'static str {
        match self {
            CatalogVariant::Standard => BUILTIN_CATALOG,
            CatalogVariant::Classic => CLASSIC_CATALOG,
            CatalogVariant::AstrocytePenalty => ASTROCYTE_PENALTY_CATALOG,
            CatalogVariant::AstrocyteFolded => ASTROCYTE_FOLDED_CATALOG,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse intervention catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read intervention catalog from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("category {0} is defined more than once")]
    DuplicateCategory(CategoryKind),
    #[error("category {0} has no interventions")]
    EmptyCategory(CategoryKind),
    #[error("intervention {0} appears in more than one place")]
    DuplicateIntervention(InterventionId),
    #[error("intervention {intervention} declares an overlay but {category} has no canvas layer")]
    OverlayNotSupported {
        category: CategoryKind,
        intervention: InterventionId,
    },
    #[error("multi-select category {0} declares more than one overlay")]
    MultipleOverlays(CategoryKind),
    #[error("inconsistent outcome bounds (baseline {baseline}, floor {floor}, ceiling {ceiling})")]
    InvalidBounds {
        baseline: f64,
        floor: f64,
        ceiling: f64,
    },
    #[error("effect band for {category} is invalid ({min}..{max})")]
    InvalidEffect {
        category: CategoryKind,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    base_image: String,
    success_asset: String,
    failure_asset: String,
    #[serde(default = "default_dwell_ms")]
    dwell_ms: u64,
    #[serde(default)]
    outcome: OutcomeBounds,
    #[serde(default)]
    replay_on_reconfirm: bool,
    categories: Vec<CategoryEntry>,
}

fn default_dwell_ms() -> u64 {
    1_000
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    kind: CategoryKind,
    #[serde(default)]
    label: Option<String>,
    cardinality: Cardinality,
    effect: EffectBand,
    interventions: Vec<InterventionEntry>,
}

#[derive(Debug, Deserialize)]
struct InterventionEntry {
    id: String,
    #[serde(default)]
    label: Option<String>,
    icon: String,
    #[serde(default)]
    overlay: Option<String>,
    animation: String,
}

#[derive(Debug, Clone)]
pub struct CatalogMetadata {
    path: Option<PathBuf>,
}

impl CatalogMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Loads the catalog named by `REGEN_CATALOG_PATH`, falling back to the builtin one.
pub fn load_catalog_from_env() -> (Arc<InterventionCatalog>, CatalogMetadata) {
    let Some(path) = env::var("REGEN_CATALOG_PATH").ok().map(PathBuf::from) else {
        tracing::info!(
            target: "regen_sim::config",
            "catalog.loaded=builtin"
        );
        return (InterventionCatalog::builtin(), CatalogMetadata::new(None));
    };

    match InterventionCatalog::from_file(&path) {
        Ok(catalog) => {
            tracing::info!(
                target: "regen_sim::config",
                path = %path.display(),
                categories = catalog.categories().len(),
                "catalog.loaded=file"
            );
            (Arc::new(catalog), CatalogMetadata::new(Some(path)))
        }
        Err(err) => {
            tracing::warn!(
                target: "regen_sim::config",
                path = %path.display(),
                error = %err,
                "catalog.load_failed"
            );
            tracing::info!(
                target: "regen_sim::config",
                "catalog.loaded=builtin"
            );
            (InterventionCatalog::builtin(), CatalogMetadata::new(None))
        }
    }
}
