use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AssetId, CategoryKind, InterventionId};

/// Where the pixels of a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSource {
    /// Base image with the active overlays composited on top.
    Steady,
    /// One-shot transient shown for the dwell interval after an activation.
    Animation,
    Success,
    Failure,
}

/// Description of a frame the host should display.
///
/// Pixels are not shipped over the wire; `digest` identifies the rendered
/// buffer so clients can tell whether the canvas actually changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameView {
    pub source: FrameSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetId>,
    #[serde(default)]
    pub layers: Vec<AssetId>,
    pub width: u32,
    pub height: u32,
    pub digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dwell_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeView {
    pub probability: f64,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsView {
    pub activations: u64,
    pub rejected_activations: u64,
    pub runs: u64,
    pub successes: u64,
    pub resets: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub phase: String,
    pub selections: BTreeMap<CategoryKind, Vec<InterventionId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<OutcomeView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_animation: Option<AssetId>,
    pub metrics: MetricsView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionView {
    pub id: InterventionId,
    pub label: String,
    pub icon: AssetId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryView {
    pub kind: CategoryKind,
    pub label: String,
    pub exclusive: bool,
    pub interventions: Vec<InterventionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogView {
    pub categories: Vec<CategoryView>,
}

/// JSON line emitted by a host in response to a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Session {
        id: u64,
    },
    Activated {
        category: CategoryKind,
        intervention: InterventionId,
        reconfirmed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        animation: Option<AssetId>,
    },
    Rejected {
        category: CategoryKind,
        intervention: InterventionId,
        reason: String,
    },
    Outcome {
        probability: f64,
        success: bool,
    },
    Frame(FrameView),
    Drained {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset: Option<AssetId>,
    },
    Reset,
    Status(StatusView),
    Catalog(CatalogView),
    Error {
        message: String,
    },
}

pub fn encode_event(event: &SessionEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

pub fn decode_event(line: &str) -> Result<SessionEvent, serde_json::Error> {
    serde_json::from_str(line)
}
