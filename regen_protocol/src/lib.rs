//! Shared contracts for the axon regeneration simulator.
//!
//! Identifiers, the textual command grammar, and the JSON events that hosts
//! send back to their clients. This crate carries no image or RNG code so thin
//! clients can depend on it without pulling in the engine.

mod command_text;
mod commands;
mod events;
mod ids;

pub use command_text::{parse_command_line, CommandParseError};
pub use commands::CommandPayload;
pub use events::{
    decode_event, encode_event, CatalogView, CategoryView, FrameSource, FrameView,
    InterventionView, MetricsView, OutcomeView, SessionEvent, StatusView,
};
pub use ids::{AssetId, CategoryKind, InterventionId};
