use crate::{CategoryKind, InterventionId};

/// Actions a host surface can deliver to one simulation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPayload {
    Activate {
        category: CategoryKind,
        intervention: InterventionId,
    },
    Run,
    Reset,
    /// Request the frame the canvas should currently show.
    Image,
    /// Pop the pending transient animation, if any.
    Drain,
    Status,
    Catalog,
}

impl CommandPayload {
    /// Stable verb used in logs.
    pub fn verb(&self) -> &'static str {
        match self {
            CommandPayload::Activate { .. } => "activate",
            CommandPayload::Run => "run",
            CommandPayload::Reset => "reset",
            CommandPayload::Image => "image",
            CommandPayload::Drain => "drain",
            CommandPayload::Status => "status",
            CommandPayload::Catalog => "catalog",
        }
    }
}
