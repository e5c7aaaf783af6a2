//! Single-slot queue for the transient clip shown after an activation.
//!
//! The sequencer holds no timer. After [`AnimationSequencer::drain`] hands an
//! asset to the host, the host shows it for the catalog's dwell interval and
//! then asks for the steady-state canvas again.

use regen_protocol::AssetId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum AnimationState {
    #[default]
    Idle,
    Pending(AssetId),
}

#[derive(Debug, Clone, Default)]
pub struct AnimationSequencer {
    state: AnimationState,
}

impl AnimationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&AssetId> {
        match &self.state {
            AnimationState::Idle => None,
            AnimationState::Pending(asset) => Some(asset),
        }
    }

    /// Queues `asset`, returning any undisplayed clip it replaced.
    pub fn enqueue(&mut self, asset: AssetId) -> Option<AssetId> {
        let previous = std::mem::replace(&mut self.state, AnimationState::Pending(asset));
        match previous {
            AnimationState::Idle => None,
            AnimationState::Pending(displaced) => {
                tracing::debug!(
                    target: "regen_sim::animation",
                    displaced = %displaced,
                    "animation.superseded"
                );
                Some(displaced)
            }
        }
    }

    pub fn drain(&mut self) -> Option<AssetId> {
        match std::mem::take(&mut self.state) {
            AnimationState::Idle => None,
            AnimationState::Pending(asset) => Some(asset),
        }
    }

    pub fn clear(&mut self) {
        self.state = AnimationState::Idle;
    }
}
