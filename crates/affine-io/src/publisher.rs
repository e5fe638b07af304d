//! Cross-process state publication.

use crate::SharedRegion;
use affine_protocol::{ButtonState, Player, PublishedState};
use std::sync::Arc;

/// Mirrors one slot's decoded buttons into its shared region.
///
/// A publisher without a region (mapping failed) silently drops writes and
/// reads back nothing.
#[derive(Clone)]
pub struct StatePublisher {
    player: Player,
    region: Option<Arc<dyn SharedRegion>>,
}

impl StatePublisher {
    pub fn new(player: Player, region: Option<Arc<dyn SharedRegion>>) -> Self {
        Self { player, region }
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn has_region(&self) -> bool {
        self.region.is_some()
    }

    pub fn publish(&self, buttons: ButtonState) {
        if let Some(region) = &self.region {
            region.store(PublishedState::encode(self.player, buttons).to_bytes());
        }
    }

    /// Publishes all-released.
    pub fn publish_idle(&self) {
        self.publish(ButtonState::default());
    }

    /// Decodes the region with this publisher's player layout.
    pub fn read(&self) -> Option<ButtonState> {
        self.region
            .as_ref()
            .map(|region| PublishedState::from_bytes(region.load()).decode(self.player))
    }
}

impl std::fmt::Debug for StatePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePublisher")
            .field("player", &self.player)
            .field("region", &self.region.as_ref().map(|r| r.name().to_string()))
            .finish()
    }
}
