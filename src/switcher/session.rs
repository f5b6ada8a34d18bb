use super::mute::{MutedSet, StartedCorked};
use super::registry::ConnectionRegistry;
use super::volume::VolumeMemory;
use crate::config::VolumeMemoryMode;

/// Everything the switcher remembers between events.
///
/// Lives for one process run; nothing is persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) volume: VolumeMemory,
    pub(crate) muted: MutedSet,
    pub(crate) started_corked: StartedCorked,
}

impl Session {
    pub fn new(volume_mode: VolumeMemoryMode) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            volume: VolumeMemory::new(volume_mode),
            muted: MutedSet::new(),
            started_corked: StartedCorked::new(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn volume(&self) -> &VolumeMemory {
        &self.volume
    }

    pub fn muted(&self) -> &MutedSet {
        &self.muted
    }

    pub fn started_corked(&self) -> &StartedCorked {
        &self.started_corked
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(VolumeMemoryMode::default())
    }
}
