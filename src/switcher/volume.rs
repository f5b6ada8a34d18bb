use std::collections::HashMap;
use tracing::debug;

use crate::audio::DeviceProfile;
use crate::config::VolumeMemoryMode;

/// Volume remembered across profile switches, in device steps.
///
/// In `Shared` mode a single slot holds whatever the sink read just before the
/// last switch, so a switch always replays the level seen before the previous
/// one. `PerProfile` keeps the last level seen while each profile was active.
#[derive(Debug, Clone)]
pub struct VolumeMemory {
    mode: VolumeMemoryMode,
    shared: Option<u32>,
    per_profile: HashMap<DeviceProfile, u32>,
}

impl VolumeMemory {
    pub fn new(mode: VolumeMemoryMode) -> Self {
        Self {
            mode,
            shared: None,
            per_profile: HashMap::new(),
        }
    }

    /// Volume to apply once the card has entered `entering`
    pub fn replay_for(&self, entering: &DeviceProfile) -> Option<u32> {
        match self.mode {
            VolumeMemoryMode::Shared => self.shared,
            VolumeMemoryMode::PerProfile => self.per_profile.get(entering).copied(),
        }
    }

    /// Record the volume read while `leaving` was still active.
    ///
    /// A failed read (`None`) clears the shared slot but leaves per-profile slots alone.
    pub fn remember(&mut self, leaving: &DeviceProfile, steps: Option<u32>) {
        debug!("Remembering volume {:?} for {}", steps, leaving);
        match self.mode {
            VolumeMemoryMode::Shared => self.shared = steps,
            VolumeMemoryMode::PerProfile => {
                if let Some(steps) = steps {
                    self.per_profile.insert(leaving.clone(), steps);
                }
            }
        }
    }

    /// Last value stored in the shared slot, or for `profile` in per-profile mode
    pub fn saved(&self, profile: &DeviceProfile) -> Option<u32> {
        match self.mode {
            VolumeMemoryMode::Shared => self.shared,
            VolumeMemoryMode::PerProfile => self.per_profile.get(profile).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIFI: DeviceProfile = DeviceProfile::HighFidelity;
    const PHONE: DeviceProfile = DeviceProfile::Telephony;

    #[test]
    fn test_shared_slot_alternates_between_directions() {
        let mut memory = VolumeMemory::new(VolumeMemoryMode::Shared);

        // first forward switch: nothing to replay, A2DP level saved
        assert_eq!(memory.replay_for(&PHONE), None);
        memory.remember(&HIFI, Some(6));

        // reverse switch replays it and stores the HSP level
        assert_eq!(memory.replay_for(&HIFI), Some(6));
        memory.remember(&PHONE, Some(11));

        // next forward switch replays the HSP level
        assert_eq!(memory.replay_for(&PHONE), Some(11));
    }

    #[test]
    fn test_shared_slot_is_cleared_by_failed_read() {
        let mut memory = VolumeMemory::new(VolumeMemoryMode::Shared);
        memory.remember(&HIFI, Some(6));
        memory.remember(&PHONE, None);
        assert_eq!(memory.replay_for(&HIFI), None);
    }

    #[test]
    fn test_per_profile_slots_are_independent() {
        let mut memory = VolumeMemory::new(VolumeMemoryMode::PerProfile);

        memory.remember(&HIFI, Some(6));
        assert_eq!(memory.replay_for(&PHONE), None);
        assert_eq!(memory.replay_for(&HIFI), Some(6));

        memory.remember(&PHONE, Some(11));
        memory.remember(&PHONE, None);
        assert_eq!(memory.replay_for(&PHONE), Some(11));
        assert_eq!(memory.saved(&HIFI), Some(6));
    }
}
