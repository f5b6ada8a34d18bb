//! Call-state decisions
//!
//! Pure functions over the registry and the live card profile. The profile is
//! always read fresh by the caller; nothing here caches what the card was doing.

use std::fmt;

use super::registry::ConnectionRegistry;
use crate::audio::DeviceProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Approved playback and capture streams are both active
    InCall,
    /// No approved stream at all
    Idle,
    /// Exactly one category populated; no switching happens here
    Mixed,
}

impl CallState {
    pub fn of(registry: &ConnectionRegistry) -> Self {
        if registry.is_in_call() {
            CallState::InCall
        } else if registry.is_idle() {
            CallState::Idle
        } else {
            CallState::Mixed
        }
    }
}

/// Registry change that prompted an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    StreamAdded,
    StreamRemoved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDirection {
    /// A2DP -> HSP/HFP
    Forward,
    /// HSP/HFP -> A2DP
    Reverse,
}

impl fmt::Display for SwitchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchDirection::Forward => write!(f, "telephony"),
            SwitchDirection::Reverse => write!(f, "high fidelity"),
        }
    }
}

/// Whether `decide` could return a switch, i.e. whether the profile is worth reading
pub fn needs_profile(trigger: Trigger, state: CallState) -> bool {
    matches!(
        (trigger, state),
        (Trigger::StreamAdded, CallState::InCall) | (Trigger::StreamRemoved, CallState::Idle)
    )
}

/// Decide whether an accepted registry change calls for a switch.
///
/// `profile` is `None` when no Bluetooth card is the current default output.
pub fn decide(
    trigger: Trigger,
    state: CallState,
    profile: Option<&DeviceProfile>,
) -> Option<SwitchDirection> {
    let telephony = profile.is_some_and(DeviceProfile::is_telephony);

    match (trigger, state) {
        (Trigger::StreamAdded, CallState::InCall) if !telephony => Some(SwitchDirection::Forward),
        (Trigger::StreamRemoved, CallState::Idle) if telephony => Some(SwitchDirection::Reverse),
        _ => None,
    }
}
