use anyhow::Result;
use std::fmt::Display;
use tracing::{debug, info, warn};

use super::decider::SwitchDirection;
use super::mute::MuteManager;
use super::session::Session;
use crate::audio::{BluetoothEndpoint, DeviceKind, DeviceProfile, StreamCategory};
use crate::config::SwitchingConfig;
use crate::system::AudioControl;

/// Result of one switch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Every step was attempted; `failed_steps` of them reported an error
    Completed {
        direction: SwitchDirection,
        failed_steps: usize,
    },
    /// No Bluetooth headset is the default output
    Skipped { direction: SwitchDirection },
}

impl SwitchOutcome {
    pub fn direction(&self) -> SwitchDirection {
        match self {
            SwitchOutcome::Completed { direction, .. } | SwitchOutcome::Skipped { direction } => {
                *direction
            }
        }
    }
}

/// Counts failed steps of a best-effort command sequence
#[derive(Default)]
struct Steps {
    failed: usize,
}

impl Steps {
    fn run(&mut self, what: impl Display, result: Result<()>) {
        match result {
            Ok(()) => debug!("{}", what),
            Err(e) => {
                warn!("{} failed: {:#}", what, e);
                self.failed += 1;
            }
        }
    }
}

/// Runs the A2DP <-> HSP/HFP switch procedures.
///
/// Each mutation is independent: a failed command is logged and the rest of
/// the procedure still runs. Only an unresolvable endpoint aborts a switch.
pub struct SwitchOrchestrator {
    high_fidelity_profile: String,
    telephony_profile: String,
    mute: MuteManager,
}

impl SwitchOrchestrator {
    pub fn new(config: &SwitchingConfig) -> Self {
        Self {
            high_fidelity_profile: config.high_fidelity_profile.clone(),
            telephony_profile: config.telephony_profile.clone(),
            mute: MuteManager::new(config.mute_other_streams),
        }
    }

    /// Bluetooth endpoint behind the current default sink
    pub fn resolve_endpoint<A: AudioControl>(&self, control: &A) -> Option<BluetoothEndpoint> {
        let sink = match control.get_default_sink() {
            Ok(Some(sink)) => sink,
            Ok(None) => {
                debug!("Audio server has no default sink");
                return None;
            }
            Err(e) => {
                warn!("Could not query the default sink: {:#}", e);
                return None;
            }
        };

        let endpoint = BluetoothEndpoint::from_sink_name(&sink);
        if endpoint.is_none() {
            debug!("Default sink {} is not a Bluetooth device", sink);
        }
        endpoint
    }

    /// Live profile of the default Bluetooth card, never cached
    pub fn current_profile<A: AudioControl>(&self, control: &A) -> Option<DeviceProfile> {
        let endpoint = self.resolve_endpoint(control)?;

        let cards = match control.list_cards() {
            Ok(cards) => cards,
            Err(e) => {
                warn!("Could not list cards: {:#}", e);
                return None;
            }
        };

        let profile = cards
            .into_iter()
            .find(|card| card.name == endpoint.card)
            .and_then(|card| card.active_profile)
            .map(|name| DeviceProfile::classify(&name, &self.telephony_profile));

        debug!("{} is in profile {:?}", endpoint.card, profile);
        profile
    }

    /// Node of the headset as it is named once `profile` is active.
    ///
    /// Falls back to the name derived from the default sink when the server
    /// cannot be listed or shows no matching node.
    fn settled_device<A: AudioControl>(
        &self,
        control: &A,
        endpoint: &BluetoothEndpoint,
        kind: DeviceKind,
        profile: &str,
    ) -> String {
        let listed = match control.list_devices(kind) {
            Ok(names) => endpoint
                .find_device(kind, &names, profile)
                .map(String::from),
            Err(e) => {
                warn!("Could not list {}s: {:#}", kind, e);
                None
            }
        };

        listed.unwrap_or_else(|| {
            let derived = endpoint.derived(kind);
            debug!("No {} of {} listed, using {}", kind, endpoint.card, derived);
            derived.to_string()
        })
    }

    pub fn switch<A: AudioControl>(
        &self,
        direction: SwitchDirection,
        control: &A,
        session: &mut Session,
    ) -> SwitchOutcome {
        match direction {
            SwitchDirection::Forward => self.switch_to_telephony(control, session),
            SwitchDirection::Reverse => self.switch_to_high_fidelity(control, session),
        }
    }

    fn read_volume<A: AudioControl>(&self, control: &A, sink: &str) -> Option<u32> {
        match control.get_sink_volume(sink) {
            Ok(Some(volume)) => {
                info!("{} volume: {}", sink, volume);
                Some(volume.steps())
            }
            Ok(None) => {
                warn!("Sink {} reported no volume", sink);
                None
            }
            Err(e) => {
                warn!("Could not read volume of {}: {:#}", sink, e);
                None
            }
        }
    }

    fn replay_volume<A: AudioControl>(
        &self,
        control: &A,
        sink: &str,
        entering: &DeviceProfile,
        session: &Session,
        steps: &mut Steps,
    ) {
        if let Some(saved) = session.volume.replay_for(entering) {
            info!("Resetting volume to {}", saved);
            steps.run(
                format_args!("set volume of {} to {}", sink, saved),
                control.set_sink_volume(sink, saved),
            );
        }
    }

    fn switch_to_telephony<A: AudioControl>(
        &self,
        control: &A,
        session: &mut Session,
    ) -> SwitchOutcome {
        let direction = SwitchDirection::Forward;
        let Some(endpoint) = self.resolve_endpoint(control) else {
            info!("No Bluetooth headset is the default output, staying put");
            return SwitchOutcome::Skipped { direction };
        };

        let new_volume = self.read_volume(control, &endpoint.sink);
        self.mute.mute_others(
            control,
            &session.registry,
            &session.started_corked,
            &mut session.muted,
        );

        info!("Switching {} to {}", endpoint, self.telephony_profile);
        let mut steps = Steps::default();

        steps.run(
            format_args!("set {} profile {}", endpoint.card, self.telephony_profile),
            control.set_card_profile(&endpoint.card, &self.telephony_profile),
        );

        let profile = &self.telephony_profile;
        let sink = self.settled_device(control, &endpoint, DeviceKind::Sink, profile);
        let source = self.settled_device(control, &endpoint, DeviceKind::Source, profile);

        steps.run(
            format_args!("set default source {}", source),
            control.set_default_source(&source),
        );
        steps.run(
            format_args!("set default sink {}", sink),
            control.set_default_sink(&sink),
        );

        for (category, device) in [
            (StreamCategory::Output, &sink),
            (StreamCategory::InputCapture, &source),
        ] {
            for handle in session.registry.handles(category) {
                steps.run(
                    format_args!("move {} {} to {}", category, handle, device),
                    control.move_stream(category, handle, device),
                );
            }
        }

        self.replay_volume(
            control,
            &sink,
            &DeviceProfile::Telephony,
            session,
            &mut steps,
        );
        session
            .volume
            .remember(&DeviceProfile::HighFidelity, new_volume);

        SwitchOutcome::Completed {
            direction,
            failed_steps: steps.failed,
        }
    }

    fn switch_to_high_fidelity<A: AudioControl>(
        &self,
        control: &A,
        session: &mut Session,
    ) -> SwitchOutcome {
        let direction = SwitchDirection::Reverse;
        let Some(endpoint) = self.resolve_endpoint(control) else {
            info!("No Bluetooth headset is the default output, staying put");
            return SwitchOutcome::Skipped { direction };
        };

        let new_volume = self.read_volume(control, &endpoint.sink);

        info!("Switching {} back to {}", endpoint, self.high_fidelity_profile);
        let mut steps = Steps::default();

        steps.run(
            format_args!("set {} profile {}", endpoint.card, self.high_fidelity_profile),
            control.set_card_profile(&endpoint.card, &self.high_fidelity_profile),
        );
        let sink = self.settled_device(
            control,
            &endpoint,
            DeviceKind::Sink,
            &self.high_fidelity_profile,
        );
        steps.run(
            format_args!("set default sink {}", sink),
            control.set_default_sink(&sink),
        );

        self.replay_volume(
            control,
            &sink,
            &DeviceProfile::HighFidelity,
            session,
            &mut steps,
        );
        session.volume.remember(&DeviceProfile::Telephony, new_volume);

        self.mute.unmute_all(control, &mut session.muted);

        SwitchOutcome::Completed {
            direction,
            failed_steps: steps.failed,
        }
    }
}
