use anyhow::Result;
use tracing::{debug, info, trace, warn};

use super::decider::{self, CallState, Trigger};
use super::event::{EventKind, SubscriptionEvent};
use super::filter::ClientFilter;
use super::orchestrator::{SwitchOrchestrator, SwitchOutcome};
use super::session::Session;
use crate::audio::{StreamCategory, StreamHandle, StreamInfo};
use crate::config::Config;
use crate::system::AudioControl;

/// Turns subscription events into profile switches.
///
/// Generic over [`AudioControl`] so the whole event path can run against a mock server.
pub struct CallController<A: AudioControl> {
    audio_control: A,
    filter: ClientFilter,
    orchestrator: SwitchOrchestrator,
    session: Session,
}

impl<A: AudioControl> CallController<A> {
    pub fn new(audio_control: A, config: &Config) -> Result<Self> {
        Ok(Self {
            audio_control,
            filter: ClientFilter::new(config)?,
            orchestrator: SwitchOrchestrator::new(&config.switching),
            session: Session::new(config.switching.volume_memory),
        })
    }

    /// Handle one raw line of the event feed; unparseable lines are ignored
    pub fn handle_line(&mut self, line: &str) -> Option<SwitchOutcome> {
        match SubscriptionEvent::parse(line) {
            Some(event) => self.handle_event(&event),
            None => {
                trace!("Ignoring feed line: {}", line.trim_end());
                None
            }
        }
    }

    /// Apply an event to the registry and switch if the call state calls for it
    pub fn handle_event(&mut self, event: &SubscriptionEvent) -> Option<SwitchOutcome> {
        let Some((category, handle)) = event.stream() else {
            trace!("Ignoring event: {}", event);
            return None;
        };

        match event.kind {
            EventKind::New => self.on_new_stream(category, handle),
            EventKind::Remove => self.on_removed_stream(category, handle),
            EventKind::Change => None,
        }
    }

    fn on_new_stream(
        &mut self,
        category: StreamCategory,
        handle: StreamHandle,
    ) -> Option<SwitchOutcome> {
        let stream = self.lookup(category, handle);
        if category == StreamCategory::Output && stream.as_ref().is_some_and(|s| s.corked) {
            self.session.started_corked.record(handle);
        }

        let application = stream.and_then(|s| s.application);
        let approved = self.session.registry.record_new(
            &self.filter,
            category,
            handle,
            application.as_deref(),
        );

        if approved {
            self.evaluate(Trigger::StreamAdded)
        } else {
            None
        }
    }

    fn on_removed_stream(
        &mut self,
        category: StreamCategory,
        handle: StreamHandle,
    ) -> Option<SwitchOutcome> {
        if category == StreamCategory::Output {
            self.session.started_corked.forget(handle);
            if self.session.muted.forget(handle) {
                debug!("Muted {} {} went away", category, handle);
            }
        }

        if self.session.registry.record_remove(category, handle) {
            self.evaluate(Trigger::StreamRemoved)
        } else {
            None
        }
    }

    /// Enumeration entry of a stream, if the server still knows it
    fn lookup(&self, category: StreamCategory, handle: StreamHandle) -> Option<StreamInfo> {
        let streams = match self.audio_control.list_streams(category) {
            Ok(streams) => streams,
            Err(e) => {
                warn!("Could not look up {} {}: {:#}", category, handle, e);
                return None;
            }
        };

        let stream = streams.into_iter().find(|s| s.handle == handle);
        match &stream {
            None => debug!("{} {} is already gone", category, handle),
            Some(s) if s.application.is_none() => {
                debug!("{} {} has no application name", category, handle)
            }
            Some(_) => {}
        }
        stream
    }

    fn evaluate(&mut self, trigger: Trigger) -> Option<SwitchOutcome> {
        let state = CallState::of(&self.session.registry);
        if !decider::needs_profile(trigger, state) {
            debug!("{:?} after {:?}, nothing to do", state, trigger);
            return None;
        }

        let profile = self.orchestrator.current_profile(&self.audio_control);
        let direction = decider::decide(trigger, state, profile.as_ref())?;

        info!("Call state {:?}, switching to {}", state, direction);
        Some(
            self.orchestrator
                .switch(direction, &self.audio_control, &mut self.session),
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn audio_control(&self) -> &A {
        &self.audio_control
    }

    pub fn filter(&self) -> &ClientFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{DeviceProfile, SinkVolume, StreamInfo};
    use crate::switcher::decider::SwitchDirection;
    use crate::system::MockAudioControl;

    const ADDRESS: &str = "00_1B_66_AA_BB_CC";

    fn controller_with_headset(profile: &str) -> CallController<MockAudioControl> {
        let control = MockAudioControl::new();
        control.add_bluetooth_headset(ADDRESS, profile, SinkVolume::new(40.0, 16));
        CallController::new(control, &Config::default()).unwrap()
    }

    fn add_stream(
        controller: &CallController<MockAudioControl>,
        category: StreamCategory,
        index: u32,
        app: &str,
    ) {
        controller
            .audio_control()
            .add_stream(StreamInfo::new(StreamHandle(index), category).with_application(app));
    }

    #[test]
    fn test_call_start_switches_once() {
        let mut controller = controller_with_headset("a2dp_sink");
        add_stream(&controller, StreamCategory::InputCapture, 5, "Skype");
        add_stream(&controller, StreamCategory::Output, 7, "Skype");

        assert_eq!(controller.handle_line("Event 'new' on source-output #5"), None);
        let outcome = controller
            .handle_line("Event 'new' on sink-input #7")
            .unwrap();
        assert_eq!(outcome.direction(), SwitchDirection::Forward);

        let card = format!("bluez_card.{}", ADDRESS);
        assert_eq!(
            controller.audio_control().card_profile(&card).as_deref(),
            Some("headset_head_unit")
        );

        // a second Skype playback stream must not switch again
        add_stream(&controller, StreamCategory::Output, 8, "Skype");
        assert_eq!(controller.handle_line("Event 'new' on sink-input #8"), None);
    }

    #[test]
    fn test_unknown_application_is_ignored() {
        let mut controller = controller_with_headset("a2dp_sink");
        add_stream(&controller, StreamCategory::Output, 9, "UnknownApp");

        assert_eq!(controller.handle_line("Event 'new' on sink-input #9"), None);
        assert_eq!(controller.handle_line("Event 'remove' on sink-input #9"), None);
        assert!(controller.session().registry().is_idle());
        assert!(controller.audio_control().get_commands().is_empty());
    }

    #[test]
    fn test_vanished_stream_is_not_registered() {
        let mut controller = controller_with_headset("a2dp_sink");
        assert_eq!(controller.handle_line("Event 'new' on sink-input #11"), None);
        assert!(controller.session().registry().is_idle());
    }

    #[test]
    fn test_call_end_reverses_only_from_telephony() {
        let mut controller = controller_with_headset("headset_head_unit");
        add_stream(&controller, StreamCategory::InputCapture, 5, "Skype");
        add_stream(&controller, StreamCategory::Output, 7, "Skype");

        controller.handle_line("Event 'new' on source-output #5");
        // already in telephony: nothing to do on call start
        assert_eq!(controller.handle_line("Event 'new' on sink-input #7"), None);

        assert_eq!(controller.handle_line("Event 'remove' on sink-input #7"), None);
        let outcome = controller
            .handle_line("Event 'remove' on source-output #5")
            .unwrap();
        assert_eq!(outcome.direction(), SwitchDirection::Reverse);
        assert_eq!(
            controller.orchestrator.current_profile(controller.audio_control()),
            Some(DeviceProfile::HighFidelity)
        );
    }

    #[test]
    fn test_corked_playback_is_remembered_until_removed() {
        let mut controller = controller_with_headset("a2dp_sink");
        controller.audio_control().add_stream(
            StreamInfo::new(StreamHandle(30), StreamCategory::Output)
                .with_application("Rhythmbox")
                .set_corked(true),
        );
        add_stream(&controller, StreamCategory::Output, 31, "Firefox");
        controller.audio_control().add_stream(
            StreamInfo::new(StreamHandle(6), StreamCategory::InputCapture).set_corked(true),
        );

        controller.handle_line("Event 'new' on sink-input #30");
        controller.handle_line("Event 'new' on sink-input #31");
        controller.handle_line("Event 'new' on source-output #6");

        let started = controller.session().started_corked();
        assert_eq!(started.len(), 1);
        assert!(started.contains(StreamHandle(30)));

        controller.handle_line("Event 'remove' on sink-input #30");
        assert!(controller.session().started_corked().is_empty());
    }

    #[test]
    fn test_change_and_noise_lines_are_ignored() {
        let mut controller = controller_with_headset("a2dp_sink");
        assert_eq!(controller.handle_line("Event 'change' on sink-input #7"), None);
        assert_eq!(controller.handle_line("Event 'new' on client #12"), None);
        assert_eq!(controller.handle_line("garbage"), None);
        assert!(controller.audio_control().get_commands().is_empty());
    }
}
