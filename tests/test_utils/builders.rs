//! Test utility builders for streams, allow-list rules and mock audio servers
//!
//! Individual methods may not be used by all tests, so dead code warnings are suppressed.

#![allow(dead_code)]

use bt_profile_switcher::audio::{SinkVolume, StreamCategory, StreamHandle, StreamInfo};
use bt_profile_switcher::config::{ClientRule, MatchType};
use bt_profile_switcher::switcher::CallController;
use bt_profile_switcher::system::MockAudioControl;

pub const HEADSET: &str = "00_1B_66_AA_BB_CC";

pub fn headset_sink() -> String {
    format!("bluez_sink.{}", HEADSET)
}

pub fn headset_source() -> String {
    format!("bluez_source.{}", HEADSET)
}

pub fn headset_card() -> String {
    format!("bluez_card.{}", HEADSET)
}

/// Sink or source node of a headset whose node names carry the profile
pub fn bluez5_node(kind: &str, profile: &str) -> String {
    format!("bluez_{}.{}.{}", kind, HEADSET, profile)
}

/// Builder for creating test StreamInfo instances
pub struct StreamInfoBuilder {
    handle: u32,
    category: StreamCategory,
    application: Option<String>,
    corked: bool,
    muted: bool,
}

impl StreamInfoBuilder {
    pub fn new() -> Self {
        Self {
            handle: 1,
            category: StreamCategory::Output,
            application: None,
            corked: false,
            muted: false,
        }
    }

    pub fn playback(handle: u32) -> Self {
        Self::new().handle(handle).output()
    }

    pub fn capture(handle: u32) -> Self {
        Self::new().handle(handle).capture_stream()
    }

    pub fn handle(mut self, handle: u32) -> Self {
        self.handle = handle;
        self
    }

    pub fn output(mut self) -> Self {
        self.category = StreamCategory::Output;
        self
    }

    pub fn capture_stream(mut self) -> Self {
        self.category = StreamCategory::InputCapture;
        self
    }

    pub fn app(mut self, application: &str) -> Self {
        self.application = Some(application.to_string());
        self
    }

    pub fn corked(mut self) -> Self {
        self.corked = true;
        self
    }

    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }

    pub fn build(self) -> StreamInfo {
        let mut stream = StreamInfo::new(StreamHandle(self.handle), self.category)
            .set_corked(self.corked)
            .set_muted(self.muted);
        if let Some(application) = self.application {
            stream = stream.with_application(&application);
        }
        stream
    }
}

impl Default for StreamInfoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test ClientRule instances
pub struct ClientRuleBuilder {
    name: String,
    match_type: MatchType,
    enabled: bool,
}

impl ClientRuleBuilder {
    pub fn new() -> Self {
        Self {
            name: "Test Client".to_string(),
            match_type: MatchType::Exact,
            enabled: true,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn exact_match(mut self) -> Self {
        self.match_type = MatchType::Exact;
        self
    }

    pub fn contains_match(mut self) -> Self {
        self.match_type = MatchType::Contains;
        self
    }

    pub fn regex_match(mut self) -> Self {
        self.match_type = MatchType::Regex;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn build(self) -> ClientRule {
        ClientRule {
            name: self.name,
            match_type: self.match_type,
            enabled: self.enabled,
        }
    }
}

impl Default for ClientRuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper functions for creating common test scenarios
pub mod scenarios {
    use super::*;

    /// Headset on A2DP at 40% of 16 steps, as default sink
    pub fn headset_on_a2dp() -> MockAudioControl {
        let control = MockAudioControl::new();
        control.add_bluetooth_headset(HEADSET, "a2dp_sink", SinkVolume::new(40.0, 16));
        control
    }

    /// Headset on A2DP at 40% of 16 steps with nodes renamed on every profile change
    pub fn bluez5_headset_on_a2dp() -> MockAudioControl {
        let control = MockAudioControl::new();
        control.add_bluez5_headset(HEADSET, "a2dp_sink", SinkVolume::new(40.0, 16));
        control
    }

    /// Skype capture #5 and playback #7, the two halves of a call
    pub fn add_skype_call(control: &MockAudioControl) {
        control.add_stream(StreamInfoBuilder::capture(5).app("Skype").build());
        control.add_stream(StreamInfoBuilder::playback(7).app("Skype").build());
    }

    /// A music player opened paused (#30) and a live browser tab (#31)
    pub fn add_background_playback(control: &MockAudioControl) {
        control.add_stream(StreamInfoBuilder::playback(30).app("Rhythmbox").corked().build());
        control.add_stream(StreamInfoBuilder::playback(31).app("Firefox").build());
    }

    /// Background playback announced to the controller, then the music player resumes
    pub fn start_background_playback(
        control: &MockAudioControl,
        controller: &mut CallController<MockAudioControl>,
    ) {
        add_background_playback(control);
        controller.handle_line("Event 'new' on sink-input #30");
        controller.handle_line("Event 'new' on sink-input #31");
        control.set_mock_stream_corked(StreamHandle(30), false);
    }
}
