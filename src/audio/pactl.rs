//! `pactl` command runner and output parsers
//!
//! Works against native PulseAudio and PipeWire's pipewire-pulse layer. All
//! commands run with `LC_ALL=C` so the field labels parsed here are stable.

use anyhow::{Context, Result, bail};
use std::process::Command;
use tracing::trace;

use super::device::{CardInfo, SinkVolume};
use super::stream::{StreamCategory, StreamHandle, StreamInfo};

/// Raw volume value of 100% (`PA_VOLUME_NORM`)
pub const VOLUME_NORM: u32 = 0x10000;

/// Thin wrapper around the `pactl` binary
#[derive(Debug, Clone)]
pub struct Pactl {
    program: String,
}

impl Pactl {
    pub fn new() -> Self {
        Self::with_program("pactl")
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `pactl` with the given arguments and return its stdout
    pub fn run(&self, args: &[&str]) -> Result<String> {
        trace!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .env("LC_ALL", "C")
            .output()
            .with_context(|| format!("Failed to execute {} {}", self.program, args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "{} {} failed ({}): {}",
                self.program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for Pactl {
    fn default() -> Self {
        Self::new()
    }
}

fn block_header(category: StreamCategory) -> &'static str {
    match category {
        StreamCategory::Output => "Sink Input #",
        StreamCategory::InputCapture => "Source Output #",
    }
}

fn parse_yes_no(value: &str) -> bool {
    value.trim() == "yes"
}

/// Extract `Default Sink:` from `pactl info`
pub fn parse_default_sink(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Default Sink:"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && name != "n/a")
}

/// Node names from `pactl list short sinks` / `pactl list short sources`
pub fn parse_short_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `pactl list sink-inputs` / `pactl list source-outputs`
pub fn parse_streams(output: &str, category: StreamCategory) -> Vec<StreamInfo> {
    let header = block_header(category);
    let mut streams = Vec::new();
    let mut current: Option<StreamInfo> = None;

    for line in output.lines() {
        let trimmed = line.trim();

        if let Some(index) = trimmed.strip_prefix(header) {
            if let Some(stream) = current.take() {
                streams.push(stream);
            }
            current = index
                .trim()
                .parse::<u32>()
                .ok()
                .map(|index| StreamInfo::new(StreamHandle(index), category));
            continue;
        }

        let Some(stream) = current.as_mut() else {
            continue;
        };

        if let Some(value) = trimmed.strip_prefix("Corked:") {
            stream.corked = parse_yes_no(value);
        } else if let Some(value) = trimmed.strip_prefix("Mute:") {
            stream.muted = parse_yes_no(value);
        } else if let Some(value) = trimmed.strip_prefix("application.name = ") {
            stream.application = Some(value.trim().trim_matches('"').to_string());
        }
    }

    if let Some(stream) = current {
        streams.push(stream);
    }

    streams
}

/// Parse `pactl list cards`
pub fn parse_cards(output: &str) -> Vec<CardInfo> {
    let mut cards = Vec::new();
    let mut current: Option<CardInfo> = None;

    for line in output.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("Card #") {
            if let Some(card) = current.take() {
                cards.push(card);
            }
            current = Some(CardInfo::new(""));
            continue;
        }

        let Some(card) = current.as_mut() else {
            continue;
        };

        if let Some(name) = trimmed.strip_prefix("Name:") {
            card.name = name.trim().to_string();
        } else if let Some(profile) = trimmed.strip_prefix("Active Profile:") {
            card.active_profile = Some(profile.trim().to_string());
        }
    }

    if let Some(card) = current {
        cards.push(card);
    }

    cards.retain(|card| !card.name.is_empty());
    cards
}

/// Parse the volume of `sink_name` from `pactl list sinks`.
///
/// Uses the first channel's raw value.
pub fn parse_sink_volume(output: &str, sink_name: &str) -> Option<SinkVolume> {
    let mut in_sink = false;

    for line in output.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("Sink #") {
            in_sink = false;
        } else if let Some(name) = trimmed.strip_prefix("Name:") {
            in_sink = name.trim() == sink_name;
        } else if in_sink {
            if let Some(channels) = trimmed.strip_prefix("Volume:") {
                let raw = parse_first_channel_raw(channels)?;
                let percent = f64::from(raw) * 100.0 / f64::from(VOLUME_NORM);
                return Some(SinkVolume::new(percent, VOLUME_NORM));
            }
        }
    }

    None
}

// "front-left: 26214 /  40% / -23.88 dB,   front-right: ..."
fn parse_first_channel_raw(channels: &str) -> Option<u32> {
    let first = channels.split(',').next()?;
    let (_, value) = first.split_once(':')?;
    value.split('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINK_INPUTS: &str = r#"Sink Input #42
	Driver: protocol-native.c
	Owner Module: 10
	Client: 35
	Sink: 1
	Sample Specification: s16le 2ch 44100Hz
	Corked: yes
	Mute: no
	Volume: front-left: 65536 / 100% / 0.00 dB,   front-right: 65536 / 100% / 0.00 dB
	        balance 0.00
	Properties:
		media.name = "Playback"
		application.name = "Firefox"
		application.process.id = "4242"

Sink Input #43
	Driver: protocol-native.c
	Corked: no
	Mute: yes
	Properties:
		media.name = "Call"
		application.name = "WEBRTC VoiceEngine"

Sink Input #44
	Corked: no
	Mute: no
	Properties:
		media.name = "event"
"#;

    const CARDS: &str = r#"Card #0
	Name: alsa_card.pci-0000_00_1f.3
	Driver: module-alsa-card.c
	Profiles:
		output:analog-stereo: Analog Stereo Output (sinks: 1, sources: 0, priority: 6500)
	Active Profile: output:analog-stereo+input:analog-stereo

Card #3
	Name: bluez_card.00_1B_66_AA_BB_CC
	Driver: module-bluez5-device.c
	Profiles:
		a2dp_sink: High Fidelity Playback (A2DP Sink) (sinks: 1, sources: 0, priority: 40)
		headset_head_unit: Headset Head Unit (HSP/HFP) (sinks: 1, sources: 1, priority: 30)
	Active Profile: a2dp_sink
"#;

    const SINKS: &str = r#"Sink #0
	State: SUSPENDED
	Name: alsa_output.pci-0000_00_1f.3.analog-stereo
	Mute: no
	Volume: front-left: 65536 / 100% / 0.00 dB,   front-right: 65536 / 100% / 0.00 dB
	        balance 0.00
	Base Volume: 65536 / 100% / 0.00 dB

Sink #1
	State: RUNNING
	Name: bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink
	Mute: no
	Volume: front-left: 26214 /  40% / -23.88 dB,   front-right: 26214 /  40% / -23.88 dB
	        balance 0.00
	Base Volume: 65536 / 100% / 0.00 dB
"#;

    #[test]
    fn test_parse_default_sink() {
        let info = "Server String: /run/user/1000/pulse/native\n\
                    Default Sink: bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink\n\
                    Default Source: alsa_input.pci\n";
        assert_eq!(
            parse_default_sink(info).as_deref(),
            Some("bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink")
        );
        assert_eq!(parse_default_sink("Server Name: pulseaudio\n"), None);
    }

    #[test]
    fn test_parse_sink_inputs() {
        let streams = parse_streams(SINK_INPUTS, StreamCategory::Output);
        assert_eq!(streams.len(), 3);

        assert_eq!(streams[0].handle, StreamHandle(42));
        assert_eq!(streams[0].application.as_deref(), Some("Firefox"));
        assert!(streams[0].corked);
        assert!(!streams[0].muted);

        assert_eq!(streams[1].application.as_deref(), Some("WEBRTC VoiceEngine"));
        assert!(!streams[1].corked);
        assert!(streams[1].muted);

        assert_eq!(streams[2].application, None);
    }

    #[test]
    fn test_parse_source_outputs_uses_its_own_header() {
        let output = "Source Output #5\n\tCorked: no\n\tMute: no\n\tProperties:\n\
                      \t\tapplication.name = \"Skype\"\n";
        let streams = parse_streams(output, StreamCategory::InputCapture);
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].category, StreamCategory::InputCapture);
        assert_eq!(streams[0].application.as_deref(), Some("Skype"));

        assert!(parse_streams(output, StreamCategory::Output).is_empty());
    }

    #[test]
    fn test_parse_cards() {
        let cards = parse_cards(CARDS);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].name, "bluez_card.00_1B_66_AA_BB_CC");
        assert_eq!(cards[1].active_profile.as_deref(), Some("a2dp_sink"));
    }

    #[test]
    fn test_parse_short_names() {
        let sources = concat!(
            "0\talsa_input.pci-0000_00_1f.3.analog-stereo\t",
            "module-alsa-card.c\ts16le 2ch 44100Hz\tSUSPENDED\n",
            "5\tbluez_sink.00_1B_66_AA_BB_CC.headset_head_unit.monitor\t",
            "module-bluez5-device.c\ts16le 1ch 16000Hz\tIDLE\n",
            "6\tbluez_source.00_1B_66_AA_BB_CC.headset_head_unit\t",
            "module-bluez5-device.c\ts16le 1ch 16000Hz\tRUNNING\n",
        );
        assert_eq!(
            parse_short_names(sources),
            vec![
                "alsa_input.pci-0000_00_1f.3.analog-stereo",
                "bluez_sink.00_1B_66_AA_BB_CC.headset_head_unit.monitor",
                "bluez_source.00_1B_66_AA_BB_CC.headset_head_unit",
            ]
        );
        assert!(parse_short_names("").is_empty());
    }

    #[test]
    fn test_parse_sink_volume() {
        let volume = parse_sink_volume(SINKS, "bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink").unwrap();
        assert_eq!(volume.total_steps, VOLUME_NORM);
        assert_eq!(volume.steps(), 26214);
        assert!((volume.percent - 40.0).abs() < 0.01);

        assert!(parse_sink_volume(SINKS, "bluez_sink.missing").is_none());
    }
}
