use serde::{Deserialize, Serialize};
use std::fmt;

/// Sink and source name prefixes of Bluetooth nodes: PulseAudio, then pipewire-pulse
const BLUEZ_NAMING: [(&str, &str); 2] = [
    ("bluez_sink.", "bluez_source."),
    ("bluez_output.", "bluez_input."),
];
const BLUEZ_CARD_PREFIX: &str = "bluez_card.";
const MONITOR_SUFFIX: &str = ".monitor";

/// Profile a Bluetooth card is currently running
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceProfile {
    /// A2DP stereo playback
    HighFidelity,
    /// HSP/HFP mono duplex
    Telephony,
    Other(String),
}

impl DeviceProfile {
    /// Classify a profile name reported by the server.
    ///
    /// `telephony_name` is the configured telephony profile, accepted even when it
    /// does not follow the usual `headset`/`hsp`/`hfp` naming.
    pub fn classify(profile_name: &str, telephony_name: &str) -> Self {
        let name = profile_name.trim();
        if name.starts_with("a2dp") {
            DeviceProfile::HighFidelity
        } else if name == telephony_name
            || name.starts_with("hsp")
            || name.starts_with("hfp")
            || name.starts_with("headset")
        {
            DeviceProfile::Telephony
        } else {
            DeviceProfile::Other(name.to_string())
        }
    }

    pub fn is_telephony(&self) -> bool {
        matches!(self, DeviceProfile::Telephony)
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::HighFidelity => write!(f, "High Fidelity (A2DP)"),
            DeviceProfile::Telephony => write!(f, "Telephony (HSP/HFP)"),
            DeviceProfile::Other(name) => write!(f, "Other ({})", name),
        }
    }
}

/// A card as enumerated by the audio server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    pub name: String,
    pub active_profile: Option<String>,
}

impl CardInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            active_profile: None,
        }
    }

    pub fn with_profile(mut self, profile: &str) -> Self {
        self.active_profile = Some(profile.to_string());
        self
    }
}

impl fmt::Display for CardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.name,
            self.active_profile.as_deref().unwrap_or("no active profile")
        )
    }
}

/// Which side of a card a device node sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Sink,
    Source,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Sink => f.write_str("sink"),
            DeviceKind::Source => f.write_str("source"),
        }
    }
}

/// The Bluetooth headset behind the current default sink.
///
/// Device names depend on the active profile (`bluez_sink.<addr>.a2dp_sink`
/// becomes `bluez_sink.<addr>.headset_head_unit`), so after a profile change
/// the real sink and source are picked out of a fresh listing with
/// [`BluetoothEndpoint::find_device`]. `sink` and `source` are the names
/// derived from the default sink and only serve as a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothEndpoint {
    pub address: String,
    pub sink: String,
    pub source: String,
    pub card: String,
}

impl BluetoothEndpoint {
    /// Derive the endpoint from the default sink name.
    ///
    /// Returns `None` unless the name is a `bluez_sink.*` or `bluez_output.*` node.
    pub fn from_sink_name(sink_name: &str) -> Option<Self> {
        let sink_name = sink_name.trim();
        let (rest, source_prefix) = BLUEZ_NAMING.iter().find_map(|(sink, source)| {
            sink_name.strip_prefix(*sink).map(|rest| (rest, *source))
        })?;
        let address = rest.split('.').next().filter(|a| !a.is_empty())?;

        Some(Self {
            address: address.to_string(),
            sink: sink_name.to_string(),
            source: format!("{}{}", source_prefix, rest),
            card: format!("{}{}", BLUEZ_CARD_PREFIX, address),
        })
    }

    /// Whether `name` is a sink or source node of this headset (monitors excluded)
    pub fn owns(&self, kind: DeviceKind, name: &str) -> bool {
        if name.ends_with(MONITOR_SUFFIX) {
            return false;
        }
        BLUEZ_NAMING.iter().any(|(sink, source)| {
            let prefix = match kind {
                DeviceKind::Sink => *sink,
                DeviceKind::Source => *source,
            };
            name.strip_prefix(prefix)
                .is_some_and(|rest| rest.split('.').next() == Some(self.address.as_str()))
        })
    }

    /// Pick this headset's device out of a listing of `kind` nodes.
    ///
    /// A node whose last name segment is `profile` wins; otherwise the first
    /// node of the headset is used.
    pub fn find_device<'a>(
        &self,
        kind: DeviceKind,
        names: &'a [String],
        profile: &str,
    ) -> Option<&'a str> {
        let mut owned = names
            .iter()
            .map(String::as_str)
            .filter(|name| self.owns(kind, name))
            .peekable();
        let first = owned.peek().copied();
        owned
            .find(|name| name.rsplit('.').next() == Some(profile))
            .or(first)
    }

    /// Name derived from the default sink, used when no listing is available
    pub fn derived(&self, kind: DeviceKind) -> &str {
        match kind {
            DeviceKind::Sink => &self.sink,
            DeviceKind::Source => &self.source,
        }
    }
}

impl fmt::Display for BluetoothEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (sink {})", self.card, self.sink)
    }
}

/// Volume of a sink as reported by the server
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkVolume {
    pub percent: f64,
    pub total_steps: u32,
}

impl SinkVolume {
    pub fn new(percent: f64, total_steps: u32) -> Self {
        Self {
            percent,
            total_steps,
        }
    }

    /// Volume as a discrete step count
    pub fn steps(&self) -> u32 {
        let steps = (self.percent / 100.0 * f64::from(self.total_steps)).round();
        if steps <= 0.0 { 0 } else { steps as u32 }
    }
}

impl fmt::Display for SinkVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} steps ({:.0}%)",
            self.steps(),
            self.total_steps,
            self.percent
        )
    }
}
