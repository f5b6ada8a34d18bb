use anyhow::Result;
use std::path::Path;

use crate::audio::{CardInfo, DeviceKind, SinkVolume, StreamCategory, StreamHandle, StreamInfo};

/// Trait for audio server control - abstracts `pactl` and friends.
///
/// Every operation may fail on its own; callers decide whether a failure is fatal.
pub trait AudioControl {
    /// Enumerate active streams of one category
    fn list_streams(&self, category: StreamCategory) -> Result<Vec<StreamInfo>>;

    /// Enumerate cards with their active profile
    fn list_cards(&self) -> Result<Vec<CardInfo>>;

    /// Names of every sink or source node, monitors included
    fn list_devices(&self, kind: DeviceKind) -> Result<Vec<String>>;

    /// Name of the current default sink, if the server has one
    fn get_default_sink(&self) -> Result<Option<String>>;

    /// Current volume of a sink, `None` if the sink is unknown
    fn get_sink_volume(&self, sink: &str) -> Result<Option<SinkVolume>>;

    /// Switch a card to the named profile
    fn set_card_profile(&self, card: &str, profile: &str) -> Result<()>;

    fn set_default_sink(&self, sink: &str) -> Result<()>;

    fn set_default_source(&self, source: &str) -> Result<()>;

    /// Move a stream onto another sink (Output) or source (InputCapture)
    fn move_stream(&self, category: StreamCategory, handle: StreamHandle, device: &str)
    -> Result<()>;

    /// Set a sink's volume to an absolute step count
    fn set_sink_volume(&self, sink: &str, steps: u32) -> Result<()>;

    /// Set or clear the mute flag of a playback stream
    fn set_stream_mute(&self, handle: StreamHandle, muted: bool) -> Result<()>;
}

/// Live, ordered feed of server notifications.
///
/// A connection is one subscription; there is no replay, a new subscription
/// only sees events from the moment it is established.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    type Subscription: Subscription;

    /// Establish a new subscription
    async fn connect(&self) -> Result<Self::Subscription>;
}

/// One established subscription, yielding raw notification lines in order
#[allow(async_fn_in_trait)]
pub trait Subscription {
    /// Next line, or `None` once the feed has closed
    async fn next_line(&mut self) -> Result<Option<String>>;
}

/// Trait for file system operations - abstracts std::fs for testability
pub trait FileSystemInterface {
    /// Read the entire contents of a configuration file
    fn read_config_file(&self, path: &Path) -> Result<String>;

    /// Write configuration content to a file
    fn write_config_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Check if a configuration file exists
    fn config_file_exists(&self, path: &Path) -> bool;

    /// Create the directory structure for config files
    fn create_config_dir(&self, path: &Path) -> Result<()>;
}
