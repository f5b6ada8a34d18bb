use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::{CardInfo, DeviceKind, SinkVolume, StreamCategory, StreamHandle, StreamInfo};
use crate::system::traits::{AudioControl, EventSource, FileSystemInterface, Subscription};

/// A mutating command issued against [`MockAudioControl`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    SetCardProfile {
        card: String,
        profile: String,
    },
    SetDefaultSink(String),
    SetDefaultSource(String),
    MoveStream {
        category: StreamCategory,
        handle: StreamHandle,
        device: String,
    },
    SetSinkVolume {
        sink: String,
        steps: u32,
    },
    SetStreamMute {
        handle: StreamHandle,
        muted: bool,
    },
}

/// Mock audio server for testing - provides controllable server state
#[derive(Clone)]
pub struct MockAudioControl {
    pub streams: Arc<Mutex<Vec<StreamInfo>>>,
    pub cards: Arc<Mutex<Vec<CardInfo>>>,
    pub sinks: Arc<Mutex<Vec<String>>>,
    pub sources: Arc<Mutex<Vec<String>>>,
    /// Headset nodes are named after the card profile and renamed when it changes
    pub renames_devices: Arc<Mutex<bool>>,
    pub default_sink: Arc<Mutex<Option<String>>>,
    pub sink_volumes: Arc<Mutex<HashMap<String, SinkVolume>>>,
    pub commands: Arc<Mutex<Vec<ControlCommand>>>,
    pub should_fail_queries: Arc<Mutex<bool>>,
    pub should_fail_commands: Arc<Mutex<bool>>,
}

impl MockAudioControl {
    pub fn new() -> Self {
        Self {
            streams: Arc::new(Mutex::new(Vec::new())),
            cards: Arc::new(Mutex::new(Vec::new())),
            sinks: Arc::new(Mutex::new(Vec::new())),
            sources: Arc::new(Mutex::new(Vec::new())),
            renames_devices: Arc::new(Mutex::new(false)),
            default_sink: Arc::new(Mutex::new(None)),
            sink_volumes: Arc::new(Mutex::new(HashMap::new())),
            commands: Arc::new(Mutex::new(Vec::new())),
            should_fail_queries: Arc::new(Mutex::new(false)),
            should_fail_commands: Arc::new(Mutex::new(false)),
        }
    }

    /// Connect a headset with fixed `bluez_sink.<addr>`/`bluez_source.<addr>` nodes
    /// and make it the default sink
    pub fn add_bluetooth_headset(&self, address: &str, profile: &str, volume: SinkVolume) {
        let sink = format!("bluez_sink.{}", address);
        self.cards
            .lock()
            .unwrap()
            .push(CardInfo::new(&format!("bluez_card.{}", address)).with_profile(profile));
        self.sinks.lock().unwrap().push(sink.clone());
        self.sources
            .lock()
            .unwrap()
            .push(format!("bluez_source.{}", address));
        self.sink_volumes
            .lock()
            .unwrap()
            .insert(sink.clone(), volume);
        *self.default_sink.lock().unwrap() = Some(sink);
    }

    /// Connect a headset whose nodes carry the profile name, as module-bluez5-device
    /// does (`bluez_sink.<addr>.a2dp_sink`), and make it the default sink.
    ///
    /// Setting the card profile replaces the nodes. A new sink starts at the level
    /// the old one had, unless it was seen before.
    pub fn add_bluez5_headset(&self, address: &str, profile: &str, volume: SinkVolume) {
        self.cards
            .lock()
            .unwrap()
            .push(CardInfo::new(&format!("bluez_card.{}", address)).with_profile(profile));
        *self.renames_devices.lock().unwrap() = true;

        let sink = self.publish_headset_nodes(address, profile);
        self.sink_volumes
            .lock()
            .unwrap()
            .insert(sink.clone(), volume);
        *self.default_sink.lock().unwrap() = Some(sink);
    }

    fn publish_headset_nodes(&self, address: &str, profile: &str) -> String {
        let sink_prefix = format!("bluez_sink.{}.", address);
        let source_prefix = format!("bluez_source.{}.", address);
        let sink = format!("{}{}", sink_prefix, profile);

        let mut sinks = self.sinks.lock().unwrap();
        sinks.retain(|name| !name.starts_with(&sink_prefix));
        sinks.push(sink.clone());

        let mut sources = self.sources.lock().unwrap();
        sources.retain(|name| !name.starts_with(&sink_prefix) && !name.starts_with(&source_prefix));
        sources.push(format!("{}.monitor", sink));
        if !profile.starts_with("a2dp") {
            sources.push(format!("{}{}", source_prefix, profile));
        }
        sink
    }

    fn rename_headset_nodes(&self, card: &str, profile: &str) {
        let Some(address) = card.strip_prefix("bluez_card.") else {
            return;
        };
        let sink_prefix = format!("bluez_sink.{}.", address);
        let previous = self
            .sinks
            .lock()
            .unwrap()
            .iter()
            .find(|name| name.starts_with(&sink_prefix))
            .cloned();

        let sink = self.publish_headset_nodes(address, profile);

        if let Some(previous) = previous {
            let mut volumes = self.sink_volumes.lock().unwrap();
            if let Some(volume) = volumes.get(&previous).copied() {
                volumes.entry(sink.clone()).or_insert(volume);
            }
            let mut default_sink = self.default_sink.lock().unwrap();
            if default_sink.as_deref() == Some(previous.as_str()) {
                *default_sink = Some(sink);
            }
        }
    }

    /// Add a stream to the mock server
    pub fn add_stream(&self, stream: StreamInfo) {
        self.streams.lock().unwrap().push(stream);
    }

    /// Remove a stream from the mock server
    pub fn remove_stream(&self, category: StreamCategory, handle: StreamHandle) {
        self.streams
            .lock()
            .unwrap()
            .retain(|s| !(s.category == category && s.handle == handle));
    }

    /// Pause or resume a stream behind the switcher's back
    pub fn set_mock_stream_corked(&self, handle: StreamHandle, corked: bool) {
        if let Some(stream) = self
            .streams
            .lock()
            .unwrap()
            .iter_mut()
            .find(|s| s.category == StreamCategory::Output && s.handle == handle)
        {
            stream.corked = corked;
        }
    }

    pub fn set_mock_default_sink(&self, sink: Option<&str>) {
        *self.default_sink.lock().unwrap() = sink.map(String::from);
    }

    /// Change a sink's volume behind the switcher's back
    pub fn set_mock_sink_volume(&self, sink: &str, volume: SinkVolume) {
        self.sink_volumes
            .lock()
            .unwrap()
            .insert(sink.to_string(), volume);
    }

    pub fn card_profile(&self, card: &str) -> Option<String> {
        self.cards
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == card)
            .and_then(|c| c.active_profile.clone())
    }

    pub fn sink_volume_steps(&self, sink: &str) -> Option<u32> {
        self.sink_volumes
            .lock()
            .unwrap()
            .get(sink)
            .map(SinkVolume::steps)
    }

    pub fn is_stream_muted(&self, handle: StreamHandle) -> Option<bool> {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.category == StreamCategory::Output && s.handle == handle)
            .map(|s| s.muted)
    }

    /// Every attempted mutation, including failed ones
    pub fn get_commands(&self) -> Vec<ControlCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }

    /// Configure the mock to fail every query
    pub fn set_query_failure(&self, should_fail: bool) {
        *self.should_fail_queries.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail every mutating command
    pub fn set_command_failure(&self, should_fail: bool) {
        *self.should_fail_commands.lock().unwrap() = should_fail;
    }

    fn check_query(&self) -> Result<()> {
        if *self.should_fail_queries.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock query failure"));
        }
        Ok(())
    }

    fn check_device(&self, kind: DeviceKind, name: &str) -> Result<()> {
        let devices = match kind {
            DeviceKind::Sink => &self.sinks,
            DeviceKind::Source => &self.sources,
        };
        if !devices.lock().unwrap().iter().any(|device| device == name) {
            return Err(anyhow::anyhow!("No such {}: {}", kind, name));
        }
        Ok(())
    }

    fn record(&self, command: ControlCommand) -> Result<()> {
        self.commands.lock().unwrap().push(command);
        if *self.should_fail_commands.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock command failure"));
        }
        Ok(())
    }
}

impl AudioControl for MockAudioControl {
    fn list_streams(&self, category: StreamCategory) -> Result<Vec<StreamInfo>> {
        self.check_query()?;
        Ok(self
            .streams
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.category == category)
            .cloned()
            .collect())
    }

    fn list_cards(&self) -> Result<Vec<CardInfo>> {
        self.check_query()?;
        Ok(self.cards.lock().unwrap().clone())
    }

    fn list_devices(&self, kind: DeviceKind) -> Result<Vec<String>> {
        self.check_query()?;
        let devices = match kind {
            DeviceKind::Sink => &self.sinks,
            DeviceKind::Source => &self.sources,
        };
        Ok(devices.lock().unwrap().clone())
    }

    fn get_default_sink(&self) -> Result<Option<String>> {
        self.check_query()?;
        Ok(self.default_sink.lock().unwrap().clone())
    }

    fn get_sink_volume(&self, sink: &str) -> Result<Option<SinkVolume>> {
        self.check_query()?;
        Ok(self.sink_volumes.lock().unwrap().get(sink).copied())
    }

    fn set_card_profile(&self, card: &str, profile: &str) -> Result<()> {
        self.record(ControlCommand::SetCardProfile {
            card: card.to_string(),
            profile: profile.to_string(),
        })?;

        if let Some(found) = self.cards.lock().unwrap().iter_mut().find(|c| c.name == card) {
            found.active_profile = Some(profile.to_string());
        }
        if *self.renames_devices.lock().unwrap() {
            self.rename_headset_nodes(card, profile);
        }
        Ok(())
    }

    fn set_default_sink(&self, sink: &str) -> Result<()> {
        self.record(ControlCommand::SetDefaultSink(sink.to_string()))?;
        self.check_device(DeviceKind::Sink, sink)?;
        *self.default_sink.lock().unwrap() = Some(sink.to_string());
        Ok(())
    }

    fn set_default_source(&self, source: &str) -> Result<()> {
        self.record(ControlCommand::SetDefaultSource(source.to_string()))?;
        self.check_device(DeviceKind::Source, source)
    }

    fn move_stream(
        &self,
        category: StreamCategory,
        handle: StreamHandle,
        device: &str,
    ) -> Result<()> {
        self.record(ControlCommand::MoveStream {
            category,
            handle,
            device: device.to_string(),
        })?;
        let kind = match category {
            StreamCategory::Output => DeviceKind::Sink,
            StreamCategory::InputCapture => DeviceKind::Source,
        };
        self.check_device(kind, device)
    }

    fn set_sink_volume(&self, sink: &str, steps: u32) -> Result<()> {
        self.record(ControlCommand::SetSinkVolume {
            sink: sink.to_string(),
            steps,
        })?;
        self.check_device(DeviceKind::Sink, sink)?;

        let mut volumes = self.sink_volumes.lock().unwrap();
        if let Some(volume) = volumes.get_mut(sink) {
            volume.percent = f64::from(steps) * 100.0 / f64::from(volume.total_steps);
        }
        Ok(())
    }

    fn set_stream_mute(&self, handle: StreamHandle, muted: bool) -> Result<()> {
        self.record(ControlCommand::SetStreamMute { handle, muted })?;

        if let Some(stream) = self
            .streams
            .lock()
            .unwrap()
            .iter_mut()
            .find(|s| s.category == StreamCategory::Output && s.handle == handle)
        {
            stream.muted = muted;
        }
        Ok(())
    }
}

impl Default for MockAudioControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Scripted outcome of one [`MockEventSource::connect`] call
#[derive(Debug, Clone)]
pub enum MockConnection {
    /// Server not reachable
    Refused,
    /// Deliver these lines, then close the feed
    Lines(Vec<String>),
    /// Deliver these lines, then stay open without producing more
    Open(Vec<String>),
}

/// Mock event source for testing - replays scripted subscriptions
#[derive(Clone)]
pub struct MockEventSource {
    pub connections: Arc<Mutex<VecDeque<MockConnection>>>,
    pub connect_attempts: Arc<AtomicUsize>,
}

impl MockEventSource {
    /// A source that refuses every connection until scripted otherwise
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(VecDeque::new())),
            connect_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue the outcome of the next connection attempt
    pub fn push_connection(&self, connection: MockConnection) {
        self.connections.lock().unwrap().push_back(connection);
    }

    /// Queue a subscription delivering `lines` and then closing
    pub fn push_lines(&self, lines: &[&str]) {
        self.push_connection(MockConnection::Lines(
            lines.iter().map(|l| l.to_string()).collect(),
        ));
    }

    pub fn get_connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::Relaxed)
    }
}

impl Default for MockEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for MockEventSource {
    type Subscription = MockSubscription;

    async fn connect(&self) -> Result<MockSubscription> {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);

        let next = self.connections.lock().unwrap().pop_front();
        match next.unwrap_or(MockConnection::Refused) {
            MockConnection::Refused => Err(anyhow::anyhow!("Mock connection refused")),
            MockConnection::Lines(lines) => Ok(MockSubscription {
                lines: lines.into(),
                stay_open: false,
            }),
            MockConnection::Open(lines) => Ok(MockSubscription {
                lines: lines.into(),
                stay_open: true,
            }),
        }
    }
}

/// Subscription handed out by [`MockEventSource`]
pub struct MockSubscription {
    lines: VecDeque<String>,
    stay_open: bool,
}

impl Subscription for MockSubscription {
    async fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }
        if self.stay_open {
            std::future::pending::<()>().await;
        }
        Ok(None)
    }
}

/// Mock file system for testing - provides controllable file operations
#[derive(Clone)]
pub struct MockFileSystem {
    pub files: Arc<Mutex<HashMap<PathBuf, String>>>,
    pub read_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub write_calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub directory_creation_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub should_fail_read: Arc<Mutex<bool>>,
    pub should_fail_write: Arc<Mutex<bool>>,
    pub should_fail_create_dir: Arc<Mutex<bool>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            read_calls: Arc::new(Mutex::new(Vec::new())),
            write_calls: Arc::new(Mutex::new(Vec::new())),
            directory_creation_calls: Arc::new(Mutex::new(Vec::new())),
            should_fail_read: Arc::new(Mutex::new(false)),
            should_fail_write: Arc::new(Mutex::new(false)),
            should_fail_create_dir: Arc::new(Mutex::new(false)),
        }
    }

    /// Add a file to the mock file system
    pub fn add_file<P: AsRef<Path>>(&self, path: P, content: String) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), content);
    }

    /// Get all read calls that were made
    pub fn get_read_calls(&self) -> Vec<PathBuf> {
        self.read_calls.lock().unwrap().clone()
    }

    /// Get all write calls that were made
    pub fn get_write_calls(&self) -> Vec<(PathBuf, String)> {
        self.write_calls.lock().unwrap().clone()
    }

    /// Get all directory creation calls that were made
    pub fn get_directory_creation_calls(&self) -> Vec<PathBuf> {
        self.directory_creation_calls.lock().unwrap().clone()
    }

    /// Configure the mock to fail read operations
    pub fn set_read_failure(&self, should_fail: bool) {
        *self.should_fail_read.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail write operations
    pub fn set_write_failure(&self, should_fail: bool) {
        *self.should_fail_write.lock().unwrap() = should_fail;
    }

    /// Configure the mock to fail directory creation
    pub fn set_create_dir_failure(&self, should_fail: bool) {
        *self.should_fail_create_dir.lock().unwrap() = should_fail;
    }

    /// Check if a file exists in the mock system
    pub fn file_exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files
            .lock()
            .unwrap()
            .contains_key(&path.as_ref().to_path_buf())
    }
}

impl FileSystemInterface for MockFileSystem {
    fn read_config_file(&self, path: &Path) -> Result<String> {
        self.read_calls.lock().unwrap().push(path.to_path_buf());

        if *self.should_fail_read.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock read failure"));
        }

        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))
    }

    fn write_config_file(&self, path: &Path, content: &str) -> Result<()> {
        self.write_calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), content.to_string()));

        if *self.should_fail_write.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock write failure"));
        }

        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn config_file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_config_dir(&self, path: &Path) -> Result<()> {
        self.directory_creation_calls
            .lock()
            .unwrap()
            .push(path.to_path_buf());

        if *self.should_fail_create_dir.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock create directory failure"));
        }

        Ok(())
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}
