use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

use crate::audio::pactl::{self, Pactl};
use crate::audio::{CardInfo, DeviceKind, SinkVolume, StreamCategory, StreamHandle, StreamInfo};
use crate::system::traits::{AudioControl, EventSource, FileSystemInterface, Subscription};

/// Production implementation of AudioControl using `pactl`
#[derive(Debug, Clone, Default)]
pub struct PactlAudioControl {
    pactl: Pactl,
}

impl PactlAudioControl {
    pub fn new() -> Self {
        Self {
            pactl: Pactl::new(),
        }
    }

    pub fn with_pactl(pactl: Pactl) -> Self {
        Self { pactl }
    }

    fn command(&self, args: &[&str]) -> Result<()> {
        self.pactl.run(args).map(|_| ())
    }
}

impl AudioControl for PactlAudioControl {
    fn list_streams(&self, category: StreamCategory) -> Result<Vec<StreamInfo>> {
        let listing = match category {
            StreamCategory::Output => "sink-inputs",
            StreamCategory::InputCapture => "source-outputs",
        };
        let output = self.pactl.run(&["list", listing])?;
        Ok(pactl::parse_streams(&output, category))
    }

    fn list_cards(&self) -> Result<Vec<CardInfo>> {
        let output = self.pactl.run(&["list", "cards"])?;
        Ok(pactl::parse_cards(&output))
    }

    fn list_devices(&self, kind: DeviceKind) -> Result<Vec<String>> {
        let listing = match kind {
            DeviceKind::Sink => "sinks",
            DeviceKind::Source => "sources",
        };
        let output = self.pactl.run(&["list", "short", listing])?;
        Ok(pactl::parse_short_names(&output))
    }

    fn get_default_sink(&self) -> Result<Option<String>> {
        let output = self.pactl.run(&["info"])?;
        Ok(pactl::parse_default_sink(&output))
    }

    fn get_sink_volume(&self, sink: &str) -> Result<Option<SinkVolume>> {
        let output = self.pactl.run(&["list", "sinks"])?;
        Ok(pactl::parse_sink_volume(&output, sink))
    }

    fn set_card_profile(&self, card: &str, profile: &str) -> Result<()> {
        self.command(&["set-card-profile", card, profile])
    }

    fn set_default_sink(&self, sink: &str) -> Result<()> {
        self.command(&["set-default-sink", sink])
    }

    fn set_default_source(&self, source: &str) -> Result<()> {
        self.command(&["set-default-source", source])
    }

    fn move_stream(
        &self,
        category: StreamCategory,
        handle: StreamHandle,
        device: &str,
    ) -> Result<()> {
        let verb = match category {
            StreamCategory::Output => "move-sink-input",
            StreamCategory::InputCapture => "move-source-output",
        };
        self.command(&[verb, &handle.0.to_string(), device])
    }

    fn set_sink_volume(&self, sink: &str, steps: u32) -> Result<()> {
        self.command(&["set-sink-volume", sink, &steps.to_string()])
    }

    fn set_stream_mute(&self, handle: StreamHandle, muted: bool) -> Result<()> {
        let flag = if muted { "1" } else { "0" };
        self.command(&["set-sink-input-mute", &handle.0.to_string(), flag])
    }
}

/// Production implementation of EventSource backed by `pactl subscribe`
#[derive(Debug, Clone, Default)]
pub struct PactlEventSource {
    pactl: Pactl,
}

impl PactlEventSource {
    pub fn new() -> Self {
        Self {
            pactl: Pactl::new(),
        }
    }

    pub fn with_pactl(pactl: Pactl) -> Self {
        Self { pactl }
    }
}

impl EventSource for PactlEventSource {
    type Subscription = PactlSubscription;

    async fn connect(&self) -> Result<PactlSubscription> {
        let program = self.pactl.program();

        // `pactl subscribe` spawns fine even with no server, so check `pactl info` first
        let status = Command::new(program)
            .arg("info")
            .env("LC_ALL", "C")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to execute {} info", program))?;
        if !status.success() {
            bail!("Audio server is not reachable ({} info: {})", program, status);
        }

        let mut child = Command::new(program)
            .arg("subscribe")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {} subscribe", program))?;

        let stdout = child
            .stdout
            .take()
            .context("pactl subscribe was spawned without a stdout pipe")?;

        info!("Subscribed to audio server events (pid {:?})", child.id());

        Ok(PactlSubscription {
            _child: child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

/// Running `pactl subscribe` process; killed when dropped
pub struct PactlSubscription {
    _child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl Subscription for PactlSubscription {
    async fn next_line(&mut self) -> Result<Option<String>> {
        let line = self
            .lines
            .next_line()
            .await
            .context("Failed to read from pactl subscribe")?;
        if line.is_none() {
            debug!("pactl subscribe closed its output");
        }
        Ok(line)
    }
}

/// Production implementation of FileSystemInterface using std::fs
pub struct StandardFileSystem;

impl FileSystemInterface for StandardFileSystem {
    fn read_config_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))
    }

    fn write_config_file(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write config file: {}", e))
    }

    fn config_file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_config_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .map_err(|e| anyhow::anyhow!("Failed to create config directory: {}", e))
    }
}

impl Default for StandardFileSystem {
    fn default() -> Self {
        Self
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    // Executing a script while another test still holds it open for writing fails
    // with ETXTBSY, so script tests run one at a time.
    static SCRIPTS: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

    const HEADSET_SINK: &str = "bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink";

    /// Stand-in `pactl` that logs its arguments and answers a few queries
    fn fake_pactl(dir: &TempDir, server_up: bool) -> (Pactl, PathBuf) {
        let log = dir.path().join("calls.log");
        let script = dir.path().join("pactl");
        let info_status = if server_up { 0 } else { 1 };
        std::fs::write(
            &script,
            format!(
                r#"#!/bin/sh
echo "$*" >> "{log}"
case "$1" in
    info) exit {info_status} ;;
    set-card-profile) echo "Failure: No such entity" >&2; exit 1 ;;
    subscribe) printf "Event 'new' on sink-input #7\nEvent 'remove' on sink-input #7\n" ;;
    list) printf '3\t{sink}\tmodule-bluez5-device.c\ts16le 2ch 48000Hz\tRUNNING\n' ;;
esac
"#,
                log = log.display(),
                info_status = info_status,
                sink = HEADSET_SINK,
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        (Pactl::with_program(&script.to_string_lossy()), log)
    }

    fn calls(log: &Path) -> Vec<String> {
        std::fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_control_builds_pactl_commands() {
        let _guard = SCRIPTS.lock().await;
        let dir = TempDir::new().unwrap();
        let (pactl, log) = fake_pactl(&dir, true);
        let control = PactlAudioControl::with_pactl(pactl);

        control
            .move_stream(StreamCategory::InputCapture, StreamHandle(5), "bluez_source.x")
            .unwrap();
        control
            .move_stream(StreamCategory::Output, StreamHandle(7), HEADSET_SINK)
            .unwrap();
        control.set_stream_mute(StreamHandle(30), true).unwrap();
        control.set_stream_mute(StreamHandle(30), false).unwrap();
        control.set_sink_volume(HEADSET_SINK, 26214).unwrap();
        assert_eq!(
            control.list_devices(DeviceKind::Source).unwrap(),
            vec![HEADSET_SINK.to_string()]
        );

        let error = control
            .set_card_profile("bluez_card.00_1B_66_AA_BB_CC", "headset_head_unit")
            .unwrap_err();
        assert!(error.to_string().contains("No such entity"));

        assert_eq!(
            calls(&log),
            vec![
                "move-source-output 5 bluez_source.x".to_string(),
                format!("move-sink-input 7 {}", HEADSET_SINK),
                "set-sink-input-mute 30 1".to_string(),
                "set-sink-input-mute 30 0".to_string(),
                format!("set-sink-volume {} 26214", HEADSET_SINK),
                "list short sources".to_string(),
                "set-card-profile bluez_card.00_1B_66_AA_BB_CC headset_head_unit".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_event_source_reads_subscribe_output() {
        let _guard = SCRIPTS.lock().await;
        let dir = TempDir::new().unwrap();
        let (pactl, log) = fake_pactl(&dir, true);
        let source = PactlEventSource::with_pactl(pactl);

        let mut subscription = source.connect().await.unwrap();
        assert_eq!(
            subscription.next_line().await.unwrap().as_deref(),
            Some("Event 'new' on sink-input #7")
        );
        assert_eq!(
            subscription.next_line().await.unwrap().as_deref(),
            Some("Event 'remove' on sink-input #7")
        );
        assert_eq!(subscription.next_line().await.unwrap(), None);
        assert_eq!(calls(&log), vec!["info", "subscribe"]);
    }

    #[tokio::test]
    async fn test_event_source_refuses_when_server_is_down() {
        let _guard = SCRIPTS.lock().await;
        let dir = TempDir::new().unwrap();
        let (pactl, log) = fake_pactl(&dir, false);
        let source = PactlEventSource::with_pactl(pactl);

        let error = source.connect().await.err().unwrap();
        assert!(error.to_string().contains("not reachable"));
        assert_eq!(calls(&log), vec!["info"]);
    }
}
