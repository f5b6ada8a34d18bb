use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::registry::ConnectionRegistry;
use crate::audio::{StreamCategory, StreamHandle};
use crate::system::AudioControl;

/// Playback streams muted by the switcher for the current call, with their application
#[derive(Debug, Default, Clone)]
pub struct MutedSet {
    entries: BTreeMap<StreamHandle, String>,
}

impl MutedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, handle: StreamHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = StreamHandle> + '_ {
        self.entries.keys().copied()
    }

    /// Distinct application names, sorted
    pub fn applications(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    fn insert(&mut self, handle: StreamHandle, application: String) {
        self.entries.insert(handle, application);
    }

    /// Drop a stream that went away, so a reused handle is never unmuted
    pub fn forget(&mut self, handle: StreamHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Playback streams that were paused when they appeared.
///
/// A player that opens its stream corked and later resumes it is the kind of
/// background audio muted during a call. Only streams seen appearing are known.
#[derive(Debug, Default, Clone)]
pub struct StartedCorked {
    handles: BTreeSet<StreamHandle>,
}

impl StartedCorked {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, handle: StreamHandle) {
        debug!("{} {} started corked", StreamCategory::Output, handle);
        self.handles.insert(handle);
    }

    pub fn forget(&mut self, handle: StreamHandle) {
        self.handles.remove(&handle);
    }

    pub fn contains(&self, handle: StreamHandle) -> bool {
        self.handles.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Silences other applications' resumed playback while a call is up
pub struct MuteManager {
    enabled: bool,
}

impl MuteManager {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Mute every playback stream that started corked, is playing again, is
    /// unmuted and is not part of the call.
    ///
    /// Streams are recorded in `muted` before the mute command is sent, so a
    /// failed command still gets an unmute attempt when the call ends.
    pub fn mute_others<A: AudioControl>(
        &self,
        control: &A,
        registry: &ConnectionRegistry,
        started_corked: &StartedCorked,
        muted: &mut MutedSet,
    ) {
        if !self.enabled {
            debug!("Muting other streams is disabled");
            return;
        }

        let streams = match control.list_streams(StreamCategory::Output) {
            Ok(streams) => streams,
            Err(e) => {
                warn!("Could not list playback streams, nothing muted: {:#}", e);
                return;
            }
        };

        let targets: Vec<(StreamHandle, String)> = streams
            .into_iter()
            .filter(|s| started_corked.contains(s.handle) && !s.corked && !s.muted)
            .filter(|s| !registry.contains(StreamCategory::Output, s.handle))
            .filter_map(|s| s.application.map(|app| (s.handle, app)))
            .collect();

        if targets.is_empty() {
            return;
        }

        for (handle, application) in &targets {
            muted.insert(*handle, application.clone());
        }
        info!(
            "Muting {}",
            muted.applications().into_iter().collect::<Vec<_>>().join(" ")
        );

        for (handle, application) in targets {
            if let Err(e) = control.set_stream_mute(handle, true) {
                warn!(
                    "Failed to mute {} {} ({}): {:#}",
                    StreamCategory::Output,
                    handle,
                    application,
                    e
                );
            }
        }
    }

    /// Unmute everything in `muted`, then forget it regardless of failures
    pub fn unmute_all<A: AudioControl>(&self, control: &A, muted: &mut MutedSet) {
        if muted.is_empty() {
            return;
        }

        info!("Unmuting {} streams", muted.len());
        for handle in muted.handles() {
            if let Err(e) = control.set_stream_mute(handle, false) {
                warn!(
                    "Failed to unmute {} {}: {:#}",
                    StreamCategory::Output,
                    handle,
                    e
                );
            }
        }
        muted.clear();
    }
}
