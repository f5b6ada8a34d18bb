use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of stream the switcher watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamCategory {
    /// Playback stream flowing into a sink (`sink-input`)
    Output,
    /// Capture stream flowing out of a source (`source-output`)
    InputCapture,
}

impl StreamCategory {
    pub const ALL: [StreamCategory; 2] = [StreamCategory::Output, StreamCategory::InputCapture];

    /// Map a subscription facility name onto a category
    pub fn from_facility(facility: &str) -> Option<Self> {
        match facility {
            "sink-input" => Some(StreamCategory::Output),
            "source-output" => Some(StreamCategory::InputCapture),
            _ => None,
        }
    }

    pub fn facility(&self) -> &'static str {
        match self {
            StreamCategory::Output => "sink-input",
            StreamCategory::InputCapture => "source-output",
        }
    }
}

impl fmt::Display for StreamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.facility())
    }
}

/// Server-assigned index of a stream. Reused by the server after the stream goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamHandle(pub u32);

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for StreamHandle {
    fn from(index: u32) -> Self {
        StreamHandle(index)
    }
}

/// One entry of a stream enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub handle: StreamHandle,
    pub category: StreamCategory,
    pub application: Option<String>,
    /// Stream is paused by its application (transient, it may resume at any time)
    pub corked: bool,
    pub muted: bool,
}

impl StreamInfo {
    pub fn new(handle: StreamHandle, category: StreamCategory) -> Self {
        Self {
            handle,
            category,
            application: None,
            corked: false,
            muted: false,
        }
    }

    pub fn with_application(mut self, application: &str) -> Self {
        self.application = Some(application.to_string());
        self
    }

    pub fn set_corked(mut self, corked: bool) -> Self {
        self.corked = corked;
        self
    }

    pub fn set_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}) [{}{}]",
            self.category,
            self.handle,
            self.application.as_deref().unwrap_or("unknown"),
            if self.corked { "corked" } else { "running" },
            if self.muted { ", muted" } else { "" }
        )
    }
}
