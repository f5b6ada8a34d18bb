use std::collections::BTreeSet;
use tracing::{info, trace};

use super::filter::ClientFilter;
use crate::audio::{StreamCategory, StreamHandle};

/// Approved streams that are currently active, per category.
///
/// A handle is only ever added after the server reported it as new and the
/// client filter approved it, and is dropped again on the matching remove.
#[derive(Debug, Default, Clone)]
pub struct ConnectionRegistry {
    outputs: BTreeSet<StreamHandle>,
    captures: BTreeSet<StreamHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, category: StreamCategory) -> &BTreeSet<StreamHandle> {
        match category {
            StreamCategory::Output => &self.outputs,
            StreamCategory::InputCapture => &self.captures,
        }
    }

    fn set_mut(&mut self, category: StreamCategory) -> &mut BTreeSet<StreamHandle> {
        match category {
            StreamCategory::Output => &mut self.outputs,
            StreamCategory::InputCapture => &mut self.captures,
        }
    }

    /// Register a new stream if its application is approved.
    ///
    /// Returns whether the stream is (now) registered; a repeated insert is accepted.
    pub fn record_new(
        &mut self,
        filter: &ClientFilter,
        category: StreamCategory,
        handle: StreamHandle,
        label: Option<&str>,
    ) -> bool {
        if !filter.approve(label) {
            trace!(
                "Ignoring {} {} from {}",
                category,
                handle,
                label.unwrap_or("unidentified application")
            );
            return false;
        }

        if self.set_mut(category).insert(handle) {
            info!(
                "NEW: {} {} ({})",
                category,
                handle,
                label.unwrap_or_default()
            );
        }
        true
    }

    /// Drop a stream; returns whether it was registered
    pub fn record_remove(&mut self, category: StreamCategory, handle: StreamHandle) -> bool {
        let removed = self.set_mut(category).remove(&handle);
        if removed {
            info!("REMOVE: {} {}", category, handle);
        }
        removed
    }

    pub fn contains(&self, category: StreamCategory, handle: StreamHandle) -> bool {
        self.set(category).contains(&handle)
    }

    /// Registered handles of one category, in ascending order
    pub fn handles(&self, category: StreamCategory) -> impl Iterator<Item = StreamHandle> + '_ {
        self.set(category).iter().copied()
    }

    pub fn count(&self, category: StreamCategory) -> usize {
        self.set(category).len()
    }

    /// Both categories have at least one approved stream
    pub fn is_in_call(&self) -> bool {
        !self.outputs.is_empty() && !self.captures.is_empty()
    }

    /// Neither category has an approved stream
    pub fn is_idle(&self) -> bool {
        self.outputs.is_empty() && self.captures.is_empty()
    }
}
