use std::fmt;

use crate::audio::{StreamCategory, StreamHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    New,
    Change,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facility {
    Stream(StreamCategory),
    /// sink, source, card, client, server, ...
    Other(String),
}

/// One parsed line of the server's subscription feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEvent {
    pub kind: EventKind,
    pub facility: Facility,
    pub index: Option<u32>,
}

impl SubscriptionEvent {
    /// Parse `Event '<kind>' on <facility> #<index>`.
    ///
    /// Returns `None` for anything else, including stream events without an index.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix("Event '")?;
        let (kind, subject) = rest.split_once("' on ")?;

        let kind = match kind {
            "new" => EventKind::New,
            "change" => EventKind::Change,
            "remove" => EventKind::Remove,
            _ => return None,
        };

        let (name, index) = match subject.split_once(" #") {
            Some((name, index)) => (name, index.parse::<u32>().ok()),
            None => (subject, None),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_lowercase() || c == '-') {
            return None;
        }

        let facility = match StreamCategory::from_facility(name) {
            Some(category) => {
                index?;
                Facility::Stream(category)
            }
            None => Facility::Other(name.to_string()),
        };

        Some(Self {
            kind,
            facility,
            index,
        })
    }

    /// Category and handle, for stream events
    pub fn stream(&self) -> Option<(StreamCategory, StreamHandle)> {
        match (&self.facility, self.index) {
            (Facility::Stream(category), Some(index)) => Some((*category, StreamHandle(index))),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EventKind::New => "new",
            EventKind::Change => "change",
            EventKind::Remove => "remove",
        };
        let facility = match &self.facility {
            Facility::Stream(category) => category.facility(),
            Facility::Other(name) => name,
        };
        match self.index {
            Some(index) => write!(f, "{} {} #{}", kind, facility, index),
            None => write!(f, "{} {}", kind, facility),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_events() {
        let event = SubscriptionEvent::parse("Event 'new' on sink-input #42").unwrap();
        assert_eq!(event.kind, EventKind::New);
        assert_eq!(
            event.stream(),
            Some((StreamCategory::Output, StreamHandle(42)))
        );

        let event = SubscriptionEvent::parse("Event 'remove' on source-output #5\n").unwrap();
        assert_eq!(event.kind, EventKind::Remove);
        assert_eq!(
            event.stream(),
            Some((StreamCategory::InputCapture, StreamHandle(5)))
        );
    }

    #[test]
    fn test_parse_other_facilities() {
        let event = SubscriptionEvent::parse("Event 'new' on client #77").unwrap();
        assert_eq!(event.facility, Facility::Other("client".to_string()));
        assert_eq!(event.stream(), None);

        let event = SubscriptionEvent::parse("Event 'change' on sink-input #42").unwrap();
        assert_eq!(event.kind, EventKind::Change);
    }

    #[test]
    fn test_malformed_lines_are_rejected() {
        assert!(SubscriptionEvent::parse("").is_none());
        assert!(SubscriptionEvent::parse("Connection failure: Connection refused").is_none());
        assert!(SubscriptionEvent::parse("Event 'moved' on sink-input #1").is_none());
        assert!(SubscriptionEvent::parse("Event 'new' on sink-input").is_none());
        assert!(SubscriptionEvent::parse("Event 'new' on sink-input #abc").is_none());
    }

    #[test]
    fn test_display_round_trips_the_essentials() {
        let event = SubscriptionEvent::parse("Event 'remove' on sink-input #7").unwrap();
        assert_eq!(event.to_string(), "remove sink-input #7");
    }
}
