pub mod controller;
pub mod decider;
pub mod event;
pub mod filter;
pub mod mute;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod volume;

pub use controller::CallController;
pub use decider::{CallState, SwitchDirection, Trigger};
pub use event::{EventKind, Facility, SubscriptionEvent};
pub use filter::ClientFilter;
pub use mute::{MuteManager, MutedSet, StartedCorked};
pub use orchestrator::{SwitchOrchestrator, SwitchOutcome};
pub use registry::ConnectionRegistry;
pub use session::Session;
pub use volume::VolumeMemory;
