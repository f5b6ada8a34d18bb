pub mod daemon;
pub mod signals;
pub mod startup;

pub use daemon::SwitcherService;
pub use signals::{SignalHandler, SignalType};
pub use startup::StartupSynchronizer;
