pub mod audio;
pub mod config;
pub mod logging;
pub mod service;
pub mod switcher;
pub mod system;

pub use config::Config;
pub use service::SwitcherService;
pub use switcher::CallController;
