#![deny(clippy::all)]

mod capture;
mod config;
mod context;
pub mod error;
mod registry;
mod session;

pub use capture::CaptureOutcome;
pub use capture::ScrollbackCapture;
pub use config::AppConfig;
pub use config::CaptureMode;
pub use config::ShellCommand;
pub use config::DEFAULT_SCROLLBACK_LINES;
pub use context::AppContext;
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use registry::Teardown;
pub use registry::Titled;
pub use registry::WindowId;
pub use session::display_title;
pub use session::generate_session_id;
pub use session::Session;
pub use session::SessionId;

pub type Result<T> = std::result::Result<T, SessionError>;
