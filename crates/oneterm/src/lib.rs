#![deny(clippy::all)]

pub mod app;
pub mod commands;
pub mod error;
pub mod telemetry;

pub use app::Application;
pub use commands::Cli;
pub use error::AppError;
