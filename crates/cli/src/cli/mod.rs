pub mod commands;

pub use commands::{CliArgs, Commands, HealthArgs, ServeArgs};
