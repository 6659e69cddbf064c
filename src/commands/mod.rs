//! Command-line interface definitions and handlers for the taxicf CLI.

pub mod args;
pub mod build;
pub mod inspect;

pub use args::{BuildArgs, Cli, Commands, InspectArgs};
pub use build::run_build;
pub use inspect::run_inspect;
