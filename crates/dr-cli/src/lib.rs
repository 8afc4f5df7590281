//! Library half of the `dashreport` binary.
//!
//! Wires the report pipeline to files on disk: configuration resolution,
//! structured logging, exit codes and the subcommand implementations.

pub mod commands;
pub mod exit_codes;
pub mod logging;
pub mod resolve;

pub use exit_codes::ExitCode;
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use resolve::{load_config, ConfigSource, ResolvedConfig};
