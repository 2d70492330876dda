//! Command-line front end for pixq.
//!
//! Layout:
//! - `cli.rs`: argument parsing, error type and command dispatch
//! - `commands/`: command handlers grouped by concern
//! - `input.rs`: turning files, stdin and URLs into input blobs
//! - `bootstrap.rs`: building and loading the configured engine
//! - `output.rs`: renderers and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod bootstrap;
pub(crate) mod cli;
pub(crate) mod commands;
pub(crate) mod input;
pub(crate) mod output;

pub use cli::run;
