//! Command-line interface for imdb-forge.
//!
//! Provides the `materialize` and `train` commands.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands, MaterializeArgs, TrainArgs};
