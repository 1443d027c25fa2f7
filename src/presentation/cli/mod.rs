//! CLI module

mod commands;
mod progress;

pub use commands::{Cli, Commands, ROOT_MFT_INDEX};
pub use progress::ProgressReporter;
