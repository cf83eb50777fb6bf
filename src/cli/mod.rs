//! CLI argument parsing and command handling.

mod args;
pub mod manage;
pub mod validators;
pub mod views;

pub use args::{CacheAction, Cli, Command, ConfigAction, FilterArgs};
pub use views::Context;
