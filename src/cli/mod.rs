//! Terminal presentation for each subcommand

pub mod invest;
pub mod sectors;
pub mod setup;
pub mod summary;
pub mod ui;
