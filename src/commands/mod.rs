//! CLI subcommands

pub mod list;
pub mod new;
pub mod show;
pub mod sync;
pub mod tags;
