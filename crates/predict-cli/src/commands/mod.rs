//! CLI subcommands

pub mod predict;
