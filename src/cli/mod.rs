//! CLI command handlers

pub mod commands;

pub use commands::{duplicate, export, import, plan, resolve_contest, serve, tree, wipe};
