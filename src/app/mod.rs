//! Command-line presentation layer: reads task snapshots, never engine internals.

mod config_runtime;
mod exit_handler;
mod output;
mod progress_manager;
mod runtime;
pub(crate) mod terminal;

pub(crate) use runtime::run_litefetch;
