//! lexvec command-line library.
//!
//! Exposes argument parsing and command handlers so they can be tested
//! without spawning the binary.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, ModeArg};
pub use commands::{
    handle_audit, handle_clear_vectors, handle_generate, handle_import, import_chunks,
    init_logging, list_models, load_settings, open_storage, print_report, show_status,
    ImportSummary,
};
