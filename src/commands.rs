//! CLI command implementations, one `cmd_*` method on [`crate::App`] per subcommand.

pub mod append;
pub mod branch;
pub mod comment;
pub mod pr;
pub mod submit;
