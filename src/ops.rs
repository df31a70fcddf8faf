//! Repository operations built on the GitHub client.
//!
//! - [`mutator`]: ensure a branch exists, append a line to a file on it
//! - [`pulls`]: open pull requests (tolerating duplicates), find them by branch, comment on them
//!
//! Every operation is a short sequential exchange with the API; nothing is
//! retried and nothing already done is rolled back on failure.

pub mod mutator;
pub mod pulls;
