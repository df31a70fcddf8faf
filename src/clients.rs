//! Clients for the external systems `ghscribe` talks to.
//!
//! - [`github`]: typed GitHub REST API calls (repositories, refs, contents, pulls, comments)
//! - [`github_curl`]: Curl-based HTTP transport for making GitHub API requests
//!
//! The GitHub client is generic over [`github_curl::HttpTransport`] so tests can
//! substitute a mock or an in-memory fake.

#[cfg(test)]
pub mod fake_github;
pub mod github;
pub mod github_curl;
