use std::fmt::Display;
use std::path;
use std::str::FromStr;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use tokio::process::Command;

/// Identifies a remote GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() || name.is_empty() {
            bail!("Repository owner and name must be non-empty");
        }
        if owner.contains('/') || name.contains('/') {
            bail!("Invalid repository {}/{}", owner, name);
        }
        Ok(Self { owner, name })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse a GitHub remote URL.
    ///
    /// Accepts URLs like:
    /// - git@github.com:owner/repo.git
    /// - https://github.com/owner/repo.git
    pub fn from_remote_url(url: &str) -> Result<Self> {
        let url = url.trim();
        let parts = if let Some(rest) = url.strip_prefix("git@github.com:") {
            rest
        } else if let Some(rest) = url.strip_prefix("https://github.com/") {
            rest
        } else if let Some(rest) = url.strip_prefix("ssh://git@github.com/") {
            rest
        } else {
            bail!("Remote URL is not a GitHub URL: {}", url);
        };

        let parts = parts.trim_end_matches('/');
        let parts = parts.strip_suffix(".git").unwrap_or(parts);
        let mut split = parts.split('/');
        let owner = split
            .next()
            .context("Could not parse owner from GitHub URL")?;
        let name = split
            .next()
            .context("Could not parse repo from GitHub URL")?;
        if split.next().is_some() {
            bail!("Unexpected path in GitHub URL: {}", url);
        }

        Self::new(owner, name)
    }

    /// Detect owner and repo from the `origin` remote of a git checkout
    pub async fn detect(path: &path::Path) -> Result<Self> {
        let output = Command::new("git")
            .current_dir(path)
            .args(["config", "--get", "remote.origin.url"])
            .output()
            .await
            .context("Failed to get git remote URL")?;

        if !output.status.success() {
            bail!("No git remote 'origin' configured; pass --repo owner/name");
        }

        let url = String::from_utf8(output.stdout)?;
        Self::from_remote_url(&url)
    }
}

impl FromStr for RepositoryRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (owner, name) = s
            .split_once('/')
            .with_context(|| format!("Expected owner/name, got {:?}", s))?;
        Self::new(owner, name)
    }
}

impl Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
