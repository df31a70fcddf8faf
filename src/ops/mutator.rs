use anyhow::Context;
use anyhow::Result;
use log::debug;
use log::info;

use crate::clients::github::CommitRef;
use crate::clients::github::FileUpdate;
use crate::clients::github::GithubClient;
use crate::clients::github_curl::HttpTransport;
use crate::repo::RepositoryRef;

// -----------------------------------------------------------------------------
// Types

/// Whether a branch had to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    /// The branch was created pointing at `sha`.
    Created { sha: String },
    /// The branch already existed at `sha` and was left untouched.
    Existing { sha: String },
}

impl BranchOutcome {
    pub fn sha(&self) -> &str {
        match self {
            Self::Created { sha } | Self::Existing { sha } => sha,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Everything `ensure_branch_and_append` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The default branch the target was (or would have been) created from.
    pub base_branch: String,
    pub branch: BranchOutcome,
    pub commit: CommitRef,
}

/// Creates branches and appends lines to files on them.
pub struct RepositoryMutator<'a, H> {
    gh: &'a GithubClient<H>,
}

/// Content after appending `text` as a new line.
pub fn append_line(original: &str, text: &str) -> String {
    format!("{original}\n{text}\n")
}

pub fn default_commit_message(path: &str) -> String {
    format!("Append line to {}", path)
}

// -----------------------------------------------------------------------------
// RepositoryMutator impl

impl<'a, H: HttpTransport> RepositoryMutator<'a, H> {
    pub fn new(gh: &'a GithubClient<H>) -> Self {
        Self { gh }
    }

    /// Make sure `branch` exists, creating it from `source` (or the default
    /// branch) when absent.
    pub async fn ensure_branch(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        source: Option<&str>,
    ) -> Result<BranchOutcome> {
        let source = match source {
            Some(source) => source.to_string(),
            None => self.gh.default_branch(repo).await?,
        };
        let source_sha = self.source_tip(repo, &source).await?;
        self.create_if_absent(repo, branch, &source, &source_sha).await
    }

    /// Ensure `branch` exists (created from the default branch if absent) and
    /// append `text` as a new line to `path` on it, producing one commit.
    ///
    /// A stale revision surfaces as [`crate::clients::github::GithubError::Conflict`];
    /// nothing is retried and a freshly created branch is left in place.
    pub async fn ensure_branch_and_append(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        path: &str,
        text: &str,
        message: Option<&str>,
    ) -> Result<AppendOutcome> {
        let base_branch = self.gh.default_branch(repo).await?;
        debug!("Default branch of {}: {}", repo, base_branch);
        let base_sha = self.source_tip(repo, &base_branch).await?;

        let outcome = self
            .create_if_absent(repo, branch, &base_branch, &base_sha)
            .await?;

        // A just-created branch is read at the commit it was created from, so
        // the read does not depend on the new ref being visible yet.
        let read_ref = match &outcome {
            BranchOutcome::Created { sha } => sha.as_str(),
            BranchOutcome::Existing { .. } => branch,
        };
        let commit = self
            .append_to(repo, branch, read_ref, path, text, message)
            .await;
        let commit = match &outcome {
            BranchOutcome::Created { sha } => commit.with_context(|| {
                format!(
                    "Branch {} was created from {} ({}) and left in place",
                    branch, base_branch, sha
                )
            })?,
            BranchOutcome::Existing { .. } => commit?,
        };

        Ok(AppendOutcome {
            base_branch,
            branch: outcome,
            commit,
        })
    }

    async fn append_to(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        read_ref: &str,
        path: &str,
        text: &str,
        message: Option<&str>,
    ) -> Result<CommitRef> {
        let blob = self.gh.get_file(repo, path, read_ref).await?;
        debug!(
            "Read {} ({} bytes, revision {})",
            blob.path,
            blob.content.len(),
            blob.sha
        );

        let content = append_line(&blob.content, text);
        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| default_commit_message(path));
        let commit = self
            .gh
            .put_file(
                repo,
                &FileUpdate {
                    path,
                    message: &message,
                    content: &content,
                    sha: &blob.sha,
                    branch,
                },
            )
            .await?;
        info!("Committed {} to {} as {}", path, branch, commit.sha);
        Ok(commit)
    }

    async fn source_tip(&self, repo: &RepositoryRef, source: &str) -> Result<String> {
        self.gh
            .branch_tip(repo, source)
            .await?
            .with_context(|| format!("Source branch {} does not exist in {}", source, repo))
    }

    async fn create_if_absent(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        source: &str,
        source_sha: &str,
    ) -> Result<BranchOutcome> {
        if let Some(sha) = self.gh.branch_tip(repo, branch).await? {
            info!("Branch {} already exists at {}", branch, sha);
            return Ok(BranchOutcome::Existing { sha });
        }

        self.gh.create_branch(repo, branch, source_sha).await?;
        info!("Created branch {} from {} ({})", branch, source, source_sha);
        Ok(BranchOutcome::Created {
            sha: source_sha.to_string(),
        })
    }
}
