use std::sync::LazyLock;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use log::info;
use regex::Regex;

use crate::clients::github::CommentRef;
use crate::clients::github::GithubClient;
use crate::clients::github::GithubError;
use crate::clients::github::NewPullRequest;
use crate::clients::github::PullCreation;
use crate::clients::github::PullRequestRef;
use crate::clients::github_curl::HttpTransport;
use crate::repo::RepositoryRef;

static PULL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/]+/[^/]+/[^/]+/pull/(\d+)(?:[/#?].*)?$").expect("valid regex")
});

// -----------------------------------------------------------------------------
// Types

/// How `open_pull_request` obtained its pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestOutcome {
    Created(PullRequestRef),
    /// Creation was rejected as a duplicate and the open one was looked up.
    Existing(PullRequestRef),
}

impl PullRequestOutcome {
    pub fn pull_request(&self) -> &PullRequestRef {
        match self {
            Self::Created(pr) | Self::Existing(pr) => pr,
        }
    }
}

/// Opens, finds and comments on pull requests.
pub struct PullRequestManager<'a, H> {
    gh: &'a GithubClient<H>,
}

/// Parse a pull request given as `123`, `#123` or a pull request URL.
pub fn parse_pull_request_number(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Some(caps) = PULL_URL.captures(s) {
        return Ok(caps[1].parse()?);
    }
    s.strip_prefix('#')
        .unwrap_or(s)
        .parse()
        .with_context(|| format!("Not a pull request number or URL: {:?}", s))
}

// -----------------------------------------------------------------------------
// PullRequestManager impl

impl<'a, H: HttpTransport> PullRequestManager<'a, H> {
    pub fn new(gh: &'a GithubClient<H>) -> Self {
        Self { gh }
    }

    /// Open a PR from `head` into `base`.
    ///
    /// If GitHub rejects the creation as unprocessable (a PR for the pair
    /// already exists), the open PR for `head` is returned instead.
    pub async fn open_pull_request(
        &self,
        repo: &RepositoryRef,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestOutcome> {
        let creation = self
            .gh
            .create_pull_request(
                repo,
                &NewPullRequest {
                    head,
                    base,
                    title,
                    body,
                },
            )
            .await?;

        match creation {
            PullCreation::Created(pr) => {
                info!("Created PR #{} for {}", pr.number, head);
                Ok(PullRequestOutcome::Created(pr))
            }
            PullCreation::Unprocessable { message } => {
                info!("PR creation for {} rejected ({}); looking for an open PR", head, message);
                match self.find_open_pull_request_for_branch(repo, head).await? {
                    Some(pr) => {
                        info!("Found existing PR #{} for {}", pr.number, head);
                        Ok(PullRequestOutcome::Existing(pr))
                    }
                    None => Err(GithubError::DuplicateWithoutMatch {
                        head: head.to_string(),
                        message,
                    }
                    .into()),
                }
            }
        }
    }

    /// The first open PR whose head is `branch`, if any
    pub async fn find_open_pull_request_for_branch(
        &self,
        repo: &RepositoryRef,
        branch: &str,
    ) -> Result<Option<PullRequestRef>> {
        let prs = self.gh.list_open_pull_requests(repo, branch).await?;
        Ok(prs.into_iter().next())
    }

    /// Comment on an open PR
    pub async fn comment_on(
        &self,
        repo: &RepositoryRef,
        number: u64,
        text: &str,
    ) -> Result<CommentRef> {
        let Some(pr) = self.gh.get_pull_request(repo, number).await? else {
            return Err(GithubError::PullRequestNotFound { number }.into());
        };
        if !pr.is_open() {
            return Err(GithubError::PullRequestNotOpen {
                number,
                state: pr.state,
            }
            .into());
        }

        let comment = self.gh.create_comment(repo, number, text).await?;
        info!("Commented on PR #{}", number);
        Ok(comment)
    }

    /// Comment on the open PR for `branch`
    pub async fn comment_on_branch(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        text: &str,
    ) -> Result<(PullRequestRef, CommentRef)> {
        let Some(pr) = self.find_open_pull_request_for_branch(repo, branch).await? else {
            bail!("No open pull request found for branch {}", branch);
        };
        let comment = self.gh.create_comment(repo, pr.number, text).await?;
        info!("Commented on PR #{} for {}", pr.number, branch);
        Ok((pr, comment))
    }
}
