use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::clients::github_curl::HttpTransport;
use crate::ops::pulls::PullRequestOutcome;

impl<H: HttpTransport> App<H> {
    /// Open a PR from `head` into `base` (default branch if `None`), reusing an open one.
    pub async fn cmd_pr(
        &self,
        head: &str,
        base: Option<&str>,
        title: &str,
        body: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<PullRequestOutcome> {
        let base = match base {
            Some(base) => base.to_string(),
            None => self.gh.default_branch(&self.repo).await?,
        };

        let outcome = self
            .pulls()
            .open_pull_request(&self.repo, head, &base, title, body)
            .await?;

        match &outcome {
            PullRequestOutcome::Created(pr) => writeln!(
                stdout,
                "Created PR {} for {} into {}: {}",
                format!("#{}", pr.number).green(),
                head,
                base,
                pr.html_url
            )?,
            PullRequestOutcome::Existing(pr) => writeln!(
                stdout,
                "Found existing PR {} for {}: {}",
                format!("#{}", pr.number).yellow(),
                head,
                pr.html_url
            )?,
        }

        Ok(outcome)
    }

    /// Print the open PR for `branch`, if there is one.
    pub async fn cmd_find_pr(&self, branch: &str, stdout: &mut impl std::io::Write) -> Result<()> {
        match self
            .pulls()
            .find_open_pull_request_for_branch(&self.repo, branch)
            .await?
        {
            Some(pr) => writeln!(
                stdout,
                "PR {} ({} -> {}): {}",
                format!("#{}", pr.number).cyan(),
                pr.head,
                pr.base,
                pr.html_url
            )?,
            None => writeln!(stdout, "No open PR for {}", branch)?,
        }
        Ok(())
    }
}
