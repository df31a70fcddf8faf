use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::clients::github_curl::HttpTransport;
use crate::ops::mutator::AppendOutcome;
use crate::ops::mutator::BranchOutcome;

impl<H: HttpTransport> App<H> {
    /// Append a line to a file on a branch, creating the branch from the
    /// default branch first if needed.
    pub async fn cmd_append(
        &self,
        branch: &str,
        path: &str,
        text: &str,
        message: Option<&str>,
        stdout: &mut impl std::io::Write,
    ) -> Result<AppendOutcome> {
        let outcome = self
            .mutator()
            .ensure_branch_and_append(&self.repo, branch, path, text, message)
            .await?;

        writeln!(stdout, "Default branch: {}", outcome.base_branch)?;
        match &outcome.branch {
            BranchOutcome::Created { sha } => writeln!(
                stdout,
                "Created branch {} from {} ({})",
                branch.green(),
                outcome.base_branch,
                sha
            )?,
            BranchOutcome::Existing { .. } => writeln!(
                stdout,
                "Branch {} already exists, updating file directly",
                branch.yellow()
            )?,
        }
        writeln!(stdout, "Updated {} on {}", path, branch)?;
        writeln!(stdout, "Commit: {}", outcome.commit.sha)?;
        writeln!(stdout, "Commit URL: {}", outcome.commit.html_url.dimmed())?;

        Ok(outcome)
    }
}
