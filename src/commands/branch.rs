use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::clients::github_curl::HttpTransport;
use crate::ops::mutator::BranchOutcome;

impl<H: HttpTransport> App<H> {
    /// Print the repository's default branch.
    pub async fn cmd_default_branch(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let branch = self.gh.default_branch(&self.repo).await?;
        writeln!(stdout, "{}", branch)?;
        Ok(())
    }

    /// Create `branch` from `source` (default branch if `None`) unless it already exists.
    pub async fn cmd_create_branch(
        &self,
        branch: &str,
        source: Option<&str>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        match self.mutator().ensure_branch(&self.repo, branch, source).await? {
            BranchOutcome::Created { sha } => {
                writeln!(stdout, "Created branch {} at {}", branch.green(), sha)?;
            }
            BranchOutcome::Existing { sha } => {
                writeln!(stdout, "Branch {} already exists at {}", branch.yellow(), sha)?;
            }
        }
        Ok(())
    }
}
