use anyhow::Result;

use crate::App;
use crate::clients::github_curl::HttpTransport;
use crate::ops::pulls::PullRequestOutcome;

impl<H: HttpTransport> App<H> {
    /// Append a line on `branch`, then open (or reuse) a PR into the default branch.
    #[allow(clippy::too_many_arguments)]
    pub async fn cmd_submit(
        &self,
        branch: &str,
        path: &str,
        text: &str,
        message: Option<&str>,
        title: &str,
        body: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<PullRequestOutcome> {
        let appended = self.cmd_append(branch, path, text, message, stdout).await?;
        self.cmd_pr(branch, Some(appended.base_branch.as_str()), title, body, stdout)
            .await
    }
}
