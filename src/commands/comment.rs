use anyhow::Result;

use crate::App;
use crate::clients::github_curl::HttpTransport;

/// Which pull request a comment goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Number(u64),
    /// The open pull request whose head is this branch.
    Branch(String),
}

impl<H: HttpTransport> App<H> {
    pub async fn cmd_comment(
        &self,
        target: &CommentTarget,
        text: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let (number, comment) = match target {
            CommentTarget::Number(number) => {
                let comment = self.pulls().comment_on(&self.repo, *number, text).await?;
                (*number, comment)
            }
            CommentTarget::Branch(branch) => {
                let (pr, comment) = self
                    .pulls()
                    .comment_on_branch(&self.repo, branch, text)
                    .await?;
                (pr.number, comment)
            }
        };

        writeln!(stdout, "Comment added to PR #{}: {}", number, comment.html_url)?;
        Ok(())
    }
}
