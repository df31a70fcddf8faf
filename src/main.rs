use std::path::PathBuf;

use anyhow::Result;
use clap::ArgGroup;
use clap::Parser;
use clap::Subcommand;
use ghscribe::App;
use ghscribe::Config;
use ghscribe::commands::comment::CommentTarget;
use ghscribe::ops::pulls::parse_pull_request_number;
use ghscribe::repo::RepositoryRef;

#[derive(Parser)]
#[command(name = "ghscribe")]
#[command(about = "Create branches, append lines to files, and manage pull requests on GitHub", long_about = None)]
pub struct Cli {
    /// Target repository as owner/name (defaults to the origin remote of the current checkout)
    #[arg(long, global = true, env = "GITHUB_REPOSITORY")]
    pub repo: Option<RepositoryRef>,

    /// Read GITHUB_TOKEN and GITHUB_API_URL from this file only, ignoring the environment
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the repository's default branch
    DefaultBranch,
    /// Create a branch unless it already exists
    CreateBranch {
        branch: String,
        /// Branch to create from (defaults to the default branch)
        #[arg(long)]
        from: Option<String>,
    },
    /// Append a line to a file on a branch, creating the branch if needed
    Append {
        branch: String,
        path: String,
        text: String,
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Open a pull request, or find the existing one
    Pr {
        head: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Branch to merge into (defaults to the default branch)
        #[arg(long)]
        base: Option<String>,
    },
    /// Show the open pull request for a branch
    FindPr { branch: String },
    /// Comment on a pull request
    #[command(group(ArgGroup::new("target").required(true).args(["pr", "branch"])))]
    Comment {
        text: String,
        /// Pull request number or URL
        #[arg(long)]
        pr: Option<String>,
        /// Comment on the open pull request for this branch
        #[arg(long)]
        branch: Option<String>,
    },
    /// Append a line on a branch and open a pull request into the default branch
    Submit {
        branch: String,
        path: String,
        text: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    ghscribe::logging::setup_logging()?;

    let cli = Cli::parse();
    let config = match &cli.env_file {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    let repo = match cli.repo {
        Some(repo) => repo,
        None => RepositoryRef::detect(&std::env::current_dir()?).await?,
    };
    let app = App::new(&config, repo);
    let stdout = &mut std::io::stdout();

    match cli.command {
        Commands::DefaultBranch => app.cmd_default_branch(stdout).await?,
        Commands::CreateBranch { branch, from } => {
            app.cmd_create_branch(&branch, from.as_deref(), stdout)
                .await?
        }
        Commands::Append {
            branch,
            path,
            text,
            message,
        } => {
            app.cmd_append(&branch, &path, &text, message.as_deref(), stdout)
                .await?;
        }
        Commands::Pr {
            head,
            title,
            body,
            base,
        } => {
            app.cmd_pr(&head, base.as_deref(), &title, &body, stdout)
                .await?;
        }
        Commands::FindPr { branch } => app.cmd_find_pr(&branch, stdout).await?,
        Commands::Comment { text, pr, branch } => {
            let target = match (pr, branch) {
                (Some(pr), _) => CommentTarget::Number(parse_pull_request_number(&pr)?),
                (None, Some(branch)) => CommentTarget::Branch(branch),
                (None, None) => unreachable!("clap requires --pr or --branch"),
            };
            app.cmd_comment(&target, &text, stdout).await?
        }
        Commands::Submit {
            branch,
            path,
            text,
            title,
            body,
            message,
        } => {
            app.cmd_submit(
                &branch,
                &path,
                &text,
                message.as_deref(),
                &title,
                &body,
                stdout,
            )
            .await?;
        }
    }

    Ok(())
}
