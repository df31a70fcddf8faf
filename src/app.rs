use crate::clients::github::GithubClient;
use crate::clients::github_curl::GithubCurlClient;
use crate::clients::github_curl::HttpTransport;
use crate::config::Config;
use crate::ops::mutator::RepositoryMutator;
use crate::ops::pulls::PullRequestManager;
use crate::repo::RepositoryRef;

pub struct App<H = GithubCurlClient> {
    pub repo: RepositoryRef,
    pub gh: GithubClient<H>,
}

impl App {
    pub fn new(config: &Config, repo: RepositoryRef) -> Self {
        Self {
            repo,
            gh: GithubClient::new(config),
        }
    }
}

/// Shared helper methods for App
impl<H: HttpTransport> App<H> {
    pub fn with_client(gh: GithubClient<H>, repo: RepositoryRef) -> Self {
        Self { repo, gh }
    }

    pub(crate) fn mutator(&self) -> RepositoryMutator<'_, H> {
        RepositoryMutator::new(&self.gh)
    }

    pub(crate) fn pulls(&self) -> PullRequestManager<'_, H> {
        PullRequestManager::new(&self.gh)
    }
}
