use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::github_curl::GithubCurlClient;
use super::github_curl::HttpResponse;
use super::github_curl::HttpTransport;
use crate::config::Config;
use crate::repo::RepositoryRef;

/// Characters escaped in URL paths; `/` is kept so file paths stay nested.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const QUERY: &AsciiSet = &PATH.add(b'&').add(b'+').add(b'=').add(b'/');

// -----------------------------------------------------------------------------
// Types

/// Client to interact with GitHub API.
pub struct GithubClient<H = GithubCurlClient> {
    base_url: String,
    http: H,
}

/// Failures callers are expected to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("Stale revision for {path}: the file changed since it was read ({message})")]
    Conflict { path: String, message: String },
    #[error(
        "GitHub reported an existing pull request for {head}, but no open pull request was found ({message})"
    )]
    DuplicateWithoutMatch { head: String, message: String },
    #[error("Pull request #{number} is {state}, not open")]
    PullRequestNotOpen { number: u64, state: String },
    #[error("Pull request #{number} not found")]
    PullRequestNotFound { number: u64 },
    #[error("GitHub API request failed with status {status}: {message}")]
    Status { status: u16, message: String },
}

/// A file's text content together with its revision (blob SHA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub path: String,
    pub content: String,
    pub sha: String,
}

/// A content write: the revision `sha` must be the one last read.
#[derive(Debug)]
pub struct FileUpdate<'a> {
    pub path: &'a str,
    pub message: &'a str,
    pub content: &'a str,
    pub sha: &'a str,
    pub branch: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub sha: String,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub html_url: String,
    pub head: String,
    pub base: String,
    pub state: String,
}

impl PullRequestRef {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

#[derive(Debug)]
pub struct NewPullRequest<'a> {
    pub head: &'a str,
    pub base: &'a str,
    pub title: &'a str,
    pub body: &'a str,
}

/// Result of a pull request creation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullCreation {
    Created(PullRequestRef),
    /// GitHub answered 422, usually because a pull request for the same
    /// head and base already exists.
    Unprocessable { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRef {
    pub id: u64,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct Content {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateContent<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpdateContentResponse {
    commit: Commit,
}

#[derive(Debug, Deserialize)]
struct Commit {
    sha: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    html_url: String,
    state: String,
    head: PullRequestBranch,
    base: PullRequestBranch,
}

#[derive(Debug, Deserialize)]
struct PullRequestBranch {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<PullRequest> for PullRequestRef {
    fn from(pr: PullRequest) -> Self {
        Self {
            number: pr.number,
            html_url: pr.html_url,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
            state: pr.state,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateComment<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct Comment {
    id: u64,
    html_url: String,
}

// -----------------------------------------------------------------------------
// GithubClient impl

impl GithubClient<GithubCurlClient> {
    pub fn new(config: &Config) -> Self {
        Self::with_transport(
            config.api_base_url.clone(),
            GithubCurlClient::new(config.github_token.clone()),
        )
    }
}

impl<H: HttpTransport> GithubClient<H> {
    pub fn with_transport(base_url: String, http: H) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn transport(&self) -> &H {
        &self.http
    }

    fn repo_url(&self, repo: &RepositoryRef) -> String {
        format!(
            "{}/repos/{}/{}",
            self.base_url,
            encode_path(repo.owner()),
            encode_path(repo.name())
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url).await?;
        let body = expect_success(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Look up the repository's default branch name
    #[instrument(skip_all)]
    pub async fn default_branch(&self, repo: &RepositoryRef) -> Result<String> {
        let repository: Repository = self
            .get_json(&self.repo_url(repo))
            .await
            .with_context(|| format!("Failed to fetch repository {}", repo))?;
        Ok(repository.default_branch)
    }

    /// Get the tip commit SHA of a branch, returns None if the branch does not exist
    #[instrument(skip_all)]
    pub async fn branch_tip(&self, repo: &RepositoryRef, branch: &str) -> Result<Option<String>> {
        let url = format!("{}/git/ref/heads/{}", self.repo_url(repo), encode_path(branch));
        let response = self.http.get(&url).await?;
        if response.status == 404 {
            return Ok(None);
        }
        let body = expect_success(response)
            .with_context(|| format!("Failed to look up branch {}", branch))?;
        let git_ref: GitRef = serde_json::from_str(&body)?;
        Ok(Some(git_ref.object.sha))
    }

    /// Create a branch pointing at `sha`
    #[instrument(skip_all)]
    pub async fn create_branch(&self, repo: &RepositoryRef, branch: &str, sha: &str) -> Result<()> {
        let url = format!("{}/git/refs", self.repo_url(repo));
        let request_body = CreateRef {
            ref_name: format!("refs/heads/{}", branch),
            sha,
        };

        let json_data = serde_json::to_string(&request_body)?;
        let response = self.http.post(&url, &json_data).await?;
        expect_success(response).with_context(|| format!("Failed to create branch {}", branch))?;
        Ok(())
    }

    /// Read a file's decoded content and revision at `git_ref` (branch, tag or commit SHA)
    #[instrument(skip_all)]
    pub async fn get_file(&self, repo: &RepositoryRef, path: &str, git_ref: &str) -> Result<FileBlob> {
        let url = format!(
            "{}/contents/{}?ref={}",
            self.repo_url(repo),
            encode_path(path),
            encode_query(git_ref)
        );
        let content: Content = self
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to read {} at {}", path, git_ref))?;

        match content.encoding.as_deref() {
            Some("base64") => {}
            // Blobs over 1 MB come back without inline content
            Some("none") => bail!(
                "{} is too large for the contents API (over 1 MB); it cannot be appended to",
                path
            ),
            Some(other) => bail!("Unsupported content encoding {:?} for {}", other, path),
            None => bail!("{} is not a regular file", path),
        }

        // GitHub wraps base64 content at 60 columns
        let packed: String = content
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = BASE64
            .decode(packed)
            .with_context(|| format!("Invalid base64 content for {}", path))?;
        let text = String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8 text", path))?;

        Ok(FileBlob {
            path: content.path,
            content: text,
            sha: content.sha,
        })
    }

    /// Write a file, returning the new commit.
    ///
    /// Fails with [`GithubError::Conflict`] if `update.sha` is stale.
    #[instrument(skip_all)]
    pub async fn put_file(&self, repo: &RepositoryRef, update: &FileUpdate<'_>) -> Result<CommitRef> {
        let url = format!("{}/contents/{}", self.repo_url(repo), encode_path(update.path));
        let request_body = UpdateContent {
            message: update.message,
            content: BASE64.encode(update.content.as_bytes()),
            sha: update.sha,
            branch: update.branch,
        };

        let json_data = serde_json::to_string(&request_body)?;
        let response = self.http.put(&url, &json_data).await?;
        if response.status == 409 {
            return Err(GithubError::Conflict {
                path: update.path.to_string(),
                message: error_message(&response.body),
            }
            .into());
        }
        let body = expect_success(response)
            .with_context(|| format!("Failed to update {} on {}", update.path, update.branch))?;
        let updated: UpdateContentResponse = serde_json::from_str(&body)?;
        Ok(CommitRef {
            sha: updated.commit.sha,
            html_url: updated.commit.html_url,
        })
    }

    /// Create a new PR; a 422 answer is reported rather than failed
    #[instrument(skip_all)]
    pub async fn create_pull_request(
        &self,
        repo: &RepositoryRef,
        pr: &NewPullRequest<'_>,
    ) -> Result<PullCreation> {
        let url = format!("{}/pulls", self.repo_url(repo));
        let request_body = CreatePullRequest {
            title: pr.title,
            head: pr.head,
            base: pr.base,
            body: pr.body,
        };

        let json_data = serde_json::to_string(&request_body)?;
        let response = self.http.post(&url, &json_data).await?;
        if response.status == 422 {
            return Ok(PullCreation::Unprocessable {
                message: error_message(&response.body),
            });
        }
        let body = expect_success(response)
            .with_context(|| format!("Failed to create pull request for {}", pr.head))?;
        let created: PullRequest = serde_json::from_str(&body)?;
        Ok(PullCreation::Created(created.into()))
    }

    /// List open PRs whose head is `{owner}:{branch}`
    #[instrument(skip_all)]
    pub async fn list_open_pull_requests(
        &self,
        repo: &RepositoryRef,
        branch: &str,
    ) -> Result<Vec<PullRequestRef>> {
        let url = format!(
            "{}/pulls?head={}&state=open",
            self.repo_url(repo),
            encode_query(&format!("{}:{}", repo.owner(), branch))
        );
        let prs: Vec<PullRequest> = self
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to list pull requests for {}", branch))?;
        Ok(prs.into_iter().map(PullRequestRef::from).collect())
    }

    /// Get a PR by number, returns None if it does not exist
    #[instrument(skip_all)]
    pub async fn get_pull_request(
        &self,
        repo: &RepositoryRef,
        number: u64,
    ) -> Result<Option<PullRequestRef>> {
        let url = format!("{}/pulls/{}", self.repo_url(repo), number);
        let response = self.http.get(&url).await?;
        if response.status == 404 {
            return Ok(None);
        }
        let body = expect_success(response)
            .with_context(|| format!("Failed to fetch pull request #{}", number))?;
        let pr: PullRequest = serde_json::from_str(&body)?;
        Ok(Some(pr.into()))
    }

    /// Post a comment on a PR's discussion thread
    #[instrument(skip_all)]
    pub async fn create_comment(
        &self,
        repo: &RepositoryRef,
        number: u64,
        body: &str,
    ) -> Result<CommentRef> {
        let url = format!("{}/issues/{}/comments", self.repo_url(repo), number);
        let json_data = serde_json::to_string(&CreateComment { body })?;
        let response = self.http.post(&url, &json_data).await?;
        let body = expect_success(response)
            .with_context(|| format!("Failed to comment on pull request #{}", number))?;
        let comment: Comment = serde_json::from_str(&body)?;
        Ok(CommentRef {
            id: comment.id,
            html_url: comment.html_url,
        })
    }
}

/// Return the body of a 2xx response, or a [`GithubError::Status`]
fn expect_success(response: HttpResponse) -> Result<String, GithubError> {
    if response.is_success() {
        return Ok(response.body);
    }
    Err(GithubError::Status {
        status: response.status,
        message: error_message(&response.body),
    })
}

/// Extract GitHub's error message from a response body, falling back to the raw text
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(error) => error.message,
        Err(_) => body.trim().to_string(),
    }
}

fn encode_path(segment: &str) -> String {
    utf8_percent_encode(segment, PATH).to_string()
}

fn encode_query(value: &str) -> String {
    utf8_percent_encode(value, QUERY).to_string()
}
