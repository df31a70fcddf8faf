//! In-memory stand-in for the GitHub REST API, used by unit tests.
//!
//! Routes the handful of endpoints the client uses, keeps branches, file
//! trees per commit, pull requests and comments in memory, and records every
//! request so tests can assert on the exact calls made.

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;

use anyhow::Result;
use anyhow::bail;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use serde_json::json;

use super::github_curl::HttpResponse;
use super::github_curl::HttpTransport;

pub const FAKE_API: &str = "https://api.github.test";

#[derive(Debug, Clone)]
pub struct FakePullRequest {
    pub number: u64,
    pub head: String,
    pub base: String,
    pub state: String,
}

pub struct FakeGithub {
    pub owner: String,
    pub repo: String,
    pub default_branch: String,
    /// Branch name -> tip commit SHA
    pub branches: RefCell<HashMap<String, String>>,
    /// Commit SHA -> (path -> content)
    pub trees: RefCell<HashMap<String, BTreeMap<String, String>>>,
    pub pulls: RefCell<Vec<FakePullRequest>>,
    pub comments: RefCell<Vec<(u64, String)>>,
    /// Every request as "METHOD /path?query"
    pub requests: RefCell<Vec<String>>,
    /// When set, the next file write fails with 409 regardless of SHA
    pub fail_next_write: Cell<bool>,
    commit_counter: Cell<u64>,
}

impl FakeGithub {
    /// A repository `owner/repo` whose default branch `main` points at commit `abc123`
    pub fn new(owner: &str, repo: &str) -> Self {
        let fake = Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            default_branch: "main".to_string(),
            branches: RefCell::new(HashMap::new()),
            trees: RefCell::new(HashMap::new()),
            pulls: RefCell::new(Vec::new()),
            comments: RefCell::new(Vec::new()),
            requests: RefCell::new(Vec::new()),
            fail_next_write: Cell::new(false),
            commit_counter: Cell::new(0),
        };
        fake.branches
            .borrow_mut()
            .insert("main".to_string(), "abc123".to_string());
        fake.trees
            .borrow_mut()
            .insert("abc123".to_string(), BTreeMap::new());
        fake
    }

    /// Replace the seeded default branch with `branch` at commit `sha`
    pub fn with_default_branch(mut self, branch: &str, sha: &str) -> Self {
        let old_tip = self.branches.borrow_mut().remove(&self.default_branch);
        if let Some(old_tip) = old_tip {
            self.trees.borrow_mut().remove(&old_tip);
        }
        self.default_branch = branch.to_string();
        self.branches
            .borrow_mut()
            .insert(branch.to_string(), sha.to_string());
        self.trees
            .borrow_mut()
            .insert(sha.to_string(), BTreeMap::new());
        self
    }

    /// Add a file at the tip of the default branch
    pub fn with_file(self, path: &str, content: &str) -> Self {
        let tip = self.branches.borrow()[&self.default_branch].clone();
        self.trees
            .borrow_mut()
            .get_mut(&tip)
            .expect("default branch tree")
            .insert(path.to_string(), content.to_string());
        self
    }

    pub fn with_branch(self, branch: &str, from: &str) -> Self {
        let sha = self.branches.borrow()[from].clone();
        self.branches.borrow_mut().insert(branch.to_string(), sha);
        self
    }

    pub fn with_pull(self, number: u64, head: &str, base: &str, state: &str) -> Self {
        self.pulls.borrow_mut().push(FakePullRequest {
            number,
            head: head.to_string(),
            base: base.to_string(),
            state: state.to_string(),
        });
        self
    }

    /// Content of `path` at the tip of `branch`
    pub fn file_on(&self, branch: &str, path: &str) -> Option<String> {
        let tip = self.branches.borrow().get(branch)?.clone();
        self.trees.borrow().get(&tip)?.get(path).cloned()
    }

    pub fn requests_matching(&self, prefix: &str) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn repo_prefix(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.repo)
    }

    fn pr_json(&self, pr: &FakePullRequest) -> Value {
        json!({
            "number": pr.number,
            "html_url": format!("https://github.com/{}/{}/pull/{}", self.owner, self.repo, pr.number),
            "state": pr.state,
            "head": {"ref": pr.head},
            "base": {"ref": pr.base},
        })
    }

    fn resolve_ref(&self, git_ref: &str) -> Option<String> {
        if let Some(sha) = self.branches.borrow().get(git_ref) {
            return Some(sha.clone());
        }
        self.trees
            .borrow()
            .contains_key(git_ref)
            .then(|| git_ref.to_string())
    }

    fn route(&self, method: &str, url: &str, body: Option<&str>) -> Result<HttpResponse> {
        let Some(rest) = url.strip_prefix(FAKE_API) else {
            bail!("unexpected host in {}", url);
        };
        self.requests.borrow_mut().push(format!("{} {}", method, rest));

        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let query: HashMap<String, String> = query
            .split('&')
            .filter(|kv| !kv.is_empty())
            .filter_map(|kv| kv.split_once('='))
            .map(|(k, v)| (k.to_string(), decode(v)))
            .collect();
        let path = decode(path);
        let Some(path) = path.strip_prefix(&self.repo_prefix()) else {
            return Ok(not_found());
        };
        let body: Value = match body {
            Some(b) => serde_json::from_str(b)?,
            None => Value::Null,
        };

        match (method, path) {
            ("GET", "") => Ok(ok(json!({ "default_branch": self.default_branch }))),
            ("GET", p) if p.starts_with("/git/ref/heads/") => {
                let branch = &p["/git/ref/heads/".len()..];
                match self.branches.borrow().get(branch) {
                    Some(sha) => Ok(ok(json!({
                        "ref": format!("refs/heads/{}", branch),
                        "object": {"sha": sha, "type": "commit"},
                    }))),
                    None => Ok(not_found()),
                }
            }
            ("POST", "/git/refs") => {
                let name = body["ref"].as_str().unwrap_or_default();
                let sha = body["sha"].as_str().unwrap_or_default().to_string();
                let Some(branch) = name.strip_prefix("refs/heads/") else {
                    return Ok(unprocessable("Reference name must start with refs/heads/"));
                };
                if self.branches.borrow().contains_key(branch) {
                    return Ok(unprocessable("Reference already exists"));
                }
                self.branches.borrow_mut().insert(branch.to_string(), sha.clone());
                Ok(HttpResponse::new(
                    201,
                    json!({"ref": name, "object": {"sha": sha}}).to_string(),
                ))
            }
            ("GET", p) if p.starts_with("/contents/") => {
                let file = &p["/contents/".len()..];
                let git_ref = query.get("ref").cloned().unwrap_or(self.default_branch.clone());
                let Some(commit) = self.resolve_ref(&git_ref) else {
                    return Ok(not_found());
                };
                let trees = self.trees.borrow();
                let Some(content) = trees.get(&commit).and_then(|t| t.get(file)) else {
                    return Ok(not_found());
                };
                // Wrap like GitHub does
                let encoded = BASE64.encode(content.as_bytes());
                let wrapped = encoded
                    .as_bytes()
                    .chunks(60)
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(ok(json!({
                    "type": "file",
                    "path": file,
                    "sha": blob_sha(content),
                    "encoding": "base64",
                    "content": wrapped + "\n",
                })))
            }
            ("PUT", p) if p.starts_with("/contents/") => {
                let file = p["/contents/".len()..].to_string();
                let branch = body["branch"].as_str().unwrap_or_default().to_string();
                let Some(tip) = self.branches.borrow().get(&branch).cloned() else {
                    return Ok(not_found());
                };
                let mut tree = self.trees.borrow()[&tip].clone();
                let current = tree.get(&file).map(|c| blob_sha(c));
                let supplied = body["sha"].as_str().map(|s| s.to_string());
                if self.fail_next_write.replace(false) || current != supplied {
                    return Ok(HttpResponse::new(
                        409,
                        json!({"message": format!("{} does not match {}", file, supplied.unwrap_or_default())})
                            .to_string(),
                    ));
                }
                let decoded = BASE64.decode(body["content"].as_str().unwrap_or_default())?;
                tree.insert(file.clone(), String::from_utf8(decoded)?);

                let n = self.commit_counter.get() + 1;
                self.commit_counter.set(n);
                let commit = format!("commit{}", n);
                self.trees.borrow_mut().insert(commit.clone(), tree);
                self.branches.borrow_mut().insert(branch, commit.clone());
                Ok(ok(json!({
                    "content": {"path": file},
                    "commit": {
                        "sha": commit,
                        "html_url": format!("https://github.com/{}/{}/commit/{}", self.owner, self.repo, commit),
                    },
                })))
            }
            ("POST", "/pulls") => {
                let head = body["head"].as_str().unwrap_or_default().to_string();
                let base = body["base"].as_str().unwrap_or_default().to_string();
                let duplicate = self
                    .pulls
                    .borrow()
                    .iter()
                    .any(|pr| pr.head == head && pr.base == base && pr.state == "open");
                if duplicate {
                    return Ok(unprocessable(&format!(
                        "A pull request already exists for {}:{}.",
                        self.owner, head
                    )));
                }
                let number = self.pulls.borrow().iter().map(|pr| pr.number).max().unwrap_or(0) + 1;
                let pr = FakePullRequest {
                    number,
                    head,
                    base,
                    state: "open".to_string(),
                };
                let value = self.pr_json(&pr);
                self.pulls.borrow_mut().push(pr);
                Ok(HttpResponse::new(201, value.to_string()))
            }
            ("GET", "/pulls") => {
                let head = query.get("head").cloned().unwrap_or_default();
                let state = query.get("state").cloned().unwrap_or("open".to_string());
                let matches: Vec<Value> = self
                    .pulls
                    .borrow()
                    .iter()
                    .filter(|pr| format!("{}:{}", self.owner, pr.head) == head)
                    .filter(|pr| state == "all" || pr.state == state)
                    .map(|pr| self.pr_json(pr))
                    .collect();
                Ok(ok(Value::Array(matches)))
            }
            ("GET", p) if p.starts_with("/pulls/") => {
                let number: u64 = p["/pulls/".len()..].parse()?;
                match self.pulls.borrow().iter().find(|pr| pr.number == number) {
                    Some(pr) => Ok(ok(self.pr_json(pr))),
                    None => Ok(not_found()),
                }
            }
            ("POST", p) if p.starts_with("/issues/") && p.ends_with("/comments") => {
                let number: u64 = p["/issues/".len()..p.len() - "/comments".len()].parse()?;
                if !self.pulls.borrow().iter().any(|pr| pr.number == number) {
                    return Ok(not_found());
                }
                let text = body["body"].as_str().unwrap_or_default().to_string();
                self.comments.borrow_mut().push((number, text));
                let id = self.comments.borrow().len() as u64 + 1000;
                Ok(HttpResponse::new(
                    201,
                    json!({
                        "id": id,
                        "html_url": format!(
                            "https://github.com/{}/{}/pull/{}#issuecomment-{}",
                            self.owner, self.repo, number, id
                        ),
                    })
                    .to_string(),
                ))
            }
            _ => Ok(not_found()),
        }
    }
}

impl HttpTransport for FakeGithub {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.route("GET", url, None)
    }

    async fn post(&self, url: &str, json_data: &str) -> Result<HttpResponse> {
        self.route("POST", url, Some(json_data))
    }

    async fn put(&self, url: &str, json_data: &str) -> Result<HttpResponse> {
        self.route("PUT", url, Some(json_data))
    }
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Stand-in for git's blob hash: stable and content-addressed
fn blob_sha(content: &str) -> String {
    use std::hash::Hash as _;
    use std::hash::Hasher as _;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn ok(value: Value) -> HttpResponse {
    HttpResponse::new(200, value.to_string())
}

fn not_found() -> HttpResponse {
    HttpResponse::new(404, json!({"message": "Not Found"}).to_string())
}

fn unprocessable(message: &str) -> HttpResponse {
    HttpResponse::new(422, json!({"message": message}).to_string())
}
