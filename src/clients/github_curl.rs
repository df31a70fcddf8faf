#![allow(async_fn_in_trait)]

use std::process::Stdio;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;

// -----------------------------------------------------------------------------
// HttpTransport trait

/// A raw HTTP response: status code plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP surface needed to talk to the GitHub REST API.
///
/// Implementations return every HTTP status as a response; only transport
/// failures are errors.
#[cfg_attr(test, automock)]
pub trait HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
    async fn post(&self, url: &str, json_data: &str) -> Result<HttpResponse>;
    async fn put(&self, url: &str, json_data: &str) -> Result<HttpResponse>;
}

// -----------------------------------------------------------------------------
// GithubCurlClient

/// HTTP client using curl for making GitHub API requests
pub struct GithubCurlClient {
    token: String,
}

impl GithubCurlClient {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    fn base_args(&self, method: &str) -> Vec<String> {
        vec![
            "-s".to_string(),
            "-w".to_string(),
            "\n%{http_code}".to_string(),
            "-X".to_string(),
            method.to_string(),
            "-H".to_string(),
            format!("Authorization: Bearer {}", self.token),
            "-H".to_string(),
            "Accept: application/vnd.github+json".to_string(),
            "-H".to_string(),
            "X-GitHub-Api-Version: 2022-11-28".to_string(),
            "-H".to_string(),
            "User-Agent: ghscribe".to_string(),
        ]
    }

    /// Run curl, streaming the request body (if any) through stdin.
    async fn execute(
        &self,
        method: &str,
        url: &str,
        json_data: Option<&str>,
    ) -> Result<HttpResponse> {
        let mut args = self.base_args(method);
        if json_data.is_some() {
            args.extend([
                "-H".to_string(),
                "Content-Type: application/json".to_string(),
                "--data-binary".to_string(),
                "@-".to_string(),
            ]);
        }
        args.push(url.to_string());

        let mut child = Command::new("curl")
            .args(&args)
            .stdin(if json_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to execute curl command")?;

        if let Some(data) = json_data {
            let mut stdin = child.stdin.take().context("curl stdin unavailable")?;
            stdin
                .write_all(data.as_bytes())
                .await
                .context("Failed to write request body to curl")?;
            // Close stdin so curl sees EOF
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for curl command")?;

        if !output.status.success() {
            bail!(
                "curl command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        parse_response(output.stdout)
    }
}

impl HttpTransport for GithubCurlClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.execute("GET", url, None).await
    }

    async fn post(&self, url: &str, json_data: &str) -> Result<HttpResponse> {
        self.execute("POST", url, Some(json_data)).await
    }

    async fn put(&self, url: &str, json_data: &str) -> Result<HttpResponse> {
        self.execute("PUT", url, Some(json_data)).await
    }
}

/// Parse curl response with status code appended
fn parse_response(stdout: Vec<u8>) -> Result<HttpResponse> {
    let output_str = String::from_utf8(stdout)?;
    let Some((body, status_line)) = output_str.rsplit_once('\n') else {
        bail!("Malformed curl output: missing status code");
    };

    let status = status_line
        .trim()
        .parse::<u16>()
        .with_context(|| format!("Malformed HTTP status from curl: {:?}", status_line))?;
    if status == 0 {
        bail!("curl did not receive an HTTP response");
    }

    Ok(HttpResponse::new(status, body))
}
