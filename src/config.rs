use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use anyhow::bail;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

#[derive(Clone)]
pub struct Config {
    pub github_token: String,
    pub api_base_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("github_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Config {
    /// Load config from the process environment, falling back to a `.env` file
    pub fn load() -> Result<Self> {
        let dotenv = match dotenvy::dotenv_iter() {
            Ok(iter) => iter.collect::<Result<HashMap<_, _>, _>>()?,
            Err(e) if e.not_found() => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned()))
    }

    /// Load config from an explicit env file, without consulting the process environment
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let vars = dotenvy::from_path_iter(path)?.collect::<Result<HashMap<_, _>, _>>()?;
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let Some(github_token) = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty()) else {
            bail!("GITHUB_TOKEN not set in environment (export it or put it in a .env file)");
        };
        let api_base_url = lookup("GITHUB_API_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            github_token: github_token.trim().to_string(),
            api_base_url,
        })
    }
}
