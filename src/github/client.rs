//! GitHub API Client
//!
//! Production [`RepoHost`] implementation. Metadata, trees, contents,
//! issues, and README go through the REST v3 API; maintainer
//! responsiveness needs the timing join only the GraphQL API can express
//! in one round trip.
//!
//! The token is optional (unauthenticated requests work against public
//! repositories at a lower rate limit) and never appears in logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{IssueDetails, MaintainerStats, RepoHost, RepoInfo, TreeEntry};
use crate::constants::github as tables;
use crate::types::{ContribError, Result};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("contribmap/", env!("CARGO_PKG_VERSION"));

/// GitHub REST + GraphQL client with optional token auth
pub struct GithubClient {
    api_base: String,
    token: Option<SecretString>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GithubClient {
    pub fn new(api_base: Option<String>, token: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ContribError::GithubApi(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            token: token.map(SecretString::from),
            client,
        })
    }

    /// Authenticated GET with the given media type
    fn get(&self, path: &str, accept: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(format!("{}{}", self.api_base, path))
            .header("Accept", accept);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token.expose_secret()));
        }
        request
    }

    /// GET a JSON endpoint, mapping non-2xx responses to `GithubApi`
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .get(path, "application/vnd.github.v3+json")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ContribError::GithubApi(format!(
                "GET {} returned {}: {}",
                path, status, body
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ContribError::GithubApi(format!("failed to parse {}: {}", path, e)))
    }

    /// GET raw file text via the raw media type; absence yields `None`
    async fn get_raw_text(&self, path: &str) -> Result<Option<String>> {
        let response = self.get(path, "application/vnd.github.raw+json").send().await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                debug!("raw fetch {} failed: {}", path, e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            debug!("raw fetch {} returned {}", path, response.status());
            return Ok(None);
        }

        match response.text().await {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                debug!("raw fetch {} body unreadable: {}", path, e);
                Ok(None)
            }
        }
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let mut request = self
            .client
            .post(format!("{}/graphql", self.api_base))
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("bearer {}", token.expose_secret()));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ContribError::GithubApi(format!(
                "GraphQL request returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ContribError::GithubApi(format!("failed to parse GraphQL body: {}", e)))?;
        if let Some(errors) = body.get("errors") {
            return Err(ContribError::GithubApi(format!(
                "GraphQL errors: {}",
                errors
            )));
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct RestRepo {
    name: String,
    description: Option<String>,
    html_url: String,
    stargazers_count: u64,
    forks_count: u64,
    open_issues_count: u64,
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

const RESPONSIVENESS_QUERY: &str = r#"
query($owner: String!, $name: String!, $sample: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: [MERGED, CLOSED], last: $sample, orderBy: {field: UPDATED_AT, direction: DESC}) {
      nodes {
        createdAt
        reviews(first: 1) { nodes { createdAt } }
      }
    }
    issues(states: [CLOSED], last: $sample, orderBy: {field: UPDATED_AT, direction: DESC}) {
      nodes {
        createdAt
        comments(first: 1) { nodes { createdAt } }
      }
    }
  }
}
"#;

/// Hours between an item's creation and the first listed response
fn response_hours(node: &Value, responses_key: &str) -> Option<f64> {
    let created: DateTime<Utc> = node.get("createdAt")?.as_str()?.parse().ok()?;
    let first: DateTime<Utc> = node
        .get(responses_key)?
        .get("nodes")?
        .as_array()?
        .first()?
        .get("createdAt")?
        .as_str()?
        .parse()
        .ok()?;
    Some((first - created).num_seconds() as f64 / 3600.0)
}

#[async_trait]
impl RepoHost for GithubClient {
    async fn repo_info(&self, owner: &str, name: &str) -> Result<RepoInfo> {
        let repo: RestRepo = self.get_json(&format!("/repos/{}/{}", owner, name)).await?;

        // Language list ordered by code size, largest first
        let by_size: HashMap<String, u64> = self
            .get_json(&format!("/repos/{}/{}/languages", owner, name))
            .await
            .unwrap_or_default();
        let mut languages: Vec<(String, u64)> = by_size.into_iter().collect();
        languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(RepoInfo {
            name: repo.name,
            description: repo.description,
            url: repo.html_url,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            primary_language: repo.language,
            languages: languages.into_iter().map(|(lang, _)| lang).collect(),
            topics: repo.topics,
            default_branch: repo.default_branch,
        })
    }

    async fn repo_tree(&self, owner: &str, name: &str, branch: &str) -> Result<Vec<TreeEntry>> {
        let response: TreeResponse = self
            .get_json(&format!(
                "/repos/{}/{}/git/trees/{}?recursive=1",
                owner, name, branch
            ))
            .await?;
        if response.truncated {
            warn!("tree listing for {}/{} was truncated by the host", owner, name);
        }
        Ok(response.tree)
    }

    async fn file_content(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>> {
        self.get_raw_text(&format!(
            "/repos/{}/{}/contents/{}?ref={}",
            owner, name, path, branch
        ))
        .await
    }

    async fn issues_with_label(&self, owner: &str, name: &str, label: &str) -> Result<Vec<Value>> {
        let encoded: String = url::form_urlencoded::byte_serialize(label.as_bytes()).collect();
        self.get_json(&format!(
            "/repos/{}/{}/issues?state=open&per_page=100&labels={}",
            owner, name, encoded
        ))
        .await
    }

    async fn beginner_issues(&self, owner: &str, name: &str) -> Result<Vec<Value>> {
        let mut unique: Vec<Value> = Vec::new();
        let mut seen: Vec<u64> = Vec::new();

        for label in tables::BEGINNER_LABELS {
            match self.issues_with_label(owner, name, label).await {
                Ok(issues) => {
                    for issue in issues {
                        let id = issue.get("id").and_then(Value::as_u64).unwrap_or_default();
                        if !seen.contains(&id) {
                            seen.push(id);
                            unique.push(issue);
                        }
                    }
                }
                Err(e) => {
                    debug!("label query '{}' failed for {}/{}: {}", label, owner, name, e);
                }
            }
        }

        Ok(unique)
    }

    async fn issue(&self, owner: &str, name: &str, number: u64) -> Result<IssueDetails> {
        let raw: Value = self
            .get_json(&format!("/repos/{}/{}/issues/{}", owner, name, number))
            .await?;

        Ok(IssueDetails {
            number: raw.get("number").and_then(Value::as_u64).unwrap_or(number),
            title: raw
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            body: raw
                .get("body")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            labels: raw
                .get("labels")
                .and_then(Value::as_array)
                .map(|labels| {
                    labels
                        .iter()
                        .filter_map(|label| label.get("name").and_then(Value::as_str))
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    async fn readme(&self, owner: &str, name: &str) -> Result<Option<String>> {
        self.get_raw_text(&format!("/repos/{}/{}/readme", owner, name))
            .await
    }

    async fn contributing(&self, owner: &str, name: &str) -> Result<Option<String>> {
        for path in tables::CONTRIBUTING_PATHS {
            if let Some(content) = self
                .get_raw_text(&format!("/repos/{}/{}/contents/{}", owner, name, path))
                .await?
            {
                return Ok(Some(content));
            }
        }
        Ok(None)
    }

    async fn maintainer_stats(&self, owner: &str, name: &str) -> Result<MaintainerStats> {
        let variables = json!({
            "owner": owner,
            "name": name,
            "sample": tables::RESPONSIVENESS_SAMPLE,
        });

        let body = match self.graphql(RESPONSIVENESS_QUERY, variables).await {
            Ok(body) => body,
            Err(e) => {
                warn!("maintainer stats unavailable for {}/{}: {}", owner, name, e);
                return Ok(MaintainerStats::default());
            }
        };

        let repository = &body["data"]["repository"];
        let empty = Vec::new();
        let prs = repository["pullRequests"]["nodes"]
            .as_array()
            .unwrap_or(&empty);
        let issues = repository["issues"]["nodes"].as_array().unwrap_or(&empty);

        let mut total_hours = 0.0;
        let mut count = 0u32;
        for pr in prs {
            if let Some(hours) = response_hours(pr, "reviews") {
                total_hours += hours;
                count += 1;
            }
        }
        for issue in issues {
            if let Some(hours) = response_hours(issue, "comments") {
                total_hours += hours;
                count += 1;
            }
        }

        if count == 0 {
            return Ok(MaintainerStats::default());
        }
        Ok(MaintainerStats::from_avg_hours(total_hours / count as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_hours_extraction() {
        let node = json!({
            "createdAt": "2026-01-01T00:00:00Z",
            "reviews": { "nodes": [{ "createdAt": "2026-01-02T12:00:00Z" }] }
        });
        let hours = response_hours(&node, "reviews").unwrap();
        assert!((hours - 36.0).abs() < 0.01);
    }

    #[test]
    fn test_response_hours_missing_response() {
        let node = json!({
            "createdAt": "2026-01-01T00:00:00Z",
            "reviews": { "nodes": [] }
        });
        assert!(response_hours(&node, "reviews").is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = GithubClient::new(None, Some("ghp_secret".into()), 30).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("REDACTED"));
    }
}
