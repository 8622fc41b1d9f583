//! Repository Host Abstraction
//!
//! Defines the [`RepoHost`] trait the pipeline consumes plus the data
//! types crossing that seam. The production implementation is
//! [`GithubClient`]; tests substitute stubs.

mod client;

pub use client::GithubClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::types::{ContribError, Result};

// =============================================================================
// Host Data Types
// =============================================================================

/// Repository metadata merged into the analysis record
#[derive(Debug, Clone, Default)]
pub struct RepoInfo {
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub primary_language: Option<String>,
    /// Ordered by code size, largest first
    pub languages: Vec<String>,
    pub topics: Vec<String>,
    pub default_branch: String,
}

/// Kind of a recursive-tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Tree,
    Blob,
    /// Submodule pointers and anything else the host may report
    #[serde(other)]
    Other,
}

/// One entry of the recursive file/directory listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Tree
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

/// The subset of an issue the roadmap generator needs
#[derive(Debug, Clone, Default)]
pub struct IssueDetails {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub labels: Vec<String>,
}

/// Maintainer responsiveness tier derived from response latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityLevel {
    VeryActive,
    Active,
    Moderate,
    Slow,
}

/// Maintainer responsiveness statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintainerStats {
    pub avg_response_days: u32,
    pub avg_response_hours: u32,
    pub activity_level: ActivityLevel,
}

impl Default for MaintainerStats {
    fn default() -> Self {
        Self {
            avg_response_days: crate::constants::github::DEFAULT_RESPONSE_DAYS,
            avg_response_hours: crate::constants::github::DEFAULT_RESPONSE_DAYS * 24,
            activity_level: ActivityLevel::Moderate,
        }
    }
}

impl MaintainerStats {
    /// Classify average response hours into a responsiveness tier
    pub fn from_avg_hours(avg_response_hours: f64) -> Self {
        let avg_response_days = (avg_response_hours / 24.0).ceil() as u32;
        let activity_level = if avg_response_days <= 1 {
            ActivityLevel::VeryActive
        } else if avg_response_days <= 3 {
            ActivityLevel::Active
        } else if avg_response_days <= 7 {
            ActivityLevel::Moderate
        } else {
            ActivityLevel::Slow
        };
        Self {
            avg_response_days,
            avg_response_hours: avg_response_hours.round() as u32,
            activity_level,
        }
    }
}

/// Shared host handle for the pipeline and HTTP handlers
pub type SharedHost = Arc<dyn RepoHost>;

// =============================================================================
// URL Parsing
// =============================================================================

/// Extract `(owner, name)` from a public GitHub repository URL
pub fn parse_repo_url(repo_url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(repo_url)
        .map_err(|_| ContribError::InvalidRepoUrl(repo_url.to_string()))?;

    let host_ok = parsed
        .host_str()
        .is_some_and(|host| host == "github.com" || host == "www.github.com");
    if !host_ok {
        return Err(ContribError::InvalidRepoUrl(repo_url.to_string()));
    }

    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| ContribError::InvalidRepoUrl(repo_url.to_string()))?
        .filter(|segment| !segment.is_empty());

    let owner = segments
        .next()
        .ok_or_else(|| ContribError::InvalidRepoUrl(repo_url.to_string()))?
        .to_string();
    let name = segments
        .next()
        .ok_or_else(|| ContribError::InvalidRepoUrl(repo_url.to_string()))?
        .trim_end_matches(".git")
        .to_string();

    if owner.is_empty() || name.is_empty() {
        return Err(ContribError::InvalidRepoUrl(repo_url.to_string()));
    }

    Ok((owner, name))
}

// =============================================================================
// Host Trait
// =============================================================================

/// Source-control hosting API consumed by the pipeline.
///
/// Methods returning `Option` treat absence as a valid outcome (missing
/// README, unfetchable file); methods returning bare values propagate
/// failures to the caller.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Repository metadata (description, counters, languages, topics)
    async fn repo_info(&self, owner: &str, name: &str) -> Result<RepoInfo>;

    /// Full recursive file/directory listing for a branch
    async fn repo_tree(&self, owner: &str, name: &str, branch: &str) -> Result<Vec<TreeEntry>>;

    /// Raw file content; `None` when the file is missing or unreadable
    async fn file_content(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>>;

    /// Open issues carrying the given label, as raw host JSON
    async fn issues_with_label(&self, owner: &str, name: &str, label: &str) -> Result<Vec<Value>>;

    /// Open issues matching any beginner label, deduplicated by issue id.
    /// Per-label failures are tolerated.
    async fn beginner_issues(&self, owner: &str, name: &str) -> Result<Vec<Value>>;

    /// One issue's title/body/labels
    async fn issue(&self, owner: &str, name: &str, number: u64) -> Result<IssueDetails>;

    /// README text; `None` when the repository has none
    async fn readme(&self, owner: &str, name: &str) -> Result<Option<String>>;

    /// CONTRIBUTING text from the conventional locations; `None` if absent
    async fn contributing(&self, owner: &str, name: &str) -> Result<Option<String>>;

    /// Responsiveness statistics from recent PR/issue timing history.
    /// Falls back to defaults when history is unavailable.
    async fn maintainer_stats(&self, owner: &str, name: &str) -> Result<MaintainerStats>;
}
