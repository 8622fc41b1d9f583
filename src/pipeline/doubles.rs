//! Test doubles for the pipeline and HTTP surface.
//!
//! `StubHost` plays the repository host with canned data and switchable
//! failure points; `StubProvider` answers every insight operation with a
//! schema-complete fixture.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;

use crate::ai::provider::{GenerationParams, LlmProvider, LlmResponse};
use crate::github::{
    EntryKind, IssueDetails, MaintainerStats, RepoHost, RepoInfo, TreeEntry,
};
use crate::storage::SharedDatabase;
use crate::types::record::AnalysisStatus;
use crate::types::{AnalysisRecord, ContribError, Result};

/// Insert a processing record for acme/widgets
pub fn seeded_record(db: &SharedDatabase) -> AnalysisRecord {
    let mut record = AnalysisRecord::new("https://github.com/acme/widgets", "acme", "widgets");
    record.analysis_status = AnalysisStatus::Processing;
    db.insert_record(&record).unwrap();
    record
}

pub struct StubHost {
    pub info: RepoInfo,
    pub tree: Vec<TreeEntry>,
    pub file_contents: HashMap<String, String>,
    pub readme: Option<String>,
    pub contributing: Option<String>,
    pub issues: Vec<Value>,
    pub fail_tree: bool,
    pub fail_info: bool,
}

impl StubHost {
    pub fn healthy() -> Self {
        let tree = vec![
            tree_entry("src", EntryKind::Tree),
            tree_entry("src/index.js", EntryKind::Blob),
            tree_entry("docs", EntryKind::Tree),
            tree_entry("docs/guide.md", EntryKind::Blob),
            tree_entry("tests", EntryKind::Tree),
            tree_entry("package.json", EntryKind::Blob),
            tree_entry("README.md", EntryKind::Blob),
        ];

        let mut file_contents = HashMap::new();
        file_contents.insert(
            "package.json".to_string(),
            "{\"name\": \"widgets\"}".to_string(),
        );
        file_contents.insert(
            "README.md".to_string(),
            "# Widgets\nfunction shine() {}".to_string(),
        );

        Self {
            info: RepoInfo {
                name: "widgets".into(),
                description: Some("A widget factory".into()),
                url: "https://github.com/acme/widgets".into(),
                stars: 420,
                forks: 17,
                open_issues: 12,
                primary_language: Some("JavaScript".into()),
                languages: vec!["JavaScript".into(), "CSS".into()],
                topics: vec!["widgets".into()],
                default_branch: "main".into(),
            },
            tree,
            file_contents,
            readme: Some("# Widgets\nThe finest widgets.".into()),
            contributing: Some("Fork, branch, PR.".into()),
            issues: vec![
                json!({"id": 1, "number": 7, "title": "Squeaky widget", "labels": [{"name": "good first issue"}]}),
            ],
            fail_tree: false,
            fail_info: false,
        }
    }
}

fn tree_entry(path: &str, kind: EntryKind) -> TreeEntry {
    TreeEntry {
        path: path.to_string(),
        kind,
        size: Some(10),
    }
}

#[async_trait]
impl RepoHost for StubHost {
    async fn repo_info(&self, _owner: &str, _name: &str) -> Result<RepoInfo> {
        if self.fail_info {
            return Err(ContribError::GithubApi("repo info unavailable".into()));
        }
        Ok(self.info.clone())
    }

    async fn repo_tree(&self, _owner: &str, _name: &str, _branch: &str) -> Result<Vec<TreeEntry>> {
        if self.fail_tree {
            return Err(ContribError::GithubApi("tree fetch exploded".into()));
        }
        Ok(self.tree.clone())
    }

    async fn file_content(
        &self,
        _owner: &str,
        _name: &str,
        path: &str,
        _branch: &str,
    ) -> Result<Option<String>> {
        Ok(self.file_contents.get(path).cloned())
    }

    async fn issues_with_label(
        &self,
        _owner: &str,
        _name: &str,
        _label: &str,
    ) -> Result<Vec<Value>> {
        Ok(self.issues.clone())
    }

    async fn beginner_issues(&self, _owner: &str, _name: &str) -> Result<Vec<Value>> {
        Ok(self.issues.clone())
    }

    async fn issue(&self, _owner: &str, _name: &str, number: u64) -> Result<IssueDetails> {
        Ok(IssueDetails {
            number,
            title: "Squeaky widget".into(),
            body: Some("The widget squeaks when spun.".into()),
            labels: vec!["good first issue".into()],
        })
    }

    async fn readme(&self, _owner: &str, _name: &str) -> Result<Option<String>> {
        Ok(self.readme.clone())
    }

    async fn contributing(&self, _owner: &str, _name: &str) -> Result<Option<String>> {
        Ok(self.contributing.clone())
    }

    async fn maintainer_stats(&self, _owner: &str, _name: &str) -> Result<MaintainerStats> {
        Ok(MaintainerStats::from_avg_hours(20.0))
    }
}

/// Provider double returning a body that satisfies all four schemas
pub struct StubProvider {
    pub fail: bool,
}

impl StubProvider {
    pub fn ok() -> Self {
        Self { fail: false }
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _schema: &Value,
        _params: GenerationParams,
    ) -> Result<LlmResponse> {
        if self.fail {
            return Err(ContribError::LlmApi("backend down".into()));
        }
        // Superset of every operation's schema; serde ignores extras
        Ok(LlmResponse::content_only(json!({
            "overview": "Widgets for everyone.",
            "purpose": "Makes widgets.",
            "techStack": ["JavaScript"],
            "mainComponents": ["src: widget core"],
            "dataFlow": "request -> widget -> response",
            "keyFolders": ["src"],
            "importantFiles": ["package.json"],
            "gettingStarted": ["Read the docs"],
            "beginnerFriendlyAreas": ["docs"],
            "setupSteps": ["npm install"],
            "commonPatterns": ["module pattern"],
            "steps": ["Step 1: Find the squeak"],
            "modulesToUnderstand": ["src"],
            "filesToChange": ["src/index.js"],
            "testingAreas": ["spin tests"],
            "commonMistakes": ["over-oiling"],
            "preSubmitChecks": ["npm test"],
            "impactedAreas": ["src"],
            "testingRecommendations": ["unit tests"],
            "documentationNeeds": ["README"],
            "codeQualityTips": ["keep functions small"]
        })))
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-1"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
