//! Persisted Analysis Record
//!
//! The aggregate describing one repository's full analysis output and
//! status. One record exists per unique repository URL; the pipeline is
//! its only writer, all other components are pure functions whose output
//! the pipeline merges in.
//!
//! Field names serialize camelCase — this is the JSON wire shape API
//! clients consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::analyzer::{ScanResult, StructureTree};
use crate::mindmap::MindMapData;

/// Lifecycle status of an analysis.
///
/// Transitions are monotonic within one attempt:
/// pending/processing → completed | failed (both terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions within an attempt
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AI-generated architectural explanation of the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    pub overview: String,
    pub purpose: String,
    pub tech_stack: Vec<String>,
    pub main_components: Vec<String>,
    pub data_flow: String,
    pub key_folders: Vec<String>,
    pub important_files: Vec<String>,
}

/// AI-generated contribution guidance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionGuide {
    pub getting_started: Vec<String>,
    pub beginner_friendly_areas: Vec<String>,
    pub setup_steps: Vec<String>,
    pub common_patterns: Vec<String>,
}

/// AI-generated pre-PR checklist
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrPreparationHelp {
    pub pre_submit_checks: Vec<String>,
    pub impacted_areas: Vec<String>,
    pub testing_recommendations: Vec<String>,
    pub documentation_needs: Vec<String>,
    pub code_quality_tips: Vec<String>,
}

/// AI-generated roadmap for tackling one issue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRoadmap {
    pub steps: Vec<String>,
    pub modules_to_understand: Vec<String>,
    pub files_to_change: Vec<String>,
    pub testing_areas: Vec<String>,
    pub common_mistakes: Vec<String>,
}

/// Cached roadmap entry, unique per issue number within a record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRoadmapEntry {
    pub issue_number: u64,
    pub issue_title: String,
    pub roadmap: IssueRoadmap,
    pub generated_at: DateTime<Utc>,
}

/// One repository's full analysis aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub repo_url: String,
    pub owner: String,
    pub name: String,
    /// `owner/name` — the human-facing lookup key
    pub full_name: String,

    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub language: Option<String>,
    pub languages: Vec<String>,
    pub topics: Vec<String>,

    pub structure: Option<StructureTree>,
    /// File path → heuristic scan output for the deep-scanned subset
    pub code_analysis: BTreeMap<String, ScanResult>,
    pub mind_map_data: Option<MindMapData>,

    pub ai_insights: Option<AiInsights>,
    pub contribution_guide: Option<ContributionGuide>,
    pub pr_preparation_help: Option<PrPreparationHelp>,
    /// Append-only; entries unique per issue number
    pub issue_roadmaps: Vec<IssueRoadmapEntry>,

    pub analysis_status: AnalysisStatus,
    /// Set only when `analysis_status` is `Failed`
    pub analysis_error: Option<String>,
    pub last_analyzed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Create a fresh record for a repository about to be analyzed
    pub fn new(repo_url: impl Into<String>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            repo_url: repo_url.into(),
            full_name: format!("{}/{}", owner, name),
            owner,
            name,
            description: None,
            stars: 0,
            forks: 0,
            open_issues: 0,
            language: None,
            languages: Vec::new(),
            topics: Vec::new(),
            structure: None,
            code_analysis: BTreeMap::new(),
            mind_map_data: None,
            ai_insights: None,
            contribution_guide: None,
            pr_preparation_help: None,
            issue_roadmaps: Vec::new(),
            analysis_status: AnalysisStatus::Pending,
            analysis_error: None,
            last_analyzed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up a cached roadmap by issue number
    pub fn roadmap_for_issue(&self, issue_number: u64) -> Option<&IssueRoadmapEntry> {
        self.issue_roadmaps
            .iter()
            .find(|entry| entry.issue_number == issue_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AnalysisStatus::Pending,
            AnalysisStatus::Processing,
            AnalysisStatus::Completed,
            AnalysisStatus::Failed,
        ] {
            assert_eq!(AnalysisStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AnalysisStatus::parse("bogus"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(AnalysisStatus::Completed.is_terminal());
        assert!(AnalysisStatus::Failed.is_terminal());
        assert!(!AnalysisStatus::Processing.is_terminal());
        assert!(!AnalysisStatus::Pending.is_terminal());
    }

    #[test]
    fn test_new_record_defaults() {
        let record = AnalysisRecord::new("https://github.com/acme/widgets", "acme", "widgets");
        assert_eq!(record.full_name, "acme/widgets");
        assert_eq!(record.analysis_status, AnalysisStatus::Pending);
        assert!(record.structure.is_none());
        assert!(record.issue_roadmaps.is_empty());
    }

    #[test]
    fn test_camel_case_wire_shape() {
        let record = AnalysisRecord::new("https://github.com/acme/widgets", "acme", "widgets");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("fullName").is_some());
        assert!(json.get("analysisStatus").is_some());
        assert!(json.get("issueRoadmaps").is_some());
        assert_eq!(json["analysisStatus"], "pending");
    }

    #[test]
    fn test_roadmap_lookup() {
        let mut record = AnalysisRecord::new("https://github.com/acme/widgets", "acme", "widgets");
        record.issue_roadmaps.push(IssueRoadmapEntry {
            issue_number: 42,
            issue_title: "Fix the flux capacitor".into(),
            roadmap: IssueRoadmap {
                steps: vec!["Step 1".into()],
                modules_to_understand: vec![],
                files_to_change: vec![],
                testing_areas: vec![],
                common_mistakes: vec![],
            },
            generated_at: Utc::now(),
        });
        assert!(record.roadmap_for_issue(42).is_some());
        assert!(record.roadmap_for_issue(7).is_none());
    }
}
