//! Insight Generator
//!
//! Builds structured prompts from repository facts and sends them to the
//! LLM backend in JSON mode, parsing each response into one of four fixed
//! schemas: repository overview, contribution guide, issue roadmap, and
//! PR checklist.
//!
//! Error boundary: any backend failure — network, non-2xx, malformed or
//! mis-shaped JSON — surfaces as a single operation-specific
//! `ContribError::Insight`. Retry policy lives in the queue layer, and
//! roadmap caching on the record; neither belongs here.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::warn;

use super::provider::{GenerationParams, SharedProvider};
use crate::analyzer::{EcosystemScore, ScanResult, StructureTree};
use crate::constants::insight as limits;
use crate::github::IssueDetails;
use crate::types::{
    AiInsights, ContribError, ContributionGuide, IssueRoadmap, PrPreparationHelp, Result,
};

/// Repository facts shared by every insight operation
#[derive(Debug, Clone, Default)]
pub struct RepoContext {
    pub name: String,
    pub description: Option<String>,
    pub languages: Vec<String>,
    pub topics: Vec<String>,
    pub structure: Option<StructureTree>,
    pub code_analysis: BTreeMap<String, ScanResult>,
    pub ecosystems: Vec<EcosystemScore>,
}

/// Four-operation generator over a shared LLM provider
#[derive(Clone)]
pub struct InsightGenerator {
    provider: SharedProvider,
}

impl InsightGenerator {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Architectural explanation of the repository
    pub async fn explain_repository(
        &self,
        context: &RepoContext,
        readme: Option<&str>,
    ) -> Result<AiInsights> {
        let mut prompt = String::new();
        prompt.push_str(
            "You are a Senior Software Architect. Analyze the following repository and provide a deep, insightful explanation for a new developer.\n\n",
        );
        prompt.push_str(&format!("Repository: {}\n", context.name));
        prompt.push_str(&format!(
            "Description: {}\n",
            context.description.as_deref().unwrap_or("No description provided")
        ));
        prompt.push_str(&format!(
            "Main Languages: {}\n",
            join_capped(&context.languages, limits::MAX_PROMPT_LANGUAGES)
        ));
        prompt.push_str(&format!(
            "Key Topics: {}\n",
            join_capped(&context.topics, limits::MAX_PROMPT_TOPICS)
        ));
        if !context.ecosystems.is_empty() {
            let detected: Vec<String> = context
                .ecosystems
                .iter()
                .take(3)
                .map(|score| format!("{} ({:.2})", score.ecosystem, score.confidence))
                .collect();
            prompt.push_str(&format!("Detected Ecosystems: {}\n", detected.join(", ")));
        }
        prompt.push_str("\n--- REPOSITORY STRUCTURE ---\n");
        prompt.push_str(&structure_summary(context.structure.as_ref()));
        prompt.push_str("\n\n--- CODE INTELLIGENCE (Main Functions & Classes) ---\n");
        prompt.push_str(&code_summary(&context.code_analysis));
        prompt.push_str("\n\n--- README EXCERPT ---\n");
        prompt.push_str(&truncate(
            readme.unwrap_or("No README available"),
            limits::MAX_README_CHARS,
        ));
        prompt.push_str(
            "\n\nBased on this data, provide a highly professional analysis. Focus on technical accuracy and architectural clarity. Do not use generic filler text.",
        );

        let schema = json!({
            "overview": "A clear, 3-sentence summary of what this project does and why it exists.",
            "purpose": "The core problem this project solves and its primary use cases.",
            "techStack": ["The main technologies, frameworks, and tools used."],
            "mainComponents": ["3-5 major modules/components with their roles."],
            "dataFlow": "Step-by-step explanation of how a typical request moves through the system.",
            "keyFolders": ["4-6 critical folders and the logic that lives there."],
            "importantFiles": ["5-7 most important files and why they are critical."]
        });

        self.generate("repository explanation", &prompt, &schema, params(0.2, 2500))
            .await
    }

    /// Practical step-by-step contribution guide
    pub async fn contribution_guide(
        &self,
        context: &RepoContext,
        contributing: Option<&str>,
        readme: Option<&str>,
    ) -> Result<ContributionGuide> {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "You are an Open-Source Mentor. Help a developer contribute to \"{}\".\n\n",
            context.name
        ));
        prompt.push_str(&format!("Languages: {}\n", context.languages.join(", ")));
        prompt.push_str(&format!(
            "Has CONTRIBUTING.md: {}\n",
            if contributing.is_some() { "Yes" } else { "No" }
        ));
        if let Some(text) = contributing {
            prompt.push_str("\n--- CONTRIBUTING EXCERPT ---\n");
            prompt.push_str(&truncate(text, limits::MAX_README_CHARS));
            prompt.push('\n');
        }
        if let Some(text) = readme {
            prompt.push_str("\n--- README EXCERPT ---\n");
            prompt.push_str(&truncate(text, limits::MAX_README_CHARS));
            prompt.push('\n');
        }
        prompt.push_str("\n--- STRUCTURE ---\n");
        prompt.push_str(&structure_summary(context.structure.as_ref()));
        prompt.push_str("\n\n--- RELEVANT CODE ---\n");
        prompt.push_str(&code_summary(&context.code_analysis));
        prompt.push_str(
            "\n\nGenerate a practical, step-by-step contribution guide. Be specific to the technology stack found in the code.",
        );

        let schema = json!({
            "gettingStarted": ["High-level steps to get involved in the community/project."],
            "beginnerFriendlyAreas": ["Modules or folders where a beginner can safely make changes."],
            "setupSteps": ["Actionable, technical steps to set up the dev environment."],
            "commonPatterns": ["Code patterns used across this repository."]
        });

        self.generate("contribution guide", &prompt, &schema, params(0.3, 1500))
            .await
    }

    /// Technical roadmap for tackling one issue
    pub async fn issue_roadmap(
        &self,
        issue: &IssueDetails,
        context: &RepoContext,
    ) -> Result<IssueRoadmap> {
        let mut prompt = String::new();
        prompt.push_str("You are a Tech Lead. Create a technical roadmap for this GitHub issue:\n\n");
        prompt.push_str(&format!("Issue: {}\n", issue.title));
        prompt.push_str(&format!(
            "Details: {}\n",
            issue.body.as_deref().unwrap_or("No description")
        ));
        prompt.push_str(&format!("Labels: {}\n\n", issue.labels.join(", ")));
        prompt.push_str(&format!("Repository Context ({}):\n", context.name));
        prompt.push_str(&format!("Languages: {}\n", context.languages.join(", ")));
        prompt.push_str(&format!(
            "Structure: {}\n",
            structure_summary(context.structure.as_ref())
        ));
        prompt.push_str(&format!(
            "Code Intelligence: {}\n",
            code_summary(&context.code_analysis)
        ));
        prompt.push_str(
            "\nCreate a detailed roadmap. Base your advice on the actual files and structure mentioned above.",
        );

        let schema = json!({
            "steps": ["Ordered implementation steps, e.g. 'Step 1: Locate X'."],
            "modulesToUnderstand": ["Folders/files containing the logic relevant to this issue."],
            "filesToChange": ["Probable files that need edits based on the issue description."],
            "testingAreas": ["Exactly what to test to ensure the fix works."],
            "commonMistakes": ["Specific technical pitfalls in this repo for this type of change."]
        });

        self.generate("issue roadmap", &prompt, &schema, params(0.2, 1500))
            .await
    }

    /// Pre-PR checklist tailored to a proposed change
    pub async fn pr_checklist(
        &self,
        context: &RepoContext,
        proposed_changes: &str,
    ) -> Result<PrPreparationHelp> {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "You are an expert Code Reviewer. Prepare a PR checklist for a developer contributing to \"{}\".\n\n",
            context.name
        ));
        prompt.push_str(&format!("Languages: {}\n", context.languages.join(", ")));
        prompt.push_str(&format!("Proposed Changes: {}\n", proposed_changes));
        prompt.push_str("\n--- CONTEXT ---\n");
        prompt.push_str(&structure_summary(context.structure.as_ref()));
        prompt.push('\n');
        prompt.push_str(&code_summary(&context.code_analysis));
        prompt.push_str(
            "\n\nGenerate a checklist. Focus on preventing regressions and maintaining code quality.",
        );

        let schema = json!({
            "preSubmitChecks": ["Mandatory checks like linting, build, or formatting."],
            "impactedAreas": ["Parts of the system that might break if these files change."],
            "testingRecommendations": ["Specific tests to run (unit, integration, or manual)."],
            "documentationNeeds": ["Docs needing updates (README, inline comments, tutorials)."],
            "codeQualityTips": ["Repo-specific style tips based on the current code structure."]
        });

        self.generate("PR checklist", &prompt, &schema, params(0.3, 1200))
            .await
    }

    // =========================================================================
    // Shared Plumbing
    // =========================================================================

    /// Run one generation and validate the response against the typed
    /// schema. Every failure collapses to `Insight { operation }`.
    async fn generate<T: DeserializeOwned>(
        &self,
        operation: &str,
        prompt: &str,
        schema: &Value,
        params: GenerationParams,
    ) -> Result<T> {
        let response = self
            .provider
            .generate(prompt, schema, params)
            .await
            .map_err(|e| {
                warn!("{} generation failed: {}", operation, e);
                ContribError::insight(operation)
            })?;

        serde_json::from_value(response.content).map_err(|e| {
            warn!("{} response did not match schema: {}", operation, e);
            ContribError::insight(operation)
        })
    }
}

// =============================================================================
// Prompt Summaries
// =============================================================================

/// Bounded folder/file listing for prompt embedding
fn structure_summary(structure: Option<&StructureTree>) -> String {
    let Some(structure) = structure else {
        return "No structure data.".to_string();
    };

    let dirs: Vec<&str> = structure
        .directories
        .keys()
        .take(limits::MAX_SUMMARY_DIRS)
        .map(String::as_str)
        .collect();
    let files: Vec<&str> = structure
        .files
        .keys()
        .take(limits::MAX_SUMMARY_FILES)
        .map(String::as_str)
        .collect();

    format!("Folders: {}\nFiles: {}", dirs.join(", "), files.join(", "))
}

/// Per-file classes/functions/imports listing for prompt embedding
fn code_summary(code_analysis: &BTreeMap<String, ScanResult>) -> String {
    if code_analysis.is_empty() {
        return "No code analysis data.".to_string();
    }

    let mut summary = String::new();
    for (file, scan) in code_analysis {
        summary.push_str(&format!("File: {}\n", file));
        if !scan.classes.is_empty() {
            summary.push_str(&format!("  Classes: {}\n", scan.classes.join(", ")));
        }
        if !scan.functions.is_empty() {
            summary.push_str(&format!("  Functions: {}\n", scan.functions.join(", ")));
        }
        if !scan.imports.is_empty() {
            summary.push_str(&format!(
                "  Imports: {}\n",
                join_capped(&scan.imports, limits::MAX_SUMMARY_IMPORTS)
            ));
        }
    }

    if summary.is_empty() {
        "Basic file structure identified.".to_string()
    } else {
        summary
    }
}

fn join_capped(items: &[String], cap: usize) -> String {
    items
        .iter()
        .take(cap)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate on a char boundary to at most `max_chars` characters
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

fn params(temperature: f32, max_tokens: usize) -> GenerationParams {
    GenerationParams {
        temperature,
        max_tokens,
    }
}
