//! Analysis Pipeline
//!
//! The state machine that sequences one repository's analysis: host
//! metadata → tree → structure → deep scan → responsiveness → mind map →
//! docs → the three AI artifacts → completion. Stages run in order; any
//! failure aborts the remainder, marks the record failed with the
//! captured message (partial progress stays persisted), and re-raises so
//! the queue's retry policy applies uniformly.
//!
//! The pipeline is the record's sole writer. A per-record async mutex
//! serializes its saves against the on-demand roadmap append, which is
//! the only mutation arriving from outside the main pipeline.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::ai::{InsightGenerator, RepoContext};
use crate::analyzer;
use crate::constants::structure::MAX_SCANNED_FILES;
use crate::github::SharedHost;
use crate::mindmap::{MindMapContext, build_mind_map};
use crate::storage::SharedDatabase;
use crate::types::record::{AnalysisStatus, IssueRoadmapEntry, PrPreparationHelp};
use crate::types::{AnalysisRecord, ContribError, Result};

#[cfg(test)]
pub(crate) mod doubles;

/// Orchestrates pipeline runs and on-demand generation for one deployment
pub struct AnalysisPipeline {
    db: SharedDatabase,
    host: SharedHost,
    insights: InsightGenerator,
    /// Per-record write locks keyed by full name
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AnalysisPipeline {
    pub fn new(db: SharedDatabase, host: SharedHost, insights: InsightGenerator) -> Self {
        Self {
            db,
            host,
            insights,
            locks: DashMap::new(),
        }
    }

    fn record_lock(&self, full_name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(full_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Persist the pipeline's view of the record.
    ///
    /// `issue_roadmaps` is refreshed from storage first: it is the one
    /// field mutated outside this pipeline, and a stale copy here must
    /// not clobber an append that landed mid-run.
    async fn save(&self, record: &mut AnalysisRecord) -> Result<()> {
        let lock = self.record_lock(&record.full_name);
        let _guard = lock.lock().await;
        if let Some(current) = self.db.find_by_id(record.id)? {
            record.issue_roadmaps = current.issue_roadmaps;
        }
        self.db.save_record(record)
    }

    // =========================================================================
    // Main Pipeline
    // =========================================================================

    /// Run the full analysis for an existing record.
    ///
    /// On error the record is marked failed with the error's message and
    /// the error re-raised to the queue.
    pub async fn run(&self, analysis_id: Uuid, owner: &str, name: &str) -> Result<()> {
        match self.execute(analysis_id, owner, name).await {
            Ok(()) => {
                info!("analysis completed: {}/{}", owner, name);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                // Partial progress stays; only status and error change.
                if let Err(save_err) =
                    self.db
                        .update_status(analysis_id, AnalysisStatus::Failed, Some(&message))
                {
                    tracing::error!(
                        "failed to mark analysis {} as failed: {}",
                        analysis_id,
                        save_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, analysis_id: Uuid, owner: &str, name: &str) -> Result<()> {
        let mut record = self
            .db
            .find_by_id(analysis_id)?
            .ok_or_else(|| ContribError::NotFound(format!("Analysis {} not found", analysis_id)))?;

        info!("[1/10] fetching repository info for {}/{}", owner, name);
        let repo = self.host.repo_info(owner, name).await?;
        record.description = repo.description.clone();
        record.stars = repo.stars;
        record.forks = repo.forks;
        record.open_issues = repo.open_issues;
        record.language = repo.primary_language.clone();
        record.languages = repo.languages.clone();
        record.topics = repo.topics.clone();
        self.save(&mut record).await?;

        info!("[2/10] fetching repository tree ({})", repo.default_branch);
        let tree = self
            .host
            .repo_tree(owner, name, &repo.default_branch)
            .await?;
        let structure = analyzer::normalize(&tree);
        record.structure = Some(structure.clone());
        self.save(&mut record).await?;

        info!("[3/10] scanning important files");
        let important: Vec<String> = analyzer::identify_important_files(&structure)
            .into_iter()
            .take(MAX_SCANNED_FILES)
            .collect();
        for path in important {
            let Some(content) = self
                .host
                .file_content(owner, name, &path, &repo.default_branch)
                .await?
            else {
                continue;
            };
            let extension = path.rsplit('.').next().unwrap_or_default();
            let scan = analyzer::scan(&content, extension);
            record.code_analysis.insert(path, scan);
        }
        self.save(&mut record).await?;

        info!("[4/10] fetching maintainer responsiveness");
        let maintainer_stats = self.host.maintainer_stats(owner, name).await?;

        info!("[5/10] building mind map");
        let context = MindMapContext {
            maintainer_stats: Some(maintainer_stats),
            languages: record.languages.clone(),
            open_issues: record.open_issues,
        };
        record.mind_map_data = Some(build_mind_map(&structure, name, &context));
        self.save(&mut record).await?;

        info!("[6/10] fetching README and CONTRIBUTING");
        let (readme, contributing) = tokio::join!(
            self.host.readme(owner, name),
            self.host.contributing(owner, name)
        );
        let readme = readme?;
        let contributing = contributing?;

        let repo_context = Self::repo_context(&record);

        info!("[7/10] generating repository explanation");
        record.ai_insights = Some(
            self.insights
                .explain_repository(&repo_context, readme.as_deref())
                .await?,
        );
        self.save(&mut record).await?;

        info!("[8/10] generating contribution guide");
        record.contribution_guide = Some(
            self.insights
                .contribution_guide(&repo_context, contributing.as_deref(), readme.as_deref())
                .await?,
        );
        self.save(&mut record).await?;

        info!("[9/10] generating PR preparation help");
        record.pr_preparation_help = Some(
            self.insights
                .pr_checklist(&repo_context, "General bug fix or feature")
                .await?,
        );
        self.save(&mut record).await?;

        info!("[10/10] finalizing");
        record.analysis_status = AnalysisStatus::Completed;
        record.analysis_error = None;
        record.last_analyzed_at = Some(chrono::Utc::now());
        self.save(&mut record).await?;

        Ok(())
    }

    /// Insight-facing view of a record's stored facts
    fn repo_context(record: &AnalysisRecord) -> RepoContext {
        let ecosystems = record
            .structure
            .as_ref()
            .map(analyzer::detect_project_types)
            .unwrap_or_default();
        RepoContext {
            name: record.name.clone(),
            description: record.description.clone(),
            languages: record.languages.clone(),
            topics: record.topics.clone(),
            structure: record.structure.clone(),
            code_analysis: record.code_analysis.clone(),
            ecosystems,
        }
    }

    // =========================================================================
    // On-Demand Operations
    // =========================================================================

    /// Roadmap for one issue against a completed record.
    ///
    /// Returns `(entry, cached)`. The cache is the record's append-only
    /// `issueRoadmaps` list; generation happens outside the record lock,
    /// with a second cache check before the append.
    pub async fn issue_roadmap(
        &self,
        owner: &str,
        name: &str,
        issue_number: u64,
    ) -> Result<(IssueRoadmapEntry, bool)> {
        let full_name = format!("{}/{}", owner, name);
        let record = self
            .db
            .find_by_full_name(&full_name)?
            .ok_or_else(|| ContribError::NotFound("Repository not analyzed yet".to_string()))?;

        if let Some(entry) = record.roadmap_for_issue(issue_number) {
            return Ok((entry.clone(), true));
        }

        let issue = self.host.issue(owner, name, issue_number).await?;
        let roadmap = self
            .insights
            .issue_roadmap(&issue, &Self::repo_context(&record))
            .await?;

        let entry = IssueRoadmapEntry {
            issue_number,
            issue_title: issue.title,
            roadmap,
            generated_at: chrono::Utc::now(),
        };

        let lock = self.record_lock(&full_name);
        let _guard = lock.lock().await;
        let mut current = self
            .db
            .find_by_full_name(&full_name)?
            .ok_or_else(|| ContribError::NotFound("Repository not analyzed yet".to_string()))?;

        // A concurrent request may have appended the same issue meanwhile
        if let Some(existing) = current.roadmap_for_issue(issue_number) {
            return Ok((existing.clone(), true));
        }
        current.issue_roadmaps.push(entry.clone());
        self.db.save_record(&current)?;

        Ok((entry, false))
    }

    /// Fresh PR checklist for a caller-supplied change description.
    /// Never cached — recomputed on every call.
    pub async fn pr_checklist(
        &self,
        owner: &str,
        name: &str,
        changes: &str,
    ) -> Result<PrPreparationHelp> {
        let full_name = format!("{}/{}", owner, name);
        let record = self
            .db
            .find_by_full_name(&full_name)?
            .ok_or_else(|| ContribError::NotFound("Repository not analyzed yet".to_string()))?;

        self.insights
            .pr_checklist(&Self::repo_context(&record), changes)
            .await
    }
}
