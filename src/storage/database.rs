//! Database Layer with Connection Pooling
//!
//! SQLite persistence for analysis records featuring:
//! - Connection pooling via r2d2 for concurrent access
//! - WAL mode for optimal read/write performance
//! - Whole-record save semantics: the pipeline is the only writer and
//!   serializes writes per record, so updates replace the full row
//!
//! All JSON aggregates round-trip through serde; a row that fails to
//! deserialize surfaces as a storage error rather than a partial record.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::types::record::AnalysisStatus;
use crate::types::{AnalysisRecord, ContribError, Result};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Minimum idle connections to keep ready
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl PoolConfig {
    const MIN_POOL_SIZE: u32 = 4;
    const MAX_POOL_SIZE: u32 = 32;

    /// clamp(cores * 2, MIN, MAX): two connections per core with bounds
    pub fn optimal_pool_size() -> u32 {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        (cores * 2).clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE)
    }

    /// Create config with automatic pool sizing based on CPU cores
    pub fn auto() -> Self {
        let max_size = Self::optimal_pool_size();
        Self {
            max_size,
            min_idle: (max_size / 4).max(2),
            connection_timeout_secs: 30,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// Thread-safe database with connection pooling
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open database with connection pooling at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open database with custom pool configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| ContribError::Storage(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.connection()?.execute_batch(SCHEMA)?;
        Ok(db)
    }

    /// Open an in-memory database for testing or temporary use.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| ContribError::Storage(format!("Failed to create in-memory pool: {}", e)))?;

        let db = Self { pool };
        db.connection()?.execute_batch(SCHEMA)?;
        Ok(db)
    }

    /// Configure a new connection with production-ready settings.
    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    }

    /// Acquire a pooled connection
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Insert a new record. Fails on a duplicate repository URL.
    pub fn insert_record(&self, record: &AnalysisRecord) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO repo_analyses (
                id, repo_url, owner, name, full_name, description,
                stars, forks, open_issues, language, languages, topics,
                structure, code_analysis, mind_map_data, ai_insights,
                contribution_guide, pr_preparation_help, issue_roadmaps,
                analysis_status, analysis_error, last_analyzed_at,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
            )",
            params![
                record.id.to_string(),
                record.repo_url,
                record.owner,
                record.name,
                record.full_name,
                record.description,
                record.stars,
                record.forks,
                record.open_issues,
                record.language,
                to_json(&record.languages)?,
                to_json(&record.topics)?,
                to_json_opt(&record.structure)?,
                to_json(&record.code_analysis)?,
                to_json_opt(&record.mind_map_data)?,
                to_json_opt(&record.ai_insights)?,
                to_json_opt(&record.contribution_guide)?,
                to_json_opt(&record.pr_preparation_help)?,
                to_json(&record.issue_roadmaps)?,
                record.analysis_status.as_str(),
                record.analysis_error,
                record.last_analyzed_at.map(|ts| ts.to_rfc3339()),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Replace every mutable column of an existing record.
    pub fn save_record(&self, record: &AnalysisRecord) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE repo_analyses SET
                description = ?2, stars = ?3, forks = ?4, open_issues = ?5,
                language = ?6, languages = ?7, topics = ?8, structure = ?9,
                code_analysis = ?10, mind_map_data = ?11, ai_insights = ?12,
                contribution_guide = ?13, pr_preparation_help = ?14,
                issue_roadmaps = ?15, analysis_status = ?16,
                analysis_error = ?17, last_analyzed_at = ?18, updated_at = ?19
             WHERE id = ?1",
            params![
                record.id.to_string(),
                record.description,
                record.stars,
                record.forks,
                record.open_issues,
                record.language,
                to_json(&record.languages)?,
                to_json(&record.topics)?,
                to_json_opt(&record.structure)?,
                to_json(&record.code_analysis)?,
                to_json_opt(&record.mind_map_data)?,
                to_json_opt(&record.ai_insights)?,
                to_json_opt(&record.contribution_guide)?,
                to_json_opt(&record.pr_preparation_help)?,
                to_json(&record.issue_roadmaps)?,
                record.analysis_status.as_str(),
                record.analysis_error,
                record.last_analyzed_at.map(|ts| ts.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            return Err(ContribError::NotFound(format!(
                "Analysis {} not found",
                record.id
            )));
        }
        Ok(())
    }

    /// Transition a record's status; sets the error column only on failure
    pub fn update_status(
        &self,
        id: Uuid,
        status: AnalysisStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE repo_analyses
             SET analysis_status = ?2, analysis_error = ?3, updated_at = ?4
             WHERE id = ?1",
            params![
                id.to_string(),
                status.as_str(),
                error,
                Utc::now().to_rfc3339()
            ],
        )?;
        if changed == 0 {
            return Err(ContribError::NotFound(format!("Analysis {} not found", id)));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<AnalysisRecord>> {
        self.find_one("id = ?1", params![id.to_string()])
    }

    pub fn find_by_url(&self, repo_url: &str) -> Result<Option<AnalysisRecord>> {
        self.find_one("repo_url = ?1", params![repo_url])
    }

    pub fn find_by_full_name(&self, full_name: &str) -> Result<Option<AnalysisRecord>> {
        self.find_one("full_name = ?1", params![full_name])
    }

    /// Case-insensitive substring search over name, description, and
    /// topics of completed records.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let conn = self.connection()?;
        let needle = format!("%{}%", query.to_lowercase());

        let mut stmt = conn.prepare(
            "SELECT * FROM repo_analyses
             WHERE analysis_status = 'completed'
               AND (lower(name) LIKE ?1
                    OR lower(coalesce(description, '')) LIKE ?1
                    OR lower(topics) LIKE ?1)
             ORDER BY stars DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![needle, limit as i64], record_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }

    fn find_one(
        &self,
        predicate: &str,
        args: impl rusqlite::Params,
    ) -> Result<Option<AnalysisRecord>> {
        let conn = self.connection()?;
        let sql = format!("SELECT * FROM repo_analyses WHERE {} LIMIT 1", predicate);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(args, record_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row??)),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

type RowResult = std::result::Result<Result<AnalysisRecord>, rusqlite::Error>;

/// Map a full row to a record; JSON/uuid parse failures are deferred into
/// the inner `Result` so query_map keeps rusqlite's error type.
fn record_from_row(row: &Row<'_>) -> RowResult {
    Ok(build_record(row))
}

fn build_record(row: &Row<'_>) -> Result<AnalysisRecord> {
    let id: String = row.get("id")?;
    let status: String = row.get("analysis_status")?;

    Ok(AnalysisRecord {
        id: Uuid::parse_str(&id)
            .map_err(|e| ContribError::Storage(format!("bad record id {}: {}", id, e)))?,
        repo_url: row.get("repo_url")?,
        owner: row.get("owner")?,
        name: row.get("name")?,
        full_name: row.get("full_name")?,
        description: row.get("description")?,
        stars: row.get("stars")?,
        forks: row.get("forks")?,
        open_issues: row.get("open_issues")?,
        language: row.get("language")?,
        languages: from_json(row, "languages")?,
        topics: from_json(row, "topics")?,
        structure: from_json_opt(row, "structure")?,
        code_analysis: from_json(row, "code_analysis")?,
        mind_map_data: from_json_opt(row, "mind_map_data")?,
        ai_insights: from_json_opt(row, "ai_insights")?,
        contribution_guide: from_json_opt(row, "contribution_guide")?,
        pr_preparation_help: from_json_opt(row, "pr_preparation_help")?,
        issue_roadmaps: from_json(row, "issue_roadmaps")?,
        analysis_status: AnalysisStatus::parse(&status)
            .ok_or_else(|| ContribError::Storage(format!("unknown status '{}'", status)))?,
        analysis_error: row.get("analysis_error")?,
        last_analyzed_at: parse_ts_opt(row.get::<_, Option<String>>("last_analyzed_at")?)?,
        created_at: parse_ts(row.get::<_, String>("created_at")?)?,
        updated_at: parse_ts(row.get::<_, String>("updated_at")?)?,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn to_json_opt<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value.as_ref().map(|v| to_json(v)).transpose()
}

fn from_json<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> Result<T> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text)
        .map_err(|e| ContribError::Storage(format!("bad JSON in column {}: {}", column, e)))
}

fn from_json_opt<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> Result<Option<T>> {
    let text: Option<String> = row.get(column)?;
    text.map(|t| {
        serde_json::from_str(&t)
            .map_err(|e| ContribError::Storage(format!("bad JSON in column {}: {}", column, e)))
    })
    .transpose()
}

fn parse_ts(text: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ContribError::Storage(format!("bad timestamp '{}': {}", text, e)))
}

fn parse_ts_opt(text: Option<String>) -> Result<Option<DateTime<Utc>>> {
    text.map(parse_ts).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::{IssueRoadmap, IssueRoadmapEntry};

    fn sample_record() -> AnalysisRecord {
        let mut record =
            AnalysisRecord::new("https://github.com/acme/widgets", "acme", "widgets");
        record.description = Some("A widget factory".into());
        record.stars = 420;
        record.languages = vec!["Rust".into(), "TypeScript".into()];
        record.topics = vec!["widgets".into(), "factory".into()];
        record
    }

    #[test]
    fn test_insert_and_find_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let record = sample_record();
        db.insert_record(&record).unwrap();

        let by_url = db.find_by_url(&record.repo_url).unwrap().unwrap();
        assert_eq!(by_url.id, record.id);
        assert_eq!(by_url.languages, record.languages);
        assert_eq!(by_url.analysis_status, AnalysisStatus::Pending);

        let by_name = db.find_by_full_name("acme/widgets").unwrap().unwrap();
        assert_eq!(by_name.id, record.id);

        assert!(db.find_by_full_name("acme/gadgets").unwrap().is_none());
    }

    #[test]
    fn test_unique_repo_url() {
        let db = Database::open_in_memory().unwrap();
        db.insert_record(&sample_record()).unwrap();
        let duplicate = sample_record();
        assert!(db.insert_record(&duplicate).is_err());
    }

    #[test]
    fn test_save_round_trips_aggregates() {
        let db = Database::open_in_memory().unwrap();
        let mut record = sample_record();
        db.insert_record(&record).unwrap();

        record.analysis_status = AnalysisStatus::Completed;
        record.last_analyzed_at = Some(Utc::now());
        record.issue_roadmaps.push(IssueRoadmapEntry {
            issue_number: 3,
            issue_title: "Leaky widget".into(),
            roadmap: IssueRoadmap {
                steps: vec!["find the leak".into()],
                modules_to_understand: vec![],
                files_to_change: vec![],
                testing_areas: vec![],
                common_mistakes: vec![],
            },
            generated_at: Utc::now(),
        });
        db.save_record(&record).unwrap();

        let loaded = db.find_by_id(record.id).unwrap().unwrap();
        assert_eq!(loaded.analysis_status, AnalysisStatus::Completed);
        assert_eq!(loaded.issue_roadmaps.len(), 1);
        assert_eq!(loaded.issue_roadmaps[0].issue_number, 3);
        assert!(loaded.last_analyzed_at.is_some());
    }

    #[test]
    fn test_update_status_sets_error_on_failure() {
        let db = Database::open_in_memory().unwrap();
        let record = sample_record();
        db.insert_record(&record).unwrap();

        db.update_status(record.id, AnalysisStatus::Failed, Some("tree fetch exploded"))
            .unwrap();
        let loaded = db.find_by_id(record.id).unwrap().unwrap();
        assert_eq!(loaded.analysis_status, AnalysisStatus::Failed);
        assert_eq!(loaded.analysis_error.as_deref(), Some("tree fetch exploded"));
    }

    #[test]
    fn test_search_matches_completed_only() {
        let db = Database::open_in_memory().unwrap();

        let mut completed = sample_record();
        completed.analysis_status = AnalysisStatus::Completed;
        db.insert_record(&completed).unwrap();

        let mut processing = AnalysisRecord::new(
            "https://github.com/acme/widgets-two",
            "acme",
            "widgets-two",
        );
        processing.analysis_status = AnalysisStatus::Processing;
        db.insert_record(&processing).unwrap();

        let hits = db.search("WIDGET", 20).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "widgets");

        // Topic match
        let topic_hits = db.search("factory", 20).unwrap();
        assert_eq!(topic_hits.len(), 1);

        assert!(db.search("nonexistent", 20).unwrap().is_empty());
    }

    #[test]
    fn test_save_unknown_record_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let record = sample_record();
        assert!(matches!(
            db.save_record(&record),
            Err(ContribError::NotFound(_))
        ));
    }
}
