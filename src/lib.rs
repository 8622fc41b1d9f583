//! ContribMap - Contribution Starter Kits for GitHub Repositories
//!
//! An HTTP service that turns a public repository URL into everything a
//! new contributor needs: a normalized structure breakdown, a heuristic
//! code scan, a Mermaid contribution roadmap, and four AI-generated
//! artifacts (architecture overview, contribution guide, per-issue
//! roadmap, pre-PR checklist).
//!
//! ## Architecture
//!
//! The analyze endpoint persists a record and enqueues a job; a worker
//! runs the [`pipeline::AnalysisPipeline`] — host metadata, recursive
//! tree, structure normalization, deep file scan, responsiveness stats,
//! mind map, then three LLM calls — persisting partial progress after
//! every stage. Clients poll status and fetch sub-resources once the
//! record completes.
//!
//! ## Modules
//!
//! - [`analyzer`]: structure normalization and regex-based code scanning
//! - [`mindmap`]: fixed-topology Mermaid roadmap synthesis
//! - [`ai`]: LLM provider abstraction and the four insight operations
//! - [`github`]: repository host trait + GitHub client
//! - [`pipeline`]: the analysis state machine
//! - [`queue`]: broker-agnostic job queue with retry/backoff
//! - [`storage`]: SQLite persistence with connection pooling
//! - [`server`]: hyper HTTP surface

pub mod ai;
pub mod analyzer;
pub mod config;
pub mod constants;
pub mod github;
pub mod mindmap;
pub mod pipeline;
pub mod queue;
pub mod server;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{ContribError, Result};

// Storage
pub use storage::{Database, SharedDatabase};

// Pipeline
pub use pipeline::AnalysisPipeline;

// AI
pub use ai::{GroqProvider, InsightGenerator, LlmProvider, LlmResponse, SharedProvider};

// Host
pub use github::{GithubClient, RepoHost, SharedHost, parse_repo_url};
