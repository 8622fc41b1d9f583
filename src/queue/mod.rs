//! Analysis Job Queue
//!
//! Decouples the fast analyze endpoint from the slow pipeline run.
//! The broker is hidden behind the [`JobQueue`] trait so the transport
//! can be swapped without touching the orchestrator; the shipped
//! implementation is an in-process tokio channel.
//!
//! Delivery is at-least-once per process lifetime: the worker retries a
//! failed job with exponential backoff and jitter before giving up.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::constants::queue as tuning;
use crate::types::{ContribError, Result};

/// One unit of analysis work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub analysis_id: Uuid,
    pub owner: String,
    pub name: String,
}

/// Broker-agnostic producer interface
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: AnalysisJob) -> Result<()>;
}

/// Retry policy applied uniformly regardless of which stage failed
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: tuning::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(tuning::BASE_DELAY_MS),
            max_delay: Duration::from_secs(tuning::MAX_DELAY_SECS),
            backoff_factor: tuning::BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff with up to 10% random jitter
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let base = self.base_delay.mul_f32(factor).min(self.max_delay);
        let jitter = rand::rng().random_range(0.0..0.1f32);
        base.mul_f32(1.0 + jitter).min(self.max_delay)
    }
}

/// In-process queue over an unbounded channel
#[derive(Clone)]
pub struct InMemoryQueue {
    tx: mpsc::UnboundedSender<AnalysisJob>,
}

impl InMemoryQueue {
    /// Create the queue and its consumer half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AnalysisJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn enqueue(&self, job: AnalysisJob) -> Result<()> {
        info!(
            "enqueuing analysis job for {}/{} ({})",
            job.owner, job.name, job.analysis_id
        );
        self.tx
            .send(job)
            .map_err(|_| ContribError::Queue("queue consumer is gone".to_string()))
    }
}

/// Spawn the consumer loop: one job at a time, retried per policy.
///
/// The handler owns the job's full pipeline run; an error after the final
/// attempt is logged and the job dropped (its record already carries the
/// failure).
pub fn spawn_worker<H, Fut>(
    mut rx: mpsc::UnboundedReceiver<AnalysisJob>,
    policy: RetryPolicy,
    handler: H,
) -> JoinHandle<()>
where
    H: Fn(AnalysisJob) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            run_with_retries(&policy, &handler, job).await;
        }
        info!("analysis worker shutting down: queue closed");
    })
}

async fn run_with_retries<H, Fut>(policy: &RetryPolicy, handler: &H, job: AnalysisJob)
where
    H: Fn(AnalysisJob) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    for attempt in 1..=policy.max_attempts {
        info!(
            "processing analysis {} for {}/{} (attempt {}/{})",
            job.analysis_id, job.owner, job.name, attempt, policy.max_attempts
        );

        match handler(job.clone()).await {
            Ok(()) => {
                info!("completed analysis job {}", job.analysis_id);
                return;
            }
            Err(e) if !e.is_retryable() => {
                error!("analysis job {} failed permanently: {}", job.analysis_id, e);
                return;
            }
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "analysis job {} attempt {} failed: {} (retrying in {:?})",
                    job.analysis_id, attempt, e, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(
                    "analysis job {} failed after {} attempts: {}",
                    job.analysis_id, policy.max_attempts, e
                );
            }
        }
    }
}
