//! HTTP Surface
//!
//! hyper-based JSON API. Every response uses the
//! `{success, data | message}` envelope; input errors map to 400,
//! missing records to 404, everything else to 500.
//!
//! Routing is a plain `(method, path-segments)` match — the surface is
//! small enough that a framework would outweigh it.

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::ai::{InsightGenerator, create_provider};
use crate::config::Config;
use crate::constants::server as limits;
use crate::github::{GithubClient, SharedHost, parse_repo_url};
use crate::pipeline::AnalysisPipeline;
use crate::queue::{AnalysisJob, InMemoryQueue, JobQueue, RetryPolicy, spawn_worker};
use crate::storage::{Database, SharedDatabase};
use crate::types::record::AnalysisStatus;
use crate::types::{AnalysisRecord, ContribError, Result};

/// Everything a request handler can reach
pub struct AppState {
    pub db: SharedDatabase,
    pub host: SharedHost,
    pub pipeline: Arc<AnalysisPipeline>,
    pub queue: Arc<dyn JobQueue>,
}

// =============================================================================
// Process Wiring
// =============================================================================

/// Build every component from config, start the worker, and serve until
/// ctrl-c. Components are constructed here and passed down — no process
/// globals.
pub async fn run(config: Config) -> Result<()> {
    let db: SharedDatabase = Arc::new(Database::open(&config.storage.db_path)?);

    let token = config
        .github
        .token
        .clone()
        .or_else(|| std::env::var("GITHUB_TOKEN").ok());
    let host: SharedHost = Arc::new(GithubClient::new(
        config.github.api_base.clone(),
        token,
        config.github.timeout_secs,
    )?);

    let provider = create_provider(&config.llm)?;
    let insights = InsightGenerator::new(provider);
    let pipeline = Arc::new(AnalysisPipeline::new(db.clone(), host.clone(), insights));

    let (queue, rx) = InMemoryQueue::channel();
    let policy = RetryPolicy {
        max_attempts: config.queue.max_attempts,
        base_delay: Duration::from_millis(config.queue.base_delay_ms),
        ..RetryPolicy::default()
    };
    let worker_pipeline = pipeline.clone();
    let worker = spawn_worker(rx, policy, move |job: AnalysisJob| {
        let pipeline = worker_pipeline.clone();
        async move { pipeline.run(job.analysis_id, &job.owner, &job.name).await }
    });

    let state = Arc::new(AppState {
        db,
        host,
        pipeline,
        queue: Arc::new(queue),
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ContribError::Config(format!("invalid bind address: {}", e)))?;

    serve(addr, state).await?;

    // Dropping the state closes the queue; let the worker drain.
    let _ = worker.await;
    Ok(())
}

/// Serve the API on the given address until ctrl-c
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let make_service = make_service_fn(move |_| {
        let state = Arc::clone(&state);
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(route(state, req).await) }
            }))
        }
    });

    let server = Server::try_bind(&addr)
        .map_err(|e| ContribError::Config(format!("failed to bind {}: {}", addr, e)))?
        .serve(make_service)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        });

    info!("listening on http://{}", addr);
    server
        .await
        .map_err(|e| ContribError::Config(format!("server error: {}", e)))
}

// =============================================================================
// Routing
// =============================================================================

/// Dispatch one request; never fails, errors become envelope responses
pub async fn route(state: Arc<AppState>, req: Request<Body>) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (&method, segments.as_slice()) {
        (&Method::POST, ["repos", "analyze"]) => analyze(&state, req).await,
        (&Method::GET, ["repos", "analysis", id, "status"]) => analysis_status(&state, id),
        (&Method::GET, ["repos", "search"]) => search(&state, req.uri().query()),
        (&Method::GET, ["repos", owner, name, "issues", "beginner"]) => {
            beginner_issues(&state, owner, name).await
        }
        (&Method::GET, ["repos", owner, name]) => repo_analysis(&state, owner, name),
        (&Method::GET, ["analysis", owner, name, "mindmap"]) => mindmap(&state, owner, name),
        (&Method::GET, ["analysis", owner, name, "insights"]) => insights(&state, owner, name),
        (&Method::GET, ["analysis", owner, name, "issues", number, "roadmap"]) => {
            issue_roadmap(&state, owner, name, number).await
        }
        (&Method::POST, ["analysis", owner, name, "pr-checklist"]) => {
            let owner = owner.to_string();
            let name = name.to_string();
            pr_checklist(&state, &owner, &name, req).await
        }
        (&Method::GET, ["health"]) => health(),
        _ => Err(ContribError::NotFound("Route not found".to_string())),
    };

    result.unwrap_or_else(|err| error_response(&err))
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /repos/analyze — create or reuse a record and enqueue the job
async fn analyze(state: &AppState, req: Request<Body>) -> Result<Response<Body>> {
    let body = read_json(req).await?;
    let repo_url = body
        .get("repoUrl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ContribError::MissingField("Repository URL is required".to_string()))?;

    let (owner, name) = parse_repo_url(repo_url)?;
    let existing = state.db.find_by_url(repo_url)?;

    if let Some(record) = &existing {
        match record.analysis_status {
            AnalysisStatus::Completed => {
                return json_response(
                    StatusCode::OK,
                    json!({
                        "success": true,
                        "message": "Repository already analyzed",
                        "data": record,
                        "cached": true,
                    }),
                );
            }
            // Known duplicate-enqueue race: a record already in flight is
            // not queued again.
            AnalysisStatus::Processing => {
                return json_response(
                    StatusCode::OK,
                    json!({
                        "success": true,
                        "message": "Analysis already in progress",
                        "data": { "analysisId": record.id, "status": "processing" },
                    }),
                );
            }
            AnalysisStatus::Pending | AnalysisStatus::Failed => {}
        }
    }

    let record = match existing {
        Some(mut record) => {
            record.analysis_status = AnalysisStatus::Processing;
            state
                .db
                .update_status(record.id, AnalysisStatus::Processing, None)?;
            record
        }
        None => {
            let mut record = AnalysisRecord::new(repo_url, owner.clone(), name.clone());
            record.analysis_status = AnalysisStatus::Processing;
            state.db.insert_record(&record)?;
            record
        }
    };

    state
        .queue
        .enqueue(AnalysisJob {
            analysis_id: record.id,
            owner,
            name,
        })
        .await?;

    json_response(
        StatusCode::OK,
        json!({
            "success": true,
            "message": "Analysis queued successfully",
            "data": { "analysisId": record.id, "status": "processing" },
        }),
    )
}

/// GET /repos/analysis/:id/status
fn analysis_status(state: &AppState, id: &str) -> Result<Response<Body>> {
    let id = Uuid::parse_str(id)
        .map_err(|_| ContribError::NotFound("Analysis not found".to_string()))?;
    let record = state
        .db
        .find_by_id(id)?
        .ok_or_else(|| ContribError::NotFound("Analysis not found".to_string()))?;

    ok_data(json!({
        "status": record.analysis_status,
        "error": record.analysis_error,
        "lastAnalyzedAt": record.last_analyzed_at,
    }))
}

/// GET /repos/:owner/:name — the full analysis record
fn repo_analysis(state: &AppState, owner: &str, name: &str) -> Result<Response<Body>> {
    let record = find_analyzed(state, owner, name)?;
    ok_data(serde_json::to_value(&record)?)
}

/// GET /repos/:owner/:name/issues/beginner
async fn beginner_issues(state: &AppState, owner: &str, name: &str) -> Result<Response<Body>> {
    let issues = state.host.beginner_issues(owner, name).await?;
    ok_data(Value::Array(issues))
}

/// GET /repos/search?query=
fn search(state: &AppState, raw_query: Option<&str>) -> Result<Response<Body>> {
    let query = raw_query
        .map(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .find(|(key, _)| key == "query")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default()
        })
        .unwrap_or_default();

    if query.is_empty() {
        return Err(ContribError::MissingField(
            "Search query is required".to_string(),
        ));
    }

    let records = state.db.search(&query, limits::SEARCH_LIMIT)?;
    ok_data(serde_json::to_value(&records)?)
}

/// GET /analysis/:owner/:name/mindmap
fn mindmap(state: &AppState, owner: &str, name: &str) -> Result<Response<Body>> {
    let record = find_analyzed(state, owner, name)?;
    ok_data(serde_json::to_value(&record.mind_map_data)?)
}

/// GET /analysis/:owner/:name/insights
fn insights(state: &AppState, owner: &str, name: &str) -> Result<Response<Body>> {
    let record = find_analyzed(state, owner, name)?;
    ok_data(json!({
        "aiInsights": record.ai_insights,
        "contributionGuide": record.contribution_guide,
    }))
}

/// GET /analysis/:owner/:name/issues/:number/roadmap
async fn issue_roadmap(
    state: &AppState,
    owner: &str,
    name: &str,
    number: &str,
) -> Result<Response<Body>> {
    let number: u64 = number
        .parse()
        .map_err(|_| ContribError::NotFound("Issue not found".to_string()))?;

    let (entry, cached) = state.pipeline.issue_roadmap(owner, name, number).await?;
    json_response(
        StatusCode::OK,
        json!({
            "success": true,
            "data": entry,
            "cached": cached,
        }),
    )
}

/// POST /analysis/:owner/:name/pr-checklist
async fn pr_checklist(
    state: &AppState,
    owner: &str,
    name: &str,
    req: Request<Body>,
) -> Result<Response<Body>> {
    let body = read_json(req).await?;
    let changes = body
        .get("changes")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            ContribError::MissingField("Changes description is required".to_string())
        })?;

    let checklist = state.pipeline.pr_checklist(owner, name, changes).await?;
    ok_data(serde_json::to_value(&checklist)?)
}

/// GET /health
fn health() -> Result<Response<Body>> {
    json_response(
        StatusCode::OK,
        json!({
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }),
    )
}

// =============================================================================
// Helpers
// =============================================================================

fn find_analyzed(state: &AppState, owner: &str, name: &str) -> Result<AnalysisRecord> {
    state
        .db
        .find_by_full_name(&format!("{}/{}", owner, name))?
        .ok_or_else(|| ContribError::NotFound("Repository not analyzed yet".to_string()))
}

/// Read and parse a JSON request body, bounded by the body size limit
async fn read_json(req: Request<Body>) -> Result<Value> {
    let bytes = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|e| ContribError::MissingField(format!("unreadable request body: {}", e)))?;
    if bytes.len() > limits::MAX_BODY_BYTES {
        return Err(ContribError::MissingField(
            "request body too large".to_string(),
        ));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ContribError::MissingField(format!("invalid JSON body: {}", e)))
}

fn ok_data(data: Value) -> Result<Response<Body>> {
    json_response(StatusCode::OK, json!({ "success": true, "data": data }))
}

fn json_response(status: StatusCode, value: Value) -> Result<Response<Body>> {
    let body = serde_json::to_vec(&value)?;
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .map_err(|e| ContribError::Config(format!("failed to build response: {}", e)))
}

fn error_response(err: &ContribError) -> Response<Body> {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("request failed: {}", err);
    }
    let body = json!({ "success": false, "message": err.to_string() });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::from("internal error")))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::doubles::{StubHost, StubProvider};

    fn test_state() -> (Arc<AppState>, tokio::task::JoinHandle<()>) {
        let db: SharedDatabase = Arc::new(Database::open_in_memory().unwrap());
        let host: SharedHost = Arc::new(StubHost::healthy());
        let insights = InsightGenerator::new(Arc::new(StubProvider::ok()));
        let pipeline = Arc::new(AnalysisPipeline::new(db.clone(), host.clone(), insights));

        let (queue, rx) = InMemoryQueue::channel();
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let worker_pipeline = pipeline.clone();
        let worker = spawn_worker(rx, policy, move |job: AnalysisJob| {
            let pipeline = worker_pipeline.clone();
            async move { pipeline.run(job.analysis_id, &job.owner, &job.name).await }
        });

        let state = Arc::new(AppState {
            db,
            host,
            pipeline,
            queue: Arc::new(queue),
        });
        (state, worker)
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        builder = builder.header("Content-Type", "application/json");
        let request = builder
            .body(match body {
                Some(value) => Body::from(value.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = route(state.clone(), request).await;
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn poll_until_completed(state: &Arc<AppState>, analysis_id: &str) -> Value {
        for _ in 0..100 {
            let (status, body) = send(
                state,
                Method::GET,
                &format!("/repos/analysis/{}/status", analysis_id),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            if body["data"]["status"] == "completed" || body["data"]["status"] == "failed" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("analysis never reached a terminal state");
    }

    #[tokio::test]
    async fn test_analyze_scenario_end_to_end() {
        let (state, _worker) = test_state();

        let (status, body) = send(
            &state,
            Method::POST,
            "/repos/analyze",
            Some(json!({"repoUrl": "https://github.com/acme/widgets"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "processing");
        let analysis_id = body["data"]["analysisId"].as_str().unwrap().to_string();

        let final_status = poll_until_completed(&state, &analysis_id).await;
        assert_eq!(final_status["data"]["status"], "completed");

        let (status, body) = send(&state, Method::GET, "/repos/acme/widgets", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["data"]["structure"].is_null());
        assert!(!body["data"]["aiInsights"].is_null());
        assert!(!body["data"]["mindMapData"].is_null());
    }

    #[tokio::test]
    async fn test_reanalyze_completed_returns_cached() {
        let (state, _worker) = test_state();

        let (_, body) = send(
            &state,
            Method::POST,
            "/repos/analyze",
            Some(json!({"repoUrl": "https://github.com/acme/widgets"})),
        )
        .await;
        let analysis_id = body["data"]["analysisId"].as_str().unwrap().to_string();
        poll_until_completed(&state, &analysis_id).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/repos/analyze",
            Some(json!({"repoUrl": "https://github.com/acme/widgets"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cached"], true);
        assert_eq!(body["data"]["fullName"], "acme/widgets");
    }

    #[tokio::test]
    async fn test_analyze_missing_url_is_400() {
        let (state, _worker) = test_state();
        let (status, body) = send(&state, Method::POST, "/repos/analyze", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_analyze_invalid_url_is_400() {
        let (state, _worker) = test_state();
        let (status, _) = send(
            &state,
            Method::POST,
            "/repos/analyze",
            Some(json!({"repoUrl": "https://example.com/not/github"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_record_is_404() {
        let (state, _worker) = test_state();
        let (status, body) = send(&state, Method::GET, "/repos/ghost/repo", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Repository not analyzed yet");

        let (status, _) = send(
            &state,
            Method::GET,
            &format!("/repos/analysis/{}/status", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (state, _worker) = test_state();
        let (status, body) = send(&state, Method::GET, "/nope/nothing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_roadmap_cached_flag() {
        let (state, _worker) = test_state();
        let (_, body) = send(
            &state,
            Method::POST,
            "/repos/analyze",
            Some(json!({"repoUrl": "https://github.com/acme/widgets"})),
        )
        .await;
        let analysis_id = body["data"]["analysisId"].as_str().unwrap().to_string();
        poll_until_completed(&state, &analysis_id).await;

        let (status, first) = send(
            &state,
            Method::GET,
            "/analysis/acme/widgets/issues/7/roadmap",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["cached"], false);

        let (_, second) = send(
            &state,
            Method::GET,
            "/analysis/acme/widgets/issues/7/roadmap",
            None,
        )
        .await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["data"]["issueNumber"], 7);
    }

    #[tokio::test]
    async fn test_pr_checklist_requires_changes() {
        let (state, _worker) = test_state();
        let (_, body) = send(
            &state,
            Method::POST,
            "/repos/analyze",
            Some(json!({"repoUrl": "https://github.com/acme/widgets"})),
        )
        .await;
        let analysis_id = body["data"]["analysisId"].as_str().unwrap().to_string();
        poll_until_completed(&state, &analysis_id).await;

        let (status, _) = send(
            &state,
            Method::POST,
            "/analysis/acme/widgets/pr-checklist",
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            Method::POST,
            "/analysis/acme/widgets/pr-checklist",
            Some(json!({"changes": "Swap the spinner"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["preSubmitChecks"].is_array());
    }

    #[tokio::test]
    async fn test_insights_and_mindmap_endpoints() {
        let (state, _worker) = test_state();
        let (_, body) = send(
            &state,
            Method::POST,
            "/repos/analyze",
            Some(json!({"repoUrl": "https://github.com/acme/widgets"})),
        )
        .await;
        let analysis_id = body["data"]["analysisId"].as_str().unwrap().to_string();
        poll_until_completed(&state, &analysis_id).await;

        let (status, body) = send(&state, Method::GET, "/analysis/acme/widgets/insights", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["data"]["aiInsights"].is_null());
        assert!(!body["data"]["contributionGuide"].is_null());

        let (status, body) = send(&state, Method::GET, "/analysis/acme/widgets/mindmap", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            body["data"]["mermaidCode"]
                .as_str()
                .unwrap()
                .contains("flowchart TD")
        );
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let (state, _worker) = test_state();
        let (_, body) = send(
            &state,
            Method::POST,
            "/repos/analyze",
            Some(json!({"repoUrl": "https://github.com/acme/widgets"})),
        )
        .await;
        let analysis_id = body["data"]["analysisId"].as_str().unwrap().to_string();
        poll_until_completed(&state, &analysis_id).await;

        let (status, body) = send(&state, Method::GET, "/repos/search?query=widget", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = send(&state, Method::GET, "/repos/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_beginner_issues_endpoint() {
        let (state, _worker) = test_state();
        let (status, body) = send(
            &state,
            Method::GET,
            "/repos/acme/widgets/issues/beginner",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["number"], 7);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _worker) = test_state();
        let (status, body) = send(&state, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
