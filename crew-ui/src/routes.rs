//! HTTP route handlers for the form and the JSON API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use crew::agents::roster::roster;
use crew::agents::{ModelSlot, Stage};
use crew::core::types::{IterationBound, Requirement};
use crew::pipeline::{PipelineOutcome, run_pipeline};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::render::PageBody;
use crate::sse;
use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/run", post(run_form))
        .nest("/api", api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state)
}

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .route("/run", post(run_api))
}

#[derive(Debug, Deserialize)]
struct RunForm {
    #[serde(default)]
    requirement: String,
    #[serde(default = "default_iterations")]
    max_iterations: u32,
}

fn default_iterations() -> u32 {
    IterationBound::default().get()
}

async fn health() -> &'static str {
    "ok"
}

/// GET / - empty form.
async fn index(State(state): State<AppState>) -> Response {
    page(&state, "", default_iterations(), PageBody::Empty, StatusCode::OK)
}

/// POST /run - run the pipeline from the form and render the result.
async fn run_form(State(state): State<AppState>, Form(form): Form<RunForm>) -> Response {
    let input = Requirement::new(form.requirement.clone())
        .and_then(|requirement| Ok((requirement, IterationBound::new(form.max_iterations)?)));
    let (requirement, bound) = match input {
        Ok(input) => input,
        Err(err) => {
            let warning = err.to_string();
            return page(
                &state,
                &form.requirement,
                form.max_iterations,
                PageBody::Warning(&warning),
                StatusCode::OK,
            );
        }
    };

    match execute(&state, requirement, bound).await {
        Ok(outcome) => page(
            &state,
            &form.requirement,
            form.max_iterations,
            PageBody::Result(&outcome.result),
            StatusCode::OK,
        ),
        Err(err) => {
            let message = format!("{err:#}");
            page(
                &state,
                &form.requirement,
                form.max_iterations,
                PageBody::Error(&message),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

/// POST /api/run - run the pipeline and return the outcome as JSON.
async fn run_api(State(state): State<AppState>, Json(body): Json<RunForm>) -> Response {
    let input = Requirement::new(body.requirement)
        .and_then(|requirement| Ok((requirement, IterationBound::new(body.max_iterations)?)));
    let (requirement, bound) = match input {
        Ok(input) => input,
        Err(err) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response();
        }
    };

    match execute(&state, requirement, bound).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("{err:#}") })),
        )
            .into_response(),
    }
}

#[derive(Serialize)]
struct AgentEntry {
    stage: Stage,
    role: &'static str,
    goal: &'static str,
    model_slot: ModelSlot,
    model: String,
}

/// GET /api/agents - roster with the configured model per agent.
async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentEntry>> {
    let agents = roster()
        .into_iter()
        .map(|agent| AgentEntry {
            stage: agent.stage,
            role: agent.role,
            goal: agent.goal,
            model_slot: agent.model,
            model: state.config.model(agent.model).name.clone(),
        })
        .collect();
    Json(agents)
}

/// Run the pipeline on a blocking thread, broadcasting progress to SSE clients.
async fn execute(
    state: &AppState,
    requirement: Requirement,
    bound: IterationBound,
) -> anyhow::Result<PipelineOutcome> {
    let config = state.config.clone();
    let executor = state.executor.clone();
    let event_tx = state.event_tx.clone();
    info!(max_iterations = bound.get(), "pipeline requested");

    let outcome = tokio::task::spawn_blocking(move || {
        run_pipeline(executor.as_ref(), &config, &requirement, bound, |event| {
            // No subscribers is fine.
            let _ = event_tx.send(event.clone());
        })
    })
    .await?;

    if let Err(err) = &outcome {
        error!(error = %format!("{err:#}"), "pipeline failed");
    }
    outcome
}

fn page(
    state: &AppState,
    requirement: &str,
    max_iterations: u32,
    body: PageBody<'_>,
    status: StatusCode,
) -> Response {
    match state
        .pages
        .index(&state.config.language, requirement, max_iterations, body)
    {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            error!(error = %format!("{err:#}"), "page render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "page render failed").into_response()
        }
    }
}
