use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use clap::Parser;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use slidecraft::app::artifact_store::{JsonOutlineBuilder, LocalFsArtifactStore};
use slidecraft::app::model::{GenerationRequest, GenerationStatus};
use slidecraft::app::pipeline::GenerationPipeline;
use slidecraft::app::queue::InProcessQueue;
use slidecraft::app::status_store::InMemoryStatusStore;
use slidecraft::error::{GenerationError, StatusError};
use slidecraft::gemini::GeminiClient;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    #[arg(long, default_value = "slidecraft-data")]
    data_dir: PathBuf,

    /// Maximum generations running at once for `submit`.
    #[arg(long, default_value_t = 4)]
    max_concurrency: usize,
}

#[derive(Clone)]
struct AppState {
    pipeline: GenerationPipeline,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    message: String,
    data: Option<T>,
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), (StatusCode, Json<ApiResponse<()>>)>;

fn ok<T: Serialize>(status: StatusCode, message: &str, data: T) -> ApiResult<T> {
    Ok((
        status,
        Json(ApiResponse {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }),
    ))
}

fn fail(status: StatusCode, message: String) -> (StatusCode, Json<ApiResponse<()>>) {
    (
        status,
        Json(ApiResponse {
            success: false,
            message,
            data: None,
        }),
    )
}

fn generation_failure(err: GenerationError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match &err {
        GenerationError::Invalid(_) => StatusCode::BAD_REQUEST,
        GenerationError::Failed { .. } | GenerationError::Preview { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    fail(status, format!("{:#}", anyhow::Error::new(err)))
}

fn status_failure(err: StatusError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match &err {
        StatusError::NotFound(_) => StatusCode::NOT_FOUND,
        StatusError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    fail(status, format!("{:#}", anyhow::Error::new(err)))
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    slidecraft::logging::init("info")?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting slidecraft-app");

    let gateway = GeminiClient::from_env().context("configure model gateway")?;
    let status_store = InMemoryStatusStore::from_env().context("configure status store")?;
    let artifact_store = LocalFsArtifactStore::new(args.data_dir.clone());
    let presentations_dir = artifact_store.presentations_dir();
    let pipeline = GenerationPipeline::new(
        Arc::new(gateway),
        Arc::new(status_store),
        Arc::new(JsonOutlineBuilder::new(args.data_dir.join("tmp"))),
        Arc::new(artifact_store),
    )
    .with_queue(InProcessQueue::new(args.max_concurrency));

    let app = router(AppState { pipeline }, presentations_dir);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn router(state: AppState, presentations_dir: PathBuf) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/presentations/generate", post(generate_handler))
        .route("/api/presentations/submit", post(submit_handler))
        .route("/api/presentations/outline", post(outline_handler))
        .route("/api/presentations/status", get(list_status_handler))
        .route(
            "/api/presentations/status/:id",
            get(status_handler).delete(delete_status_handler),
        )
        .route("/artifacts/:id", get(download_artifact))
        .nest_service("/presentations", ServeDir::new(presentations_dir))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<String> {
    let artifact = state
        .pipeline
        .generate(&request)
        .await
        .map_err(generation_failure)?;
    ok(
        StatusCode::OK,
        "presentation generated",
        artifact.path.display().to_string(),
    )
}

async fn submit_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<String> {
    let id = state
        .pipeline
        .submit(request)
        .await
        .map_err(generation_failure)?;
    ok(StatusCode::ACCEPTED, "presentation generation started", id)
}

async fn outline_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Vec<slidecraft::formats::SlideOutline>> {
    let slides = state
        .pipeline
        .preview_outline(&request)
        .await
        .map_err(generation_failure)?;
    ok(StatusCode::OK, "outline generated", slides)
}

async fn status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<GenerationStatus> {
    let status = state
        .pipeline
        .status(id.trim())
        .await
        .map_err(status_failure)?;
    ok(StatusCode::OK, "status found", status)
}

async fn delete_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .pipeline
        .delete_status(id.trim())
        .await
        .map_err(status_failure)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_status_handler(
    State(state): State<AppState>,
) -> ApiResult<std::collections::BTreeMap<String, slidecraft::app::model::GenerationRecord>> {
    let records = state
        .pipeline
        .list_all()
        .await
        .map_err(status_failure)?;
    ok(StatusCode::OK, "status snapshot", records)
}

async fn download_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, StatusCode> {
    if uuid::Uuid::parse_str(id.trim()).is_err() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let record = match state.pipeline.record(id.trim()).await {
        Ok(record) => record,
        Err(StatusError::NotFound(_)) => return Err(StatusCode::NOT_FOUND),
        Err(StatusError::Store(_)) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };
    if record.status != GenerationStatus::Completed {
        return Err(StatusCode::CONFLICT);
    }
    let Some(path) = record.artifact_path else {
        return Err(StatusCode::NOT_FOUND);
    };

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let body = axum::body::Body::from_stream(ReaderStream::new(file));

    let mut resp = body.into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"slidecraft-{id}.json\""))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    );
    Ok(resp)
}
