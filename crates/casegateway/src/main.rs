use actix_cors::Cors;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult};
use actix_ws::Message;
use caseruntime::{PipelineRuntime, RuntimeConfig, TaskRegistry};
use casetasks::{standard_stages, EnvParameterStore, InMemoryCommandChannel, TaskDeps};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Application state shared across handlers
struct AppState {
    runtime: Arc<PipelineRuntime>,
    pipeline: String,
}

/// Explicit gateway configuration; nothing is read from ambient state
/// after startup.
#[derive(Debug, Clone)]
struct GatewayConfig {
    bind_address: String,
    task_timeout: Duration,
}

impl GatewayConfig {
    fn from_env() -> Self {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let task_timeout = std::env::var("TASK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));
        Self {
            bind_address,
            task_timeout,
        }
    }
}

/// Response when a run is accepted
#[derive(Debug, Serialize)]
struct TriggerResponse {
    run_id: Uuid,
    message: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Pull the trigger payload out of a request body. A JSON object may
/// wrap the payload under an "event" key; any other body is the event
/// itself, passed through opaque and unchanged.
fn extract_event(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) if map.contains_key("event") => {
            map.remove("event").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "casegateway"
    }))
}

/// Trigger a run of the configured pipeline.
///
/// This is a synchronous accept/reject boundary only: 202 means the run
/// was scheduled, not that it completed. Outcomes are observable via
/// the run status endpoint and the event feed.
#[post("/api/trigger")]
async fn trigger_run(
    data: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> ActixResult<impl Responder> {
    let event = extract_event(body.into_inner());

    match data.runtime.trigger(&data.pipeline, event).await {
        Ok(run_id) => {
            info!(%run_id, pipeline = %data.pipeline, "Run accepted");
            Ok(HttpResponse::Accepted().json(TriggerResponse {
                run_id,
                message: "Run started".to_string(),
            }))
        }
        Err(e) => {
            error!(pipeline = %data.pipeline, error = %e, "Run rejected");
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            }))
        }
    }
}

/// Look up a run by id
#[get("/api/runs/{id}")]
async fn get_run(data: web::Data<AppState>, path: web::Path<Uuid>) -> ActixResult<impl Responder> {
    let run_id = path.into_inner();

    match data.runtime.run_status(run_id).await {
        Some(run) => Ok(HttpResponse::Ok().json(run)),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Run {} not found", run_id),
        })),
    }
}

/// List registered task names
#[get("/api/tasks")]
async fn list_tasks(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    Ok(HttpResponse::Ok().json(data.runtime.registry().task_names()))
}

/// WebSocket endpoint streaming run events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = GatewayConfig::from_env();
    info!("Starting caseflow trigger gateway");

    // Worker transport is an external collaborator; the in-process
    // channel here acknowledges commands locally until one is wired in.
    let deps = TaskDeps::new(
        Arc::new(InMemoryCommandChannel::new()),
        Arc::new(EnvParameterStore),
    );

    let mut registry = TaskRegistry::new();
    casetasks::register_all(&mut registry, &deps, config.task_timeout)?;

    let runtime = PipelineRuntime::with_registry(Arc::new(registry), RuntimeConfig::default());
    runtime
        .register_pipeline(casetasks::STANDARD_PIPELINE, &standard_stages())
        .await?;

    info!(
        pipeline = casetasks::STANDARD_PIPELINE,
        "Runtime initialized with standard tasks"
    );

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
        pipeline: casetasks::STANDARD_PIPELINE.to_string(),
    });

    info!("Gateway listening on http://{}", config.bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(trigger_run)
            .service(get_run)
            .service(list_tasks)
            .service(websocket_events)
    })
    .bind(&config.bind_address)?
    .run()
    .await?;

    Ok(())
}
