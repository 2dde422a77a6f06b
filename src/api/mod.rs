mod error;
mod validation;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::{PolicyTables, SimulationInput, SimulationResult, run_simulation};

pub use error::AppError;
pub use validation::{InputError, InputErrors, MAX_AGE, MAX_TRIALS, validate_input};

#[derive(Parser, Debug)]
#[command(
    name = "lifeplan",
    about = "Household cash-flow and asset projection (three scenarios + Monte Carlo)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level for lifeplan; RUST_LOG overrides it"
    )]
    pub log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation from a JSON input file and print the result.
    Run(RunArgs),
    /// Print the built-in sample household as JSON.
    Defaults,
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, help = "SimulationInput JSON; missing fields take the sample values")]
    input: PathBuf,
    #[arg(long, help = "PolicyTables JSON; defaults to the built-in tax regime")]
    policy: Option<PathBuf>,
    #[arg(long, help = "Override scenario.monteCarloTrials (0 disables Monte Carlo)")]
    trials: Option<u32>,
    #[arg(long, help = "Override scenario.seed")]
    seed: Option<u64>,
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long)]
    policy: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    policy: Arc<PolicyTables>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    problems: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lifeplan={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Run(args) => {
            let output = run_from_files(&args)?;
            println!("{output}");
        }
        Command::Defaults => {
            let json = serde_json::to_string_pretty(&SimulationInput::default())
                .map_err(AppError::Serialize)?;
            println!("{json}");
        }
        Command::Serve(args) => {
            let policy = load_policy(args.policy.as_deref())?;
            run_http_server(args.port, policy)
                .await
                .map_err(AppError::Server)?;
        }
    }
    Ok(())
}

fn run_from_files(args: &RunArgs) -> Result<String, AppError> {
    let mut input: SimulationInput = read_json(&args.input)?;
    if let Some(trials) = args.trials {
        input.scenario.monte_carlo_trials = trials;
    }
    if let Some(seed) = args.seed {
        input.scenario.seed = seed;
    }
    validate_input(&input)?;
    let policy = load_policy(args.policy.as_deref())?;

    info!(
        current_age = input.household.current_age,
        end_age = input.household.end_age,
        trials = input.scenario.monte_carlo_trials,
        "running simulation"
    );
    let result = run_simulation(&input, &policy);
    log_summary(&result);

    if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .map_err(AppError::Serialize)
}

pub fn load_input(path: &Path) -> Result<SimulationInput, AppError> {
    let input = read_json(path)?;
    validate_input(&input)?;
    Ok(input)
}

/// Policy tables from `path`, or the built-in regime when no file is given.
pub fn load_policy(path: Option<&Path>) -> Result<PolicyTables, AppError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(PolicyTables::default()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let text = fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AppError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn log_summary(result: &SimulationResult) {
    for scenario in [&result.optimistic, &result.standard, &result.pessimistic] {
        info!(
            scenario = ?scenario.kind,
            final_assets = scenario.final_assets,
            insolvency_age = ?scenario.insolvency_age,
            "scenario summary"
        );
    }
    if let Some(mc) = &result.monte_carlo {
        info!(success_rate = mc.success_rate, trials = mc.trials, "monte carlo summary");
    }
}

pub async fn run_http_server(port: u16, policy: PolicyTables) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "lifeplan HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, router(policy)).await
}

fn router(policy: PolicyTables) -> Router {
    Router::new()
        .route("/api/simulate", post(simulate_handler))
        .route("/api/defaults", get(defaults_handler))
        .route("/api/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(AppState {
            policy: Arc::new(policy),
        })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn defaults_handler() -> Response {
    json_response(StatusCode::OK, SimulationInput::default())
}

async fn simulate_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulationInput>, JsonRejection>,
) -> Response {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected simulate payload");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid JSON payload: {}", rejection.body_text()),
            );
        }
    };
    if let Err(errors) = validate_input(&input) {
        warn!(problems = errors.0.len(), "invalid simulation input");
        return invalid_input_response(&errors);
    }

    let policy = Arc::clone(&state.policy);
    match tokio::task::spawn_blocking(move || run_simulation(&input, &policy)).await {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => {
            error!(%err, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            problems: Vec::new(),
        },
    )
}

fn invalid_input_response(errors: &InputErrors) -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        ErrorResponse {
            error: "Invalid simulation input".to_string(),
            problems: errors.problems(),
        },
    )
}

#[cfg(test)]
fn input_from_json(json: &str) -> Result<SimulationInput, String> {
    let input = serde_json::from_str::<SimulationInput>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    validate_input(&input).map_err(|e| e.to_string())?;
    Ok(input)
}
