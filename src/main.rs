use actix_web::{App, HttpServer, web};
use clap::Parser;
use sqlx::{Pool, Postgres};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, filter::LevelFilter};

mod agent;
mod analytics;
mod api;
mod approval;
mod artifacts;
mod browser;
mod cli;
mod config;
mod db;
mod domain;
mod error;
mod oracle;
mod queue;
mod shutdown;
#[cfg(test)]
mod testing;
mod worker;
mod workflow;

use crate::agent::{ActionLoop, SubmissionController};
use crate::analytics::{AnalyticsSink, JsonlAnalytics};
use crate::api::{job::JobService, validation, AppState};
use crate::approval::{ApprovalGate, PgApprovalStore};
use crate::artifacts::ArtifactWriter;
use crate::browser::{ChromeFactory, DriverFactory};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::db::{PgStore, Store};
use crate::domain::UserProfile;
use crate::oracle::{DecisionOracle, OpenAiOracle};
use crate::queue::{ApplyQueue, PgStageQueue, RawJobQueue, APPLY, RAW_JOBS};
use crate::shutdown::ShutdownCoordinator;
use crate::worker::{ApplyWorker, IntakeWorker, StagePermits};
use crate::workflow::{FitWorkflow, IntakePipeline};

/// Log a start-up failure and turn it into the binary's error type.
fn fatal(step: &str, err: impl Display) -> std::io::Error {
    error!("Failed to {}: {}", step, err);
    std::io::Error::other(format!("failed to {step}: {err}"))
}

/// Console output plus one daily-rotated file per level under `log_dir`,
/// e.g. logs/info.log.2024-12-22, logs/error.log.2024-12-22.
fn init_tracing(log_dir: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::daily(log_dir, "info.log"))
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let warn_layer = tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::daily(log_dir, "warn.log"))
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::daily(log_dir, "error.log"))
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let debug_layer = tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::daily(log_dir, "debug.log"))
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .with(debug_layer)
        .init();
}

/// Postgres-backed collaborators shared by the server, the workers and the
/// one-shot commands.
fn build_state(config: &Config, pool: &Pool<Postgres>) -> AppState {
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    let raw_jobs = RawJobQueue::new(Arc::new(PgStageQueue::new(pool.clone(), RAW_JOBS, config.queue_poll)));
    let apply = ApplyQueue::new(Arc::new(PgStageQueue::new(pool.clone(), APPLY, config.queue_poll)));
    let gate = ApprovalGate::new(Arc::new(PgApprovalStore::new(pool.clone())), config.approval_poll);
    let analytics: Arc<dyn AnalyticsSink> = Arc::new(JsonlAnalytics::new(&config.analytics_file));

    AppState::new(store, raw_jobs, apply, gate, analytics)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Logging is not up yet, so this one goes to stderr only.
    let config = Config::from_env().map_err(std::io::Error::other)?;

    std::fs::create_dir_all(&config.log_dir)?;
    init_tracing(&config.log_dir);

    let pool = db::connection::get_connection(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| fatal("connect to database", e))?;
    info!("Database connection pool established");

    db::migrations::run_migrations(&pool)
        .await
        .map_err(|e| fatal("run database migrations", e))?;

    let state = build_state(&config, &pool);

    match cli.selected() {
        Command::Serve => serve(config, pool, state).await,
        command => {
            let result = cli::run(&command, &state).await;
            pool.close().await;
            result.map_err(|e| fatal("run command", e))
        }
    }
}

async fn serve(config: Config, pool: Pool<Postgres>, state: AppState) -> std::io::Result<()> {
    info!("Starting job-pilot");
    info!("Configuration loaded successfully:");
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max database connections: {}", config.max_db_connections);
    info!("  - Max concurrent jobs per stage: {}", config.max_concurrent_jobs);
    info!("  - Workers: {} intake, {} apply", config.intake_workers, config.apply_workers);
    info!("  - Fit threshold: {}", config.fit_threshold);

    let api_key = config
        .oracle_api_key
        .clone()
        .ok_or_else(|| fatal("load configuration", "ORACLE_API_KEY must be set to serve"))?;
    let profile = Arc::new(
        UserProfile::load(&config.profile_path)
            .await
            .map_err(|e| fatal("load user profile", e))?,
    );
    let oracle: Arc<dyn DecisionOracle> = Arc::new(
        OpenAiOracle::new(&config.oracle_api_base, api_key, config.oracle_model.clone(), config.oracle_timeout)
            .map_err(|e| fatal("build oracle client", e))?,
    );
    let drivers: Arc<dyn DriverFactory> = Arc::new(ChromeFactory::new(
        config.chrome_path.as_ref().map(PathBuf::from),
        config.driver_timeout,
        config.browser_headless,
    ));
    let artifacts = ArtifactWriter::new(&config.artifacts_dir);

    let intake = Arc::new(IntakePipeline::new(
        state.store.clone(),
        FitWorkflow::new(oracle.clone(), config.fit_threshold),
        artifacts.clone(),
        state.apply.clone(),
        state.analytics.clone(),
        profile.clone(),
    ));
    let controller = Arc::new(SubmissionController::new(
        state.store.clone(),
        drivers,
        ActionLoop::new(oracle, config.loop_settings()),
        state.gate.clone(),
        artifacts,
        state.analytics.clone(),
        profile,
    ));

    // watch channel: every worker sees the same shutdown flag
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cancel = CancellationToken::new();
    let permits = StagePermits::new(config.max_concurrent_jobs);
    let mut worker_handles = Vec::new();

    for worker_id in 1..=config.intake_workers {
        let worker = IntakeWorker::new(state.raw_jobs.clone(), intake.clone(), config.dequeue_timeout);
        let worker_semaphore = permits.intake.clone();
        let worker_shutdown_rx = shutdown_rx.clone();
        worker_handles.push(tokio::spawn(async move {
            worker.run(worker_id, worker_semaphore, worker_shutdown_rx).await;
        }));
        info!("Spawned intake worker {}", worker_id);
    }

    for worker_id in 1..=config.apply_workers {
        let worker = ApplyWorker::new(state.apply.clone(), controller.clone(), config.dequeue_timeout);
        let worker_semaphore = permits.apply.clone();
        let worker_shutdown_rx = shutdown_rx.clone();
        let worker_cancel = cancel.child_token();
        worker_handles.push(tokio::spawn(async move {
            worker
                .run(worker_id, worker_semaphore, worker_shutdown_rx, worker_cancel)
                .await;
        }));
        info!("Spawned apply worker {}", worker_id);
    }

    let app_state = web::Data::new(state.clone());
    let job_service = web::Data::new(JobService::new(state.store.clone(), state.raw_jobs.clone()));
    let max_payload_size = config.max_payload_size;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(job_service.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .app_data(web::JsonConfig::default().limit(max_payload_size))
            .app_data(validation::json_config())
            .app_data(validation::query_config())
            .configure(api::routes)
    });

    info!("Server starting on http://{}:{}", config.bind_addr, config.port);

    let server = server
        .bind((config.bind_addr.as_str(), config.port))?
        .run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let coordinator = ShutdownCoordinator::new(
        server_handle,
        server_task,
        worker_handles,
        shutdown_tx,
        cancel,
        pool,
    );

    coordinator.wait_for_shutdown().await
}
