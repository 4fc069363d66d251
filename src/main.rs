use std::{future::IntoFuture, path::PathBuf, process, sync::Arc};

use satam_edge::{
    application::{WorkerRegistration, error::AppError, ports::Caches},
    cache::CacheStorage,
    config::{self, InspectArgs, Settings},
    infra::{
        error::InfraError,
        http::{self, EdgeState},
        network::HttpNetwork,
        telemetry,
    },
};
use tokio::{sync::Notify, time::timeout};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Inspect(args) => run_inspect(settings, args).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let upstream = settings.upstream.base_url.clone().ok_or_else(|| {
        AppError::from(InfraError::configuration(
            "upstream.base_url is required to serve (use --upstream-url or SATAM_EDGE__UPSTREAM__BASE_URL)",
        ))
    })?;

    let storage = Arc::new(match settings.cache.snapshot_path.as_deref() {
        Some(path) => CacheStorage::load_snapshot(path).await?,
        None => CacheStorage::new(),
    });

    let network = Arc::new(HttpNetwork::new(
        settings.server.public_origin.clone(),
        upstream.clone(),
        settings.upstream.timeout,
    )?);

    let caches: Arc<dyn Caches> = storage.clone();
    let registration = Arc::new(WorkerRegistration::new(caches, network));

    match registration.register(settings.worker_config()).await {
        Ok(worker) => info!(
            target = "satam_edge::serve",
            worker = %worker.id(),
            version = worker.version(),
            "worker registered"
        ),
        Err(err) => error!(
            target = "satam_edge::serve",
            error = %err,
            "worker registration failed; serving in passthrough mode"
        ),
    }

    let state = EdgeState::new(registration, settings.server.public_origin.clone());
    let result = serve_http(&settings, state).await;

    if let Some(path) = settings.cache.snapshot_path.as_deref()
        && let Err(err) = storage.write_snapshot(path).await
    {
        warn!(
            target = "satam_edge::serve",
            error = %err,
            "failed to write cache snapshot"
        );
    }

    result
}

async fn serve_http(settings: &Settings, state: EdgeState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "satam_edge::serve",
        addr = %settings.server.addr,
        origin = %settings.server.public_origin,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move { shutdown.notified().await }
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = shutdown_signal() => {
            info!(target = "satam_edge::serve", "shutdown requested; draining connections");
            shutdown.notify_one();
            match timeout(settings.server.graceful_shutdown, &mut server).await {
                Ok(result) => {
                    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
                }
                Err(_) => warn!(
                    target = "satam_edge::serve",
                    seconds = settings.server.graceful_shutdown.as_secs(),
                    "graceful shutdown timed out"
                ),
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "satam_edge::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}

fn inspect_path(settings: Settings, args: InspectArgs) -> Result<PathBuf, AppError> {
    args.file
        .or(settings.cache.snapshot_path)
        .ok_or_else(|| AppError::validation("no snapshot file given and cache.snapshot_path is unset"))
}

async fn run_inspect(settings: Settings, args: InspectArgs) -> Result<(), AppError> {
    let path = inspect_path(settings, args)?;

    let storage = CacheStorage::load_snapshot(&path).await?;
    for store in storage.info() {
        println!("{}\t{} entries", store.name, store.entries);
        if let Some(handle) = storage.find(&store.name) {
            for key in handle.keys() {
                println!("  {key}");
            }
        }
    }
    Ok(())
}
