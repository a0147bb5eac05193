use std::{process, sync::Arc, time::Duration};

use asksniff::{
    application::{accounts::AccountsService, error::AppError, repos::Repositories},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        memory::MemoryRepositories,
        passwords::BcryptHasher,
        telemetry,
    },
    util::clock::{Clock, SystemClock},
};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

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

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::GrantEditor(args) => run_grant_editor(settings, args).await,
    }
}

async fn connect_postgres(
    url: &str,
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

/// Postgres when a URL is configured, otherwise the in-memory backend.
async fn init_repositories(settings: &config::Settings) -> Result<Repositories, AppError> {
    match settings.database.url.as_deref() {
        Some(url) => Ok(Repositories::from_backend(
            connect_postgres(url, settings).await?,
        )),
        None => {
            warn!(
                target = "asksniff::bootstrap",
                "No database URL configured; using the in-memory backend. Data is lost on exit."
            );
            Ok(Repositories::from_backend(Arc::new(MemoryRepositories::new())))
        }
    }
}

fn require_database_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| AppError::from(InfraError::configuration("database url is not configured")))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = HttpState::new(repositories, &settings, clock);

    let sessions = state.sessions.clone();
    let purge_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                info!(target = "asksniff::sessions", purged, "Purged expired sessions");
            }
        }
    });

    let result = serve_http(&settings, state).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let url = require_database_url(&settings)?;
    connect_postgres(url, &settings).await?;
    info!(target = "asksniff::migrate", "Migrations applied");
    Ok(())
}

async fn run_grant_editor(
    settings: config::Settings,
    args: config::GrantEditorArgs,
) -> Result<(), AppError> {
    let url = require_database_url(&settings)?;
    let repositories = Repositories::from_backend(connect_postgres(url, &settings).await?);
    let accounts = AccountsService::new(
        repositories.users,
        Arc::new(BcryptHasher::new(settings.accounts.bcrypt_cost)),
        Arc::new(SystemClock),
    );

    let is_editor = !args.revoke;
    if !accounts.set_editor(&args.username, is_editor).await? {
        return Err(AppError::validation(format!(
            "no account named `{}`",
            args.username
        )));
    }
    info!(
        target = "asksniff::grant_editor",
        username = %args.username,
        is_editor,
        "Editor rights updated"
    );
    Ok(())
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "asksniff::bootstrap",
        addr = %settings.server.addr,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM; a second wait bounds how long in-flight
/// requests may take once shutdown starts.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        target = "asksniff::bootstrap",
        grace_secs = grace.as_secs(),
        "Shutdown requested"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = "asksniff::bootstrap", "Graceful shutdown timed out");
        process::exit(1);
    });
}
