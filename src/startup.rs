use std::path::Path;

use axum::extract::{DefaultBodyLimit, FromRef, MatchedPath, Request};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::configuration::{ApplicationSettings, Environment, Settings};
use crate::middleware::{cors, expose_error_detail, handle_panic, AllowedOrigins};
use crate::routes::{
    api_method_not_allowed, api_not_found, check_health, count_emails, submit_email,
};
use crate::store::{PostgresStore, SharedStore};

const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub environment: Environment,
    pub allowed_origins: AllowedOrigins,
}

impl AppState {
    pub fn new(settings: &ApplicationSettings, store: SharedStore) -> Self {
        Self {
            store,
            environment: settings.environment,
            allowed_origins: AllowedOrigins::new(settings.allowed_origins()),
        }
    }
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Environment {
    fn from_ref(state: &AppState) -> Self {
        state.environment
    }
}

impl FromRef<AppState> for AllowedOrigins {
    fn from_ref(state: &AppState) -> Self {
        state.allowed_origins.clone()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("Failed to connect to the subscription store")]
    Connectivity(#[source] sqlx::Error),
    #[error("Failed to migrate the subscription store")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("Failed to bind the listener on {address}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    store: SharedStore,
}

impl Application {
    /// Connects to Postgres and binds the listener. A store that cannot be
    /// reached is fatal: no traffic is served without it.
    pub async fn build(configuration: Settings) -> Result<Self, StartupError> {
        let store = PostgresStore::connect(&configuration.database)
            .await
            .map_err(StartupError::Connectivity)?;
        store.migrate().await.map_err(StartupError::Migration)?;
        tracing::info!("Subscription store connected");

        Self::build_with_store(configuration, std::sync::Arc::new(store)).await
    }

    pub async fn build_with_store(
        configuration: Settings,
        store: SharedStore,
    ) -> Result<Self, StartupError> {
        let settings = &configuration.application;
        let address = format!("{}:{}", settings.host, settings.port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;
        let port = listener
            .local_addr()
            .map_err(|source| StartupError::Bind { address, source })?
            .port();

        let state = AppState::new(settings, store.clone());
        tracing::info!(
            port,
            environment = settings.environment.as_str(),
            allowed_origins = ?state.allowed_origins.as_slice(),
            "Waitlist server configured"
        );
        let router = router(state, &settings.static_dir);

        Ok(Self {
            port,
            listener,
            router,
            store,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        axum::serve(self.listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Closing the subscription store");
        self.store.close().await;

        Ok(())
    }
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    let api = Router::new()
        .route(
            "/emails",
            post(submit_email).fallback(api_method_not_allowed),
        )
        .route(
            "/emails/count",
            get(count_emails).fallback(api_method_not_allowed),
        )
        .route(
            "/health",
            get(check_health).fallback(api_method_not_allowed),
        )
        .fallback(api_not_found);

    let mut router = Router::new().nest("/api", api);

    if state.environment == Environment::Production {
        let index = static_dir.join("index.html");
        router = router.fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(state.clone(), expose_error_detail))
        .layer(from_fn_with_state(state.clone(), cors))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            // Refer to https://github.com/tokio-rs/axum/blob/main/examples/tracing-aka-logging/Cargo.toml
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str);
                tracing::info_span!(
                    "Starting HTTP request",
                    method = ?request.method(),
                    path,
                    request_id = %Uuid::new_v4(),
                )
            }),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?error, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = ?error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
