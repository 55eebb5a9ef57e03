use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get},
};
use healthgateway_cache::{CacheProvider, create_cache_backend};
use healthgateway_core::{ErrorTranslator, SharedClock, SystemClock};
use healthgateway_storage::{
    BannerChangeListener, ChangeFeed, DynCommunicationStorage, InMemoryCommunicationStorage,
    PostgresCommunicationStorage, StorageError, create_pool, migrations,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::communication::{ChangeDispatcher, CommunicationService};
use crate::config::{AppConfig, StorageBackend};
use crate::handlers;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub communications: Arc<CommunicationService>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/v1/api/Communication/cache",
            delete(handlers::clear_communication_cache),
        )
        .route(
            "/v1/api/Communication/{communication_type}",
            get(handlers::get_communication),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the router for `cfg`, starting any background tasks it needs.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, ServerError> {
    let server = ServerBuilder::new().with_config(cfg.clone()).build().await?;
    Ok(server.router())
}

pub struct GatewayServer {
    addr: SocketAddr,
    app: Router,
    service: Arc<CommunicationService>,
    memory_storage: Option<Arc<InMemoryCommunicationStorage>>,
    tasks: Vec<JoinHandle<()>>,
}

impl GatewayServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn service(&self) -> &Arc<CommunicationService> {
        &self.service
    }

    /// The in-memory store, when `storage.backend = "memory"`.
    pub fn memory_storage(&self) -> Option<&Arc<InMemoryCommunicationStorage>> {
        self.memory_storage.as_ref()
    }

    /// Serve until Ctrl-C, then stop background tasks.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Health Gateway communication server listening");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        for task in &self.tasks {
            task.abort();
        }
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub struct ServerBuilder {
    config: AppConfig,
    clock: SharedClock,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Connect storage and cache, wire the change feed and build the router.
    pub async fn build(self) -> Result<GatewayServer, ServerError> {
        let config = self.config;
        let clock = self.clock;
        let listen = config.communication.listen_for_changes;

        let cache: Arc<dyn CacheProvider> = Arc::new(create_cache_backend(&config.redis).await);

        let mut memory_storage = None;
        let mut listener = None;
        let (storage, feed): (DynCommunicationStorage, Option<Arc<dyn ChangeFeed>>) =
            match config.storage.backend {
                StorageBackend::Postgres => {
                    let pg = &config.storage.postgres;
                    let pool = create_pool(pg).await?;
                    if pg.run_migrations {
                        migrations::run(&pool).await?;
                    }
                    let storage = Arc::new(PostgresCommunicationStorage::new(
                        pool.clone(),
                        clock.clone(),
                    ));
                    let feed: Option<Arc<dyn ChangeFeed>> = if listen {
                        let pg_listener = Arc::new(BannerChangeListener::with_channel(
                            pool,
                            config.communication.channel.clone(),
                        ));
                        listener = Some(pg_listener.clone());
                        Some(pg_listener as Arc<dyn ChangeFeed>)
                    } else {
                        None
                    };
                    (storage as DynCommunicationStorage, feed)
                }
                StorageBackend::Memory => {
                    let memory = Arc::new(InMemoryCommunicationStorage::new(clock.clone()));
                    memory_storage = Some(memory.clone());
                    let feed: Option<Arc<dyn ChangeFeed>> = if listen {
                        Some(memory.clone() as Arc<dyn ChangeFeed>)
                    } else {
                        None
                    };
                    (memory as DynCommunicationStorage, feed)
                }
            };

        info!(
            backend = storage.backend_name(),
            listen_for_changes = listen,
            "Communication storage ready"
        );

        let service = Arc::new(CommunicationService::new(
            storage,
            cache,
            ErrorTranslator::new(&config.application.name),
            clock,
        ));

        let mut tasks = Vec::new();
        if let Some(feed) = feed {
            // Subscribe before the listener starts so no change is missed.
            tasks.push(ChangeDispatcher::new(service.clone()).start(feed.subscribe()));
        }
        if let Some(listener) = listener {
            tasks.push(listener.start());
        }

        let app = build_router(AppState {
            communications: service.clone(),
        });

        Ok(GatewayServer {
            addr: config.addr(),
            app,
            service,
            memory_storage,
            tasks,
        })
    }
}
