use std::{process, sync::Arc};

use storefront::{
    application::{
        error::AppError,
        products::{MetadataSource, ProductCache, ProductService, RefreshCoordinator},
        reseller::{ApiMode, CredentialOverrides, ResellerGateway, SharedCredentials},
    },
    config,
    infra::{
        cache_file::CacheStore,
        error::InfraError,
        http::{self, ApiState},
        metadata::MetadataFile,
        reseller::ResellerClient,
        telemetry,
    },
};
use tokio::signal;
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
        config::Command::Sync(_) => run_sync(settings).await,
        config::Command::Balance(args) => run_balance(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let refresher = app.products.refresher().clone();

    let state = ApiState {
        products: app.products,
        reseller: app.reseller,
        credentials: app.credentials,
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "storefront::server",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    if refresher.is_refreshing() {
        info!(
            target = "storefront::server",
            "waiting for in-flight product refresh"
        );
        let drain = tokio::time::timeout(settings.server.graceful_shutdown, refresher.settle());
        if drain.await.is_err() {
            warn!(
                target = "storefront::server",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "product refresh still running at shutdown; abandoning it"
            );
        }
    }

    Ok(())
}

async fn run_sync(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let envelope = app.products.sync_now().await?;

    info!(
        target = "storefront::sync",
        records = envelope.len(),
        path = %settings.cache.path.display(),
        "product cache synchronized"
    );
    Ok(())
}

async fn run_balance(
    settings: config::Settings,
    args: config::BalanceArgs,
) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;
    let mode = ApiMode::from_production_flag(args.production);
    let balance = app
        .reseller
        .balance(mode, &CredentialOverrides::default())
        .await?;

    info!(
        target = "storefront::balance",
        mode = mode.as_str(),
        deposit = balance.deposit,
        "reseller deposit balance"
    );
    Ok(())
}

struct ApplicationContext {
    products: Arc<ProductService>,
    reseller: Arc<dyn ResellerGateway>,
    credentials: SharedCredentials,
}

async fn build_application_context(
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let credentials = SharedCredentials::new(settings.reseller.credentials.clone());
    let client = ResellerClient::new(
        &settings.reseller.base_url,
        settings.reseller.timeout,
        credentials.clone(),
    )?
    .with_catalog_mode(settings.reseller.catalog_mode);
    let reseller: Arc<dyn ResellerGateway> = Arc::new(client);

    let store = CacheStore::new(settings.cache.path.clone());
    let cache = Arc::new(ProductCache::open(store).await);
    let refresher = RefreshCoordinator::new(reseller.clone(), cache.clone());
    let metadata: Arc<dyn MetadataSource> =
        Arc::new(MetadataFile::new(settings.catalog.metadata_path.clone()));

    let products = Arc::new(ProductService::new(
        cache,
        refresher,
        metadata,
        settings.cache.ttl,
    ));

    Ok(ApplicationContext {
        products,
        reseller,
        credentials,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(
                target = "storefront::server",
                error = %err,
                "failed to listen for ctrl-c"
            );
            std::future::pending::<()>().await;
        }
        info!(
            target = "storefront::server",
            "received ctrl-c, shutting down"
        );
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!(
                    target = "storefront::server",
                    "received terminate signal, shutting down"
                );
            }
            Err(err) => {
                warn!(
                    target = "storefront::server",
                    error = %err,
                    "failed to install terminate handler"
                );
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
