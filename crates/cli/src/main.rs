use bucketwatch_cli::cli::{CliArgs, Commands, HealthArgs, ServeArgs};
use bucketwatch_cli::{NAME, VERSION};
use bucketwatch_core::{AppConfig, ConfigStore, S3Settings};
use bucketwatch_poller::{wait_for_client, Poller, WebhookNotifier};
use bucketwatch_s3::{ObjectStore, S3Client};
use bucketwatch_server::{build_router, AppState};

use clap::Parser;
use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);

    let exit_code = match &args.command {
        Commands::Serve(serve_args) => handle_serve(serve_args).await,
        Commands::Health(health_args) => handle_health(health_args).await,
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = if let Some(level_str) = &args.log_level {
            parse_level(level_str)
        } else if args.verbose {
            Level::DEBUG
        } else if args.quiet {
            Level::ERROR
        } else {
            let level_str =
                env::var("BUCKETWATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            filter = filter
                .add_directive(format!("bucketwatch={}", level).parse().unwrap())
                .add_directive(format!("bucketwatch_core={}", level).parse().unwrap())
                .add_directive(format!("bucketwatch_s3={}", level).parse().unwrap())
                .add_directive(format!("bucketwatch_poller={}", level).parse().unwrap())
                .add_directive(format!("bucketwatch_server={}", level).parse().unwrap())
                .add_directive(format!("bucketwatch_cli={}", level).parse().unwrap())
                .add_directive("h2=warn".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap());
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(atty::is(atty::Stream::Stderr))
                    .with_writer(std::io::stderr),
            )
            .init();
    });
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

async fn handle_serve(args: &ServeArgs) -> i32 {
    let default_config = AppConfig::default();
    let config = AppConfig {
        bind: args.bind.unwrap_or(default_config.bind),
        config_dir: args
            .config_dir
            .clone()
            .unwrap_or_else(|| default_config.config_dir.clone()),
        poll_interval_secs: args.poll_interval.unwrap_or(default_config.poll_interval_secs),
        ..default_config
    };

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your environment variables and command-line arguments.");
        return 1;
    }

    info!(
        bind = %config.bind,
        config_dir = %config.config_dir.display(),
        poll_interval_secs = config.poll_interval_secs,
        "starting bucketwatch"
    );

    let config_store = ConfigStore::new(&config.config_dir);
    let state = AppState::new(config_store.clone());

    // Try the saved (or default) connection once at boot. Failure is
    // fine; the endpoint can be configured through the API later.
    let saved = match config_store.load_settings() {
        Ok(saved) => saved,
        Err(e) => {
            warn!(error = %e, "saved connection settings unreadable, starting unconfigured");
            None
        }
    };
    let settings = S3Settings::resolve(saved.as_ref());
    match S3Client::connect(&settings).await {
        Ok(client) => {
            info!(endpoint = client.endpoint(), "connected to S3 endpoint");
            state
                .replace_store(Arc::new(client) as Arc<dyn ObjectStore>)
                .await;
        }
        Err(e) => {
            warn!(error = %e, "S3 endpoint not reachable, configure it via PUT /api/settings/s3");
        }
    }

    let poller_handle = if args.no_poller {
        info!("background poller disabled");
        None
    } else {
        let poller_store = config_store.clone();
        let interval = Duration::from_secs(config.poll_interval_secs);
        let webhook_timeout = Duration::from_secs(config.webhook_timeout_secs);

        // The poller resolves its own client at startup; new
        // credentials saved later need a restart to reach it.
        Some(tokio::spawn(async move {
            let client = wait_for_client(&poller_store, interval).await;
            let poller = Poller::new(
                Arc::new(client) as Arc<dyn ObjectStore>,
                poller_store,
                WebhookNotifier::with_timeout(webhook_timeout),
                interval,
            );
            poller.run().await;
        }))
    };

    let router = build_router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind, e);
            return 1;
        }
    };

    info!("listening on {}", config.bind);

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = poller_handle {
        handle.abort();
    }

    match result {
        Ok(()) => {
            info!("shutdown complete");
            0
        }
        Err(e) => {
            error!("Server error: {}", e);
            1
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn handle_health(args: &HealthArgs) -> i32 {
    let config_dir = args
        .config_dir
        .clone()
        .unwrap_or_else(|| AppConfig::default().config_dir);
    let config_store = ConfigStore::new(&config_dir);

    let saved = match config_store.load_settings() {
        Ok(saved) => saved,
        Err(e) => {
            error!("Could not read saved settings: {}", e);
            return 1;
        }
    };

    let settings = S3Settings::resolve(saved.as_ref());
    println!("Endpoint: {}", settings.endpoint_url);

    match S3Client::connect(&settings).await {
        Ok(client) => {
            let buckets = match client.list_buckets().await {
                Ok(buckets) => buckets,
                Err(e) => {
                    println!("Connection Failed: {}", e);
                    return 1;
                }
            };
            println!("Successfully Connected ({} bucket(s))", buckets.len());
            0
        }
        Err(e) => {
            println!("Connection Failed: {}", e);
            1
        }
    }
}
