// src/main.rs

use mocktest_platform::config::Config;
use mocktest_platform::routes;
use mocktest_platform::state::AppState;
use mocktest_platform::storage::{Storage, seed::seed_demo_catalog};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env().expect("Invalid configuration");

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let storage = match &config.database_url {
        Some(url) => {
            let pool = connect_with_retry(url).await;

            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations applied successfully.");

            Storage::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on exit");
            Storage::in_memory()
        }
    };

    if config.seed_demo_data {
        match seed_demo_catalog(&storage).await {
            Ok(true) => tracing::info!("Seeded demo catalog."),
            Ok(false) => {}
            Err(e) => tracing::error!("Failed to seed demo catalog: {:?}", e),
        }
    }

    let addr = config.bind_addr;
    let state = AppState { storage, config };

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

async fn connect_with_retry(url: &str) -> PgPool {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Database connected...");
                return pool;
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
