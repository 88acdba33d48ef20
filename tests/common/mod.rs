// tests/common/mod.rs

use mocktest_platform::{
    config::Config,
    routes,
    state::AppState,
    storage::{Storage, seed::seed_demo_catalog},
};

pub struct TestApp {
    /// e.g. "http://127.0.0.1:12345"
    pub address: String,
    pub storage: Storage,
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_dir: "logs".to_string(),
        seed_demo_data: true,
    }
}

/// Spawns the app on a random port over a fresh, seeded in-memory store.
pub async fn spawn_app() -> TestApp {
    let storage = Storage::in_memory();
    seed_demo_catalog(&storage)
        .await
        .expect("Failed to seed demo catalog");

    let state = AppState {
        storage: storage.clone(),
        config: test_config(),
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        storage,
    }
}

pub fn unique_name() -> String {
    format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8])
}
