use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode as AxumStatusCode;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use courier::config::Config;
use courier::models::{DeliveryJob, MessageTemplate, NewDeliveryJob};

pub const TEST_SECRET: &str = "test-worker-secret";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Invoke the worker trigger with the given bearer token.
    pub async fn trigger_with(&self, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/v1/worker/run"))
            .bearer_auth(token)
            .send()
            .await
            .expect("trigger request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        (body, status)
    }

    /// Invoke the worker trigger with the configured secret.
    pub async fn trigger(&self) -> Value {
        let (body, status) = self.trigger_with(TEST_SECRET).await;
        assert_eq!(status, StatusCode::OK, "trigger non-200: {body}");
        body
    }

    pub async fn enqueue_webhook(&self, destination: &str, payload: Value) -> DeliveryJob {
        courier::db::delivery_jobs::enqueue(
            &self.pool,
            &NewDeliveryJob::webhook(destination, payload),
        )
        .await
        .expect("enqueue webhook job failed")
    }

    pub async fn enqueue_email(
        &self,
        destination: &str,
        template_id: Uuid,
        variables: Value,
    ) -> DeliveryJob {
        courier::db::delivery_jobs::enqueue(
            &self.pool,
            &NewDeliveryJob::email(destination, template_id, variables),
        )
        .await
        .expect("enqueue email job failed")
    }

    pub async fn create_template(
        &self,
        name: &str,
        subject: &str,
        body_html: &str,
        body_text: &str,
    ) -> MessageTemplate {
        courier::db::templates::create(&self.pool, name, subject, body_html, body_text)
            .await
            .expect("create template failed")
    }

    pub async fn job(&self, id: Uuid) -> DeliveryJob {
        courier::db::delivery_jobs::find_by_id(&self.pool, id)
            .await
            .expect("find job failed")
            .expect("job not found")
    }

    /// Force a retry-scheduled job to be eligible right now.
    pub async fn make_eligible(&self, id: Uuid) {
        sqlx::query(
            "UPDATE delivery_jobs SET next_retry_at = now() - interval '1 second'
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .expect("make_eligible failed");
    }

    pub async fn audit_actions(&self) -> Vec<String> {
        courier::db::audit::list(&self.pool, 100, 0)
            .await
            .expect("list audit events failed")
            .into_iter()
            .map(|e| e.action)
            .collect()
    }
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!("courier_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        worker_secret: TEST_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        batch_size: 10,
        max_retries: 3,
        stuck_after_secs: 600,
        sweep_interval_secs: 300,
        trigger_rate_limit: 10_000,
        trigger_rate_window_secs: 60,
        log_level: "warn".to_string(),
        smtp: None,
    };

    let (app, _state) = courier::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
    }
}

/// A local HTTP server standing in for a webhook destination.
pub struct Receiver {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl Receiver {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Spawn a receiver that counts POSTs to /hook and answers with `status`.
pub async fn spawn_receiver(status: u16) -> Receiver {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let status = AxumStatusCode::from_u16(status).expect("invalid status code");

    let app = axum::Router::new().route(
        "/hook",
        axum::routing::post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                status
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind receiver");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Receiver failed");
    });

    Receiver {
        url: format!("http://{addr}/hook"),
        hits,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
