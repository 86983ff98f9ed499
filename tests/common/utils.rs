#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::io::Write;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;
use once_cell::sync::Lazy;
use secrecy::ExposeSecret;
use sqlx::{Connection, Executor, PgConnection, PgPool};

use onboarding_backend::auth::jwt::generate_token;
use onboarding_backend::config::settings::{get_config, DatabaseSettings};
use onboarding_backend::config::jwt::JwtSettings;
use onboarding_backend::invitations::{InvitationLifecycle, InvitationStore, MemoryInvitationStore};
use onboarding_backend::models::invitation::{Invitation, NewInvitation, ProjectRole};
use onboarding_backend::run;
use onboarding_backend::telemetry::{get_subscriber, init_subscriber};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::stdout
        );
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::sink
        );
        init_subscriber(subscriber);
    }
});

/// Shared in-memory sink for the bunyan layer.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// Alternative to TRACING for test binaries that inspect log output
static CAPTURED_LOGS: Lazy<LogBuffer> = Lazy::new(|| {
    let buffer = LogBuffer::default();
    let subscriber = get_subscriber("test".to_string(), "info".to_string(), buffer.clone());
    init_subscriber(subscriber);
    buffer
});

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryInvitationStore>,
    pub lifecycle: Arc<InvitationLifecycle>,
}

pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

pub async fn spawn_app() -> TestApp {
    init_tracing();
    start_server()
}

/// Like `spawn_app`, but every log line the server writes lands in the returned buffer.
pub async fn spawn_app_capturing_logs() -> (TestApp, LogBuffer) {
    let logs = Lazy::force(&CAPTURED_LOGS).clone();
    (start_server(), logs)
}

fn start_server() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    // Get port assigned by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(MemoryInvitationStore::new());
    let lifecycle = Arc::new(InvitationLifecycle::new(store.clone()));
    let server = run(listener, lifecycle.clone(), test_jwt_settings())
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        lifecycle,
    }
}

pub fn test_jwt_settings() -> JwtSettings {
    JwtSettings::new(TEST_JWT_SECRET.to_string(), 1)
}

pub fn test_user(email: &str) -> TestUser {
    let user_id = Uuid::new_v4();
    let token = generate_token(&test_jwt_settings(), user_id, email)
        .expect("Failed to generate test token");
    TestUser {
        user_id,
        email: email.to_string(),
        token,
    }
}

/// Seed a project plus a pending invitation expiring `expires_in` from now.
pub async fn seed_invitation(
    store: &MemoryInvitationStore,
    email: &str,
    expires_in: Duration,
) -> Invitation {
    let project_id = store
        .create_project(format!("Voice Agent {}", Uuid::new_v4()))
        .expect("Failed to create project");
    store
        .create_invitation(NewInvitation {
            project_id,
            email: email.to_string(),
            role: ProjectRole::Member,
            expires_at: Utc::now() + expires_in,
            inviter_id: Some(Uuid::new_v4()),
            token: None,
        })
        .await
        .expect("Failed to create invitation")
}

/// Fresh database with migrations applied, or `None` when no Postgres server
/// is reachable with the configured credentials.
pub async fn configure_db() -> Option<PgPool> {
    init_tracing();
    let mut config: DatabaseSettings = get_config()
        .expect("Failed to read configuration.")
        .database;
    config.db_name = Uuid::new_v4().to_string();
    // Hosted URLs name their own database; always use the fresh one
    config.db_url = None;

    let mut connection = match PgConnection::connect(
        config.connection_string_without_db().expose_secret()
    ).await {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Skipping Postgres-backed test, cannot connect: {}", e);
            return None;
        }
    };
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.db_name).as_str())
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(config.connection_string().expose_secret())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    Some(connection_pool)
}
