//! Shared harness: one fresh database and one running server per test.

#![allow(dead_code)]

use lazy_static::lazy_static;
use positions_auth::auth::TokenService;
use positions_auth::configuration::{get_configuration, DatabaseSettings, Settings};
use positions_auth::startup::{run, token_service};
use positions_auth::telemetry::{get_subscriber, init_subscriber};
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;

lazy_static! {
    // Set TEST_LOG to see server logs while tests run.
    static ref TRACING: () = {
        if std::env::var("TEST_LOG").is_ok() {
            init_subscriber(get_subscriber("debug", std::io::stdout));
        } else {
            init_subscriber(get_subscriber("debug", std::io::sink));
        }
    };
}

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub settings: Settings,
}

pub struct LoggedInUser {
    pub id: i64,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn tokens(&self) -> TokenService {
        token_service(&self.settings)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(&self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/auth/register",
            &json!({
                "username": username,
                "email": email,
                "password": password
            }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/auth/login",
            &json!({
                "username": username,
                "password": password
            }),
        )
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }

    /// Register then log in, returning the issued tokens.
    pub async fn signed_in_user(&self, username: &str) -> LoggedInUser {
        let email = format!("{}@example.com", username);
        let response = self.register(username, &email, "pw123").await;
        assert_eq!(200, response.status().as_u16());

        let response = self.login(username, "pw123").await;
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        LoggedInUser {
            id: body["user"]["id"].as_i64().expect("missing user id"),
            access_token: body["access_token"].as_str().expect("missing access token").to_string(),
            refresh_token: body["refresh_token"]
                .as_str()
                .expect("missing refresh token")
                .to_string(),
        }
    }
}

pub async fn spawn_app() -> TestApp {
    lazy_static::initialize(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut settings = get_configuration().expect("Failed to read configuration.");
    settings.database.database_name = uuid::Uuid::new_v4().to_string();
    settings.application.hash_cost = 4;
    let connection_pool = configure_database(&settings.database).await;

    let server =
        run(listener, connection_pool.clone(), &settings).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
        settings,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}
