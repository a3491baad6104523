use positions_auth::configuration::get_configuration;
use positions_auth::startup::{get_connection_pool, run};
use positions_auth::telemetry::init_telemetry;
use std::net::TcpListener;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!(environment = ?config.application.environment, "Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!(database = ?configuration.database, "Attempting to connect to database");

    let pool = get_connection_pool(&configuration.database)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created successfully");

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, pool, &configuration)?;
    server.await
}
