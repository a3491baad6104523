use config::ConfigError;
use serde::de::{self, Deserializer, Visitor};
use sqlx::postgres::PgConnectOptions;
use std::fmt;

pub const INSECURE_ACCESS_SECRET: &str = "access_secret";
pub const INSECURE_REFRESH_SECRET: &str = "refresh_secret";

/// Environment variables and the configuration keys they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("APP_ENVIRONMENT", "application.environment"),
    ("APP_HOST", "application.host"),
    ("APP_PORT", "application.port"),
    ("BCRYPT_COST", "application.hash_cost"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.username"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.database_name"),
    ("DB_MAX_CONNECTIONS", "database.max_connections"),
    ("DB_ACQUIRE_TIMEOUT_SECONDS", "database.acquire_timeout_seconds"),
    ("JWT_ACCESS_TOKEN_SECRET", "jwt.access_secret"),
    ("JWT_REFRESH_TOKEN_SECRET", "jwt.refresh_secret"),
    ("ACCESS_TOKEN_EXPIRES_IN", "jwt.access_token_expiry"),
    ("REFRESH_TOKEN_EXPIRES_IN", "jwt.refresh_token_expiry"),
    ("JWT_ISSUER", "jwt.issuer"),
];

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// bcrypt work factor for passwords and refresh tokens
    pub hash_cost: u32,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
    /// How long a request waits for a free pooled connection before failing
    pub acquire_timeout_seconds: u64,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_seconds", &self.acquire_timeout_seconds)
            .finish()
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    /// Seconds. Accepts `900`, `"900"`, `"15m"`, `"7d"`.
    #[serde(deserialize_with = "deserialize_lifetime")]
    pub access_token_expiry: i64,
    #[serde(deserialize_with = "deserialize_lifetime")]
    pub refresh_token_expiry: i64,
    pub issuer: String,
}

impl JwtSettings {
    fn uses_default_secret(&self) -> bool {
        self.access_secret == INSECURE_ACCESS_SECRET || self.refresh_secret == INSECURE_REFRESH_SECRET
    }

    /// Rejects secrets that would make tokens forgeable or interchangeable.
    pub fn ensure_secure(&self, environment: Environment) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(ConfigError::Message("JWT secrets must not be empty".into()));
        }
        if environment == Environment::Local {
            if self.uses_default_secret() {
                tracing::warn!("Using insecure default JWT secrets; set JWT_ACCESS_TOKEN_SECRET and JWT_REFRESH_TOKEN_SECRET");
            }
            return Ok(());
        }
        if self.uses_default_secret() {
            return Err(ConfigError::Message(
                "JWT_ACCESS_TOKEN_SECRET and JWT_REFRESH_TOKEN_SECRET must be set in production"
                    .into(),
            ));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::Message(
                "access and refresh token secrets must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Parses a token lifetime into seconds: a bare number or a number followed
/// by one of `s`, `m`, `h`, `d`.
pub fn parse_lifetime(value: &str) -> Option<i64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount: i64 = amount.parse().ok()?;
    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };
    let seconds = amount.checked_mul(multiplier)?;
    (seconds > 0).then_some(seconds)
}

fn deserialize_lifetime<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LifetimeVisitor;

    impl<'de> Visitor<'de> for LifetimeVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a positive number of seconds or a string like \"15m\" or \"7d\"")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            if v > 0 {
                Ok(v)
            } else {
                Err(E::custom("token lifetime must be positive"))
            }
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v)
                .map_err(|_| E::custom("token lifetime out of range"))
                .and_then(|v| self.visit_i64(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            parse_lifetime(v).ok_or_else(|| E::custom(format!("invalid token lifetime: {v}")))
        }
    }

    deserializer.deserialize_any(LifetimeVisitor)
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("application.environment", "local")?
        .set_default("application.hash_cost", 10)?
        .set_default("database.max_connections", 10)?
        .set_default("database.acquire_timeout_seconds", 5)?
        .set_default("jwt.access_secret", INSECURE_ACCESS_SECRET)?
        .set_default("jwt.refresh_secret", INSECURE_REFRESH_SECRET)?
        .set_default("jwt.access_token_expiry", "15m")?
        .set_default("jwt.refresh_token_expiry", "7d")?
        .set_default("jwt.issuer", "positions-auth")?
        .add_source(config::File::with_name("configuration").required(false));

    for (variable, key) in ENV_OVERRIDES {
        builder = builder.set_override_option(*key, std::env::var(variable).ok())?;
    }

    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.jwt.ensure_secure(settings.application.environment)?;
    Ok(settings)
}
