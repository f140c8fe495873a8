use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};

const MIN_JWT_SECRET_CHARS: usize = 32;

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub account_name: String,
    pub account_key: String,
    pub container: String,
    /// Overrides `https://<account>.blob.core.windows.net`, e.g. for Azurite.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    pub http_addr: String,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub http_request_body_limit_bytes: usize,
    pub http_concurrency_limit: usize,
    pub http_request_timeout_secs: u64,
    pub storage: Option<StorageSettings>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let database_url = env.required("DATABASE_URL")?;
        let jwt_secret = env.required("JWT_SECRET")?;
        if jwt_secret.chars().count() < MIN_JWT_SECRET_CHARS {
            bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_CHARS} characters");
        }

        let log_level = env
            .optional("LOG_LEVEL")
            .or_else(|| env.optional("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_ttl_seconds: env.positive("JWT_TTL_SECONDS", 7 * 24 * 60 * 60)?,
            http_addr: env
                .optional("HTTP_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            cors_origins: parse_cors_origins(
                &env.optional("CORS_ORIGINS")
                    .unwrap_or_else(|| "http://localhost:5173".to_string()),
            ),
            log_level,
            http_request_body_limit_bytes: env.positive("HTTP_REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?,
            http_concurrency_limit: env.positive("HTTP_CONCURRENCY_LIMIT", 256)?,
            http_request_timeout_secs: env.positive("HTTP_REQUEST_TIMEOUT_SECS", 10)?,
            storage: storage_settings(&env)?,
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key)
            .ok_or_else(|| anyhow!("{key} is required"))
    }

    fn positive<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr + PartialOrd + Default,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        let value = raw
            .parse::<T>()
            .with_context(|| format!("failed to parse {key}, expecting a positive integer"))?;
        if value <= T::default() {
            bail!("{key} must be > 0");
        }
        Ok(value)
    }
}

/// Storage is optional at startup: without it delegation endpoints answer
/// with a configuration error instead of the whole service refusing to boot.
/// A half-filled configuration is still rejected.
fn storage_settings<F: Fn(&str) -> Option<String>>(env: &Env<'_, F>) -> Result<Option<StorageSettings>> {
    match (
        env.optional("AZURE_STORAGE_ACCOUNT_NAME"),
        env.optional("AZURE_STORAGE_ACCOUNT_KEY"),
    ) {
        (None, None) => Ok(None),
        (Some(account_name), Some(account_key)) => Ok(Some(StorageSettings {
            account_name,
            account_key,
            container: env
                .optional("AZURE_STORAGE_CONTAINER")
                .unwrap_or_else(|| "media".to_string()),
            endpoint: env.optional("AZURE_STORAGE_ENDPOINT"),
        })),
        _ => bail!("AZURE_STORAGE_ACCOUNT_NAME and AZURE_STORAGE_ACCOUNT_KEY must be set together"),
    }
}

fn parse_cors_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
